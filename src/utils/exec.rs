//! External command execution.
//!
//! Every pipeline stage hands its work to an external tool (`sass`, `esbuild`,
//! `pug`, `optipng`, ...). This module runs those tools, captures their
//! output and turns a non-zero exit into an error carrying the tool's own
//! diagnostics.

use crate::log;
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Output},
    sync::OnceLock,
};

// ============================================================================
// Macros
// ============================================================================

/// Run an external command with arguments, failing on non-zero exit.
///
/// Optional leading `filter=` and `env=` arguments, then an optional working
/// directory, then the command (`[&str; N]` or `&Vec<String>`) and its args.
/// Empty arguments are dropped, which makes conditional flags cheap:
///
/// ```ignore
/// exec!(["sass"]; input, output)?;
/// exec!(root; &config.styles.command; "--style=expanded", input, output)?;
/// exec!(env=[("BROWSERSLIST", browsers)]; root; ["postcss"]; "-r", file)?;
/// exec!(filter=&QUIET; root; ["optipng"]; if fast { "-o1" } else { "" }, file)?;
/// ```
#[macro_export]
macro_rules! exec {
    ($($tt:tt)*) => {
        $crate::exec_internal!(@parse_filter $($tt)*)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! exec_internal {
    // Parse filter argument
    (@parse_filter filter=$filter:expr; $($rest:tt)*) => {
        $crate::exec_internal!(@parse_env $filter; $($rest)*)
    };
    (@parse_filter $($rest:tt)*) => {
        $crate::exec_internal!(@parse_env &$crate::utils::exec::EMPTY_FILTER; $($rest)*)
    };

    // Parse env argument
    (@parse_env $filter:expr; env=$env:expr; $($rest:tt)*) => {
        $crate::exec_internal!(@parse_root $filter; $crate::utils::exec::internal::to_env_vec($env); $($rest)*)
    };
    (@parse_env $filter:expr; $($rest:tt)*) => {
        $crate::exec_internal!(@parse_root $filter; Vec::<(std::ffi::OsString, std::ffi::OsString)>::new(); $($rest)*)
    };

    // Parse root and command (with root)
    (@parse_root $filter:expr; $env:expr; $root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::exec(
            Some($root),
            &$crate::utils::exec::internal::to_cmd_vec($cmd),
            &$crate::utils::exec::internal::filter_args(&[$($crate::utils::exec::internal::to_os($arg)),*]),
            &$env,
            $filter,
        )
    };
    // Parse command (without root)
    (@parse_root $filter:expr; $env:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::exec(
            None,
            &$crate::utils::exec::internal::to_cmd_vec($cmd),
            &$crate::utils::exec::internal::filter_args(&[$($crate::utils::exec::internal::to_os($arg)),*]),
            &$env,
            $filter,
        )
    };
}

// ============================================================================
// Argument Conversion
// ============================================================================

#[doc(hidden)]
#[allow(clippy::wildcard_imports)] // Needed for macro internal module
pub mod internal {
    use super::*;

    #[inline]
    pub fn to_os<S: Into<OsString>>(s: S) -> OsString {
        s.into()
    }

    pub trait ToCmd {
        fn to_cmd(self) -> Vec<OsString>;
    }

    impl<const N: usize> ToCmd for [&str; N] {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.into_iter().map(OsString::from).collect()
        }
    }

    impl ToCmd for &[String] {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.iter().map(OsString::from).collect()
        }
    }

    impl ToCmd for &Vec<String> {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.iter().map(OsString::from).collect()
        }
    }

    #[inline]
    pub fn to_cmd_vec<C: ToCmd>(cmd: C) -> Vec<OsString> {
        cmd.to_cmd()
    }

    #[inline]
    pub fn to_env_vec<const N: usize, V: Into<OsString>>(
        env: [(&str, V); N],
    ) -> Vec<(OsString, OsString)> {
        env.into_iter()
            .map(|(k, v)| (OsString::from(k), v.into()))
            .collect()
    }

    /// Filter out empty args.
    #[inline]
    pub fn filter_args(args: &[OsString]) -> Vec<OsString> {
        args.iter().filter(|a| !a.is_empty()).cloned().collect()
    }
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute a command and capture its output.
///
/// # Errors
/// Returns error if the command cannot be started or exits non-zero.
pub fn exec(
    root: Option<&Path>,
    cmd: &[OsString],
    args: &[OsString],
    env: &[(OsString, OsString)],
    filter: &'static FilterRule,
) -> Result<Output> {
    let (name, output) = run(root, cmd, args, env)?;
    log_output(&name, &output, filter)?;
    Ok(output)
}

/// Execute a command without judging its exit status.
///
/// For tools whose non-zero exit is a result rather than a failure (linters).
pub fn exec_unchecked(root: Option<&Path>, cmd: &[String], args: &[OsString]) -> Result<Output> {
    let cmd = internal::to_cmd_vec(cmd);
    let (_, output) = run(root, &cmd, &internal::filter_args(args), &[])?;
    Ok(output)
}

/// Whether the program of `command` can be found on `PATH`.
pub fn command_exists(command: &[String]) -> bool {
    command.first().is_some_and(|cmd| which::which(cmd).is_ok())
}

fn run(
    root: Option<&Path>,
    cmd: &[OsString],
    args: &[OsString],
    env: &[(OsString, OsString)],
) -> Result<(String, Output)> {
    let (name, mut command) = prepare(root, cmd, args)?;
    command.envs(env.iter().map(|(k, v)| (k, v)));

    let output = command
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;
    Ok((name, output))
}

fn prepare(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let Some((program, fixed_args)) = cmd.split_first() else {
        bail!("Empty command");
    };
    let name = program
        .to_str()
        .context("Command name is not valid UTF-8")?
        .to_owned();

    let mut command = Command::new(program);
    command.args(fixed_args).args(args);

    if let Some(dir) = root {
        command.current_dir(dir);
    }

    Ok((name, command))
}

// ============================================================================
// Output Filtering
// ============================================================================

pub fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ANSI regex"));
    re.replace_all(s, "")
}

/// Lines of tool output to drop before logging.
///
/// Keeps version banners and progress chatter out of the build log.
pub struct FilterRule {
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    fn log(&self, name: &str, output: &str) {
        let lines: Vec<_> = output
            .lines()
            .filter(|line| !self.should_skip(strip_ansi(line).trim()))
            .collect();

        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Stdout filter: skip HTML and JSON output.
const STDOUT_FILTER: FilterRule = FilterRule::new(&["<!DOCTYPE", "{"]);

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// Silent filter: skip all output.
pub const SILENT_FILTER: FilterRule = FilterRule::new(&[""]);

fn log_output(name: &str, output: &Output, filter: &'static FilterRule) -> Result<()> {
    if !output.status.success() {
        bail!(format_error(name, output, filter));
    }

    // On success only stderr (warnings) is worth showing
    let stderr = String::from_utf8_lossy(&output.stderr);
    filter.log(name, stderr.trim());

    Ok(())
}

fn format_error(name: &str, output: &Output, filter: &'static FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let error_msg = filter
        .skip_prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .fold(stderr.trim(), |s, p| s.trim_start_matches(p).trim_start());

    let mut msg = format!("Command `{name}` failed with {}\n", output.status);
    if !error_msg.is_empty() {
        msg.push_str(error_msg);
    }

    let stdout_trimmed = stdout.trim();
    if !stdout_trimmed.is_empty() && !STDOUT_FILTER.should_skip(stdout_trimmed) {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout_trimmed);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::exec::internal::*;

    #[test]
    fn test_to_cmd_vec() {
        let cmd = to_cmd_vec(["sass", "--quiet"]);
        assert_eq!(cmd, vec![OsString::from("sass"), OsString::from("--quiet")]);

        let v = vec!["npx".to_string(), "esbuild".to_string()];
        let cmd = to_cmd_vec(&v);
        assert_eq!(cmd.len(), 2);
        assert_eq!(cmd[1], OsString::from("esbuild"));
    }

    #[test]
    fn test_filter_args_drops_empty() {
        let args = [OsString::from("-o5"), OsString::new(), OsString::from("in.png")];
        let filtered = filter_args(&args);
        assert_eq!(filtered, vec![OsString::from("-o5"), OsString::from("in.png")]);
    }

    #[test]
    fn test_to_env_vec() {
        let env = to_env_vec([("BROWSERSLIST", "> 1%")]);
        assert_eq!(env, vec![(OsString::from("BROWSERSLIST"), OsString::from("> 1%"))]);
    }

    #[test]
    fn test_prepare_empty() {
        assert!(prepare(None, &[], &[]).is_err());
    }

    #[test]
    fn test_prepare_splits_program() {
        let cmd = to_cmd_vec(["npx", "pug"]);
        let (name, command) = prepare(None, &cmd, &[OsString::from("page.pug")]).unwrap();
        assert_eq!(name, "npx");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["pug", "page.pug"]);
    }

    #[test]
    fn test_filter_rule() {
        let filter = FilterRule::new(&["Compiled", "Done in"]);
        assert!(filter.should_skip("Compiled src/scss/styles.scss"));
        assert!(filter.should_skip("Done in 12ms"));
        assert!(!filter.should_skip("Error: expected \";\""));
        assert!(filter.should_skip(""));
    }

    #[test]
    fn test_command_exists() {
        assert!(!command_exists(&[]));
        assert!(!command_exists(&["definitely-not-a-real-tool-7d1f".to_string()]));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_failure_carries_stderr() {
        let err = exec!(["sh"]; "-c", "echo broken >&2; exit 3").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Command `sh` failed"));
        assert!(msg.contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_passes_env() {
        let output = exec!(env=[("SITEPIPE_TEST", "42")]; ["sh"]; "-c", "printf $SITEPIPE_TEST").unwrap();
        assert_eq!(output.stdout, b"42");
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("\x1b[1;32mGreen Bold\x1b[0m"), "Green Bold");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }
}
