//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn output() -> PathBuf {
        "public".into()
    }
}

// ============================================================================
// [styles] Section Defaults
// ============================================================================

pub mod styles {
    use std::path::PathBuf;

    pub fn entry() -> PathBuf {
        "src/scss/styles.scss".into()
    }

    pub fn output() -> PathBuf {
        "css".into()
    }

    pub fn command() -> Vec<String> {
        vec!["sass".into()]
    }

    pub fn load_paths() -> Vec<PathBuf> {
        vec!["node_modules".into()]
    }

    pub fn watch() -> PathBuf {
        "src/scss".into()
    }

    pub mod postcss {
        pub fn command() -> Vec<String> {
            vec!["postcss".into()]
        }

        pub fn plugins() -> Vec<String> {
            vec!["autoprefixer".into(), "cssnano".into()]
        }

        pub fn browsers() -> String {
            "> 1%, last 2 versions, Firefox ESR, Opera 12.1".into()
        }
    }
}

// ============================================================================
// [scripts] Section Defaults
// ============================================================================

pub mod scripts {
    use std::path::PathBuf;

    pub fn entry() -> PathBuf {
        "src/js/index.js".into()
    }

    pub fn bundle() -> String {
        "scripts.js".into()
    }

    pub fn output() -> PathBuf {
        "js".into()
    }

    pub fn command() -> Vec<String> {
        vec!["esbuild".into()]
    }

    pub fn target() -> String {
        "es2015".into()
    }

    pub fn watch() -> PathBuf {
        "src/js".into()
    }
}

// ============================================================================
// [markup] Section Defaults
// ============================================================================

pub mod markup {
    use std::path::PathBuf;

    pub fn pages() -> PathBuf {
        "src/views/pages".into()
    }

    pub fn basedir() -> PathBuf {
        "src/views".into()
    }

    pub fn command() -> Vec<String> {
        vec!["pug".into()]
    }

    pub fn extension() -> String {
        "pug".into()
    }

    pub fn watch() -> PathBuf {
        "src/views".into()
    }
}

// ============================================================================
// [images] Section Defaults
// ============================================================================

pub mod images {
    use std::path::PathBuf;

    pub fn source() -> PathBuf {
        "src/img".into()
    }

    pub fn output() -> PathBuf {
        "assets/img".into()
    }

    pub fn gifsicle() -> Vec<String> {
        vec!["gifsicle".into()]
    }

    pub fn jpegtran() -> Vec<String> {
        vec!["jpegtran".into()]
    }

    pub fn optipng() -> Vec<String> {
        vec!["optipng".into()]
    }

    pub fn optimization_level() -> u8 {
        5
    }
}

// ============================================================================
// [lint] Section Defaults
// ============================================================================

pub mod lint {
    pub fn command() -> Vec<String> {
        vec!["eslint".into()]
    }

    pub fn format() -> String {
        "stylish".into()
    }

    pub fn extensions() -> Vec<String> {
        vec!["js".into()]
    }

    pub fn exclude() -> Vec<String> {
        vec!["node_modules".into()]
    }
}

// ============================================================================
// [sitemap] Section Defaults
// ============================================================================

pub mod sitemap {
    use std::path::PathBuf;

    pub fn site_url() -> String {
        "https://example.com".into()
    }

    pub fn path() -> PathBuf {
        "sitemap.xml".into()
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        3000
    }
}
