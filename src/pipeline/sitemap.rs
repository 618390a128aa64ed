//! Sitemap generation.
//!
//! Scans the rendered HTML in the output directory and lists every page for
//! search engine indexing.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!     <lastmod>2025-01-01</lastmod>
//!   </url>
//! </urlset>
//! ```

use crate::{
    config::SiteConfig,
    utils::minify::{MinifyType, minify},
};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::{
    fmt::Write,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use walkdir::WalkDir;

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Scan the output directory and write the sitemap. Returns its path.
pub fn build_sitemap(config: &SiteConfig) -> Result<PathBuf> {
    let output = &config.build.output;
    if !output.is_dir() {
        bail!(
            "Output directory {} does not exist, build the site first",
            output.display()
        );
    }

    let sitemap = Sitemap::scan(config);
    let path = &config.sitemap.path;
    let xml = sitemap.into_xml();
    let xml = minify(MinifyType::Xml(xml.as_bytes()), config);

    fs::write(path, &*xml)
        .with_context(|| format!("Failed to write sitemap to {}", path.display()))?;

    Ok(path.clone())
}

struct Sitemap<'a> {
    urls: Vec<UrlEntry>,
    changefreq: Option<&'a str>,
    priority: Option<f32>,
}

struct UrlEntry {
    loc: String,
    /// YYYY-MM-DD
    lastmod: Option<String>,
}

impl<'a> Sitemap<'a> {
    fn scan(config: &'a SiteConfig) -> Self {
        let output = &config.build.output;
        let site_url = config.sitemap.site_url.trim_end_matches('/');

        let mut urls: Vec<UrlEntry> = WalkDir::new(output)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
            .filter_map(|e| {
                let relative = e.path().strip_prefix(output).ok()?;
                Some(UrlEntry {
                    loc: page_url(site_url, relative),
                    lastmod: e
                        .metadata()
                        .ok()
                        .and_then(|m| m.modified().ok())
                        .map(format_date),
                })
            })
            .collect();

        urls.sort_by(|a, b| a.loc.cmp(&b.loc));

        Self {
            urls,
            changefreq: config.sitemap.changefreq.as_deref(),
            priority: config.sitemap.priority,
        }
    }

    fn into_xml(self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(xml, r#"<urlset xmlns="{SITEMAP_NS}">"#);

        for entry in self.urls {
            xml.push_str("  <url>\n");
            let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(&entry.loc));
            if let Some(lastmod) = entry.lastmod {
                let _ = writeln!(xml, "    <lastmod>{lastmod}</lastmod>");
            }
            if let Some(changefreq) = self.changefreq {
                let _ = writeln!(xml, "    <changefreq>{}</changefreq>", escape_xml(changefreq));
            }
            if let Some(priority) = self.priority {
                let _ = writeln!(xml, "    <priority>{priority}</priority>");
            }
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

/// Public URL of an HTML file relative to the output directory.
///
/// `index.html` files map to their directory: `blog/index.html` →
/// `<site_url>/blog/`.
fn page_url(site_url: &str, relative: &Path) -> String {
    let path = relative
        .components()
        .map(|c| urlencoding::encode(&c.as_os_str().to_string_lossy()).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    let path = match path.strip_suffix("index.html") {
        Some(dir) if dir.is_empty() || dir.ends_with('/') => dir.to_string(),
        _ => path,
    };

    format!("{site_url}/{path}")
}

fn format_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y-%m-%d").to_string()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn site(dir: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.build.output = dir.join("public");
        config.sitemap.path = dir.join("public/sitemap.xml");
        config.sitemap.site_url = "https://example.com/".into();
        config
    }

    fn write(path: PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<html></html>").unwrap();
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("hello"), "hello");
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }

    #[test]
    fn test_page_url() {
        let site = "https://example.com";
        assert_eq!(page_url(site, Path::new("index.html")), "https://example.com/");
        assert_eq!(page_url(site, Path::new("blog/index.html")), "https://example.com/blog/");
        assert_eq!(page_url(site, Path::new("about.html")), "https://example.com/about.html");
        assert_eq!(
            page_url(site, Path::new("docs/notindex.html")),
            "https://example.com/docs/notindex.html"
        );
    }

    #[test]
    fn test_page_url_encodes_segments() {
        let site = "https://example.com";
        assert_eq!(
            page_url(site, Path::new("über uns/my page.html")),
            "https://example.com/%C3%BCber%20uns/my%20page.html"
        );
        assert_eq!(
            page_url(site, Path::new("a&b/index.html")),
            "https://example.com/a%26b/"
        );
    }

    #[test]
    fn test_priority_keeps_precision() {
        let sitemap = Sitemap {
            urls: vec![UrlEntry {
                loc: "https://example.com/".into(),
                lastmod: None,
            }],
            changefreq: None,
            priority: Some(0.85),
        };
        assert!(sitemap.into_xml().contains("<priority>0.85</priority>"));
    }

    #[test]
    fn test_format_date() {
        // 20089 days after the epoch
        let time = UNIX_EPOCH + Duration::from_secs(20089 * 86400);
        assert_eq!(format_date(time), "2025-01-01");
    }

    #[test]
    fn test_xml_structure() {
        let sitemap = Sitemap {
            urls: vec![UrlEntry {
                loc: "https://example.com/search?q=a&b=c".into(),
                lastmod: Some("2025-01-01".into()),
            }],
            changefreq: Some("weekly"),
            priority: Some(0.5),
        };
        let xml = sitemap.into_xml();

        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert!(lines[1].starts_with("<urlset"));
        assert_eq!(lines.last().unwrap().trim(), "</urlset>");
        assert!(xml.contains("<loc>https://example.com/search?q=a&amp;b=c</loc>"));
        assert!(xml.contains("<lastmod>2025-01-01</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>0.5</priority>"));
    }

    #[test]
    fn test_build_sitemap_scans_output() {
        let dir = TempDir::new().unwrap();
        let config = site(dir.path());
        write(config.build.output.join("index.html"));
        write(config.build.output.join("blog/post.html"));
        write(config.build.output.join("about/index.html"));
        write(config.build.output.join(".cache/skip.html"));
        fs::write(config.build.output.join("css.css"), "").unwrap();

        let path = build_sitemap(&config).unwrap();
        let xml = fs::read_to_string(path).unwrap();

        assert_eq!(xml.matches("<url>").count(), 3);
        assert!(!xml.contains("skip.html"));
        assert!(!xml.contains("<changefreq>"));
        let about = xml.find("https://example.com/about/").unwrap();
        let blog = xml.find("https://example.com/blog/post.html").unwrap();
        assert!(about < blog);
        assert!(xml.contains("<lastmod>"));
    }

    #[test]
    fn test_build_sitemap_minified_in_prod() {
        let dir = TempDir::new().unwrap();
        let mut config = site(dir.path());
        config.build.mode = Mode::Prod;
        write(config.build.output.join("index.html"));

        let xml = fs::read_to_string(build_sitemap(&config).unwrap()).unwrap();
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(!xml.contains("\n  <url>"));
    }

    #[test]
    fn test_build_sitemap_requires_output() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir.path().join("missing"));
        assert!(build_sitemap(&config).is_err());
    }
}
