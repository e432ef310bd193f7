//! End-to-end migration tests.
//!
//! Packages are written into temporary directories. Pages are served either
//! from disk through `file://` URLs or by an in-memory fetcher that records
//! every request, so no test touches the network.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use scorm2lfa::fetch::FetchError;
use scorm2lfa::{
    Error, Fetch, MigrateConfig, Migration, PageSource, RetryPolicy, migrate, parse_manifest,
};
use tempfile::TempDir;
use url::Url;

// ============================================================================
// Fixtures
// ============================================================================

fn manifest_xml(title: &str, items: &str, resources: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest identifier="course" xmlns="http://www.imsglobal.org/xsd/imscp_v1p1"
          xmlns:imsmd="http://www.imsglobal.org/xsd/imsmd_v1p2">
  <metadata>
    <imsmd:lom>
      <imsmd:general>
        <imsmd:title><imsmd:string language="en">{title}</imsmd:string></imsmd:title>
      </imsmd:general>
    </imsmd:lom>
  </metadata>
  <organizations default="org1">
    <organization identifier="org1">
      {items}
    </organization>
  </organizations>
  <resources>
    {resources}
  </resources>
</manifest>"#
    )
}

fn weblink(id: &str, href: &str) -> String {
    format!(r#"<resource identifier="{id}" type="weblink" href="{href}"/>"#)
}

fn item(title: &str, identifier_ref: &str) -> String {
    format!(r#"<item identifierref="{identifier_ref}"><title>{title}</title></item>"#)
}

fn write_manifest(source: &Path, xml: &str) {
    fs::write(source.join("imsmanifest.xml"), xml).unwrap();
}

fn read_text(dest: &Path, relative: &str) -> String {
    fs::read_to_string(dest.join("text").join(relative)).unwrap()
}

fn instant_config() -> MigrateConfig {
    MigrateConfig {
        retry: RetryPolicy {
            max_retries: 3,
            backoff: Duration::ZERO,
        },
        ..MigrateConfig::default()
    }
}

/// How the in-memory fetcher answers a URL.
enum Reply {
    Body(&'static str),
    Status(u16),
    Reset,
}

/// Serves canned replies and records every request.
#[derive(Default)]
struct MemoryFetcher {
    replies: HashMap<String, Reply>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    fn with(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    fn requests_for(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Fetch for MemoryFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        match self.replies.get(url.as_str()) {
            Some(Reply::Body(body)) => Ok(body.as_bytes().to_vec()),
            Some(Reply::Status(code)) => Err(FetchError::Status(*code)),
            Some(Reply::Reset) => Err(FetchError::ConnectionReset("socket hang up".into())),
            None => Err(FetchError::Status(404)),
        }
    }
}

/// Load a migration for `xml` whose relative hrefs resolve below a dummy base.
fn in_memory_migration(xml: &str, dest: &Path) -> Migration {
    let manifest = parse_manifest(xml.as_bytes()).unwrap();
    let base = Url::parse("https://courses.example.com/pkg/").unwrap();
    Migration::from_manifest(manifest, base, dest.to_path_buf())
}

// ============================================================================
// Layout and Placeholders
// ============================================================================

#[tokio::test]
async fn test_worked_example_from_disk() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();

    let xml = manifest_xml(
        "Sample Course",
        &format!(
            r#"{}
      <item><title>Part 1</title>{}</item>"#,
            item("Intro", "r1"),
            item("Ch 1", "r2")
        ),
        &format!("{}\n{}", weblink("r1", "intro.html"), weblink("r2", "ch/one.html")),
    );
    write_manifest(source.path(), &xml);
    fs::write(
        source.path().join("intro.html"),
        "<html><body><h1>Intro</h1><p>Hello</p></body></html>",
    )
    .unwrap();
    fs::create_dir_all(source.path().join("ch/img")).unwrap();
    fs::write(
        source.path().join("ch/one.html"),
        r#"<html><body><p>Chapter</p><img src="img/fig.png"></body></html>"#,
    )
    .unwrap();
    fs::write(source.path().join("ch/img/fig.png"), b"\x89PNG fake").unwrap();

    let report = migrate(source.path(), dest.path(), &instant_config())
        .await
        .unwrap();

    assert_eq!(report.entries, 3);
    assert_eq!(report.converted, 2);
    assert_eq!(report.no_content, 1);
    assert_eq!(report.assets.downloaded, 1);

    assert_eq!(
        read_text(dest.path(), "001.jade"),
        "+title(\"Intro\")\n//- intro.html\n\nh1 Intro\np Hello\n"
    );
    assert_eq!(
        read_text(dest.path(), "002/000.jade"),
        "+title(\"Part 1\")\n+no_content\n"
    );

    let chapter = read_text(dest.path(), "002/001.jade");
    assert!(chapter.starts_with("+title(\"Ch 1\")\n//- ch/one.html\n\n"));
    assert!(chapter.contains("p Chapter"));
    assert!(chapter.contains("img(src=\"img/fig.png\")"), "{chapter}");

    assert_eq!(
        fs::read(dest.path().join("assets/img/fig.png")).unwrap(),
        b"\x89PNG fake"
    );
}

#[tokio::test]
async fn test_placeholders_are_distinguishable() {
    let dest = TempDir::new().unwrap();
    let xml = manifest_xml(
        "Placeholders",
        &format!(
            r#"<item><title>Section</title></item>
      {}
      {}
      <item identifierref="r1"/>"#,
            item("Missing", "nope"),
            item("Local", "r2")
        ),
        &format!(
            "{}\n{}",
            weblink("r1", "https://courses.example.com/a.html"),
            r#"<resource identifier="r2" type="webcontent" href="local.html"/>"#
        ),
    );
    let migration = in_memory_migration(&xml, dest.path());
    let fetcher = MemoryFetcher::default().with(
        "https://courses.example.com/a.html",
        Reply::Body("<p>a</p>"),
    );

    let report = migration.run(&fetcher, &instant_config()).await.unwrap();
    assert_eq!(report.entries, 4);
    assert_eq!(report.no_content, 1);
    assert_eq!(report.unknown, 2);
    assert_eq!(report.converted, 1);

    assert_eq!(
        read_text(dest.path(), "001.jade"),
        "+title(\"Section\")\n+no_content\n"
    );
    let unknown = "\nh1 Unknown page type\np No idea how to convert this. Sorry!\n";
    assert_eq!(
        read_text(dest.path(), "002.jade"),
        format!("+title(\"Missing\"){unknown}")
    );
    assert_eq!(
        read_text(dest.path(), "003.jade"),
        format!("+title(\"Local\"){unknown}")
    );
    assert!(read_text(dest.path(), "004.jade").starts_with("+title(null)\n//- "));
}

#[test]
fn test_entries_follow_document_order() {
    let dest = TempDir::new().unwrap();
    let xml = manifest_xml(
        "Order",
        &format!(
            r#"<item><title>A</title>{}<item><title>A2</title>{}</item></item>
      {}"#,
            item("A1", "r1"),
            item("A2a", "r1"),
            item("B", "r1")
        ),
        &weblink("r1", "https://courses.example.com/x.html"),
    );
    let migration = in_memory_migration(&xml, dest.path());

    let codes: Vec<_> = migration
        .entries()
        .iter()
        .map(|e| e.chapter_code.as_str().to_string())
        .collect();
    assert_eq!(
        codes,
        ["001-000", "001-001", "001-002-000", "001-002-001", "002"]
    );
    assert!(matches!(migration.entries()[0].source, PageSource::NoContent));

    let mut sorted = codes.clone();
    sorted.sort();
    assert_eq!(codes, sorted);
}

// ============================================================================
// Assets
// ============================================================================

#[tokio::test]
async fn test_shared_asset_is_downloaded_once() {
    let dest = TempDir::new().unwrap();
    let xml = manifest_xml(
        "Assets",
        &format!("{}\n{}", item("A", "r1"), item("B", "r2")),
        &format!(
            "{}\n{}",
            weblink("r1", "https://courses.example.com/a.html"),
            weblink("r2", "https://courses.example.com/b.html")
        ),
    );
    let logo = "https://courses.example.com/img/logo.png";
    let fetcher = MemoryFetcher::default()
        .with(
            "https://courses.example.com/a.html",
            Reply::Body(r#"<p>A</p><img src="img/logo.png"><img src="img/logo.png">"#),
        )
        .with(
            "https://courses.example.com/b.html",
            Reply::Body(r#"<p>B</p><img src="/img/logo.png"><img src="https://cdn.example.com/x.png">"#),
        )
        .with(logo, Reply::Body("LOGO"));

    let migration = in_memory_migration(&xml, dest.path());
    let report = migration.run(&fetcher, &instant_config()).await.unwrap();

    assert_eq!(fetcher.requests_for(logo), 1);
    assert_eq!(fetcher.requests_for("https://cdn.example.com/x.png"), 0);
    assert_eq!(report.assets.downloaded, 1);
    assert_eq!(report.assets.duplicates, 2);
    assert_eq!(
        fs::read_to_string(dest.path().join("assets/img/logo.png")).unwrap(),
        "LOGO"
    );
}

#[tokio::test]
async fn test_failed_asset_does_not_fail_page() {
    let dest = TempDir::new().unwrap();
    let xml = manifest_xml(
        "Assets",
        &item("A", "r1"),
        &weblink("r1", "https://courses.example.com/a.html"),
    );
    let fetcher = MemoryFetcher::default().with(
        "https://courses.example.com/a.html",
        Reply::Body(r#"<p>A</p><img src="gone.png">"#),
    );

    let migration = in_memory_migration(&xml, dest.path());
    let report = migration.run(&fetcher, &instant_config()).await.unwrap();

    assert_eq!(report.converted, 1);
    assert_eq!(report.assets.failed, 1);
    assert!(read_text(dest.path(), "001.jade").contains("p A"));
    assert!(!dest.path().join("assets/gone.png").exists());
}

// ============================================================================
// Failure Handling
// ============================================================================

#[tokio::test]
async fn test_failing_page_falls_back_without_stopping_batch() {
    let dest = TempDir::new().unwrap();
    let xml = manifest_xml(
        "Faults",
        &format!(
            "{}\n{}\n{}",
            item("One", "r1"),
            item("Two", "r2"),
            item("Three", "r3")
        ),
        &format!(
            "{}\n{}\n{}",
            weblink("r1", "https://courses.example.com/1.html"),
            weblink("r2", "https://courses.example.com/2.html"),
            weblink("r3", "https://courses.example.com/3.html")
        ),
    );
    let fetcher = MemoryFetcher::default()
        .with("https://courses.example.com/1.html", Reply::Body("<p>one</p>"))
        .with("https://courses.example.com/2.html", Reply::Status(500))
        .with("https://courses.example.com/3.html", Reply::Body("<p>three</p>"));

    let migration = in_memory_migration(&xml, dest.path());
    let report = migration.run(&fetcher, &instant_config()).await.unwrap();

    assert_eq!(report.entries, 3);
    assert_eq!(report.converted, 2);
    assert_eq!(report.fallback, 1);
    assert_eq!(fetcher.requests_for("https://courses.example.com/2.html"), 1);

    let failed = read_text(dest.path(), "002.jade");
    assert!(failed.starts_with(
        "+title(\"Two\")\n//- https://courses.example.com/2.html\n\npre.\n"
    ));
    assert!(failed.contains("HTTP 500"), "{failed}");

    assert!(read_text(dest.path(), "001.jade").ends_with("p one\n"));
    assert!(read_text(dest.path(), "003.jade").ends_with("p three\n"));
}

#[tokio::test]
async fn test_connection_reset_is_retried_then_falls_back() {
    let dest = TempDir::new().unwrap();
    let url = "https://courses.example.com/flaky.html";
    let xml = manifest_xml("Retry", &item("Flaky", "r1"), &weblink("r1", url));
    let fetcher = MemoryFetcher::default().with(url, Reply::Reset);

    let migration = in_memory_migration(&xml, dest.path());
    let report = migration.run(&fetcher, &instant_config()).await.unwrap();

    assert_eq!(fetcher.requests_for(url), 4);
    assert_eq!(report.fallback, 1);
    assert!(read_text(dest.path(), "001.jade").contains("ECONNRESET"));
}

#[tokio::test]
async fn test_invalid_url_falls_back() {
    let dest = TempDir::new().unwrap();
    let xml = manifest_xml(
        "Invalid",
        &item("Broken", "r1"),
        &weblink("r1", "http://[::1"),
    );
    let fetcher = MemoryFetcher::default();

    let migration = in_memory_migration(&xml, dest.path());
    let report = migration.run(&fetcher, &instant_config()).await.unwrap();

    assert_eq!(report.fallback, 1);
    assert!(fetcher.requests.borrow().is_empty());
    assert!(read_text(dest.path(), "001.jade").contains("invalid page URL"));
}

#[tokio::test]
async fn test_missing_manifest_is_fatal() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let out = dest.path().join("book");

    let err = migrate(source.path(), &out, &instant_config())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReadManifest { .. }));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_malformed_manifest_is_fatal() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_manifest(source.path(), "<manifest><organizations><organization>");

    assert!(migrate(source.path(), dest.path(), &instant_config())
        .await
        .is_err());
    assert!(!dest.path().join(".lfa").exists());
}

// ============================================================================
// Package Descriptor
// ============================================================================

#[tokio::test]
async fn test_package_descriptor_is_written() {
    let dest = TempDir::new().unwrap();
    let xml = manifest_xml("Intro to Rust &amp; Friends", &item("S", "none"), "");
    let migration = in_memory_migration(&xml, dest.path());

    let report = migration
        .run(&MemoryFetcher::default(), &instant_config())
        .await
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dest.path().join(".lfa/package.json")).unwrap())
            .unwrap();
    assert_eq!(json["name"], report.package_name.as_str());
    assert!(report.package_name.starts_with("scorm-"));
    assert_eq!(json["book"]["title"], "Intro to Rust & Friends");
    assert_eq!(json["version"], "1.0.0");
    assert_eq!(json["keywords"][0], "lfa-book");
    assert_eq!(json["engines"]["lfa"], "^0.8.8");
    assert_eq!(json["lfa"]["compileCore"], false);
    assert_eq!(
        json["lfa"]["externalPlugins"][0],
        "https://plugins.lfwd.io/lfa-core/0.8/plugin"
    );
}
