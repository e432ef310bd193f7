//! # scorm2lfa
//!
//! Migrates IMS content packages (a directory with an `imsmanifest.xml`)
//! into LFA books.
//!
//! ## Output
//!
//! - `.lfa/package.json`: the book descriptor
//! - `text/<chapter code>.jade`: one Jade file per table-of-contents item
//! - `assets/<src>`: images referenced by the converted pages
//!
//! Each item gets a chapter code such as `002-001`; its file lives at
//! `text/002/001.jade`. Items with children also get their own content at
//! `<code>-000`, so codes sort in document order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scorm2lfa::{MigrateConfig, migrate};
//!
//! # async fn run() -> scorm2lfa::Result<()> {
//! let report = migrate("course/", "book/", &MigrateConfig::default()).await?;
//! println!("{} files written", report.entries);
//! # Ok(())
//! # }
//! ```
//!
//! ## Converting without the network
//!
//! [`Migration::run`] accepts any [`Fetch`] implementation, and relative
//! resource hrefs resolve to `file://` URLs inside the package directory:
//!
//! ```no_run
//! use scorm2lfa::{HttpFetcher, MigrateConfig, Migration};
//!
//! # async fn run() -> scorm2lfa::Result<()> {
//! let migration = Migration::load("course/", "book/")?;
//! for entry in migration.entries() {
//!     println!("{} {:?}", entry.chapter_code, entry.title);
//! }
//! let config = MigrateConfig::default();
//! let fetcher = HttpFetcher::new(config.timeout)?;
//! migration.run(&fetcher, &config).await?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod jade;
pub mod manifest;
pub mod migrate;
pub mod package;
pub mod pipeline;
pub mod toc;
pub(crate) mod util;

pub use error::{Error, Result};
pub use fetch::{Fetch, FetchError, HttpFetcher, RetryPolicy};
pub use manifest::{Manifest, ResourceMap, TocNode, parse_manifest};
pub use migrate::{MigrateConfig, Migration, MigrationReport, migrate};
pub use package::{PackageConfig, PackageDescriptor};
pub use pipeline::{PageOutcome, PageReport};
pub use toc::{ChapterCode, PageSource, TextFileEntry, crawl_toc};
