//! Whole-package migration.
//!
//! [`Migration::load`] reads and flattens the manifest without touching the
//! destination. [`Migration::run`] then writes the package descriptor while
//! the pages are converted one after another in document order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use url::Url;

use crate::assets::{AssetStats, DownloadedAssets};
use crate::error::{Error, Result};
use crate::fetch::{DEFAULT_TIMEOUT, Fetch, HttpFetcher, RetryPolicy};
use crate::manifest::{MANIFEST_FILE, Manifest, ResourceMap, parse_manifest};
use crate::package::{PackageConfig, PackageDescriptor};
use crate::pipeline::{PageOutcome, PagePipeline};
use crate::toc::{TextFileEntry, crawl_toc};
use crate::util::time_seed_nanos;

/// Run settings.
///
/// ```
/// use std::time::Duration;
/// use scorm2lfa::{MigrateConfig, RetryPolicy};
///
/// let config = MigrateConfig {
///     retry: RetryPolicy { max_retries: 5, backoff: Duration::from_millis(500) },
///     ..MigrateConfig::default()
/// };
/// assert_eq!(config.timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
    pub retry: RetryPolicy,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    pub package: PackageConfig,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            package: PackageConfig::default(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub package_name: String,
    pub entries: usize,
    pub converted: usize,
    pub fallback: usize,
    pub no_content: usize,
    pub unknown: usize,
    pub assets: AssetStats,
}

impl MigrationReport {
    fn record(&mut self, outcome: PageOutcome) {
        self.entries += 1;
        match outcome {
            PageOutcome::Converted => self.converted += 1,
            PageOutcome::Fallback => self.fallback += 1,
            PageOutcome::NoContent => self.no_content += 1,
            PageOutcome::Unknown => self.unknown += 1,
        }
    }
}

/// A loaded package, ready to be written out.
#[derive(Debug)]
pub struct Migration {
    dest_dir: PathBuf,
    base_url: Url,
    title: String,
    entries: Vec<TextFileEntry>,
}

impl Migration {
    /// Read `<source>/imsmanifest.xml` and flatten its table of contents.
    ///
    /// Fails if the manifest is missing or malformed. Nothing is written.
    pub fn load(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<Self> {
        let source_dir = std::path::absolute(source.as_ref())?;
        let dest_dir = std::path::absolute(dest.as_ref())?;

        let manifest_path = source_dir.join(MANIFEST_FILE);
        let bytes = std::fs::read(&manifest_path).map_err(|source| Error::ReadManifest {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest = parse_manifest(&bytes)?;

        let base_url = Url::from_directory_path(&source_dir).map_err(|()| {
            Error::InvalidManifest(format!(
                "cannot use {} as a base URL",
                source_dir.display()
            ))
        })?;

        Ok(Self::from_manifest(manifest, base_url, dest_dir))
    }

    /// Build a migration from an already parsed manifest.
    ///
    /// Relative resource hrefs are resolved against `base_url`.
    pub fn from_manifest(manifest: Manifest, base_url: Url, dest_dir: PathBuf) -> Self {
        let resources = ResourceMap::from_records(&manifest.resources);
        let entries = crawl_toc(&manifest.toc, &resources);
        info!(
            "{}: {} entries, {} weblink resources",
            manifest.title,
            entries.len(),
            resources.len()
        );

        Self {
            dest_dir,
            base_url,
            title: manifest.title,
            entries,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> &[TextFileEntry] {
        &self.entries
    }

    /// Write the descriptor and every entry using `fetcher`.
    pub async fn run<F: Fetch>(&self, fetcher: &F, config: &MigrateConfig) -> Result<MigrationReport> {
        let descriptor = PackageDescriptor::new(&self.title, &config.package, time_seed_nanos());

        let (package, pages) = tokio::join!(
            descriptor.write(&self.dest_dir),
            self.run_pages(fetcher, config.retry)
        );
        package?;
        let mut report = pages?;
        report.package_name = descriptor.name;

        info!(
            "{}: {} files ({} converted, {} failed, {} without content, {} unknown), \
             {} assets downloaded, {} failed",
            report.package_name,
            report.entries,
            report.converted,
            report.fallback,
            report.no_content,
            report.unknown,
            report.assets.downloaded,
            report.assets.failed
        );
        Ok(report)
    }

    async fn run_pages<F: Fetch>(&self, fetcher: &F, retry: RetryPolicy) -> Result<MigrationReport> {
        let pipeline = PagePipeline::new(fetcher, retry, &self.base_url, &self.dest_dir);
        let mut downloaded = DownloadedAssets::new();
        let mut report = MigrationReport::default();

        for entry in &self.entries {
            let page = pipeline.run(entry, &mut downloaded).await?;
            report.record(page.outcome);
            report.assets += page.assets;
        }
        Ok(report)
    }
}

/// Migrate the package in `source` into `dest` over HTTP.
pub async fn migrate(
    source: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    config: &MigrateConfig,
) -> Result<MigrationReport> {
    let migration = Migration::load(source, dest)?;
    let fetcher = HttpFetcher::new(config.timeout)?;
    migration.run(&fetcher, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_outcomes() {
        let mut report = MigrationReport::default();
        report.record(PageOutcome::Converted);
        report.record(PageOutcome::Converted);
        report.record(PageOutcome::Fallback);
        report.record(PageOutcome::NoContent);
        report.record(PageOutcome::Unknown);

        assert_eq!(report.entries, 5);
        assert_eq!(report.converted, 2);
        assert_eq!(report.fallback, 1);
        assert_eq!(report.no_content, 1);
        assert_eq!(report.unknown, 1);
    }

    #[test]
    fn test_load_without_manifest_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Migration::load(dir.path(), dir.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::ReadManifest { .. }));
        assert!(!dir.path().join("out").exists());
    }
}
