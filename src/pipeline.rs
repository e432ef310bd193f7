//! Per-entry conversion.
//!
//! Each [`TextFileEntry`] goes through fetch, parse, asset localization and
//! Jade rendering. Every stage returns `Result<_, PageError>`; a failure in
//! any of them is turned into a diagnostic `pre.` block in exactly one place
//! ([`PagePipeline::convert`]), so one broken page never stops the batch.
//! Only writing the result into the destination tree can fail the run.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use quick_xml::escape::escape;
use thiserror::Error;
use url::Url;

use crate::assets::{AssetLocalizer, AssetStats, DownloadedAssets, write_file};
use crate::dom::{Document, parse_html_bytes};
use crate::error::{Result, report};
use crate::fetch::{Fetch, FetchError, RetryPolicy, fetch_with_retry};
use crate::jade::{convert_html, render_body};
use crate::toc::{PageSource, TextFileEntry};

/// Directory below the destination root that holds the Jade files.
pub const TEXT_DIR: &str = "text";

/// Body emitted for navigation nodes without content.
pub const NO_CONTENT_BODY: &str = "+no_content\n";

/// Body emitted when the `identifierref` names no weblink resource.
pub const UNKNOWN_PAGE_BODY: &str = "\nh1 Unknown page type\np No idea how to convert this. Sorry!\n";

/// How an entry's file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Fetched and rendered.
    Converted,
    /// Fetching failed; the file holds the error report.
    Fallback,
    /// `+no_content` placeholder.
    NoContent,
    /// Unknown page type placeholder.
    Unknown,
}

/// Why a page could not be converted.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("invalid page URL {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to fetch {url}")]
    Fetch {
        url: Url,
        #[source]
        source: FetchError,
    },
}

/// Result of running one entry through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub outcome: PageOutcome,
    pub assets: AssetStats,
    /// Absolute path of the written file.
    pub path: PathBuf,
}

/// Resolve a resource href. Absolute URLs are kept; anything else is taken
/// relative to `base` (the package directory as a `file://` URL).
pub fn resolve_page_url(href: &str, base: &Url) -> std::result::Result<Url, url::ParseError> {
    match Url::parse(href) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(href),
        Err(err) => Err(err),
    }
}

/// Prefix the rendered body with the `+title(...)` mixin call.
///
/// The title is written as a JSON string literal, or `null` when absent.
pub fn jade_document(title: Option<&str>, body: &str) -> String {
    let title = serde_json::Value::from(title);
    format!("+title({title})\n{body}")
}

/// Render an error report as a Jade `pre.` block.
pub fn fallback_body(err: &PageError) -> String {
    convert_html(&format!("<pre>{}</pre>", escape(report(err))))
}

/// `//- <href>` comment naming the page a file came from.
///
/// Control characters would end the comment early, so they become spaces.
pub fn source_comment(href: &str) -> String {
    format!("//- {}\n\n", href.replace(char::is_control, " "))
}

/// Converts entries one at a time and writes them below `<dest>/text`.
pub struct PagePipeline<'a, F> {
    fetcher: &'a F,
    retry: RetryPolicy,
    base_url: &'a Url,
    text_dir: PathBuf,
    assets: AssetLocalizer<'a, F>,
}

impl<'a, F: Fetch> PagePipeline<'a, F> {
    /// `base_url` resolves relative resource hrefs; `dest_root` receives the
    /// `text/` and `assets/` trees.
    pub fn new(fetcher: &'a F, retry: RetryPolicy, base_url: &'a Url, dest_root: &Path) -> Self {
        Self {
            fetcher,
            retry,
            base_url,
            text_dir: dest_root.join(TEXT_DIR),
            assets: AssetLocalizer::new(fetcher, retry, dest_root),
        }
    }

    /// Convert and write one entry.
    ///
    /// Page failures end up in the written file; only a failed write is
    /// returned as an error.
    pub async fn run(
        &self,
        entry: &TextFileEntry,
        downloaded: &mut DownloadedAssets,
    ) -> Result<PageReport> {
        let mut assets = AssetStats::default();
        let (outcome, body) = match &entry.source {
            PageSource::NoContent => (PageOutcome::NoContent, NO_CONTENT_BODY.to_string()),
            PageSource::Unknown => (PageOutcome::Unknown, UNKNOWN_PAGE_BODY.to_string()),
            PageSource::Url(href) => {
                let (outcome, jade) = self.convert(entry, href, downloaded, &mut assets).await;
                (outcome, source_comment(href) + &jade)
            }
        };

        let path = self.text_dir.join(&entry.output_path);
        let document = jade_document(entry.title.as_deref(), &body);
        write_file(&path, document.as_bytes()).await?;
        info!("{}", path.display());

        Ok(PageReport {
            outcome,
            assets,
            path,
        })
    }

    /// Run the fetch stages, falling back to the error report on failure.
    async fn convert(
        &self,
        entry: &TextFileEntry,
        href: &str,
        downloaded: &mut DownloadedAssets,
        assets: &mut AssetStats,
    ) -> (PageOutcome, String) {
        match self.process_page(entry, href, downloaded, assets).await {
            Ok(jade) => (PageOutcome::Converted, jade),
            Err(err) => {
                warn!("{}: {}", entry.chapter_code, report(&err));
                (PageOutcome::Fallback, fallback_body(&err))
            }
        }
    }

    async fn process_page(
        &self,
        entry: &TextFileEntry,
        href: &str,
        downloaded: &mut DownloadedAssets,
        assets: &mut AssetStats,
    ) -> std::result::Result<String, PageError> {
        let output = entry.output_path.display();

        let url = resolve_page_url(href, self.base_url).map_err(|source| PageError::InvalidUrl {
            url: href.to_string(),
            source,
        })?;

        let bytes = fetch_with_retry(self.fetcher, &url, &self.retry)
            .await
            .map_err(|source| PageError::Fetch {
                url: url.clone(),
                source,
            })?;
        debug!("{output}: fetched {} bytes", bytes.len());

        let doc: Document = parse_html_bytes(&bytes);
        debug!("{output}: parsed");

        *assets = self.assets.localize(&doc, &url, downloaded).await;
        debug!("{output}: processed");

        let jade = render_body(&doc);
        debug!("{output}: converted");
        Ok(jade)
    }
}
