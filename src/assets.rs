//! Image localization.
//!
//! Every `<img>` of a fetched page whose `src` is relative to the page is
//! downloaded into `<dest>/assets/<src>`. A run-wide [`DownloadedAssets`] set
//! makes sure each absolute image URL is downloaded at most once, however
//! many pages embed it. Failures are logged and counted; they never fail the
//! page.

use std::collections::HashSet;
use std::io;
use std::ops::AddAssign;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;
use url::Url;

use crate::dom::Document;
use crate::error::report;
use crate::fetch::{Fetch, FetchError, RetryPolicy, fetch_with_retry};

/// Directory below the destination root that holds localized assets.
pub const ASSETS_DIR: &str = "assets";

/// Absolute asset URLs already claimed during this run.
///
/// Owned by the migration and lent mutably to one page at a time. Pages run
/// sequentially; running them in parallel would need this behind a lock so
/// that [`DownloadedAssets::reserve`] stays an atomic check-and-insert.
#[derive(Debug, Default)]
pub struct DownloadedAssets {
    urls: HashSet<Url>,
}

impl DownloadedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `url` for download. Returns `false` if it was already claimed.
    pub fn reserve(&mut self, url: &Url) -> bool {
        self.urls.insert(url.clone())
    }
}

/// Per-page (or per-run, once summed) asset counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AssetStats {
    /// Written to disk.
    pub downloaded: usize,
    /// Fetch or write failed.
    pub failed: usize,
    /// Already claimed by an earlier image, on this page or another.
    pub duplicates: usize,
}

impl AddAssign for AssetStats {
    fn add_assign(&mut self, other: Self) {
        self.downloaded += other.downloaded;
        self.failed += other.failed;
        self.duplicates += other.duplicates;
    }
}

/// A failed asset download.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to fetch {url}")]
    Fetch {
        url: Url,
        #[source]
        source: FetchError,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An image that should be copied next to the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAsset {
    /// `src` resolved against the page URL.
    pub url: Url,
    /// Path below [`ASSETS_DIR`], taken from `src`.
    pub local_path: PathBuf,
}

/// Decide whether an `<img src>` is localized, and where to.
///
/// Returns `None` for sources that stay as they are: absolute URLs
/// (`https://...`, protocol-relative `//host/...`, `data:` and other schemes)
/// and sources whose path would escape the assets directory.
pub fn plan_asset(src: &str, page_url: &Url) -> Option<PlannedAsset> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("//") || Url::parse(src).is_ok() {
        return None;
    }

    let url = page_url.join(src).ok()?;
    let local_path = local_asset_path(src)?;
    Some(PlannedAsset { url, local_path })
}

/// Map a relative `src` to a path below the assets directory.
///
/// The path portion of `src` is used verbatim, minus any leading `/`, query
/// or fragment. Paths containing `..` are rejected.
pub fn local_asset_path(src: &str) -> Option<PathBuf> {
    let path = src.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_start_matches('/');

    let mut local = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => local.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if local.as_os_str().is_empty() {
        None
    } else {
        Some(local)
    }
}

/// Downloads the images of fetched pages into the assets directory.
pub struct AssetLocalizer<'a, F> {
    fetcher: &'a F,
    retry: RetryPolicy,
    assets_dir: PathBuf,
}

impl<'a, F: Fetch> AssetLocalizer<'a, F> {
    /// Localize into `<dest_root>/assets`.
    pub fn new(fetcher: &'a F, retry: RetryPolicy, dest_root: &Path) -> Self {
        Self {
            fetcher,
            retry,
            assets_dir: dest_root.join(ASSETS_DIR),
        }
    }

    /// Download every new relative image of `doc`, one after another.
    ///
    /// All images are reserved in `downloaded` before the first request goes
    /// out, so an image repeated on the same page is fetched once too.
    pub async fn localize(
        &self,
        doc: &Document,
        page_url: &Url,
        downloaded: &mut DownloadedAssets,
    ) -> AssetStats {
        let mut stats = AssetStats::default();
        let mut planned = Vec::new();

        for img in doc.elements_by_tag(doc.root(), "img") {
            let Some(src) = doc.get_attr(img, "src") else {
                continue;
            };
            let Some(asset) = plan_asset(src, page_url) else {
                debug!("leaving image {src:?} in place");
                continue;
            };
            if downloaded.reserve(&asset.url) {
                planned.push(asset);
            } else {
                stats.duplicates += 1;
            }
        }

        for asset in planned {
            match self.download(&asset).await {
                Ok(path) => {
                    debug!("{} -> {}", asset.url, path.display());
                    stats.downloaded += 1;
                }
                Err(err) => {
                    warn!("{}", report(&err));
                    stats.failed += 1;
                }
            }
        }

        stats
    }

    async fn download(&self, asset: &PlannedAsset) -> Result<PathBuf, AssetError> {
        let bytes = fetch_with_retry(self.fetcher, &asset.url, &self.retry)
            .await
            .map_err(|source| AssetError::Fetch {
                url: asset.url.clone(),
                source,
            })?;

        let path = self.assets_dir.join(&asset.local_path);
        write_file(&path, &bytes)
            .await
            .map_err(|source| AssetError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// Write `bytes` to `path`, creating parent directories first.
pub(crate) async fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}
