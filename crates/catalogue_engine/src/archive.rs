//! Traversal of the remote release archive.

use catalogue_core::{FileEntry, Version, VersionMatcher};
use catalogue_logging::catalogue_debug;
use url::Url;

use crate::decode::decode_listing;
use crate::listing::{parse_listing, ListingEntry};
use crate::{FailureKind, FetchError, Fetcher};

/// Reads version directories and their files from the archive's listing pages.
pub struct ArchiveScraper<'a> {
    fetcher: &'a dyn Fetcher,
    base_url: Url,
    matcher: VersionMatcher,
}

impl<'a> ArchiveScraper<'a> {
    /// `base_url` is the top-level listing; a trailing slash is added if missing.
    pub fn new(fetcher: &'a dyn Fetcher, base_url: &str) -> Result<Self, FetchError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        Ok(Self {
            fetcher,
            base_url,
            matcher: VersionMatcher::archive(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Version directories on the top-level listing, ascending and deduplicated.
    ///
    /// Directory names must be exactly a 3- or 4-component version; entries
    /// such as `old/`, `unreleased/` or `13.5a1/` are ignored.
    pub async fn list_versions(&self) -> Result<Vec<Version>, FetchError> {
        let entries = self.fetch_listing(&self.base_url).await?;
        let mut versions: Vec<Version> = entries
            .iter()
            .filter(|entry| entry.is_dir)
            .filter_map(|entry| {
                let version = self.version_dir_name(&entry.name);
                if version.is_none() {
                    catalogue_debug!("Ignoring non-version directory {:?}", entry.name);
                }
                version
            })
            .collect();
        versions.sort();
        versions.dedup();
        Ok(versions)
    }

    /// Files in one version directory as `(file_name, url)` entries in listing order.
    pub async fn list_files(&self, version: &Version) -> Result<Vec<FileEntry>, FetchError> {
        let url = self.version_url(version)?;
        let entries = self.fetch_listing(&url).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| FileEntry::new(entry.name, entry.url))
            .collect())
    }

    pub fn version_url(&self, version: &Version) -> Result<Url, FetchError> {
        self.base_url
            .join(&format!("{version}/"))
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn version_dir_name(&self, name: &str) -> Option<Version> {
        let version = self.matcher.extract_exact(name)?;
        (3..=4).contains(&version.len()).then_some(version)
    }

    async fn fetch_listing(&self, url: &Url) -> Result<Vec<ListingEntry>, FetchError> {
        let output = self.fetcher.fetch(url.as_str()).await?;
        let html = decode_listing(&output.bytes, output.metadata.content_type.as_deref())?;
        // Links resolve against where the page actually came from.
        let page_url = Url::parse(&output.metadata.final_url).unwrap_or_else(|_| url.clone());
        Ok(parse_listing(&html, &page_url))
    }
}
