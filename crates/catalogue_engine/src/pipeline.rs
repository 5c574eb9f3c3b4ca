//! Scrape, rebuild and resolve runs over a [`CacheStore`].

use std::io;
use std::path::Path;

use catalogue_core::{classify, Catalogue, Classification, FileEntry, Tier, Version};
use catalogue_logging::{catalogue_debug, catalogue_info, catalogue_warn};
use thiserror::Error;

use crate::archive::ArchiveScraper;
use crate::persist::PersistError;
use crate::publish::write_catalogue;
use crate::resolver::{DaemonResolver, SkipReason, Skipped};
use crate::store::{CacheError, CacheStore};
use crate::FetchError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read archive listing: {0}")]
    Listing(FetchError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("cannot write catalogue: {0}")]
    Persist(#[from] PersistError),
    #[error("cannot start runtime: {0}")]
    Runtime(io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub discovered: usize,
    /// Versions whose listing was fetched and merged this run.
    pub fetched: Vec<Version>,
    /// Versions skipped because every tier already holds them.
    pub cached: usize,
    /// Versions whose listing could not be fetched; retried next run.
    pub failed: Vec<Version>,
    pub files_added: usize,
}

/// Discovers versions on the archive and merges newly observed files into the cache.
///
/// A version already present in every tier is not fetched again unless it is
/// one of the newest `rescan_recent` versions on the archive. A failure
/// listing one version is logged and skipped; only a failure on the
/// top-level listing aborts the run.
pub async fn run_scrape(
    scraper: &ArchiveScraper<'_>,
    store: &mut CacheStore,
    rescan_recent: usize,
) -> Result<ScrapeReport, PipelineError> {
    let versions = scraper
        .list_versions()
        .await
        .map_err(PipelineError::Listing)?;
    let total = versions.len();
    let recent_from = total.saturating_sub(rescan_recent);
    catalogue_info!("Found {} version directories at {}", total, scraper.base_url());

    let mut report = ScrapeReport {
        discovered: total,
        ..ScrapeReport::default()
    };

    for (idx, version) in versions.iter().enumerate() {
        let position = idx + 1;
        if idx < recent_from && store.is_fully_cached(version) {
            catalogue_debug!("[{}/{}] {} - cached", position, total, version);
            report.cached += 1;
            continue;
        }

        let observed = match scraper.list_files(version).await {
            Ok(files) => files,
            Err(err) => {
                catalogue_warn!("[{}/{}] {} - skipped: {}", position, total, version, err);
                report.failed.push(version.clone());
                continue;
            }
        };

        let split = split_by_tier(version, &observed);
        let mut added = [0usize; 3];
        for (slot, (tier, files)) in split.iter().enumerate() {
            added[slot] = store.merge(*tier, version, files)?.added.len();
        }
        catalogue_info!(
            "[{}/{}] {} - {} file(s), export: {}, browser: {}, new: {}",
            position,
            total,
            version,
            split[0].1.len(),
            split[1].1.len(),
            split[2].1.len(),
            added.iter().sum::<usize>()
        );
        report.files_added += added.iter().sum::<usize>();
        report.fetched.push(version.clone());
    }

    catalogue_info!(
        "Scrape finished: {} discovered, {} fetched, {} cached, {} failed",
        report.discovered,
        report.fetched.len(),
        report.cached,
        report.failed.len()
    );
    Ok(report)
}

fn split_by_tier(version: &Version, observed: &[FileEntry]) -> [(Tier, Vec<FileEntry>); 3] {
    let mut split = Tier::ALL.map(|tier| (tier, Vec::new()));
    for entry in observed {
        let classification = classify(&entry.file_name);
        match classification {
            Classification::Noise => {
                catalogue_debug!("{}: dropping {}", version, entry.file_name);
                continue;
            }
            Classification::Unclaimed { .. } => {
                catalogue_debug!(
                    "{}: {} excluded from both product lines",
                    version,
                    entry.file_name
                );
            }
            Classification::Kept { .. } => {}
        }
        for (tier, files) in split.iter_mut() {
            if tier.admits(&classification) {
                files.push(entry.clone());
            }
        }
    }
    split
}

/// Regenerates every published projection from the cache alone.
pub fn rebuild_catalogue(store: &CacheStore, json_dir: &Path) -> Result<Catalogue, PipelineError> {
    let catalogue = store.catalogue();
    write_catalogue(json_dir, &catalogue)?;
    catalogue_info!(
        "Catalogue rebuilt: {} versions, export: {}, browser: {}, blanks: {}/{}",
        catalogue.versions.len(),
        catalogue.export.records.len(),
        catalogue.browser.records.len(),
        catalogue.export.blanks.len(),
        catalogue.browser.blanks.len()
    );
    Ok(catalogue)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Only entries whose file name contains this token (case-insensitive).
    pub os_filter: Option<String>,
    /// Visit every export version rather than only the newest one.
    pub all_versions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub version: Version,
    pub file_name: String,
    pub daemon_version: Version,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub resolved: Vec<ResolvedEntry>,
    /// Entries that already carried a daemon version and were not touched.
    pub already_resolved: usize,
    pub skipped: Vec<Skipped>,
}

/// Resolves daemon versions for export entries one at a time, writing each
/// result back to the cache as soon as it is known.
///
/// Per-entry failures are recorded in the report and never end the batch.
pub async fn run_resolve_batch(
    resolver: &DaemonResolver,
    store: &mut CacheStore,
    options: &ResolveOptions,
) -> Result<BatchReport, PipelineError> {
    let targets = resolve_targets(store, options);
    let total = targets.len();
    catalogue_info!(
        "Resolving daemon versions for {} file(s) on a {} host",
        total,
        resolver.settings().host
    );

    let mut report = BatchReport::default();
    for (idx, (version, entry)) in targets.into_iter().enumerate() {
        let position = idx + 1;
        if entry.is_resolved() {
            report.already_resolved += 1;
            continue;
        }

        match resolver.resolve(&entry).await {
            Ok(resolution) => {
                store.record_daemon(
                    &version,
                    &entry.file_name,
                    &resolution.version,
                    Some(resolution.binary_hash.as_str()),
                )?;
                catalogue_info!(
                    "[{}/{}] {} - {} reports {}",
                    position,
                    total,
                    version,
                    entry.file_name,
                    resolution.version
                );
                report.resolved.push(ResolvedEntry {
                    version,
                    file_name: entry.file_name,
                    daemon_version: resolution.version,
                });
            }
            Err(skipped) => {
                match skipped.reason {
                    SkipReason::ForeignPlatform { .. } | SkipReason::AlreadyResolved => {
                        catalogue_debug!("[{}/{}] {} - {}", position, total, version, skipped)
                    }
                    _ => catalogue_warn!("[{}/{}] {} - {}", position, total, version, skipped),
                }
                report.skipped.push(skipped);
            }
        }
    }

    catalogue_info!(
        "Resolve finished: {} resolved, {} already resolved, {} skipped",
        report.resolved.len(),
        report.already_resolved,
        report.skipped.len()
    );
    Ok(report)
}

fn resolve_targets(store: &CacheStore, options: &ResolveOptions) -> Vec<(Version, FileEntry)> {
    let mut records: Vec<_> = store
        .tier(Tier::Export)
        .records()
        .filter(|record| !record.is_blank())
        .collect();
    if !options.all_versions && records.len() > 1 {
        records.drain(..records.len() - 1);
    }

    let filter = options
        .os_filter
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase);

    records
        .into_iter()
        .flat_map(|record| {
            let version = record.version;
            record
                .files
                .into_iter()
                .map(move |entry| (version.clone(), entry))
        })
        .filter(|(_, entry)| {
            filter
                .as_deref()
                .is_none_or(|token| entry.file_name.to_ascii_lowercase().contains(token))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn entry(name: &str) -> FileEntry {
        FileEntry::new(name, format!("https://archive.example/13.0.1/{name}"))
    }

    #[test]
    fn split_routes_files_to_tiers() {
        let observed = vec![
            entry("tor-expert-bundle-13.0.1-windows-x86_64.tar.gz"),
            entry("tor-expert-bundle-13.0.1-windows-x86_64.tar.gz.asc"),
            entry("tor-browser-linux-x86_64-13.0.1.tar.xz"),
            entry("mullvad-browser-linux-x86_64-13.0.1.tar.xz"),
        ];
        let split = split_by_tier(&v("13.0.1"), &observed);
        let names = |slot: usize| -> Vec<&str> {
            split[slot].1.iter().map(|f| f.file_name.as_str()).collect()
        };

        assert_eq!(
            names(0),
            vec![
                "tor-expert-bundle-13.0.1-windows-x86_64.tar.gz",
                "tor-browser-linux-x86_64-13.0.1.tar.xz",
                "mullvad-browser-linux-x86_64-13.0.1.tar.xz",
            ]
        );
        assert_eq!(names(1), vec!["tor-expert-bundle-13.0.1-windows-x86_64.tar.gz"]);
        assert_eq!(names(2), vec!["tor-browser-linux-x86_64-13.0.1.tar.xz"]);
    }

    #[test]
    fn noise_only_listing_yields_empty_tiers() {
        let observed = vec![entry("sha256sums-signed-build.txt"), entry("tor-browser.asc")];
        let split = split_by_tier(&v("13.0.2"), &observed);
        assert!(split.iter().all(|(_, files)| files.is_empty()));
    }
}
