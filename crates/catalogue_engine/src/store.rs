//! Persistent three-tier cache of observed archive listings.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use catalogue_core::{
    CacheTier, Catalogue, DaemonUpdate, FileEntry, MergeOutcome, Tier, Version,
};
use catalogue_logging::{catalogue_debug, catalogue_info};
use thiserror::Error;

use crate::config::DataPaths;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum CacheError {
    /// A cache file exists but cannot be trusted. Writing stops for the run so
    /// nothing derived from a partial cache replaces good output.
    #[error("cache file {path:?} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("cannot read cache file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write cache: {0}")]
    Persist(#[from] PersistError),
}

/// Cache tiers loaded from a data directory, written back one version file at a time.
pub struct CacheStore {
    paths: DataPaths,
    tiers: [CacheTier; 3],
}

impl CacheStore {
    /// Loads every tier. Missing tier directories are treated as empty.
    pub fn open(paths: DataPaths) -> Result<Self, CacheError> {
        let mut tiers: [CacheTier; 3] = Default::default();
        for tier in Tier::ALL {
            tiers[index(tier)] = load_tier(&paths.tier_dir(tier))?;
        }
        catalogue_info!(
            "Opened cache at {:?} (all: {}, export: {}, browser: {})",
            paths.cache_dir(),
            tiers[0].len(),
            tiers[1].len(),
            tiers[2].len()
        );
        Ok(Self { paths, tiers })
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn tier(&self, tier: Tier) -> &CacheTier {
        &self.tiers[index(tier)]
    }

    /// True when every tier already holds a listing for `version`.
    pub fn is_fully_cached(&self, version: &Version) -> bool {
        self.tiers.iter().all(|tier| tier.contains(version))
    }

    /// Merges an observed listing and persists the version file if anything changed.
    pub fn merge(
        &mut self,
        tier: Tier,
        version: &Version,
        observed: &[FileEntry],
    ) -> Result<MergeOutcome, CacheError> {
        let outcome = self.tiers[index(tier)].merge(version, observed);
        if !outcome.unchanged {
            self.write_version(tier, version)?;
            catalogue_debug!(
                "{} tier: {} gained {} file(s)",
                tier,
                version,
                outcome.added.len()
            );
        }
        Ok(outcome)
    }

    /// Records a resolved daemon version on an export-tier entry.
    ///
    /// The version file is re-read from disk first and written back whole, so
    /// the latest persisted state is what gets updated.
    pub fn record_daemon(
        &mut self,
        version: &Version,
        file_name: &str,
        daemon_version: &Version,
        daemon_hash: Option<&str>,
    ) -> Result<DaemonUpdate, CacheError> {
        let tier = Tier::Export;
        let path = self.version_path(tier, version);
        if path.exists() {
            let files = read_version_file(&path)?;
            self.tiers[index(tier)].insert(version.clone(), files);
        }

        let update = self.tiers[index(tier)].record_daemon(
            version,
            file_name,
            daemon_version,
            daemon_hash,
        );
        if update == DaemonUpdate::Recorded {
            self.write_version(tier, version)?;
        }
        Ok(update)
    }

    pub fn catalogue(&self) -> Catalogue {
        Catalogue::build(
            self.tier(Tier::All),
            self.tier(Tier::Export),
            self.tier(Tier::Browser),
        )
    }

    fn version_path(&self, tier: Tier, version: &Version) -> PathBuf {
        self.paths.tier_dir(tier).join(format!("{version}.json"))
    }

    fn write_version(&self, tier: Tier, version: &Version) -> Result<(), CacheError> {
        let files = self.tiers[index(tier)].get(version).unwrap_or_default();
        AtomicFileWriter::new(self.paths.tier_dir(tier))
            .write_json(&format!("{version}.json"), files)?;
        Ok(())
    }
}

fn index(tier: Tier) -> usize {
    match tier {
        Tier::All => 0,
        Tier::Export => 1,
        Tier::Browser => 2,
    }
}

fn load_tier(dir: &Path) -> Result<CacheTier, CacheError> {
    let mut tier = CacheTier::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(tier),
        Err(source) => {
            return Err(CacheError::Read {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    for entry in entries {
        let path = entry
            .map_err(|source| CacheError::Read {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let version = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<Version>().ok())
            .ok_or_else(|| CacheError::Corrupt {
                path: path.clone(),
                message: "file name is not a version".to_string(),
            })?;
        tier.insert(version, read_version_file(&path)?);
    }
    Ok(tier)
}

fn read_version_file(path: &Path) -> Result<Vec<FileEntry>, CacheError> {
    let content = fs::read_to_string(path).map_err(|source| CacheError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|err| CacheError::Corrupt {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
