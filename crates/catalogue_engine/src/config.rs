use std::path::{Path, PathBuf};

use catalogue_core::Tier;

use crate::fetch::FetchSettings;
use crate::resolver::ResolverSettings;

pub const DEFAULT_BASE_URL: &str = "https://archive.torproject.org/tor-package-archive/torbrowser/";

/// How many of the newest cached versions are re-listed on every scrape.
pub const DEFAULT_RESCAN_RECENT: usize = 1;

/// On-disk layout under one data directory:
///
/// ```text
/// <root>/cache/{all,export,browser}/<version>.json
/// <root>/json/<projection>.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn tier_dir(&self, tier: Tier) -> PathBuf {
        self.cache_dir().join(tier.dir_name())
    }

    pub fn json_dir(&self) -> PathBuf {
        self.root.join("json")
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub paths: DataPaths,
    pub fetch: FetchSettings,
    pub rescan_recent: usize,
    pub resolver: ResolverSettings,
}

impl EngineConfig {
    pub fn default_with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            paths: DataPaths::new(data_dir),
            fetch: FetchSettings::default(),
            rescan_recent: DEFAULT_RESCAN_RECENT,
            resolver: ResolverSettings::default(),
        }
    }
}
