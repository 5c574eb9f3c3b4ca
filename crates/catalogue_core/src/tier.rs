use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::{Classification, FileEntry, ProductLine, Version, VersionRecord};

/// One of the three independently keyed cache partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Everything observed except hard-excluded noise.
    All,
    Export,
    Browser,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::All, Tier::Export, Tier::Browser];

    pub fn dir_name(self) -> &'static str {
        match self {
            Tier::All => "all",
            Tier::Export => "export",
            Tier::Browser => "browser",
        }
    }

    /// Whether a file with this classification belongs in the tier.
    pub fn admits(self, classification: &Classification) -> bool {
        match self {
            Tier::All => !classification.is_noise(),
            Tier::Export => classification.product_line() == Some(ProductLine::Export),
            Tier::Browser => classification.product_line() == Some(ProductLine::Browser),
        }
    }
}

impl From<ProductLine> for Tier {
    fn from(line: ProductLine) -> Self {
        match line {
            ProductLine::Export => Tier::Export,
            ProductLine::Browser => Tier::Browser,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    /// Entries appended by this merge, in observation order.
    pub added: Vec<FileEntry>,
    /// True when neither the version key nor any entry was new.
    pub unchanged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonUpdate {
    Recorded,
    AlreadyResolved,
    Missing,
}

/// Version-keyed file listings for a single tier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheTier {
    records: BTreeMap<Version, Vec<FileEntry>>,
}

impl CacheTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.records.contains_key(version)
    }

    pub fn get(&self, version: &Version) -> Option<&[FileEntry]> {
        self.records.get(version).map(Vec::as_slice)
    }

    /// Versions in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.records.keys()
    }

    /// Records in ascending version order.
    pub fn records(&self) -> impl Iterator<Item = VersionRecord> + '_ {
        self.records
            .iter()
            .map(|(version, files)| VersionRecord::new(version.clone(), files.clone()))
    }

    /// Replaces the stored listing wholesale. Used when loading from disk.
    pub fn insert(&mut self, version: Version, files: Vec<FileEntry>) {
        self.records.insert(version, files);
    }

    /// Merges an observed listing into the tier.
    ///
    /// Stored entries are never overwritten or removed; only file names not
    /// already present are appended.
    pub fn merge(&mut self, version: &Version, observed: &[FileEntry]) -> MergeOutcome {
        let is_new_version = !self.records.contains_key(version);
        let stored = self.records.entry(version.clone()).or_default();

        let mut seen: HashSet<String> = stored.iter().map(|f| f.file_name.clone()).collect();
        let mut added = Vec::new();
        for entry in observed {
            if seen.insert(entry.file_name.clone()) {
                stored.push(entry.clone());
                added.push(entry.clone());
            }
        }

        MergeOutcome {
            unchanged: !is_new_version && added.is_empty(),
            added,
        }
    }

    /// Sets the daemon fields of one entry unless it already carries a version.
    pub fn record_daemon(
        &mut self,
        version: &Version,
        file_name: &str,
        daemon_version: &Version,
        daemon_hash: Option<&str>,
    ) -> DaemonUpdate {
        let Some(entry) = self
            .records
            .get_mut(version)
            .and_then(|files| files.iter_mut().find(|f| f.file_name == file_name))
        else {
            return DaemonUpdate::Missing;
        };
        if entry.is_resolved() {
            return DaemonUpdate::AlreadyResolved;
        }
        entry.daemon_version = Some(daemon_version.clone());
        entry.daemon_hash = daemon_hash.map(str::to_string);
        DaemonUpdate::Recorded
    }
}
