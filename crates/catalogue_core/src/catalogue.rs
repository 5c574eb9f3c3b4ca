use std::collections::BTreeSet;

use serde::Serialize;

use crate::{CacheTier, FileEntry, LatestRecord, Platform, ProductLine, Version, VersionRecord};

/// Files of one product line bucketed by platform.
///
/// Serialises with keys in the fixed order `windows, macos, linux, android, unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlatformGroups {
    pub windows: Vec<FileEntry>,
    pub macos: Vec<FileEntry>,
    pub linux: Vec<FileEntry>,
    pub android: Vec<FileEntry>,
    pub unknown: Vec<FileEntry>,
}

impl PlatformGroups {
    pub fn from_records(records: &[VersionRecord]) -> Self {
        let mut groups = Self::default();
        for file in records.iter().flat_map(|r| r.files.iter()) {
            groups.bucket_mut(file.platform()).push(file.clone());
        }
        groups
    }

    pub fn get(&self, platform: Platform) -> &[FileEntry] {
        match platform {
            Platform::Windows => &self.windows,
            Platform::Macos => &self.macos,
            Platform::Linux => &self.linux,
            Platform::Android => &self.android,
            Platform::Unknown => &self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        Platform::ALL.iter().map(|p| self.get(*p).len()).sum()
    }

    fn bucket_mut(&mut self, platform: Platform) -> &mut Vec<FileEntry> {
        match platform {
            Platform::Windows => &mut self.windows,
            Platform::Macos => &mut self.macos,
            Platform::Linux => &mut self.linux,
            Platform::Android => &mut self.android,
            Platform::Unknown => &mut self.unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Blanks {
    pub export: Vec<Version>,
    pub browser: Vec<Version>,
}

/// Every projection of a single product line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductCatalogue {
    /// Non-blank records with daemon fields stripped.
    pub records: Vec<VersionRecord>,
    /// Non-blank records as stored, daemon fields included.
    pub daemon_records: Vec<VersionRecord>,
    pub grouped: PlatformGroups,
    pub blanks: Vec<Version>,
    pub latest: LatestRecord,
}

impl ProductCatalogue {
    fn build(versions: &[Version], tier: &CacheTier) -> Self {
        let daemon_records: Vec<VersionRecord> =
            tier.records().filter(|r| !r.is_blank()).collect();
        let records: Vec<VersionRecord> = daemon_records
            .iter()
            .map(VersionRecord::without_daemon_fields)
            .collect();
        let blanks = versions
            .iter()
            .filter(|v| tier.get(v).is_none_or(<[FileEntry]>::is_empty))
            .cloned()
            .collect();

        Self {
            grouped: PlatformGroups::from_records(&records),
            latest: LatestRecord::from(daemon_records.last()),
            records,
            daemon_records,
            blanks,
        }
    }
}

/// Complete set of published views, recomputed from cache state on every run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalogue {
    pub versions: Vec<Version>,
    pub export: ProductCatalogue,
    pub browser: ProductCatalogue,
}

impl Catalogue {
    pub fn build(all: &CacheTier, export: &CacheTier, browser: &CacheTier) -> Self {
        let versions: Vec<Version> = all
            .versions()
            .chain(export.versions())
            .chain(browser.versions())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            export: ProductCatalogue::build(&versions, export),
            browser: ProductCatalogue::build(&versions, browser),
            versions,
        }
    }

    pub fn product(&self, line: ProductLine) -> &ProductCatalogue {
        match line {
            ProductLine::Export => &self.export,
            ProductLine::Browser => &self.browser,
        }
    }

    pub fn blanks(&self) -> Blanks {
        Blanks {
            export: self.export.blanks.clone(),
            browser: self.browser.blanks.clone(),
        }
    }
}
