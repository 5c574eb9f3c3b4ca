use serde::{Deserialize, Serialize};

use crate::{Platform, Version};

/// One downloadable file in a version directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_name: String,
    pub url: String,
    /// Version reported by the bundled daemon binary. Set once, never re-resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon_version: Option<Version>,
    /// SHA-256 of the daemon binary the version was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon_hash: Option<String>,
}

impl FileEntry {
    pub fn new(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            url: url.into(),
            daemon_version: None,
            daemon_hash: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.daemon_version.is_some()
    }

    pub fn platform(&self) -> Platform {
        Platform::of_file_name(&self.file_name)
    }

    /// Copy without the resolver-derived fields, as published in the plain projections.
    pub fn without_daemon_fields(&self) -> Self {
        Self::new(self.file_name.clone(), self.url.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: Version,
    pub files: Vec<FileEntry>,
}

impl VersionRecord {
    pub fn new(version: Version, files: Vec<FileEntry>) -> Self {
        Self { version, files }
    }

    /// A version directory with no file surviving classification.
    pub fn is_blank(&self) -> bool {
        self.files.is_empty()
    }

    pub fn without_daemon_fields(&self) -> Self {
        Self {
            version: self.version.clone(),
            files: self
                .files
                .iter()
                .map(FileEntry::without_daemon_fields)
                .collect(),
        }
    }
}

/// Latest-version projection; `version` is null when the product line is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LatestRecord {
    pub version: Option<Version>,
    pub files: Vec<FileEntry>,
}

impl From<Option<&VersionRecord>> for LatestRecord {
    fn from(record: Option<&VersionRecord>) -> Self {
        match record {
            Some(record) => Self {
                version: Some(record.version.clone()),
                files: record.files.clone(),
            },
            None => Self::default(),
        }
    }
}
