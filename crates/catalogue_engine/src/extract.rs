//! Unpacking of downloaded artifacts.
//!
//! Both formats reject entries that would land outside the destination
//! directory (absolute paths or `..` components). Tarballs may not carry
//! symbolic or hard links at all.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported archive format: {file_name}")]
    UnsupportedFormat { file_name: String },
    #[error("path traversal detected: {path}")]
    PathTraversal { path: String },
    #[error("link entries are not allowed: {path}")]
    LinkEntry { path: String },
    #[error("archive contains no files")]
    EmptyArchive,
    #[error("corrupt zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait ArtifactExtractor: Send + Sync {
    /// Unpacks `archive` into `dest`, returning the paths of extracted regular files.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Picks the format from the archive's file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveExtractor;

impl ArtifactExtractor for ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let file_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let format = ArchiveFormat::from_file_name(&file_name)
            .ok_or(ExtractionError::UnsupportedFormat { file_name })?;

        fs::create_dir_all(dest)?;
        let extracted = match format {
            ArchiveFormat::TarGz => extract_tar_gz(archive, dest)?,
            ArchiveFormat::Zip => extract_zip(archive, dest)?,
        };
        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }
        Ok(extracted)
    }
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    let mut extracted = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        let entry_type = entry.header().entry_type();
        if matches!(entry_type, tar::EntryType::Symlink | tar::EntryType::Link) {
            return Err(ExtractionError::LinkEntry {
                path: entry_path.display().to_string(),
            });
        }

        // `unpack_in` refuses to write through anything already on disk that
        // resolves outside `dest`.
        if !entry.unpack_in(dest)? {
            return Err(ExtractionError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }

        if entry_type.is_file() {
            extracted.push(dest.join(&entry_path));
        }
    }
    Ok(extracted)
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut archive = zip::ZipArchive::new(File::open(archive)?)?;
    let mut extracted = Vec::new();

    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        let entry_path = entry
            .enclosed_name()
            .ok_or_else(|| ExtractionError::PathTraversal {
                path: entry.name().to_string(),
            })?;

        let dest_path = dest.join(&entry_path);
        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest_path)?;
        io::copy(&mut entry, &mut out)?;
        extracted.push(dest_path);
    }
    Ok(extracted)
}

fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
