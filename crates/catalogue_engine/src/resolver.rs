//! Recovery of the daemon version bundled inside a downloadable artifact.
//!
//! An artifact is downloaded into a scratch directory, unpacked, and the
//! daemon binary found inside is run with `--version`. Any failure along the
//! way yields a [`Skipped`] with the reason; the entry stays unresolved and a
//! later run tries again.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use catalogue_core::{FileEntry, Platform, Version, VersionMatcher};
use catalogue_logging::{catalogue_debug, catalogue_info};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::extract::{ArchiveFormat, ArtifactExtractor, ExtractionError};
use crate::invoke::{BinaryInvoker, InvokeError};
use crate::{FetchError, Fetcher};

pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_VERSION_FLAG: &str = "--version";

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Platform whose artifacts may be executed here.
    pub host: Platform,
    pub timeout: Duration,
    pub version_flag: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            host: Platform::from_os(std::env::consts::OS),
            timeout: DEFAULT_INVOKE_TIMEOUT,
            version_flag: DEFAULT_VERSION_FLAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub version: Version,
    /// Lowercase hex SHA-256 of the binary that reported `version`.
    pub binary_hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("already resolved")]
    AlreadyResolved,
    #[error("{platform} artifacts cannot run on a {host} host")]
    ForeignPlatform { platform: Platform, host: Platform },
    #[error("download failed: {0}")]
    Download(FetchError),
    #[error("extraction failed: {0}")]
    Extraction(ExtractionError),
    #[error("no {0} binary in the archive")]
    BinaryMissing(&'static str),
    #[error("invocation failed: {0}")]
    Invocation(InvokeError),
    #[error("binary exited with status {0:?}")]
    NonZeroExit(Option<i32>),
    #[error("no version found in binary output")]
    PatternNotFound,
    #[error("scratch directory error: {0}")]
    Io(io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("{file_name}: {reason}")]
pub struct Skipped {
    pub file_name: String,
    pub reason: SkipReason,
}

pub struct DaemonResolver {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn ArtifactExtractor>,
    invoker: Arc<dyn BinaryInvoker>,
    settings: ResolverSettings,
}

impl DaemonResolver {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn ArtifactExtractor>,
        invoker: Arc<dyn BinaryInvoker>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            invoker,
            settings,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub async fn resolve(&self, entry: &FileEntry) -> Result<Resolution, Skipped> {
        self.try_resolve(entry).await.map_err(|reason| Skipped {
            file_name: entry.file_name.clone(),
            reason,
        })
    }

    async fn try_resolve(&self, entry: &FileEntry) -> Result<Resolution, SkipReason> {
        if entry.is_resolved() {
            return Err(SkipReason::AlreadyResolved);
        }
        let platform = entry.platform();
        if !can_execute(platform, self.settings.host) {
            return Err(SkipReason::ForeignPlatform {
                platform,
                host: self.settings.host,
            });
        }
        if ArchiveFormat::from_file_name(&entry.file_name).is_none() {
            return Err(SkipReason::Extraction(ExtractionError::UnsupportedFormat {
                file_name: entry.file_name.clone(),
            }));
        }

        let scratch = tempfile::tempdir().map_err(SkipReason::Io)?;
        let archive_path = scratch.path().join(scratch_name(&entry.file_name));
        catalogue_info!("Downloading {}", entry.url);
        self.fetcher
            .download_to(&entry.url, &archive_path)
            .await
            .map_err(SkipReason::Download)?;

        let extractor = Arc::clone(&self.extractor);
        let invoker = Arc::clone(&self.invoker);
        let binary_name = daemon_binary_name(platform);
        let unpack_dir = scratch.path().join("unpacked");
        let timeout = self.settings.timeout;
        let flag = self.settings.version_flag.clone();

        let resolution = tokio::task::spawn_blocking(move || -> Result<Resolution, SkipReason> {
            extractor
                .extract(&archive_path, &unpack_dir)
                .map_err(SkipReason::Extraction)?;
            let binary = locate_daemon_binary(&unpack_dir, binary_name)
                .ok_or(SkipReason::BinaryMissing(binary_name))?;
            catalogue_debug!("Found daemon binary at {:?}", binary);

            let binary_hash = sha256_file(&binary).map_err(SkipReason::Io)?;
            make_executable(&binary).map_err(SkipReason::Io)?;
            let version = query_binary(invoker.as_ref(), &binary, &flag, timeout)?;
            Ok(Resolution {
                version,
                binary_hash,
            })
        })
        .await
        .map_err(|err| SkipReason::Io(io::Error::other(err)))??;
        Ok(resolution)
    }
}

/// Runs `binary <flag>` and reads the daemon version from its combined output.
pub fn query_binary(
    invoker: &dyn BinaryInvoker,
    binary: &Path,
    flag: &str,
    timeout: Duration,
) -> Result<Version, SkipReason> {
    let invocation = invoker
        .invoke(binary, &[flag], timeout)
        .map_err(SkipReason::Invocation)?;
    if !invocation.success() {
        return Err(SkipReason::NonZeroExit(invocation.exit_code));
    }
    VersionMatcher::daemon()
        .extract(&invocation.combined_output)
        .ok_or(SkipReason::PatternNotFound)
}

pub fn daemon_binary_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Windows => "tor.exe",
        _ => "tor",
    }
}

/// Android and unclassified artifacts never run; the rest only on their own OS.
pub fn can_execute(artifact: Platform, host: Platform) -> bool {
    match artifact {
        Platform::Android | Platform::Unknown => false,
        _ => artifact == host,
    }
}

/// First regular file called `name` below `root`, walking entries in name order.
pub fn locate_daemon_binary(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_file() && entry.file_name().to_string_lossy() == name
        })
        .map(|entry| entry.into_path())
}

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    Ok(hex)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn scratch_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string())
}
