use std::path::{Path, PathBuf};

use catalogue_core::Catalogue;
use catalogue_logging::catalogue_debug;

use crate::persist::{AtomicFileWriter, PersistError};

pub const VERSIONS_LIST: &str = "versions_list.json";
pub const EXPORT_VERSIONS: &str = "export_versions.json";
pub const BROWSER_VERSIONS: &str = "browser_versions.json";
pub const EXPORT_VERSIONS_GROUPED: &str = "export_versions_grouped.json";
pub const BROWSER_VERSIONS_GROUPED: &str = "browser_versions_grouped.json";
pub const BLANKS: &str = "blanks.json";
pub const LATEST_EXPORT_VERSIONS: &str = "latest_export_versions.json";
pub const LATEST_BROWSER_VERSIONS: &str = "latest_browser_versions.json";
pub const EXPORT_DAEMON_VERSIONS: &str = "export_daemon_versions.json";

/// Writes every projection of `catalogue` into `json_dir`, replacing previous output.
pub fn write_catalogue(json_dir: &Path, catalogue: &Catalogue) -> Result<Vec<PathBuf>, PersistError> {
    let writer = AtomicFileWriter::new(json_dir.to_path_buf());
    let written = vec![
        writer.write_json(VERSIONS_LIST, &catalogue.versions)?,
        writer.write_json(EXPORT_VERSIONS, &catalogue.export.records)?,
        writer.write_json(BROWSER_VERSIONS, &catalogue.browser.records)?,
        writer.write_json(EXPORT_VERSIONS_GROUPED, &catalogue.export.grouped)?,
        writer.write_json(BROWSER_VERSIONS_GROUPED, &catalogue.browser.grouped)?,
        writer.write_json(BLANKS, &catalogue.blanks())?,
        writer.write_json(LATEST_EXPORT_VERSIONS, &catalogue.export.latest)?,
        writer.write_json(LATEST_BROWSER_VERSIONS, &catalogue.browser.latest)?,
        writer.write_json(EXPORT_DAEMON_VERSIONS, &catalogue.export.daemon_records)?,
    ];
    catalogue_debug!("Wrote {} projections to {:?}", written.len(), json_dir);
    Ok(written)
}
