//! Catalogue core: pure version, classification, cache-tier and projection logic.
mod catalogue;
mod classify;
mod matcher;
mod model;
mod tier;
mod version;

pub use catalogue::{Blanks, Catalogue, PlatformGroups, ProductCatalogue};
pub use classify::{classify, Classification, Platform, ProductLine};
pub use matcher::{extract, Pattern, VersionMatcher, DAEMON_MARKER};
pub use model::{FileEntry, LatestRecord, VersionRecord};
pub use tier::{CacheTier, DaemonUpdate, MergeOutcome, Tier};
pub use version::{ParseVersionError, Version};
