//! Catalogue engine: archive I/O, cache persistence and daemon resolution.
mod archive;
mod config;
mod decode;
mod engine;
mod extract;
mod fetch;
mod invoke;
mod listing;
mod persist;
mod pipeline;
mod publish;
mod resolver;
mod store;
mod types;

pub use archive::ArchiveScraper;
pub use config::{DataPaths, EngineConfig, DEFAULT_BASE_URL, DEFAULT_RESCAN_RECENT};
pub use decode::decode_listing;
pub use engine::EngineHandle;
pub use extract::{ArchiveExtractor, ArchiveFormat, ArtifactExtractor, ExtractionError};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use invoke::{BinaryInvoker, Invocation, InvokeError, ProcessInvoker};
pub use listing::{parse_listing, ListingEntry};
pub use persist::{ensure_output_dir, to_pretty_json, AtomicFileWriter, PersistError};
pub use pipeline::{
    rebuild_catalogue, run_resolve_batch, run_scrape, BatchReport, PipelineError,
    ResolveOptions, ResolvedEntry, ScrapeReport,
};
pub use publish::{
    write_catalogue, BLANKS, BROWSER_VERSIONS, BROWSER_VERSIONS_GROUPED, EXPORT_DAEMON_VERSIONS,
    EXPORT_VERSIONS, EXPORT_VERSIONS_GROUPED, LATEST_BROWSER_VERSIONS, LATEST_EXPORT_VERSIONS,
    VERSIONS_LIST,
};
pub use resolver::{
    can_execute, daemon_binary_name, locate_daemon_binary, query_binary, sha256_file,
    DaemonResolver, Resolution, ResolverSettings, SkipReason, Skipped, DEFAULT_INVOKE_TIMEOUT,
    DEFAULT_VERSION_FLAG,
};
pub use store::{CacheError, CacheStore};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
