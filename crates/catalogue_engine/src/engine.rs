use std::sync::Arc;

use catalogue_core::Catalogue;
use catalogue_logging::catalogue_info;

use crate::archive::ArchiveScraper;
use crate::config::EngineConfig;
use crate::extract::ArchiveExtractor;
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::invoke::ProcessInvoker;
use crate::pipeline::{
    rebuild_catalogue, run_resolve_batch, run_scrape, BatchReport, PipelineError, ResolveOptions,
    ScrapeReport,
};
use crate::resolver::DaemonResolver;
use crate::store::CacheStore;

/// Synchronous entry point for the command line binary.
///
/// Owns a current-thread runtime; every run awaits its steps strictly in order.
pub struct EngineHandle {
    config: EngineConfig,
    runtime: tokio::runtime::Runtime,
    fetcher: Arc<dyn Fetcher>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, PipelineError> {
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch.clone()));
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(
        config: EngineConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, PipelineError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(PipelineError::Runtime)?;
        Ok(Self {
            config,
            runtime,
            fetcher,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scrape, merge and rebuild. The cache is loaded before any network
    /// access so a corrupt cache stops the run with nothing written.
    pub fn scrape(&self) -> Result<(ScrapeReport, Catalogue), PipelineError> {
        let mut store = CacheStore::open(self.config.paths.clone())?;
        let scraper = ArchiveScraper::new(self.fetcher.as_ref(), &self.config.base_url)
            .map_err(PipelineError::Listing)?;
        let report = self.runtime.block_on(run_scrape(
            &scraper,
            &mut store,
            self.config.rescan_recent,
        ))?;
        let catalogue = rebuild_catalogue(&store, &self.config.paths.json_dir())?;
        Ok((report, catalogue))
    }

    pub fn resolve(
        &self,
        options: &ResolveOptions,
    ) -> Result<(BatchReport, Catalogue), PipelineError> {
        let mut store = CacheStore::open(self.config.paths.clone())?;
        let resolver = DaemonResolver::new(
            Arc::clone(&self.fetcher),
            Arc::new(ArchiveExtractor),
            Arc::new(ProcessInvoker),
            self.config.resolver.clone(),
        );
        if let Some(filter) = options.os_filter.as_deref() {
            catalogue_info!("Restricting resolver to files matching {:?}", filter);
        }
        let report = self
            .runtime
            .block_on(run_resolve_batch(&resolver, &mut store, options))?;
        let catalogue = rebuild_catalogue(&store, &self.config.paths.json_dir())?;
        Ok((report, catalogue))
    }

    pub fn rebuild(&self) -> Result<Catalogue, PipelineError> {
        let store = CacheStore::open(self.config.paths.clone())?;
        rebuild_catalogue(&store, &self.config.paths.json_dir())
    }
}
