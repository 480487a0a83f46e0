//! Per-song processing: reconcile, resolve, download, record.
//!
//! Songs are processed one at a time. Errors are isolated per song except
//! record store IO errors, which end the run.

mod policy;
mod processor;
mod reconcile;
mod summary;

pub use policy::SpecialPolicy;
pub use processor::{SkipReason, SongOutcome};
pub use summary::RunSummary;

use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use crate::catalog::Catalog;
use crate::config::{AppConfig, RunOptions};
use crate::failure_ledger::{FailureLedger, LedgerError};
use crate::library::{LibraryError, SongLibrary};
use crate::record_store::{RecordStore, RecordStoreError};
use crate::resolver::Resolver;
use crate::timestamps::now_file_stamp;
use crate::transport::{
    AssetLocator, AssetTransport, DownloadThrottler, RetryPolicy, RetryingTransport,
};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Record store error: {0}")]
    Store(#[from] RecordStoreError),

    #[error("Failure ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

pub struct Pipeline {
    catalog: Catalog,
    resolver: Resolver,
    transport: RetryingTransport,
    throttler: Arc<dyn DownloadThrottler>,
    store: RecordStore,
    ledger: FailureLedger,
    library: SongLibrary,
    options: RunOptions,
}

impl Pipeline {
    /// Wires every component for one run against `transport`.
    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn AssetTransport>,
        throttler: Arc<dyn DownloadThrottler>,
    ) -> Result<Self, ProcessError> {
        let dry_run = config.options.dry_run;
        if !dry_run {
            std::fs::create_dir_all(&config.output_dir).map_err(LibraryError::from)?;
        }

        let transport = RetryingTransport::new(transport, RetryPolicy::new(&config.transport));
        let catalog = Catalog::new(transport.clone(), &config.catalog_url);
        let resolver = Resolver::new(
            transport.clone(),
            AssetLocator::new(&config.assets_base_url, &config.region),
            config.resolver.clone(),
        );

        let record_path = config.record_path();
        let ledger_path = config.ledger_path(&now_file_stamp());
        let (store, ledger) = if dry_run {
            (
                RecordStore::open_read_only(&record_path, &config.region)?,
                FailureLedger::disabled(&ledger_path, &config.region),
            )
        } else {
            (
                RecordStore::open(&record_path, &config.region)?,
                FailureLedger::new(&ledger_path, &config.region),
            )
        };

        Ok(Self {
            catalog,
            resolver,
            transport,
            throttler,
            store,
            ledger,
            library: SongLibrary::new(&config.output_dir, dry_run),
            options: config.options,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    /// Processes `song_ids` in order.
    pub async fn run(&mut self, song_ids: &[u32]) -> Result<RunSummary, ProcessError> {
        let mut summary = RunSummary::default();

        for &song_id in song_ids {
            match self.process_song(song_id).await {
                Ok(outcome) => summary.add(song_id, &outcome),
                Err(ProcessError::Store(e)) => return Err(ProcessError::Store(e)),
                Err(e) => {
                    error!("Song {} aborted: {}", song_id, e);
                    summary.add_error(song_id);
                }
            }
        }

        summary.failed_ids = self.ledger.failed_ids();
        if !self.ledger.is_empty() && !self.options.dry_run {
            summary.ledger_path = Some(self.ledger.path().to_path_buf());
        }
        summary.downloads = self.throttler.get_stats().await;
        Ok(summary)
    }
}
