//! Repository builder
//!
//! ```ignore
//! use grantstate_engine::{ResolutionPolicy, StateRepository};
//!
//! // In-memory, nothing on disk
//! let repo = StateRepository::ephemeral();
//!
//! // Durable log in ./data, compacted on open
//! let repo = StateRepository::builder()
//!     .log("./data")
//!     .always()
//!     .compact_on_open(true)
//!     .policy(ResolutionPolicy::CreationOrder)
//!     .build()?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use grantstate_concurrency::{LockTable, DEFAULT_STRIPES};
use grantstate_core::StateResult;
use grantstate_storage::{DocumentIndex, DurabilityMode, LogIndex, ShardedIndex};
use tracing::info;

use super::StateRepository;
use crate::resolver::ResolutionPolicy;

// ============================================================================
// Storage Backend Selection
// ============================================================================

/// Where records live
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory only
    #[default]
    Memory,
    /// Append-only log in `dir`
    Log {
        /// Data directory holding the log file
        dir: PathBuf,
        /// Sync behavior of appends
        durability: DurabilityMode,
        /// Rewrite the log from live state right after replay
        compact_on_open: bool,
    },
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`StateRepository`]
#[derive(Debug, Clone)]
pub struct RepositoryBuilder {
    backend: StorageBackend,
    stripes: usize,
    policy: ResolutionPolicy,
}

impl RepositoryBuilder {
    /// In-memory backend, 64 stripes, creation-order resolution
    pub fn new() -> Self {
        Self {
            backend: StorageBackend::Memory,
            stripes: DEFAULT_STRIPES,
            policy: ResolutionPolicy::default(),
        }
    }

    /// Replace the backend selection
    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Use the durable log backend in `dir` with standard durability
    pub fn log<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.backend = StorageBackend::Log {
            dir: dir.into(),
            durability: DurabilityMode::Standard,
            compact_on_open: false,
        };
        self
    }

    /// Sync every append (log backend only)
    pub fn always(self) -> Self {
        self.durability(DurabilityMode::Always)
    }

    /// Set the durability mode (log backend only)
    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        if let StorageBackend::Log { durability, .. } = &mut self.backend {
            *durability = mode;
        }
        self
    }

    /// Compact the log after replay (log backend only)
    pub fn compact_on_open(mut self, enabled: bool) -> Self {
        if let StorageBackend::Log {
            compact_on_open, ..
        } = &mut self.backend
        {
            *compact_on_open = enabled;
        }
        self
    }

    /// Number of key lock stripes
    pub fn stripes(mut self, stripes: usize) -> Self {
        self.stripes = stripes;
        self
    }

    /// Effective version policy
    pub fn policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Selected backend
    pub fn get_backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Open the backend and build the repository
    ///
    /// # Errors
    ///
    /// `Storage` if the log cannot be opened, replayed or compacted.
    pub fn build(self) -> StateResult<StateRepository> {
        let index: Arc<dyn DocumentIndex> = match &self.backend {
            StorageBackend::Memory => Arc::new(ShardedIndex::new()),
            StorageBackend::Log {
                dir,
                durability,
                compact_on_open,
            } => {
                let log = LogIndex::open(dir, *durability)?;
                if *compact_on_open {
                    let report = log.compact()?;
                    info!(
                        target: "grantstate::repo",
                        frames_before = report.frames_before,
                        frames_after = report.frames_after,
                        bytes_before = report.bytes_before,
                        bytes_after = report.bytes_after,
                        "Compacted state log on open"
                    );
                }
                Arc::new(log)
            }
        };
        Ok(self.assemble(index))
    }

    /// Build an in-memory repository, ignoring the backend selection
    pub fn build_ephemeral(self) -> StateRepository {
        self.assemble(Arc::new(ShardedIndex::new()))
    }

    /// Build over a caller-supplied backend
    pub fn build_with(self, index: Arc<dyn DocumentIndex>) -> StateRepository {
        self.assemble(index)
    }

    fn assemble(self, index: Arc<dyn DocumentIndex>) -> StateRepository {
        StateRepository::new(index, LockTable::new(self.stripes), self.policy)
    }
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
