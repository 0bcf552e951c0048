//! The Executor - single entry point to the state repository.
//!
//! The Executor is a stateless dispatcher: it routes commands to repository
//! operations and converts results to outputs.

use std::sync::Arc;

use grantstate_engine::StateRepository;
use tracing::debug;

use crate::{Command, Output, Result};

/// The command executor
///
/// # Thread Safety
///
/// Executor is `Send + Sync` and is shared across request handlers.
///
/// # Example
///
/// ```ignore
/// use grantstate_executor::{Command, Executor, Output};
///
/// let executor = Executor::new(Arc::new(StateRepository::ephemeral()));
/// let output = executor.execute(Command::StateFetch { key })?;
/// ```
#[derive(Debug, Clone)]
pub struct Executor {
    repo: Arc<StateRepository>,
}

impl Executor {
    /// Create an executor over a shared repository
    pub fn new(repo: Arc<StateRepository>) -> Self {
        Self { repo }
    }

    /// The underlying repository
    pub fn repository(&self) -> &Arc<StateRepository> {
        &self.repo
    }

    /// Execute a single command
    pub fn execute(&self, cmd: Command) -> Result<Output> {
        debug!(target: "grantstate::repo", command = cmd.name(), "Executing");
        match cmd {
            Command::Ping => Ok(Output::Pong {
                version: env!("CARGO_PKG_VERSION").to_string(),
            }),
            Command::StateUpsert { key, tag, state } => {
                let outcome = self.repo.upsert(&key, &tag, state)?;
                Ok(Output::Upserted {
                    created: outcome.created,
                })
            }
            Command::StateFetch { key } => Ok(Output::Document(self.repo.fetch(&key)?)),
            Command::StateErase { key } => Ok(Output::Erased {
                tag: self.repo.erase(&key)?,
            }),
            Command::StateVersions { key } => Ok(Output::Versions(self.repo.versions(&key)?)),
        }
    }

    /// Execute commands in order, one result per command
    pub fn execute_many(&self, cmds: Vec<Command>) -> Vec<Result<Output>> {
        cmds.into_iter().map(|cmd| self.execute(cmd)).collect()
    }
}
