//! # grantstate executor
//!
//! Command layer between the HTTP boundary and the state repository.
//!
//! - [`RequestGate`] validates raw bodies and query parameters
//! - [`Command`]/[`Output`] are the typed, serializable instruction set
//! - [`Executor`] dispatches commands to the repository
//! - [`Error`] is the client-facing error taxonomy
//!
//! ```text
//! body / query ──▶ RequestGate ──▶ Command ──▶ Executor ──▶ Output
//!                      │                          │
//!                      └──── MalformedRequest     └──── NotFound / Internal
//! ```

#![warn(missing_docs)]

mod command;
mod convert;
mod error;
mod executor;
mod output;
mod validate;

#[cfg(test)]
mod tests;

pub use command::Command;
pub use error::{Error, Result};
pub use executor::Executor;
pub use output::Output;
pub use validate::RequestGate;
