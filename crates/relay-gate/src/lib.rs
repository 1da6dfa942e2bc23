//! The write gate for Relay.
//!
//! Every candidate commit is shown to a [`Validator`] before its branch ref
//! may advance. The validator is a narrow request/response boundary: it gets
//! a [`ValidationRequest`] naming the old and new commits, the repository
//! directory and the changed entries with their new bytes, and answers with a
//! [`Verdict`]. [`WriteGate`] bounds the call with a deadline so a hung
//! validator can never hold a branch.
//!
//! The [`process`] module holds the JSON-over-stdio exchange shared by
//! [`CommandValidator`] and the indexer adapter.

pub mod config;
pub mod error;
pub mod gate;
pub mod process;
pub mod request;
pub mod validator;

pub use config::{CommandSpec, GateConfig};
pub use error::{GateError, GateResult};
pub use gate::{GateOutcome, WriteGate};
pub use process::{bounded, exchange};
pub use request::{EntryChange, ValidationRequest, Verdict, VerdictMessage, WriteOperation};
pub use validator::{AllowAll, CommandValidator, Validator};
