//! Branch references for Relay.
//!
//! A repository has any number of named branches. Each branch either points
//! at a commit or is *unborn* (exists, no commits yet). Heads only move
//! through [`RefStore::compare_and_swap`], which is what makes concurrent
//! writers to one branch safe: exactly one of two writers that read the same
//! head can advance it.
//!
//! # Modules
//!
//! - [`error`]: error types
//! - [`types`]: [`BranchHead`]
//! - [`traits`]: the [`RefStore`] trait
//! - [`names`]: branch name validation
//! - [`memory`]: [`InMemoryRefStore`]
//! - [`fs`]: [`FileRefStore`], one file per branch

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use fs::FileRefStore;
pub use memory::InMemoryRefStore;
pub use names::{validate_branch_name, ALL_SCOPE};
pub use traits::RefStore;
pub use types::{BranchHead, DEFAULT_BRANCH};
