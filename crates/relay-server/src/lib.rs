//! HTTP server for Relay.
//!
//! Every path of the selected branch is addressable: `GET` reads a file or a
//! synthesized listing, `PUT`/`DELETE` commit through the write gate,
//! `QUERY /` runs an index query and `OPTIONS` answers discovery. The target
//! repository and branch come from `X-Relay-Repo`/`X-Relay-Branch` or the
//! `repo=`/`branch=` query parameters.

pub mod config;
pub mod error;
pub mod handler;
pub mod render;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::AppState;
pub use router::build_router;
pub use server::RelayServer;
