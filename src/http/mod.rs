//! HTTP server module.
//!
//! Serves plain HTTP by default (TLS normally terminates in front of the
//! container) or HTTPS with user-provided certificate files. The server
//! includes:
//! - Graceful shutdown on SIGTERM/SIGINT
//! - Certificate hot-reload via SIGHUP (manual TLS mode)

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
