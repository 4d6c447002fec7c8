//! TAC toolchain front end.
//!
//! The [`service`] module is the embedding API: compile program text into
//! a reusable artifact, then run it any number of times against different
//! inputs. The `tac` binary is a thin command-line layer over it.

pub mod service;

pub use service::{
    ArtifactHandle, CompileResult, Diagnostic, DiagnosticKind, Outcome, RunReport, Service,
    ServiceError, Session,
};

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging to stderr.
///
/// Use the `RUST_LOG` environment variable to override the default filter
/// (`warn`), e.g. `RUST_LOG=tac_vm=trace` to see every call and return.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
