// Crate-wide error aggregation (spec §7). Each module owns a closed
// `thiserror` enum for its own fallible operations; `CliError` wraps them
// with `#[from]` so `main.rs` has one type to match on when choosing an
// exit code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Convert(#[from] crate::convert::ConvertError),
    #[error(transparent)]
    Emit(#[from] crate::bytecode::EmitError),
    #[error(transparent)]
    Serialize(#[from] crate::serializer::EmitError),
    #[error(transparent)]
    Package(#[from] crate::package::PackageError),
    #[error(transparent)]
    Protocol(#[from] crate::packet::ProtocolError),
    #[error(transparent)]
    Client(#[from] crate::client::ClientError),
    #[error("{0}")]
    Usage(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Maps the error taxonomy in spec §7/§6 to a process exit code:
    /// non-zero on any user-visible error, with IO/connection failures
    /// getting a distinct code from parse/convert failures so scripts can
    /// tell the two apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Io(_) | CliError::Client(_) => 3,
            CliError::Protocol(_) => 4,
            CliError::Convert(_) | CliError::Emit(_) | CliError::Serialize(_) | CliError::Package(_) | CliError::Json(_) => 1,
        }
    }
}
