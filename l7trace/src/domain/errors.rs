//! Structured error types for l7trace
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("eBPF map {0} not found")]
    MapNotFound(&'static str),

    #[error("eBPF program {0} not found")]
    ProgramNotFound(&'static str),

    #[error("Failed to attach {probe}: {error}")]
    ProbeAttachFailed { probe: &'static str, error: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Aya(#[from] aya::EbpfError),

    #[error(transparent)]
    Program(#[from] aya::programs::ProgramError),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export file: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_error_display() {
        let err = TraceError::MapNotFound("L7_EVENTS");
        assert_eq!(err.to_string(), "eBPF map L7_EVENTS not found");
    }

    #[test]
    fn test_probe_attach_error() {
        let err = TraceError::ProbeAttachFailed {
            probe: "sys_enter_write",
            error: "tracefs not mounted".to_string(),
        };
        assert!(err.to_string().contains("sys_enter_write"));
        assert!(err.to_string().contains("tracefs not mounted"));
    }
}
