//! JSON export of captured requests.
//!
//! One record per correlated request, written as a single document on exit:
//!
//! ```json
//! {"requests": [{"pid": 100, "fd": 5, "protocol": "HTTP", ...}]}
//! ```

use serde::{Deserialize, Serialize};
use std::io::Write;

use l7trace_common::L7Event;

use crate::capture::event_display::{method_name, payload_preview, protocol_name};
use crate::domain::{Duration, ExportError};

/// Characters of payload kept per exported record.
const EXPORT_PAYLOAD_LEN: usize = 512;

/// A captured request, flattened for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Process that issued the request.
    pub pid: u32,
    /// Socket file descriptor within that process.
    pub fd: u64,
    pub protocol: String,
    pub method: String,
    /// Response status; always 0 until response parsing lands.
    pub status: u32,
    /// Write→read latency in nanoseconds.
    pub latency_ns: u64,
    /// Latency in milliseconds, for human consumption.
    pub latency_ms: f64,
    /// Request payload snapshot (lossy UTF-8, control characters escaped).
    pub payload: String,
}

/// Collects finished correlations and writes them out as JSON.
#[derive(Debug, Default)]
pub struct RequestExporter {
    records: Vec<RequestRecord>,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    requests: &'a [RequestRecord],
}

impl RequestExporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one captured event.
    pub fn add_event(&mut self, event: &L7Event) {
        self.records.push(RequestRecord {
            pid: event.pid,
            fd: event.fd,
            protocol: protocol_name(event.protocol).to_string(),
            method: method_name(event.method).to_string(),
            status: event.status,
            latency_ns: event.duration_ns,
            latency_ms: Duration(event.duration_ns).as_millis(),
            payload: payload_preview(&event.payload, EXPORT_PAYLOAD_LEN),
        });
    }

    /// Number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write all collected records as a single JSON document.
    ///
    /// # Errors
    /// Returns an error if serialization or the underlying writer fails.
    pub fn export<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(writer, &ExportDocument { requests: &self.records })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l7trace_common::{MAX_PAYLOAD_SIZE, METHOD_GET, PROTOCOL_HTTP};

    fn sample_event() -> L7Event {
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];
        let request = b"GET /x HTTP/1.1\r\n";
        payload[..request.len()].copy_from_slice(request);
        L7Event {
            fd: 5,
            pid: 100,
            status: 0,
            duration_ns: 5_000_000,
            protocol: PROTOCOL_HTTP,
            method: METHOD_GET,
            _padding: [0; 2],
            payload,
        }
    }

    #[test]
    fn test_add_event_flattens_fields() {
        let mut exporter = RequestExporter::new();
        exporter.add_event(&sample_event());

        assert_eq!(exporter.len(), 1);
        let record = &exporter.records[0];
        assert_eq!(record.pid, 100);
        assert_eq!(record.fd, 5);
        assert_eq!(record.protocol, "HTTP");
        assert_eq!(record.method, "GET");
        assert_eq!(record.status, 0);
        assert_eq!(record.latency_ns, 5_000_000);
        assert_eq!(record.latency_ms, 5.0);
        assert!(record.payload.starts_with("GET /x"));
    }

    #[test]
    fn test_empty_exporter() {
        let exporter = RequestExporter::new();
        assert!(exporter.is_empty());

        let mut buffer = Vec::new();
        exporter.export(&mut buffer).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed["requests"].as_array().unwrap().len(), 0);
    }
}
