//! # Event Processing
//!
//! Decodes fixed-size [`L7Event`] records out of perf-buffer bytes and
//! routes them: PID filter → statistics → live display → export collection.
//!
//! Delivery from the kernel is at-most-once and best-effort; lost samples
//! are counted per perf-buffer read and surfaced in the statistics, never
//! treated as an error.

use l7trace_common::L7Event;

use super::event_display::{display_request, payload_preview, PREVIEW_LEN};
use crate::domain::Pid;
use crate::export::RequestExporter;

/// Decode one perf record into an [`L7Event`].
///
/// The kernel writes whole records, but a perf buffer can hand back a
/// truncated sample; anything shorter than the record is rejected.
#[must_use]
pub fn parse_l7_event(bytes: &[u8]) -> Option<L7Event> {
    if bytes.len() < std::mem::size_of::<L7Event>() {
        return None;
    }

    // SAFETY: the length was checked above and L7Event is a plain
    // #[repr(C)] record written byte-for-byte by the eBPF side.
    #[allow(unsafe_code)]
    let event = unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<L7Event>()) };
    Some(event)
}

/// Counters for a capture session.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaptureStats {
    /// Events decoded from the perf buffer.
    pub events: u64,
    /// Events skipped by the `--pid` filter.
    pub filtered: u64,
    /// Samples the kernel dropped because a per-CPU buffer was full.
    pub lost: u64,
    /// Truncated perf records rejected by the decoder.
    pub malformed: u64,
}

/// Encapsulates event routing logic and state.
pub struct EventProcessor {
    // Configuration
    quiet: bool,
    pid_filter: Option<Pid>,

    // Mutable state
    pub stats: CaptureStats,

    // Optional outputs
    exporter: Option<RequestExporter>,
}

impl EventProcessor {
    #[must_use]
    pub fn new(quiet: bool, pid_filter: Option<Pid>, exporter: Option<RequestExporter>) -> Self {
        Self { quiet, pid_filter, stats: CaptureStats::default(), exporter }
    }

    /// Route a single decoded event.
    pub fn process_event(&mut self, event: &L7Event) {
        if let Some(pid) = self.pid_filter {
            if Pid(event.pid) != pid {
                self.stats.filtered += 1;
                return;
            }
        }

        self.stats.events += 1;

        if !self.quiet {
            display_request(event, &payload_preview(&event.payload, PREVIEW_LEN));
        }

        if let Some(exporter) = self.exporter.as_mut() {
            exporter.add_event(event);
        }
    }

    /// Account for samples dropped by the kernel.
    pub fn record_lost(&mut self, lost: u64) {
        self.stats.lost += lost;
    }

    /// Account for truncated perf records rejected by the decoder.
    pub fn record_malformed(&mut self, count: u64) {
        self.stats.malformed += count;
    }

    /// Take the exporter (for the final export).
    pub fn take_exporter(&mut self) -> Option<RequestExporter> {
        self.exporter.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l7trace_common::{MAX_PAYLOAD_SIZE, METHOD_GET, PROTOCOL_HTTP};

    fn sample_event(pid: u32) -> L7Event {
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];
        let request = b"GET /health HTTP/1.1\r\n\r\n";
        payload[..request.len()].copy_from_slice(request);
        L7Event {
            fd: 5,
            pid,
            status: 0,
            duration_ns: 5_000_000,
            protocol: PROTOCOL_HTTP,
            method: METHOD_GET,
            _padding: [0; 2],
            payload,
        }
    }

    fn event_bytes(event: &L7Event) -> Vec<u8> {
        // SAFETY: L7Event is #[repr(C)] and fully initialized.
        #[allow(unsafe_code)]
        let bytes = unsafe {
            std::slice::from_raw_parts(
                std::ptr::from_ref(event).cast::<u8>(),
                std::mem::size_of::<L7Event>(),
            )
        };
        bytes.to_vec()
    }

    #[test]
    fn test_parse_valid_record() {
        let event = sample_event(100);
        let parsed = parse_l7_event(&event_bytes(&event)).expect("record should decode");
        assert_eq!(parsed.pid, 100);
        assert_eq!(parsed.fd, 5);
        assert_eq!(parsed.duration_ns, 5_000_000);
        assert_eq!(parsed.protocol, PROTOCOL_HTTP);
        assert_eq!(parsed.method, METHOD_GET);
        assert_eq!(&parsed.payload[..4], b"GET ");
    }

    #[test]
    fn test_parse_rejects_short_record() {
        let event = sample_event(100);
        let bytes = event_bytes(&event);
        assert!(parse_l7_event(&bytes[..bytes.len() - 1]).is_none());
        assert!(parse_l7_event(&[]).is_none());
    }

    #[test]
    fn test_pid_filter() {
        let mut processor = EventProcessor::new(true, Some(Pid(100)), None);
        processor.process_event(&sample_event(100));
        processor.process_event(&sample_event(200));
        processor.process_event(&sample_event(100));

        assert_eq!(processor.stats.events, 2);
        assert_eq!(processor.stats.filtered, 1);
    }

    #[test]
    fn test_no_filter_counts_everything() {
        let mut processor = EventProcessor::new(true, None, None);
        processor.process_event(&sample_event(100));
        processor.process_event(&sample_event(200));

        assert_eq!(processor.stats.events, 2);
        assert_eq!(processor.stats.filtered, 0);
    }

    #[test]
    fn test_lost_and_malformed_counters() {
        let mut processor = EventProcessor::new(true, None, None);
        processor.record_lost(3);
        processor.record_lost(2);
        processor.record_malformed(1);

        assert_eq!(processor.stats.lost, 5);
        assert_eq!(processor.stats.malformed, 1);
    }

    #[test]
    fn test_exporter_collects_matching_events() {
        let exporter = RequestExporter::new();
        let mut processor = EventProcessor::new(true, Some(Pid(100)), Some(exporter));
        processor.process_event(&sample_event(100));
        processor.process_event(&sample_event(200));

        let exporter = processor.take_exporter().expect("exporter present");
        assert_eq!(exporter.len(), 1);
    }
}
