//! Live display formatting for captured requests.

use l7trace_common::{L7Event, METHOD_GET, PROTOCOL_HTTP};

use super::event_processor::CaptureStats;
use crate::domain::Duration;

/// Characters of payload shown in the live display.
pub const PREVIEW_LEN: usize = 96;

/// Human-readable protocol name.
#[must_use]
pub fn protocol_name(protocol: u8) -> &'static str {
    match protocol {
        PROTOCOL_HTTP => "HTTP",
        _ => "UNKNOWN",
    }
}

/// Human-readable method name.
#[must_use]
pub fn method_name(method: u8) -> &'static str {
    match method {
        METHOD_GET => "GET",
        _ => "UNKNOWN",
    }
}

/// Render the payload snapshot for a terminal.
///
/// The snapshot is zero-padded to a fixed size; trailing zeros are not part
/// of the request. The rest is shown lossy-UTF-8 with CR/LF kept visible,
/// other control characters replaced, and the whole thing truncated to
/// `max` characters.
#[must_use]
pub fn payload_preview(payload: &[u8], max: usize) -> String {
    let end = payload.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let text = String::from_utf8_lossy(&payload[..end]);

    let mut preview = String::with_capacity(max);
    for c in text.chars() {
        if preview.len() >= max {
            preview.push('…');
            break;
        }
        match c {
            '\r' => preview.push_str("\\r"),
            '\n' => preview.push_str("\\n"),
            c if c.is_control() => preview.push('.'),
            c => preview.push(c),
        }
    }
    preview
}

/// Display one captured request.
pub fn display_request(event: &L7Event, preview: &str) {
    println!(
        "[{}] pid={} fd={} {} {} \"{}\"",
        protocol_name(event.protocol),
        event.pid,
        event.fd,
        method_name(event.method),
        Duration(event.duration_ns),
        preview,
    );
}

/// Display capture statistics.
pub fn display_statistics(stats: &CaptureStats) {
    eprintln!(
        "stats: events={} filtered={} lost={} malformed={}",
        stats.events, stats.filtered, stats.lost, stats.malformed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use l7trace_common::MAX_PAYLOAD_SIZE;

    #[test]
    fn test_preview_trims_zero_padding() {
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];
        payload[..3].copy_from_slice(b"GET");
        assert_eq!(payload_preview(&payload, 96), "GET");
    }

    #[test]
    fn test_preview_escapes_line_endings() {
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];
        let request = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        payload[..request.len()].copy_from_slice(request);
        let preview = payload_preview(&payload, 96);
        assert!(preview.contains("\\r\\n"));
        assert!(!preview.contains('\n'));
    }

    #[test]
    fn test_preview_truncates() {
        let mut payload = [0u8; MAX_PAYLOAD_SIZE];
        payload.fill(b'a');
        let preview = payload_preview(&payload, 16);
        assert!(preview.ends_with('…'));
        assert!(preview.chars().count() <= 17);
    }

    #[test]
    fn test_preview_replaces_control_bytes() {
        let payload = [b'G', b'E', b'T', 0x01, 0x02, 0, 0, 0];
        assert_eq!(payload_preview(&payload, 96), "GET..");
    }

    #[test]
    fn test_preview_empty_payload() {
        let payload = [0u8; MAX_PAYLOAD_SIZE];
        assert_eq!(payload_preview(&payload, 96), "");
    }

    #[test]
    fn test_names() {
        assert_eq!(protocol_name(PROTOCOL_HTTP), "HTTP");
        assert_eq!(protocol_name(0), "UNKNOWN");
        assert_eq!(method_name(METHOD_GET), "GET");
        assert_eq!(method_name(0), "UNKNOWN");
    }
}
