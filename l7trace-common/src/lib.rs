//! # Shared Data Structures (eBPF ↔ Userspace)
//!
//! Defines the records and constants shared between the kernel-side eBPF
//! programs and userspace. All types use `#[repr(C)]` with explicit padding
//! so the memory layout is identical on both sides of the boundary and a
//! record can be reinterpreted from raw perf-buffer bytes.
//!
//! ## Key Types
//!
//! - [`L7Event`] - Finished correlation record, emitted via perf event array
//! - [`L7Request`] - In-flight classified request, keyed by [`SocketKey`]
//! - [`ReadArgs`] - Read parameters stashed between read entry and exit
//! - [`SysEnterRwArgs`] / [`SysExitArgs`] - Raw tracepoint argument layouts
//!
//! The protocol classifier ([`classify_request`]) lives here as well: it is
//! pure `no_std` code, so the eBPF programs use it on the hot path and the
//! host test suite exercises it directly.

#![no_std]

// ============================================================================
// Protocol / Method Constants
// ============================================================================

/// Outbound data did not match any recognized protocol.
pub const PROTOCOL_UNKNOWN: u8 = 0;

/// Outbound data classified as an HTTP request.
pub const PROTOCOL_HTTP: u8 = 1;

/// Request method not recognized.
pub const METHOD_UNKNOWN: u8 = 0;

/// HTTP GET.
pub const METHOD_GET: u8 = 1;

/// Bytes of request payload captured per event.
///
/// A longer write is truncated to this many bytes; the snapshot is never
/// reassembled across multiple writes.
pub const MAX_PAYLOAD_SIZE: usize = 512;

/// Bytes inspected by the classifier at write entry.
pub const PAYLOAD_PREFIX_LEN: usize = 16;

/// Capacity of the pending-write (active request) table.
///
/// The table is an LRU hash: inserting under pressure silently evicts the
/// least-recently-used socket's pending request.
pub const ACTIVE_REQUESTS_CAPACITY: u32 = 32768;

/// Capacity of the read-entry → read-exit bridge table.
pub const ACTIVE_READS_CAPACITY: u32 = 10240;

// ============================================================================
// Classifier
// ============================================================================

/// Classify the first bytes of an outbound buffer.
///
/// Returns `Some((protocol, method))` when the buffer starts a request this
/// tracer tracks, `None` otherwise. Only `"GET"` is recognized for now;
/// other HTTP methods and other protocols are ignored, so the following
/// read on that socket produces no event.
///
/// Runs inside the write probe: O(1), no loops, no allocation.
#[inline(always)]
#[must_use]
pub fn classify_request(prefix: &[u8]) -> Option<(u8, u8)> {
    if prefix.len() >= 3 && prefix[0] == b'G' && prefix[1] == b'E' && prefix[2] == b'T' {
        Some((PROTOCOL_HTTP, METHOD_GET))
    } else {
        None
    }
}

// ============================================================================
// Shared Records
// ============================================================================

/// Identity of a socket within a process.
///
/// Unique while the fd is open and not reused. Used as the key of the
/// pending-write table, so the padding is explicit: the kernel hashes the
/// key bytes verbatim and stray padding would split identical keys.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SocketKey {
    /// File descriptor, widened to match the tracepoint's u64 argument.
    pub fd: u64,

    /// Process ID (TGID).
    pub pid: u32,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,
}

impl SocketKey {
    #[inline(always)]
    #[must_use]
    pub fn new(pid: u32, fd: u64) -> Self {
        Self { fd, pid, _padding: 0 }
    }
}

/// An in-flight classified request, owned by the pending-write table.
///
/// At most one exists per [`SocketKey`]; a later tracked write on the same
/// socket overwrites it with no signal.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct L7Request {
    /// Monotonic timestamp of the write entry (`bpf_ktime_get_ns`).
    pub write_time_ns: u64,

    /// One of the `PROTOCOL_*` constants.
    pub protocol: u8,

    /// One of the `METHOD_*` constants.
    pub method: u8,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 6],

    /// Truncated, zero-padded snapshot of the write buffer.
    pub payload: [u8; MAX_PAYLOAD_SIZE],
}

/// Read parameters captured at `sys_enter_read`, consumed at `sys_exit_read`.
///
/// Keyed by the caller's `pid_tgid`, because the entry and exit of one read
/// always run on the same thread. Exists only between the two probes; a read
/// that never exits leaves its entry behind until the fd's slot is reused.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ReadArgs {
    /// File descriptor passed to read().
    pub fd: u64,

    /// Userspace destination buffer address.
    pub buf: u64,

    /// Requested byte count.
    pub size: u64,
}

/// A completed write→read correlation, sent to userspace.
///
/// Fixed-size wire record: `fd` (u64), `pid` (u32), `status` (u32, always 0
/// in this version — response parsing is deferred), `duration_ns` (u64),
/// `protocol` (u8), `method` (u8), 2 padding bytes, 512-byte payload
/// snapshot.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct L7Event {
    pub fd: u64,
    pub pid: u32,

    /// HTTP status of the response. Never populated in this version.
    pub status: u32,

    /// Latency: read-exit time minus write-entry time, nanoseconds.
    pub duration_ns: u64,

    pub protocol: u8,
    pub method: u8,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 2],

    /// Request-side payload, truncated and zero-padded.
    pub payload: [u8; MAX_PAYLOAD_SIZE],
}

// ============================================================================
// Tracepoint Argument Layouts
// ============================================================================

/// Raw arguments of `syscalls:sys_enter_write` and `syscalls:sys_enter_read`.
///
/// Layout from
/// `/sys/kernel/debug/tracing/events/syscalls/sys_enter_write/format`;
/// both syscalls share it (fd, buffer pointer, count). Pointers are carried
/// as `u64` so the struct compiles identically for kernel and host targets.
#[repr(C)]
pub struct SysEnterRwArgs {
    /// Common tracepoint header (type, flags, preempt_count, pid).
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,

    pub syscall_nr: i32,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,

    /// File descriptor argument.
    pub fd: u64,

    /// Userspace buffer address.
    pub buf: u64,

    /// Byte count argument.
    pub count: u64,
}

/// Raw arguments of `syscalls:sys_exit_read`.
///
/// Layout from `/sys/kernel/debug/tracing/events/syscalls/sys_exit_read/format`.
#[repr(C)]
pub struct SysExitArgs {
    /// Common tracepoint header.
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,

    pub syscall_nr: i32,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,

    /// Syscall return value: bytes read, or a negative errno.
    pub ret: i64,
}

#[cfg(feature = "user")]
use aya::Pod;

// These unsafe impls are required for eBPF <-> userspace communication.
// Pod ensures the records can be reinterpreted as plain bytes.
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for SocketKey {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for L7Request {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for ReadArgs {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for L7Event {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{align_of, size_of};

    #[test]
    fn classifies_get_prefix() {
        assert_eq!(
            classify_request(b"GET /index.html HTTP/1.1\r\n"),
            Some((PROTOCOL_HTTP, METHOD_GET))
        );
        assert_eq!(classify_request(b"GET"), Some((PROTOCOL_HTTP, METHOD_GET)));
    }

    #[test]
    fn rejects_other_methods() {
        assert_eq!(classify_request(b"POST /submit HTTP/1.1\r\n"), None);
        assert_eq!(classify_request(b"PUT /x HTTP/1.1\r\n"), None);
        assert_eq!(classify_request(b"HTTP/1.1 200 OK\r\n"), None);
        // binary traffic
        assert_eq!(classify_request(&[0x16, 0x03, 0x01, 0x02, 0x00]), None);
    }

    #[test]
    fn rejects_short_and_empty_buffers() {
        assert_eq!(classify_request(b""), None);
        assert_eq!(classify_request(b"GE"), None);
        // case sensitive, like the wire protocol
        assert_eq!(classify_request(b"get / HTTP/1.1"), None);
    }

    #[test]
    fn record_layouts_match_wire_format() {
        assert_eq!(size_of::<SocketKey>(), 16);
        assert_eq!(size_of::<ReadArgs>(), 24);
        // 8 + 1 + 1 + 6 + 512
        assert_eq!(size_of::<L7Request>(), 528);
        // 8 + 4 + 4 + 8 + 1 + 1 + 2 + 512, rounded up to 8-byte alignment
        assert_eq!(size_of::<L7Event>(), 544);
        assert_eq!(align_of::<L7Event>(), 8);
    }

    #[test]
    fn tracepoint_arg_offsets_match_kernel_abi() {
        use core::mem::offset_of;
        assert_eq!(offset_of!(SysEnterRwArgs, fd), 16);
        assert_eq!(offset_of!(SysEnterRwArgs, buf), 24);
        assert_eq!(offset_of!(SysEnterRwArgs, count), 32);
        assert_eq!(offset_of!(SysExitArgs, ret), 16);
    }
}
