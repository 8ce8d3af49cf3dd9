//! # eBPF Kernel-Side Request Correlation
//!
//! eBPF programs that reconstruct HTTP request/response events from raw
//! socket syscalls, without instrumenting the traced application.
//!
//! ## Programs
//!
//! - **Tracepoint**: `sys_enter_write` - classify outbound data, record a
//!   pending request per socket
//! - **Tracepoint**: `sys_enter_read` - stash read parameters for sockets
//!   with a pending request
//! - **Tracepoint**: `sys_exit_read` - resolve the correlation and emit an
//!   [`L7Event`]
//!
//! ## Maps (Shared with Userspace)
//!
//! - `ACTIVE_L7_REQUESTS` - LRU table of pending requests, keyed by socket
//! - `ACTIVE_READS` - read entry→exit bridge, keyed by pid_tgid
//! - `L7_REQUEST_HEAP` / `L7_EVENT_HEAP` - per-CPU scratch records
//! - `L7_EVENTS` - perf event array delivering finished events
//!
//! ## Build
//!
//! ```bash
//! cargo xtask build-ebpf --release
//! ```
//!
//! Every handler runs synchronously to completion on the CPU that triggered
//! the syscall; failures abort the handler silently and never affect the
//! traced process.

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::{bpf_get_current_pid_tgid, bpf_ktime_get_ns, bpf_probe_read_user_buf},
    macros::{map, tracepoint},
    maps::{HashMap, LruHashMap, PerCpuArray, PerfEventArray},
    programs::TracePointContext,
    EbpfContext,
};
use aya_log_ebpf::{debug, error};
use l7trace_common::{
    classify_request, L7Event, L7Request, ReadArgs, SocketKey, SysEnterRwArgs, SysExitArgs,
    ACTIVE_READS_CAPACITY, ACTIVE_REQUESTS_CAPACITY, MAX_PAYLOAD_SIZE, PAYLOAD_PREFIX_LEN,
    PROTOCOL_UNKNOWN,
};

// ============================================================================
// eBPF Maps - Shared data structures between kernel and userspace
// ============================================================================

/// Per-CPU scratch slot for building an [`L7Request`].
///
/// An `L7Request` is 528 bytes, far over the 512-byte eBPF stack budget, so
/// the record is assembled in this single-entry per-CPU array instead.
/// Tracepoint handlers run to completion on their CPU, which makes the slot
/// safe to reuse without locking.
#[map]
static L7_REQUEST_HEAP: PerCpuArray<L7Request> = PerCpuArray::with_max_entries(1, 0);

/// Per-CPU scratch slot for building an [`L7Event`] (544 bytes).
#[map]
static L7_EVENT_HEAP: PerCpuArray<L7Event> = PerCpuArray::with_max_entries(1, 0);

/// Pending-write table: one in-flight classified request per socket.
///
/// - **Key**: [`SocketKey`] (pid, fd)
/// - **Value**: [`L7Request`]
/// - **Eviction**: least-recently-used, silent. An evicted socket's eventual
///   read resolves to nothing and produces no event.
///
/// A new tracked write on a socket replaces the previous entry with no
/// signal: last write wins, pipelined requests are not tracked.
#[map]
static ACTIVE_L7_REQUESTS: LruHashMap<SocketKey, L7Request> =
    LruHashMap::with_max_entries(ACTIVE_REQUESTS_CAPACITY, 0);

/// Read bridge: parameters seen at `sys_enter_read`, consumed at
/// `sys_exit_read` of the same thread.
///
/// - **Key**: `bpf_get_current_pid_tgid()` of the reading thread
/// - **Value**: [`ReadArgs`]
///
/// There is no cleanup for a read that never exits; the fixed capacity
/// bounds the leak and the slot is overwritten by the thread's next
/// bridged read.
#[map]
static ACTIVE_READS: HashMap<u64, ReadArgs> =
    HashMap::with_max_entries(ACTIVE_READS_CAPACITY, 0);

/// Finished correlations, delivered to userspace per CPU.
///
/// Fire-and-forget: when a CPU's buffer is full the event is dropped with
/// no retry and no feedback into the correlation state.
#[map]
static L7_EVENTS: PerfEventArray<L7Event> = PerfEventArray::new(0);

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: `syscalls:sys_enter_write`
///
/// Classifies the outbound buffer and records a pending request for the
/// socket. Non-request writes leave no state behind.
#[tracepoint]
pub fn sys_enter_write(ctx: TracePointContext) -> u32 {
    match try_sys_enter_write(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sys_enter_write(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SysEnterRwArgs = ctx.as_ptr() as *const SysEnterRwArgs;
    let fd = unsafe { (*args).fd };
    let buf = unsafe { (*args).buf };
    let count = unsafe { (*args).count };

    let req = match L7_REQUEST_HEAP.get_ptr_mut(0) {
        Some(req) => unsafe { &mut *req },
        None => {
            error!(ctx, "no scratch slot in L7_REQUEST_HEAP");
            return Err(1);
        }
    };

    req.protocol = PROTOCOL_UNKNOWN;
    req.write_time_ns = unsafe { bpf_ktime_get_ns() };

    let key = SocketKey::new((unsafe { bpf_get_current_pid_tgid() } >> 32) as u32, fd);

    if buf == 0 {
        debug!(ctx, "write buffer is null");
        return Ok(());
    }

    // Bounded, fault-tolerant prefix copy. A failure (unmapped page, bad
    // pointer) means the write is ignored entirely: no tracking state.
    let mut prefix = [0u8; PAYLOAD_PREFIX_LEN];
    if unsafe { bpf_probe_read_user_buf(buf as *const u8, &mut prefix) }.is_err() {
        return Ok(());
    }

    let Some((protocol, method)) = classify_request(&prefix) else {
        return Ok(());
    };

    // Snapshot at most MAX_PAYLOAD_SIZE bytes of the request. The scratch
    // record is reused across events on this CPU, so zero first: the wire
    // contract is truncated/zero-padded, not stale-padded.
    req.payload.fill(0);
    let len = if count as usize > MAX_PAYLOAD_SIZE { MAX_PAYLOAD_SIZE } else { count as usize };
    let Some(dst) = req.payload.get_mut(..len) else {
        return Err(1);
    };
    if unsafe { bpf_probe_read_user_buf(buf as *const u8, dst) }.is_err() {
        return Ok(());
    }

    req.protocol = protocol;
    req.method = method;

    // Upsert: a still-pending request on this socket is replaced with no
    // emission, and under capacity pressure the LRU entry is evicted
    // silently.
    if let Err(e) = ACTIVE_L7_REQUESTS.insert(&key, req, 0) {
        error!(ctx, "failed to update ACTIVE_L7_REQUESTS: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Hook: `syscalls:sys_enter_read`
///
/// If the socket has a pending request, stash the read parameters so the
/// exit probe can resolve the correlation. Reads on untracked sockets are
/// ignored; this assumes at most one outstanding request per socket.
#[tracepoint]
pub fn sys_enter_read(ctx: TracePointContext) -> u32 {
    match try_sys_enter_read(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sys_enter_read(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SysEnterRwArgs = ctx.as_ptr() as *const SysEnterRwArgs;
    let fd = unsafe { (*args).fd };

    let id = unsafe { bpf_get_current_pid_tgid() };
    let key = SocketKey::new((id >> 32) as u32, fd);

    // Process is assumed to read the response from the socket it wrote the
    // request to; anything else is unrelated traffic.
    if unsafe { ACTIVE_L7_REQUESTS.get(&key) }.is_none() {
        return Ok(());
    }

    let read_args = ReadArgs { fd, buf: unsafe { (*args).buf }, size: unsafe { (*args).count } };

    if let Err(e) = ACTIVE_READS.insert(&id, &read_args, 0) {
        error!(ctx, "failed to update ACTIVE_READS: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Hook: `syscalls:sys_exit_read`
///
/// On a successful read, consumes the bridge entry and the pending request
/// (one-shot) and emits the finished event.
#[tracepoint]
pub fn sys_exit_read(ctx: TracePointContext) -> u32 {
    match try_sys_exit_read(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sys_exit_read(ctx: &TracePointContext) -> Result<(), i64> {
    let args: *const SysExitArgs = ctx.as_ptr() as *const SysExitArgs;
    let ret = unsafe { (*args).ret };

    // Failed or empty read: no event, no cleanup. The pending request stays
    // until a later read, an overwrite, or LRU eviction.
    if ret <= 0 {
        return Ok(());
    }

    let id = unsafe { bpf_get_current_pid_tgid() };

    let Some(read_args) = (unsafe { ACTIVE_READS.get(&id) }) else {
        return Ok(());
    };

    let key = SocketKey::new((id >> 32) as u32, read_args.fd);

    let Some(req) = (unsafe { ACTIVE_L7_REQUESTS.get(&key) }) else {
        // Consumed by an earlier read on another thread, evicted, or never
        // matched. Drop silently.
        return Ok(());
    };

    let event = match L7_EVENT_HEAP.get_ptr_mut(0) {
        Some(event) => unsafe { &mut *event },
        None => {
            error!(ctx, "no scratch slot in L7_EVENT_HEAP");
            return Err(1);
        }
    };

    event.fd = key.fd;
    event.pid = key.pid;
    // Response status is not parsed in this version.
    event.status = 0;
    event.protocol = req.protocol;
    event.method = req.method;
    event.duration_ns = unsafe { bpf_ktime_get_ns() } - req.write_time_ns;
    event.payload.copy_from_slice(&req.payload);

    // One-shot consumption: both entries go before emission, so a second
    // read on the socket cannot produce a duplicate event.
    let _ = ACTIVE_READS.remove(&id);
    let _ = ACTIVE_L7_REQUESTS.remove(&key);

    L7_EVENTS.output(ctx, event, 0);

    Ok(())
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
