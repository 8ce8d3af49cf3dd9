//! # eBPF Program Loading and Attachment
//!
//! Loads the compiled eBPF bytecode and attaches the three syscall
//! tracepoints that drive the correlation engine:
//!
//! - `syscalls:sys_enter_write` - classify outbound data
//! - `syscalls:sys_enter_read` - stash read parameters
//! - `syscalls:sys_exit_read` - resolve the correlation, emit the event
//!
//! The tracepoints observe every process on the host; filtering happens in
//! userspace (`--pid`).

#![allow(unsafe_code)] // setrlimit() requires unsafe

use aya::{include_bytes_aligned, programs::TracePoint, Ebpf};
use aya_log::EbpfLogger;
use log::{debug, info, warn};

use crate::domain::TraceError;

/// Tracepoints the correlation engine attaches to, as (program, category, name).
const SYSCALL_TRACEPOINTS: [(&str, &str, &str); 3] = [
    ("sys_enter_write", "syscalls", "sys_enter_write"),
    ("sys_enter_read", "syscalls", "sys_enter_read"),
    ("sys_exit_read", "syscalls", "sys_exit_read"),
];

/// Load the eBPF program binary.
///
/// Always uses the release build: eBPF programs are small, compile fast,
/// and the release build's LTO strips code the BPF linker cannot handle.
///
/// # Errors
/// Returns an error if the embedded eBPF bytecode cannot be loaded.
pub fn load_ebpf_program() -> Result<Ebpf, TraceError> {
    // eBPF maps live in locked memory; on kernels without memcg-based
    // accounting the default RLIMIT_MEMLOCK is far too small for a
    // 32768-entry table of 528-byte values.
    raise_memlock_limit();

    let bpf =
        Ebpf::load(include_bytes_aligned!("../../../target/bpfel-unknown-none/release/l7trace"))?;
    Ok(bpf)
}

fn raise_memlock_limit() {
    let rlim = libc::rlimit { rlim_cur: libc::RLIM_INFINITY, rlim_max: libc::RLIM_INFINITY };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!("failed to remove memlock limit (ret {ret})");
    }
}

/// Initialize the kernel→userspace log bridge.
pub fn init_ebpf_logger(bpf: &mut Ebpf) {
    if let Err(e) = EbpfLogger::init(bpf) {
        warn!("Failed to initialize eBPF logger: {e}");
    }
}

/// Attach the three syscall tracepoints.
///
/// # Errors
/// Returns an error if any program is missing from the loaded bytecode or
/// its attachment fails (commonly: tracefs unavailable).
pub fn attach_syscall_tracepoints(bpf: &mut Ebpf) -> Result<(), TraceError> {
    for (name, category, tracepoint) in SYSCALL_TRACEPOINTS {
        let program: &mut TracePoint = bpf
            .program_mut(name)
            .ok_or(TraceError::ProgramNotFound(name))?
            .try_into()?;
        program.load()?;
        program.attach(category, tracepoint).map_err(|e| TraceError::ProbeAttachFailed {
            probe: name,
            error: e.to_string(),
        })?;
        info!("✓ Attached tracepoint: {category}/{tracepoint}");
    }

    Ok(())
}
