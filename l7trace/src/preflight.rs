//! Pre-flight checks for l7trace
//!
//! Validates system requirements before attempting to load eBPF programs.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Minimum kernel version required for the eBPF features used by l7trace
/// (LRU hash maps landed in 4.10; syscall tracepoints are older).
const MIN_KERNEL_VERSION: (u32, u32) = (4, 14);

/// Run all pre-flight checks before eBPF loading.
pub fn run_preflight_checks() -> Result<()> {
    check_privileges()?;
    check_kernel_version()?;
    check_tracefs()?;
    Ok(())
}

/// Check if running with sufficient privileges for eBPF.
fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    // Not root - CAP_BPF plus CAP_PERFMON would also do on 5.8+, but
    // checking capabilities needs another dependency; require root.
    bail!(
        "Permission denied: l7trace requires root privileges to load eBPF programs.\n\n\
         Run with: sudo l7trace ..."
    );
}

/// Check if the kernel version is sufficient for the eBPF features we use.
fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;

    // Parse version like "Linux version 5.15.0-generic ..."
    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");

    let version_parts: Vec<&str> = release.split('.').collect();
    if version_parts.len() < 2 {
        // Can't parse, assume it's fine
        return Ok(());
    }

    let major: u32 = version_parts[0].parse().unwrap_or(0);
    let minor: u32 = version_parts[1]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0);

    if (major, minor) < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {}.{} is too old.\n\n\
             l7trace requires Linux {}.{} or newer for LRU hash map support.\n\
             Current kernel: {release}",
            major,
            minor,
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
        );
    }

    Ok(())
}

/// Check that the syscall tracepoints are reachable through tracefs.
fn check_tracefs() -> Result<()> {
    const CANDIDATES: [&str; 2] =
        ["/sys/kernel/tracing/events/syscalls", "/sys/kernel/debug/tracing/events/syscalls"];

    if CANDIDATES.iter().any(|p| Path::new(p).exists()) {
        return Ok(());
    }

    bail!(
        "Syscall tracepoints not found under /sys/kernel/tracing or\n\
         /sys/kernel/debug/tracing. Mount tracefs, e.g.:\n\n\
         mount -t tracefs nodev /sys/kernel/tracing"
    );
}
