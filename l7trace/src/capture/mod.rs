//! Capture pipeline
//!
//! Everything between the kernel and the display/export layers:
//! - eBPF program loading and tracepoint attachment
//! - online CPU enumeration (the perf event array is per-CPU)
//! - decoding fixed-size event records from perf buffer bytes
//! - per-event routing, filtering, and statistics

pub mod cpu_utils;
pub mod ebpf_setup;
pub mod event_display;
pub mod event_processor;

// Re-export common entry points
pub use cpu_utils::online_cpus;
pub use ebpf_setup::{attach_syscall_tracepoints, init_ebpf_logger, load_ebpf_program};
pub use event_display::{display_request, display_statistics, payload_preview};
pub use event_processor::{parse_l7_event, CaptureStats, EventProcessor};
