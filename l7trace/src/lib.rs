//! # l7trace - Passive HTTP Request Tracing via eBPF
//!
//! l7trace reconstructs application-layer (HTTP) request/response events by
//! observing raw socket `write`/`read` system calls with eBPF tracepoints.
//! The traced application needs no instrumentation, no proxy, and no
//! restart.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Traced Applications                      │
//! │              write(fd, "GET /...") / read(fd)               │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │ syscall tracepoints
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  eBPF Programs (Kernel)                     │
//! │  sys_enter_write ─▶ classify ─▶ pending-request table (LRU) │
//! │  sys_enter_read  ─▶ read bridge (pid_tgid → args)           │
//! │  sys_exit_read   ─▶ correlate ─▶ L7_EVENTS perf array       │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │ fixed-size L7Event records
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  l7trace (This Crate)                       │
//! │                                                             │
//! │  ┌────────────┐    ┌─────────────┐    ┌─────────────┐       │
//! │  │  Capture   │───▶│    Event    │───▶│   Display   │       │
//! │  │ (per-CPU)  │    │  Processor  │    │  / Export   │       │
//! │  └────────────┘    └─────────────┘    └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`capture`]: eBPF loading/attachment, per-CPU perf-buffer consumption,
//!   event decoding and processing
//! - [`export`]: JSON export of captured requests
//! - [`cli`]: Command-line argument parsing
//! - [`domain`]: Core domain types (Pid, CpuId, Duration) and errors
//! - [`preflight`]: System requirement checks before eBPF loading
//!
//! ## Correlation Model
//!
//! The kernel side keeps at most one pending request per `(pid, fd)`. A
//! write beginning with `"GET"` starts (or silently replaces) the socket's
//! pending request; the next successful read on that socket completes it
//! and emits one event carrying the request payload snapshot and the
//! write→read latency. Response status is not parsed in this version.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Trace every process on the host
//! sudo l7trace
//!
//! # Trace one process, stop after a minute, keep a JSON record
//! sudo l7trace --pid 1234 --duration 60 --export requests.json
//! ```

// Expose modules for testing
pub mod capture;
pub mod cli;
pub mod domain;
pub mod export;
pub mod preflight;
