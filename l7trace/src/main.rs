//! # l7trace - Main Entry Point
//!
//! Loads the eBPF correlation engine, attaches the syscall tracepoints, and
//! consumes finished request events from the per-CPU perf buffers until
//! interrupted (or until `--duration` elapses).

// Main function is intentionally long for clarity
#![allow(clippy::too_many_lines)]

use anyhow::{Context, Result};
use aya::maps::perf::AsyncPerfEventArray;
use bytes::BytesMut;
use clap::Parser;
use crossbeam_channel::{bounded, Sender};
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use l7trace::capture::{
    attach_syscall_tracepoints, display_statistics, init_ebpf_logger, load_ebpf_program,
    online_cpus, parse_l7_event, EventProcessor,
};
use l7trace::cli::Args;
use l7trace::domain::{CpuId, Pid, TraceError};
use l7trace::export::RequestExporter;
use l7trace::preflight::run_preflight_checks;
use l7trace_common::L7Event;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOPERM: i32 = 77;

/// Events buffered between the per-CPU consumers and the main loop.
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Read buffers handed to each per-CPU perf reader.
const PER_CPU_READ_BUFFERS: usize = 16;

/// Capacity of each read buffer: one 544-byte record plus perf framing.
const READ_BUFFER_CAPACITY: usize = 1024;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            if e.to_string().to_lowercase().contains("permission denied") {
                EXIT_NOPERM
            } else {
                EXIT_ERROR
            }
        }
    });
}

/// Spawn one perf-buffer consumer per online CPU.
///
/// Each consumer decodes fixed-size records and forwards them over the
/// bounded channel; kernel-side drops are accumulated in `lost`,
/// truncated records in `malformed`.
fn spawn_perf_consumers(
    perf_array: &mut AsyncPerfEventArray<aya::maps::MapData>,
    cpus: &[CpuId],
    event_tx: &Sender<L7Event>,
    lost: &Arc<AtomicU64>,
    malformed: &Arc<AtomicU64>,
) -> Result<()> {
    for &cpu in cpus {
        let mut buf = perf_array
            .open(cpu.0, None)
            .with_context(|| format!("Failed to open perf buffer on {cpu}"))?;
        let tx = event_tx.clone();
        let lost = Arc::clone(lost);
        let malformed = Arc::clone(malformed);

        tokio::task::spawn(async move {
            let mut buffers = (0..PER_CPU_READ_BUFFERS)
                .map(|_| BytesMut::with_capacity(READ_BUFFER_CAPACITY))
                .collect::<Vec<_>>();

            loop {
                let events = match buf.read_events(&mut buffers).await {
                    Ok(events) => events,
                    Err(e) => {
                        warn!("perf buffer read failed on {cpu}: {e}");
                        return;
                    }
                };

                if events.lost > 0 {
                    lost.fetch_add(events.lost as u64, Ordering::Relaxed);
                }

                for buffer in buffers.iter().take(events.read) {
                    match parse_l7_event(buffer) {
                        Some(event) => {
                            // Main loop gone: shutting down
                            if tx.send(event).is_err() {
                                return;
                            }
                        }
                        None => {
                            malformed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
        });
    }

    Ok(())
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    run_preflight_checks()?;

    if !quiet {
        println!("l7trace v{}", env!("CARGO_PKG_VERSION"));
        if let Some(pid) = args.pid {
            println!("pid filter: {pid}");
        }
    }

    // ── Load eBPF and attach the syscall tracepoints ────────────────────
    let mut bpf = load_ebpf_program()?;
    init_ebpf_logger(&mut bpf);
    attach_syscall_tracepoints(&mut bpf)?;

    // ── Per-CPU perf buffer consumers ───────────────────────────────────
    let cpus = online_cpus()?;
    let mut perf_array: AsyncPerfEventArray<_> =
        bpf.take_map("L7_EVENTS").ok_or(TraceError::MapNotFound("L7_EVENTS"))?.try_into()?;

    let (event_tx, event_rx) = bounded::<L7Event>(EVENT_CHANNEL_CAPACITY);
    let lost = Arc::new(AtomicU64::new(0));
    let malformed = Arc::new(AtomicU64::new(0));
    spawn_perf_consumers(&mut perf_array, &cpus, &event_tx, &lost, &malformed)?;
    drop(event_tx);

    if !quiet {
        println!("consumers: {} CPUs", cpus.len());
        println!("tracing... (ctrl-c to stop)");
    }

    // ── Event processing loop ───────────────────────────────────────────
    let exporter = args.export.as_ref().map(|_| RequestExporter::new());
    let mut processor = EventProcessor::new(quiet, args.pid.map(Pid), exporter);

    let mut last_status_time = Instant::now();
    let mut stats_timer = Instant::now();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let capture_start = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };

    let mut exit_reason = "interrupted";

    loop {
        if let Some(limit) = duration_limit {
            if capture_start.elapsed() >= limit {
                exit_reason = "duration limit reached";
                break;
            }
        }

        // Drain everything the consumers have decoded so far
        while let Ok(event) = event_rx.try_recv() {
            processor.process_event(&event);
        }
        processor.record_lost(lost.swap(0, Ordering::Relaxed));
        processor.record_malformed(malformed.swap(0, Ordering::Relaxed));

        if processor.stats.events == 0 && last_status_time.elapsed() > Duration::from_secs(10) {
            info!("Still waiting for requests... (no events received yet)");
            last_status_time = Instant::now();
        }

        if !quiet && stats_timer.elapsed() > Duration::from_secs(10) {
            display_statistics(&processor.stats);
            stats_timer = Instant::now();
        }

        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => {
                // Continue loop
            }
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    // Final summary
    let elapsed = capture_start.elapsed();
    eprintln!(
        "\n{}: {:.1}s, {} requests (filtered: {}, lost: {}, malformed: {})",
        exit_reason,
        elapsed.as_secs_f64(),
        processor.stats.events,
        processor.stats.filtered,
        processor.stats.lost,
        processor.stats.malformed,
    );

    // Export captured requests if requested
    if let Some(exporter) = processor.take_exporter() {
        let export_path = args.export.expect("export path checked when exporter was created");

        let file = File::create(&export_path).context("Failed to create export file")?;
        let writer = BufWriter::new(file);
        exporter.export(writer).context("Failed to export requests")?;

        if !quiet {
            println!("saved: {}", export_path.display());
        }
    }

    Ok(())
}
