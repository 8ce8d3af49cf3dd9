//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "l7trace",
    about = "Trace HTTP requests by observing socket syscalls via eBPF",
    after_help = "\
EXAMPLES:
    sudo l7trace                                 Trace every process on the host
    sudo l7trace --pid 1234                      Only report requests from PID 1234
    sudo l7trace --duration 60 --export req.json Stop after 60s, keep a JSON record"
)]
pub struct Args {
    /// Only report requests from this process ID
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Write captured requests to a JSON file on exit
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
