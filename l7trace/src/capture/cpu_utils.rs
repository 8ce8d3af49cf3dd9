//! CPU utility functions
//!
//! The kernel delivers events through a per-CPU perf buffer, so userspace
//! needs the list of online CPUs to open one consumer per core.

use anyhow::{Context, Result};
use std::fs;

use crate::domain::CpuId;

/// Parse a CPU list in the kernel's `/sys` format.
///
/// The format is a comma-separated mix of single ids and inclusive ranges,
/// e.g. `"0-3"` or `"0-3,8-11"` on NUMA systems.
fn parse_cpu_list(list: &str) -> Result<Vec<CpuId>> {
    let mut cpus = Vec::new();

    for part in list.trim().split(',') {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.parse().context("invalid CPU range start")?;
                let end: u32 = end.parse().context("invalid CPU range end")?;
                cpus.extend((start..=end).map(CpuId));
            }
            None => {
                cpus.push(CpuId(part.parse().context("invalid CPU id")?));
            }
        }
    }

    Ok(cpus)
}

/// Get the list of online CPU IDs from `/sys/devices/system/cpu/online`.
pub fn online_cpus() -> Result<Vec<CpuId>> {
    let content = fs::read_to_string("/sys/devices/system/cpu/online")
        .context("Failed to read /sys/devices/system/cpu/online")?;
    parse_cpu_list(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_range() {
        let cpus = parse_cpu_list("0-3\n").unwrap();
        assert_eq!(cpus, vec![CpuId(0), CpuId(1), CpuId(2), CpuId(3)]);
    }

    #[test]
    fn test_parse_mixed_list() {
        let cpus = parse_cpu_list("0-1,4,6-7").unwrap();
        assert_eq!(cpus, vec![CpuId(0), CpuId(1), CpuId(4), CpuId(6), CpuId(7)]);
    }

    #[test]
    fn test_parse_single_cpu() {
        assert_eq!(parse_cpu_list("0").unwrap(), vec![CpuId(0)]);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_cpu_list("zero-three").is_err());
    }
}
