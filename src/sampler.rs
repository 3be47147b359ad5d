//! Host sampling for the agent
//!
//! Produces a [`MetricSnapshot`] from the local machine using `sysinfo`. Values
//! are rendered as the strings the collector expects: capacities in gigabytes
//! (`"15.50G"`), usages as percentages (`"42.17%"`), I/O counters as plain
//! integers.

use std::collections::BTreeMap;

use chrono::{Local, Timelike};
use sysinfo::{Disks, System};
use tracing::{instrument, trace};

use crate::{
    CpuInfo, DiskInfo, DiskIoInfo, HostInfo, MemInfo, MetricSnapshot,
    util::{format_gigabytes, format_percent},
};

/// Take one sample of the local host
///
/// Blocks for [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] to get a meaningful CPU
/// reading; call it from a blocking task.
#[instrument]
pub fn sample(host_name: &str) -> MetricSnapshot {
    let mut sys = System::new_all();
    sys.refresh_all();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let disks = Disks::new_with_refreshed_list();

    let snapshot = MetricSnapshot {
        id: None,
        host_name: host_name.to_string(),
        captured_at: Local::now().naive_local().with_nanosecond(0).unwrap_or_default(),
        host_info: host_info(host_name),
        mem_info: mem_info(&sys),
        cpu_info: group_cpus(
            sys.cpus().iter().map(|cpu| cpu.brand().trim().to_string()),
            sys.global_cpu_usage() as f64,
        ),
        disk_info: disks
            .iter()
            .map(|disk| {
                disk_info(
                    &disk.mount_point().to_string_lossy(),
                    disk.total_space(),
                    disk.available_space(),
                )
            })
            .collect(),
        disk_io_info: disks
            .iter()
            .map(|disk| {
                let usage = disk.usage();
                DiskIoInfo {
                    device: disk.name().to_string_lossy().into_owned(),
                    read_bytes: Some(usage.total_read_bytes.to_string()),
                    write_bytes: Some(usage.total_written_bytes.to_string()),
                    ..Default::default()
                }
            })
            .collect(),
    };

    trace!(
        "sampled {} cpu groups, {} disks",
        snapshot.cpu_info.len(),
        snapshot.disk_info.len()
    );
    snapshot
}

fn host_info(host_name: &str) -> HostInfo {
    HostInfo {
        host_name: Some(host_name.to_string()),
        os: System::name(),
        platform: System::long_os_version(),
        kernel_arch: Some(std::env::consts::ARCH.to_string()),
        extra: BTreeMap::new(),
    }
}

fn mem_info(sys: &System) -> MemInfo {
    let total = sys.total_memory();
    let used = sys.used_memory();

    MemInfo {
        total: Some(format_gigabytes(total)),
        available: Some(format_gigabytes(sys.available_memory())),
        used: Some(format_gigabytes(used)),
        free: Some(format_gigabytes(sys.free_memory())),
        usage: Some(format_percent(ratio(used, total))),
        extra: BTreeMap::new(),
    }
}

/// Collapse per-core entries into one entry per CPU model
///
/// Every group carries the host-wide usage; per-core usage is not reported.
pub fn group_cpus(brands: impl IntoIterator<Item = String>, usage: f64) -> Vec<CpuInfo> {
    let mut groups: Vec<(String, usize)> = Vec::new();
    for brand in brands {
        match groups.iter_mut().find(|(model, _)| *model == brand) {
            Some((_, cores)) => *cores += 1,
            None => groups.push((brand, 1)),
        }
    }

    groups
        .into_iter()
        .map(|(model, cores)| CpuInfo {
            model: Some(model),
            cores: Some(cores.to_string()),
            usage: Some(format_percent(usage)),
            extra: BTreeMap::new(),
        })
        .collect()
}

/// Build a disk entry from total and available bytes
pub fn disk_info(mountpoint: &str, total: u64, available: u64) -> DiskInfo {
    let used = total.saturating_sub(available);

    DiskInfo {
        mountpoint: mountpoint.to_string(),
        total: Some(format_gigabytes(total)),
        free: Some(format_gigabytes(available)),
        used: Some(format_gigabytes(used)),
        usage: Some(format_percent(ratio(used, total))),
        extra: BTreeMap::new(),
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
