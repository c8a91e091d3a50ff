use sysinfo::{Disks, System};

use crate::worker::types::Stats;

impl Stats {
    pub fn mem_total_kb(&self) -> u64 {
        self.mem_total_kb
    }

    pub fn mem_used_kb(&self) -> u64 {
        self.mem_total_kb.saturating_sub(self.mem_available_kb)
    }

    pub fn mem_used_percent(&self) -> f64 {
        if self.mem_total_kb == 0 {
            return 0.0;
        }
        self.mem_used_kb() as f64 / self.mem_total_kb as f64 * 100.0
    }

    pub fn disk_total(&self) -> u64 {
        self.disk_total
    }

    pub fn disk_used(&self) -> u64 {
        self.disk_total.saturating_sub(self.disk_free)
    }
}

/// Refresh `sysinfo` and take a snapshot. Memory is reported in KiB, disk in
/// bytes summed over all mounted disks.
pub fn get_stats(sysinfo: &mut System, task_count: u64) -> Stats {
    sysinfo.refresh_memory();
    sysinfo.refresh_cpu_usage();

    let disks = Disks::new_with_refreshed_list();
    let disk_total = disks.iter().map(|disk| disk.total_space()).sum();
    let disk_free = disks.iter().map(|disk| disk.available_space()).sum();

    Stats {
        mem_total_kb: sysinfo.total_memory() / 1024,
        mem_available_kb: sysinfo.available_memory() / 1024,
        disk_total,
        disk_free,
        cpu_usage: (sysinfo.global_cpu_usage() * 100.0).round() / 100.0,
        load_one: System::load_average().one,
        total_cpus: sysinfo.cpus().len() as u64,
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        task_count,
    }
}
