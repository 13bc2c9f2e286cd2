//! Process and host runtime statistics.
//!
//! [`StatsReader`] owns the `sysinfo` handle and is refreshed by the sampler
//! only; [`RuntimeStats`] is the plain snapshot the reporter turns into gauges.

use sysinfo::{get_current_pid, Pid, System};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeStats {
    pub process_resident_bytes: u64,
    pub process_virtual_bytes: u64,
    pub process_cpu_percent: f64,
    pub process_run_time_secs: u64,
    pub total_memory_bytes: u64,
    pub used_memory_bytes: u64,
    pub free_memory_bytes: u64,
    pub available_memory_bytes: u64,
    pub total_swap_bytes: u64,
    pub used_swap_bytes: u64,
    pub cpu_percent: f64,
    pub cpu_count: u64,
    pub load_average_1m: f64,
    pub load_average_5m: f64,
    pub load_average_15m: f64,
    pub uptime_secs: u64,
}

impl RuntimeStats {
    /// One gauge per statistic, named in CamelCase.
    pub fn gauges(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("ProcessResidentMemory", self.process_resident_bytes as f64),
            ("ProcessVirtualMemory", self.process_virtual_bytes as f64),
            ("ProcessCpuUsage", self.process_cpu_percent),
            ("ProcessRunTime", self.process_run_time_secs as f64),
            ("TotalMemory", self.total_memory_bytes as f64),
            ("UsedMemory", self.used_memory_bytes as f64),
            ("FreeMemory", self.free_memory_bytes as f64),
            ("AvailableMemory", self.available_memory_bytes as f64),
            ("TotalSwap", self.total_swap_bytes as f64),
            ("UsedSwap", self.used_swap_bytes as f64),
            ("CpuUsage", self.cpu_percent),
            ("CpuCount", self.cpu_count as f64),
            ("LoadAverage1", self.load_average_1m),
            ("LoadAverage5", self.load_average_5m),
            ("LoadAverage15", self.load_average_15m),
            ("Uptime", self.uptime_secs as f64),
        ]
    }
}

pub struct StatsReader {
    system: System,
    pid: Option<Pid>,
}

impl StatsReader {
    pub fn new() -> Self {
        let pid = match get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(err = e, "current pid unavailable, process stats disabled");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
        }
    }

    /// Refresh and take a snapshot.
    pub fn read(&mut self) -> RuntimeStats {
        self.system.refresh_memory();
        self.system.refresh_cpu();

        let mut stats = RuntimeStats {
            total_memory_bytes: self.system.total_memory(),
            used_memory_bytes: self.system.used_memory(),
            free_memory_bytes: self.system.free_memory(),
            available_memory_bytes: self.system.available_memory(),
            total_swap_bytes: self.system.total_swap(),
            used_swap_bytes: self.system.used_swap(),
            cpu_percent: finite(self.system.global_cpu_info().cpu_usage()),
            cpu_count: self.system.cpus().len() as u64,
            uptime_secs: System::uptime(),
            ..RuntimeStats::default()
        };

        let load = System::load_average();
        stats.load_average_1m = finite_f64(load.one);
        stats.load_average_5m = finite_f64(load.five);
        stats.load_average_15m = finite_f64(load.fifteen);

        if let Some(pid) = self.pid {
            if self.system.refresh_process(pid) {
                if let Some(p) = self.system.process(pid) {
                    stats.process_resident_bytes = p.memory();
                    stats.process_virtual_bytes = p.virtual_memory();
                    stats.process_cpu_percent = finite(p.cpu_usage());
                    stats.process_run_time_secs = p.run_time();
                }
            }
        }

        stats
    }
}

impl Default for StatsReader {
    fn default() -> Self {
        Self::new()
    }
}

// the collector rejects non-finite gauges; the first cpu sample can be NaN
fn finite(v: f32) -> f64 {
    finite_f64(f64::from(v))
}

fn finite_f64(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
