use super::types::{percent, DiskUsage, LoadAverage, MemoryUsage, ProcessUsage};
use crate::error::MetricsError;
use parking_lot::Mutex;
use std::path::Path;
use sysinfo::{
    Disks, Pid, ProcessRefreshKind, ProcessesToUpdate, System, MINIMUM_CPU_UPDATE_INTERVAL,
};

pub type ReadResult<T> = Result<T, MetricsError>;

/// Source of host and process resource readings.
///
/// Called from a blocking thread; implementations may sleep between samples.
pub trait ResourceReader: Send + Sync {
    fn cpu_percent(&self) -> ReadResult<f32>;
    fn load_average(&self) -> ReadResult<LoadAverage>;
    fn memory(&self) -> ReadResult<MemoryUsage>;
    fn disk(&self) -> ReadResult<DiskUsage>;
    fn process(&self) -> ReadResult<ProcessUsage>;
    fn thread_count(&self) -> ReadResult<usize>;
}

/// Reads the live host through `sysinfo`
pub struct SysinfoReader {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SysinfoReader {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    fn current_pid(&self) -> ReadResult<Pid> {
        self.pid
            .ok_or_else(|| MetricsError::unavailable("process", "current pid unknown"))
    }

    fn refresh_process(&self, system: &mut System, pid: Pid) {
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );
    }
}

impl Default for SysinfoReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceReader for SysinfoReader {
    fn cpu_percent(&self) -> ReadResult<f32> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(MetricsError::unavailable("cpu", "unsupported platform"));
        }
        let mut system = self.system.lock();
        // Usage is a delta, so sample twice
        system.refresh_cpu_usage();
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();
        Ok(system.global_cpu_usage())
    }

    fn load_average(&self) -> ReadResult<LoadAverage> {
        if cfg!(windows) {
            return Err(MetricsError::unavailable(
                "load_average",
                "not reported on this platform",
            ));
        }
        let load = System::load_average();
        Ok(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }

    fn memory(&self) -> ReadResult<MemoryUsage> {
        let mut system = self.system.lock();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(MetricsError::unavailable("memory", "total memory reported as 0"));
        }
        let available = system.available_memory();
        Ok(MemoryUsage {
            total_bytes: total,
            available_bytes: available,
            used_bytes: system.used_memory(),
            percent: percent(total.saturating_sub(available), total),
        })
    }

    fn disk(&self) -> ReadResult<DiskUsage> {
        let disks = Disks::new_with_refreshed_list();
        let root = Path::new("/");

        let disk = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == root)
            .or_else(|| disks.list().first())
            .ok_or_else(|| MetricsError::unavailable("disk", "no mounted filesystems reported"))?;

        let total = disk.total_space();
        let free = disk.available_space();
        let used = total.saturating_sub(free);
        Ok(DiskUsage {
            mount_point: disk.mount_point().display().to_string(),
            total_bytes: total,
            used_bytes: used,
            free_bytes: free,
            percent: percent(used, total),
        })
    }

    fn process(&self) -> ReadResult<ProcessUsage> {
        let pid = self.current_pid()?;
        let mut system = self.system.lock();
        self.refresh_process(&mut system, pid);
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        self.refresh_process(&mut system, pid);

        let process = system
            .process(pid)
            .ok_or_else(|| MetricsError::unavailable("process", "process not found"))?;
        Ok(ProcessUsage {
            resident_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
            cpu_percent: process.cpu_usage(),
        })
    }

    fn thread_count(&self) -> ReadResult<usize> {
        let pid = self.current_pid()?;
        let mut system = self.system.lock();
        self.refresh_process(&mut system, pid);

        system
            .process(pid)
            .and_then(|p| p.tasks())
            .map(|tasks| tasks.len())
            .ok_or_else(|| {
                MetricsError::unavailable("threads", "thread listing unsupported on this platform")
            })
    }
}
