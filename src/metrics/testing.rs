use super::reader::{ReadResult, ResourceReader};
use super::types::{DiskUsage, LoadAverage, MemoryUsage, ProcessUsage};
use crate::error::MetricsError;

/// Fixed readings, with selected resources failing
#[derive(Default)]
pub struct FakeReader {
    failing: Vec<&'static str>,
    panics: bool,
}

impl FakeReader {
    pub fn failing(resources: &[&'static str]) -> Self {
        Self {
            failing: resources.to_vec(),
            panics: false,
        }
    }

    pub fn panicking() -> Self {
        Self {
            failing: Vec::new(),
            panics: true,
        }
    }

    fn check(&self, resource: &'static str) -> ReadResult<()> {
        if self.panics {
            panic!("reader exploded");
        }
        if self.failing.contains(&resource) {
            Err(MetricsError::unavailable(resource, "permission denied"))
        } else {
            Ok(())
        }
    }
}

impl ResourceReader for FakeReader {
    fn cpu_percent(&self) -> ReadResult<f32> {
        self.check("cpu").map(|_| 12.5)
    }

    fn load_average(&self) -> ReadResult<LoadAverage> {
        self.check("load_average").map(|_| LoadAverage {
            one: 0.5,
            five: 0.25,
            fifteen: 0.1,
        })
    }

    fn memory(&self) -> ReadResult<MemoryUsage> {
        self.check("memory").map(|_| MemoryUsage {
            total_bytes: 1000,
            available_bytes: 250,
            used_bytes: 750,
            percent: 75.0,
        })
    }

    fn disk(&self) -> ReadResult<DiskUsage> {
        self.check("disk").map(|_| DiskUsage {
            mount_point: "/".to_string(),
            total_bytes: 200,
            used_bytes: 50,
            free_bytes: 150,
            percent: 25.0,
        })
    }

    fn process(&self) -> ReadResult<ProcessUsage> {
        self.check("process").map(|_| ProcessUsage {
            resident_bytes: 64,
            virtual_bytes: 128,
            cpu_percent: 1.0,
        })
    }

    fn thread_count(&self) -> ReadResult<usize> {
        self.check("threads").map(|_| 8)
    }
}
