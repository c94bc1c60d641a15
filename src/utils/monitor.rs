#[cfg(feature = "cli")]
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, System};

#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub cpu_usage: f32,
    pub memory_mb: u64,
    pub elapsed: Duration,
}

/// 批次執行期間的行程資源紀錄
#[cfg(feature = "cli")]
pub struct ProcessMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    started: Instant,
}

#[cfg(feature = "cli")]
impl ProcessMonitor {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
            pid: sysinfo::get_current_pid().ok(),
            started: Instant::now(),
        }
    }

    pub fn snapshot(&self) -> Option<ProcessStats> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_all();

        let process = system.process(pid)?;
        Some(ProcessStats {
            cpu_usage: process.cpu_usage(),
            memory_mb: process.memory() / 1024 / 1024,
            elapsed: self.started.elapsed(),
        })
    }

    pub fn log_phase(&self, phase: &str) {
        if let Some(stats) = self.snapshot() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_mb,
                stats.elapsed
            );
        }
    }
}

// 非 CLI 環境只記錄經過時間
#[cfg(not(feature = "cli"))]
pub struct ProcessMonitor {
    started: Instant,
}

#[cfg(not(feature = "cli"))]
impl ProcessMonitor {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn snapshot(&self) -> Option<ProcessStats> {
        Some(ProcessStats {
            cpu_usage: 0.0,
            memory_mb: 0,
            elapsed: self.started.elapsed(),
        })
    }

    pub fn log_phase(&self, phase: &str) {
        tracing::info!("📊 {} - Time: {:?}", phase, self.started.elapsed());
    }
}

impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new()
    }
}
