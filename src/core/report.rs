use crate::domain::ports::FaultReporter;
use crate::utils::error::ModuleError;
use std::sync::{Arc, Mutex};

/// 預設回報器，寫入 tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FaultReporter for TracingReporter {
    fn report(&self, fault: &ModuleError) {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            fault,
            fault.category(),
            fault.severity()
        );
    }
}

/// 記錄收到的錯誤後轉交給下一個回報器
pub struct RecordingReporter {
    inner: Arc<dyn FaultReporter>,
    faults: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new(inner: Arc<dyn FaultReporter>) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
        }
    }

    pub fn faults(&self) -> Vec<String> {
        self.faults
            .lock()
            .map(|faults| faults.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.faults().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RecordingReporter {
    fn default() -> Self {
        Self::new(Arc::new(TracingReporter))
    }
}

impl FaultReporter for RecordingReporter {
    fn report(&self, fault: &ModuleError) {
        match self.faults.lock() {
            Ok(mut faults) => faults.push(fault.to_string()),
            Err(poisoned) => poisoned.into_inner().push(fault.to_string()),
        }
        self.inner.report(fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_reporter_keeps_messages() {
        let reporter = RecordingReporter::default();
        assert!(reporter.is_empty());

        reporter.report(&ModuleError::CommandFault {
            command: "demo".to_string(),
            message: "bad input".to_string(),
        });

        assert_eq!(reporter.len(), 1);
        assert_eq!(reporter.faults()[0], "Command fault in 'demo': bad input");
    }
}
