use crate::config::batch_config::StepConfig;
use crate::core::registry::ModuleRegistry;
use crate::core::report::RecordingReporter;
use crate::domain::model::Value;
use crate::domain::ports::FaultReporter;
use crate::utils::error::Result;
use crate::utils::monitor::ProcessMonitor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 單一步驟的結束狀態
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Canceled,
    Faulted(String),
    Skipped(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub command: String,
    pub status: StepStatus,
    pub outputs: HashMap<String, Value>,
    pub canceled: bool,
    pub cancel_reason: Option<String>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
}

impl StepResult {
    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

fn serialize_duration_ms<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

struct StepOutcome {
    status: StepStatus,
    outputs: HashMap<String, Value>,
    canceled: bool,
    cancel_reason: Option<String>,
}

/// 依序執行多個模組步驟
///
/// 命令本身的失敗只會讓該步驟標記為 `Faulted`，不會中止批次；
/// 綁定或建立模組失敗時，依 `fail_fast` 決定中止或略過。
pub struct BatchRunner {
    registry: Arc<ModuleRegistry>,
    fail_fast: bool,
    monitor: Option<ProcessMonitor>,
}

impl BatchRunner {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            fail_fast: false,
            monitor: None,
        }
    }

    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(ProcessMonitor::new);
        self
    }

    pub fn execute(&self, steps: &[StepConfig]) -> Result<Vec<StepResult>> {
        let mut results = Vec::with_capacity(steps.len());

        if let Some(monitor) = &self.monitor {
            monitor.log_phase("Batch started");
        }

        for (index, step) in steps.iter().enumerate() {
            let started_at = Utc::now();
            let start = Instant::now();
            let recorder = Arc::new(RecordingReporter::new(self.registry.reporter()));

            let result = match self.execute_step(step, &recorder) {
                Ok(outcome) => StepResult {
                    command: step.command.clone(),
                    status: outcome.status,
                    outputs: outcome.outputs,
                    canceled: outcome.canceled,
                    cancel_reason: outcome.cancel_reason,
                    duration: start.elapsed(),
                    started_at,
                },
                Err(err) if self.fail_fast => {
                    tracing::error!("❌ Step {} ({}) failed: {}", index + 1, step.command, err);
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!("⏭️ Skipping step {} ({}): {}", index + 1, step.command, err);
                    StepResult {
                        command: step.command.clone(),
                        status: StepStatus::Skipped(err.to_string()),
                        outputs: HashMap::new(),
                        canceled: false,
                        cancel_reason: None,
                        duration: start.elapsed(),
                        started_at,
                    }
                }
            };

            tracing::info!(
                "Step {} ({}) finished: {:?} in {:?}",
                index + 1,
                result.command,
                result.status,
                result.duration
            );
            results.push(result);
        }

        if let Some(monitor) = &self.monitor {
            monitor.log_phase("Batch finished");
        }

        Ok(results)
    }

    /// 建立、綁定並執行單一步驟；任何綁定或讀取輸出的錯誤都交給呼叫端依 `fail_fast` 處理
    fn execute_step(&self, step: &StepConfig, recorder: &Arc<RecordingReporter>) -> Result<StepOutcome> {
        let mut module = self
            .registry
            .create_module_with_reporter(&step.command, Arc::clone(recorder) as Arc<dyn FaultReporter>)?;
        module.set_inputs(step.inputs.clone())?;

        let mut status = StepStatus::Completed;
        if step.preview {
            module.preview();
            if step.cancel_after_preview {
                module.cancel();
                tracing::debug!("↩️ Preview discarded for {}", step.command);
                status = StepStatus::Canceled;
            }
        }

        if status == StepStatus::Completed {
            self.registry.runner().execute(module.as_mut())?;
            status = match recorder.faults().into_iter().next() {
                Some(fault) => StepStatus::Faulted(fault),
                None if module.is_canceled() => StepStatus::Canceled,
                None => StepStatus::Completed,
            };
        }

        Ok(StepOutcome {
            status,
            outputs: module.outputs()?,
            canceled: module.is_canceled(),
            cancel_reason: module.cancel_reason(),
        })
    }

    /// 執行摘要
    pub fn summary(results: &[StepResult]) -> HashMap<String, Value> {
        let count = |predicate: &dyn Fn(&StepStatus) -> bool| {
            results.iter().filter(|r| predicate(&r.status)).count()
        };
        let total_duration: Duration = results.iter().map(|r| r.duration).sum();

        let mut summary = HashMap::new();
        summary.insert("total_steps".to_string(), Value::from(results.len()));
        summary.insert(
            "completed".to_string(),
            Value::from(count(&|s| matches!(s, StepStatus::Completed))),
        );
        summary.insert(
            "canceled".to_string(),
            Value::from(count(&|s| matches!(s, StepStatus::Canceled))),
        );
        summary.insert(
            "faulted".to_string(),
            Value::from(count(&|s| matches!(s, StepStatus::Faulted(_)))),
        );
        summary.insert(
            "skipped".to_string(),
            Value::from(count(&|s| matches!(s, StepStatus::Skipped(_)))),
        );
        summary.insert(
            "total_duration_ms".to_string(),
            Value::from(total_duration.as_millis() as u64),
        );
        summary
    }
}
