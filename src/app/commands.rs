//! Built-in demo commands used by the CLI.
//!
//! Each one exercises a different capability combination: `threshold` has
//! none, `scale` is previewable, `countdown` is cancelable and `fail` always
//! faults.

use crate::core::info::ModuleInfo;
use crate::core::registry::ModuleRegistry;
use crate::domain::model::{FieldRef, ParameterDescriptor};
use crate::domain::ports::{Cancelable, Command, Previewable};
use crate::utils::error::Result;
use std::sync::Arc;

/// 計算大於等於門檻的數值個數
#[derive(Debug, Default)]
pub struct ThresholdCommand {
    pub values: Vec<f64>,
    pub threshold: f64,
    pub count: usize,
}

impl Command for ThresholdCommand {
    fn run(&mut self) -> anyhow::Result<()> {
        if self.values.is_empty() {
            anyhow::bail!("no values to compare against {}", self.threshold);
        }
        self.count = self.values.iter().filter(|v| **v >= self.threshold).count();
        Ok(())
    }
}

pub fn threshold_info() -> Result<ModuleInfo<ThresholdCommand>> {
    ModuleInfo::<ThresholdCommand>::default_builder("threshold")
        .description("Count values at or above a threshold")
        .parameter(ParameterDescriptor::input(
            "values",
            FieldRef::new(|c: &ThresholdCommand| &c.values, |c: &mut ThresholdCommand| &mut c.values),
        ))
        .parameter(ParameterDescriptor::input(
            "threshold",
            FieldRef::new(
                |c: &ThresholdCommand| &c.threshold,
                |c: &mut ThresholdCommand| &mut c.threshold,
            ),
        ))
        .parameter(ParameterDescriptor::output(
            "count",
            FieldRef::new(|c: &ThresholdCommand| &c.count, |c: &mut ThresholdCommand| &mut c.count),
        ))
        .build()
}

/// 依倍率縮放數值；預覽可撤銷
#[derive(Debug, Default)]
pub struct ScaleCommand {
    pub values: Vec<f64>,
    pub factor: f64,
    pub precision: u32,
    pub scaled: Vec<f64>,
    before_preview: Option<Vec<f64>>,
}

impl ScaleCommand {
    fn compute(&self) -> Vec<f64> {
        let step = 10f64.powi(self.precision as i32);
        self.values
            .iter()
            .map(|v| (v * self.factor * step).round() / step)
            .collect()
    }
}

impl Command for ScaleCommand {
    fn run(&mut self) -> anyhow::Result<()> {
        if !self.factor.is_finite() {
            anyhow::bail!("factor must be finite");
        }
        self.scaled = self.compute();
        self.before_preview = None;
        Ok(())
    }
}

impl Previewable for ScaleCommand {
    fn preview(&mut self) {
        if self.before_preview.is_none() {
            self.before_preview = Some(self.scaled.clone());
        }
        self.scaled = self.compute();
    }

    fn cancel(&mut self) {
        if let Some(previous) = self.before_preview.take() {
            self.scaled = previous;
        }
    }
}

pub fn scale_info() -> Result<ModuleInfo<ScaleCommand>> {
    ModuleInfo::<ScaleCommand>::default_builder("scale")
        .description("Multiply values by a factor")
        .parameter(ParameterDescriptor::input(
            "values",
            FieldRef::new(|c: &ScaleCommand| &c.values, |c: &mut ScaleCommand| &mut c.values),
        ))
        .parameter(ParameterDescriptor::input(
            "factor",
            FieldRef::new(|c: &ScaleCommand| &c.factor, |c: &mut ScaleCommand| &mut c.factor),
        ))
        .parameter(
            ParameterDescriptor::input(
                "precision",
                FieldRef::new(|c: &ScaleCommand| &c.precision, |c: &mut ScaleCommand| &mut c.precision),
            )
            .persist(false),
        )
        .parameter(ParameterDescriptor::output(
            "scaled",
            FieldRef::new(|c: &ScaleCommand| &c.scaled, |c: &mut ScaleCommand| &mut c.scaled),
        ))
        .preset("precision", 2)
        .previewable()
        .build()
}

/// 倒數計數，到達 `stop_at` 時自行取消
#[derive(Debug, Default)]
pub struct CountdownCommand {
    pub from: u32,
    pub stop_at: Option<u32>,
    pub ticks: Vec<u32>,
    cancel_reason: Option<String>,
}

impl Command for CountdownCommand {
    fn run(&mut self) -> anyhow::Result<()> {
        self.ticks.clear();
        self.cancel_reason = None;
        for tick in (0..=self.from).rev() {
            if Some(tick) == self.stop_at {
                self.cancel_reason = Some(format!("stopped at {}", tick));
                break;
            }
            self.ticks.push(tick);
        }
        Ok(())
    }
}

impl Cancelable for CountdownCommand {
    fn is_canceled(&self) -> bool {
        self.cancel_reason.is_some()
    }

    fn cancel_reason(&self) -> Option<String> {
        self.cancel_reason.clone()
    }
}

pub fn countdown_info() -> Result<ModuleInfo<CountdownCommand>> {
    ModuleInfo::<CountdownCommand>::default_builder("countdown")
        .description("Count down to zero, optionally stopping early")
        .parameter(ParameterDescriptor::input(
            "from",
            FieldRef::new(|c: &CountdownCommand| &c.from, |c: &mut CountdownCommand| &mut c.from),
        ))
        .parameter(
            ParameterDescriptor::input(
                "stop_at",
                FieldRef::new(
                    |c: &CountdownCommand| &c.stop_at,
                    |c: &mut CountdownCommand| &mut c.stop_at,
                ),
            )
            .optional(),
        )
        .parameter(ParameterDescriptor::output(
            "ticks",
            FieldRef::new(|c: &CountdownCommand| &c.ticks, |c: &mut CountdownCommand| &mut c.ticks),
        ))
        .cancelable()
        .build()
}

/// 永遠失敗的命令，用來檢查錯誤攔截
#[derive(Debug, Default)]
pub struct FailCommand {
    pub message: String,
    pub panic: bool,
}

impl Command for FailCommand {
    fn run(&mut self) -> anyhow::Result<()> {
        let message = if self.message.is_empty() {
            "requested failure"
        } else {
            self.message.as_str()
        };
        if self.panic {
            panic!("{}", message);
        }
        Err(anyhow::anyhow!("{}", message))
    }
}

pub fn fail_info() -> Result<ModuleInfo<FailCommand>> {
    ModuleInfo::<FailCommand>::default_builder("fail")
        .description("Always fails, by error or by panic")
        .parameter(
            ParameterDescriptor::input(
                "message",
                FieldRef::new(|c: &FailCommand| &c.message, |c: &mut FailCommand| &mut c.message),
            )
            .optional(),
        )
        .parameter(
            ParameterDescriptor::input(
                "panic",
                FieldRef::new(|c: &FailCommand| &c.panic, |c: &mut FailCommand| &mut c.panic),
            )
            .optional(),
        )
        .build()
}

/// 註冊所有內建命令
pub fn builtin_registry() -> Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(threshold_info()?))?;
    registry.register(Arc::new(scale_info()?))?;
    registry.register(Arc::new(countdown_info()?))?;
    registry.register(Arc::new(fail_info()?))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::CommandModule;
    use crate::domain::ports::Module;
    use serde_json::json;

    #[test]
    fn test_builtin_registry_names() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.names(), vec!["countdown", "fail", "scale", "threshold"]);
    }

    #[test]
    fn test_scale_preview_then_cancel_restores_output() {
        let mut module = CommandModule::new(Arc::new(scale_info().unwrap())).unwrap();
        module.set_input("values", json!([1.0, 2.5])).unwrap();
        module.set_input("factor", json!(3.0)).unwrap();

        module.preview();
        assert_eq!(module.get_output("scaled").unwrap(), json!([3.0, 7.5]));

        module.cancel();
        assert_eq!(module.get_output("scaled").unwrap(), json!([]));
    }

    #[test]
    fn test_scale_precision_preset() {
        let module = CommandModule::new(Arc::new(scale_info().unwrap())).unwrap();
        assert_eq!(module.get_input("precision").unwrap(), json!(2));
        assert!(module.is_resolved("precision"));
    }

    #[test]
    fn test_countdown_cancels_itself() {
        let mut module = CommandModule::new(Arc::new(countdown_info().unwrap())).unwrap();
        module.set_input("from", json!(5)).unwrap();
        module.set_input("stop_at", json!(2)).unwrap();
        module.run();

        assert_eq!(module.get_output("ticks").unwrap(), json!([5, 4, 3]));
        assert!(module.is_canceled());
        assert_eq!(module.cancel_reason(), Some("stopped at 2".to_string()));
    }

    #[test]
    fn test_threshold_counts() {
        let mut command = ThresholdCommand {
            values: vec![1.0, 5.0, 9.0],
            threshold: 5.0,
            ..ThresholdCommand::default()
        };
        command.run().unwrap();
        assert_eq!(command.count, 2);
    }
}
