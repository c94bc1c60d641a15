use crate::core::harness::contain_panic;
use crate::core::info::ModuleInfo;
use crate::core::report::TracingReporter;
use crate::domain::model::{Direction, ParameterSummary, Value};
use crate::domain::ports::{Command, FaultReporter, Module};
use crate::utils::error::{ModuleError, Result};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// 將一個命令實例綁定到其 ModuleInfo 的模組
pub struct CommandModule<C> {
    info: Arc<ModuleInfo<C>>,
    command: C,
    resolved: HashSet<String>,
    reporter: Arc<dyn FaultReporter>,
}

impl<C: Command> CommandModule<C> {
    /// 由 ModuleInfo 建立命令實例並套用預設值
    pub fn new(info: Arc<ModuleInfo<C>>) -> Result<Self> {
        let command = info.create_instance()?;
        Self::with_command(info, command)
    }

    /// 包裝呼叫端提供的命令實例，預設值仍會套用
    pub fn with_command(info: Arc<ModuleInfo<C>>, command: C) -> Result<Self> {
        let mut module = Self {
            info,
            command,
            resolved: HashSet::new(),
            reporter: Arc::new(TracingReporter),
        };
        module.assign_presets()?;
        Ok(module)
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FaultReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut C {
        &mut self.command
    }

    pub fn info(&self) -> &Arc<ModuleInfo<C>> {
        &self.info
    }

    pub fn into_command(self) -> C {
        self.command
    }

    fn assign_presets(&mut self) -> Result<()> {
        let info = Arc::clone(&self.info);
        for (name, value) in info.presets() {
            self.set_input(name, value.clone())?;
            self.set_resolved(name, true)?;
        }
        Ok(())
    }

    fn collect(&self, direction: Direction) -> Result<HashMap<String, Value>> {
        let parameters = self.info.parameters().iter().filter(|p| match direction {
            Direction::Input => p.direction().is_input(),
            Direction::Output => p.direction().is_output(),
            Direction::Both => true,
        });

        let mut values = HashMap::new();
        for parameter in parameters {
            values.insert(parameter.name().to_string(), parameter.read(&self.command)?);
        }
        Ok(values)
    }
}

impl<C: Command> Module for CommandModule<C> {
    fn info_name(&self) -> &str {
        self.info.name()
    }

    fn delegate_object(&self) -> &dyn Any {
        &self.command
    }

    fn parameters(&self) -> Vec<ParameterSummary> {
        self.info.summaries()
    }

    fn preview(&mut self) {
        let capabilities = *self.info.capabilities();
        match capabilities.previewable(&mut self.command) {
            Some(previewable) => previewable.preview(),
            None => tracing::trace!("{} is not previewable", self.info.name()),
        }
    }

    fn cancel(&mut self) {
        let capabilities = *self.info.capabilities();
        if let Some(previewable) = capabilities.previewable(&mut self.command) {
            previewable.cancel();
        }
    }

    fn get_input(&self, name: &str) -> Result<Value> {
        self.info.get_input(name)?.read(&self.command)
    }

    fn set_input(&mut self, name: &str, value: Value) -> Result<()> {
        tracing::debug!("Setting input {}.{} = {}", self.info.name(), name, value);
        self.info.get_input(name)?.write(&mut self.command, value)
    }

    fn get_output(&self, name: &str) -> Result<Value> {
        self.info.get_output(name)?.read(&self.command)
    }

    fn set_output(&mut self, name: &str, value: Value) -> Result<()> {
        self.info.get_output(name)?.write(&mut self.command, value)
    }

    fn inputs(&self) -> Result<HashMap<String, Value>> {
        self.collect(Direction::Input)
    }

    fn outputs(&self) -> Result<HashMap<String, Value>> {
        self.collect(Direction::Output)
    }

    fn is_resolved(&self, name: &str) -> bool {
        self.resolved.contains(name)
    }

    fn set_resolved(&mut self, name: &str, resolved: bool) -> Result<()> {
        // 只接受宣告為輸入的名稱
        let descriptor = self.info.get_input(name)?;
        if resolved {
            self.resolved.insert(descriptor.name().to_string());
        } else {
            self.resolved.remove(name);
        }
        Ok(())
    }

    fn unresolved_required(&self) -> Vec<String> {
        self.info
            .inputs()
            .filter(|p| p.is_required() && !self.resolved.contains(p.name()))
            .map(|p| p.name().to_string())
            .collect()
    }

    fn run(&mut self) {
        let command = &mut self.command;
        let fault = match contain_panic(move || command.run()) {
            Ok(Ok(())) => return,
            Ok(Err(err)) => format!("{:#}", err),
            Err(panic_message) => format!("panic: {}", panic_message),
        };

        self.reporter.report(&ModuleError::CommandFault {
            command: self.info.name().to_string(),
            message: fault,
        });
    }

    fn is_canceled(&self) -> bool {
        self.info
            .capabilities()
            .cancelable(&self.command)
            .is_some_and(|cancelable| cancelable.is_canceled())
    }

    fn cancel_reason(&self) -> Option<String> {
        self.info
            .capabilities()
            .cancelable(&self.command)
            .and_then(|cancelable| cancelable.cancel_reason())
    }
}

impl<C> fmt::Display for CommandModule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", std::any::type_name::<C>())
    }
}

impl<C> fmt::Debug for CommandModule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandModule")
            .field("info", &self.info.name())
            .field("command", &std::any::type_name::<C>())
            .field("resolved", &self.resolved)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::RecordingReporter;
    use crate::domain::model::{FieldRef, ParameterDescriptor};
    use crate::domain::ports::{Cancelable, Previewable};
    use serde_json::json;

    #[derive(Default)]
    struct Brighten {
        amount: i64,
        pixels: Vec<i64>,
        previewed: Option<Vec<i64>>,
        canceled: bool,
    }

    impl Command for Brighten {
        fn run(&mut self) -> anyhow::Result<()> {
            if self.amount < 0 {
                anyhow::bail!("amount must not be negative");
            }
            for p in &mut self.pixels {
                *p += self.amount;
            }
            Ok(())
        }
    }

    impl Previewable for Brighten {
        fn preview(&mut self) {
            if self.previewed.is_none() {
                self.previewed = Some(self.pixels.clone());
            }
            self.pixels = self.pixels.iter().map(|p| p + self.amount).collect();
        }

        fn cancel(&mut self) {
            if let Some(original) = self.previewed.take() {
                self.pixels = original;
            }
            self.canceled = true;
        }
    }

    impl Cancelable for Brighten {
        fn is_canceled(&self) -> bool {
            self.canceled
        }

        fn cancel_reason(&self) -> Option<String> {
            self.canceled.then(|| "preview discarded".to_string())
        }
    }

    fn builder() -> crate::core::info::ModuleInfoBuilder<Brighten> {
        ModuleInfo::<Brighten>::default_builder("brighten")
            .parameter(ParameterDescriptor::input(
                "amount",
                FieldRef::new(|b: &Brighten| &b.amount, |b: &mut Brighten| &mut b.amount),
            ))
            .parameter(ParameterDescriptor::both(
                "pixels",
                FieldRef::new(|b: &Brighten| &b.pixels, |b: &mut Brighten| &mut b.pixels),
            ))
    }

    #[test]
    fn test_presets_are_applied_and_resolved() {
        let info = Arc::new(builder().preset("amount", 10).build().unwrap());
        let module = CommandModule::new(info).unwrap();

        assert_eq!(module.get_input("amount").unwrap(), json!(10));
        assert!(module.is_resolved("amount"));
        assert!(!module.is_resolved("pixels"));
        assert_eq!(module.unresolved_required(), vec!["pixels".to_string()]);
    }

    #[test]
    fn test_presets_apply_to_supplied_command() {
        let info = Arc::new(builder().preset("amount", 3).build().unwrap());
        let command = Brighten {
            amount: 99,
            pixels: vec![1],
            ..Brighten::default()
        };
        let module = CommandModule::with_command(info, command).unwrap();
        assert_eq!(module.command().amount, 3);
        assert_eq!(module.command().pixels, vec![1]);
    }

    #[test]
    fn test_preset_type_mismatch_fails_construction() {
        let info = Arc::new(builder().preset("amount", "lots").build().unwrap());
        let err = CommandModule::new(info).unwrap_err();
        assert!(matches!(err, ModuleError::TypeMismatchError { .. }));
    }

    #[test]
    fn test_set_resolved_rejects_outputs_and_unknown_names() {
        let info = Arc::new(builder().build().unwrap());
        let mut module = CommandModule::new(info).unwrap();

        assert!(module.set_resolved("nope", true).is_err());
        module.set_resolved("amount", true).unwrap();
        assert!(module.is_resolved("amount"));
        module.set_resolved("amount", false).unwrap();
        assert!(!module.is_resolved("amount"));
    }

    #[test]
    fn test_preview_and_cancel_delegate_when_registered() {
        let info = Arc::new(builder().previewable().cancelable().build().unwrap());
        let mut module = CommandModule::new(info).unwrap();
        module.set_input("amount", json!(5)).unwrap();
        module.set_input("pixels", json!([1, 2])).unwrap();

        module.preview();
        assert_eq!(module.get_output("pixels").unwrap(), json!([6, 7]));
        assert!(!module.is_canceled());

        module.cancel();
        assert_eq!(module.get_output("pixels").unwrap(), json!([1, 2]));
        assert!(module.is_canceled());
        assert_eq!(module.cancel_reason(), Some("preview discarded".to_string()));
    }

    #[test]
    fn test_unregistered_capabilities_are_no_ops() {
        // 命令有實作 Previewable，但 ModuleInfo 未登記，模組不得呼叫它
        let info = Arc::new(builder().build().unwrap());
        let mut module = CommandModule::new(info).unwrap();
        module.set_input("amount", json!(5)).unwrap();
        module.set_input("pixels", json!([1])).unwrap();

        module.preview();
        module.cancel();
        assert_eq!(module.get_output("pixels").unwrap(), json!([1]));
        assert!(!module.is_canceled());
        assert_eq!(module.cancel_reason(), None);
    }

    #[test]
    fn test_run_contains_command_errors() {
        let recorder = Arc::new(RecordingReporter::default());
        let info = Arc::new(builder().build().unwrap());
        let mut module = CommandModule::new(info)
            .unwrap()
            .with_reporter(recorder.clone());

        module.set_input("amount", json!(-1)).unwrap();
        module.run();

        let faults = recorder.faults();
        assert_eq!(faults.len(), 1);
        assert!(faults[0].contains("amount must not be negative"));
    }

    #[test]
    fn test_inputs_and_outputs_snapshots() {
        let info = Arc::new(builder().build().unwrap());
        let mut module = CommandModule::new(info).unwrap();
        module.set_input("amount", json!(2)).unwrap();
        module.set_input("pixels", json!([4])).unwrap();
        module.run();

        let inputs = module.inputs().unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs["amount"], json!(2));

        let outputs = module.outputs().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs["pixels"], json!([6]));
    }

    #[test]
    fn test_set_inputs_restores_earlier_writes_on_mismatch() {
        let info = Arc::new(builder().build().unwrap());
        let mut module = CommandModule::new(info).unwrap();
        module.set_input("pixels", json!([9])).unwrap();

        // "amount" 排在 "pixels" 之前，會先寫入再被還原
        let values = HashMap::from([
            ("amount".to_string(), json!(4)),
            ("pixels".to_string(), json!("not pixels")),
        ]);
        let err = module.set_inputs(values).unwrap_err();

        assert!(matches!(err, ModuleError::TypeMismatchError { ref name, .. } if name == "pixels"));
        assert_eq!(module.get_input("amount").unwrap(), json!(0));
        assert_eq!(module.get_input("pixels").unwrap(), json!([9]));
        assert!(!module.is_resolved("amount"));
    }

    #[test]
    fn test_parameters_are_visible_through_trait_object() {
        let info = Arc::new(builder().build().unwrap());
        let module: Box<dyn Module> = Box::new(CommandModule::new(info).unwrap());

        let parameters = module.parameters();
        let names: Vec<&str> = parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["amount", "pixels"]);
        assert_eq!(parameters[1].direction, Direction::Both);
        assert_eq!(parameters[1].type_name, std::any::type_name::<Vec<i64>>());
    }

    #[test]
    fn test_display_is_command_type_name() {
        let info = Arc::new(builder().build().unwrap());
        let module = CommandModule::new(info).unwrap();
        assert!(module.to_string().ends_with("Brighten"));
        assert!(module.delegate_object().downcast_ref::<Brighten>().is_some());
    }
}
