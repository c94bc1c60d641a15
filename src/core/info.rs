use crate::core::harness::contain_panic;
use crate::domain::model::{Direction, ParameterDescriptor, ParameterSummary, Value};
use crate::domain::ports::{Cancelable, Command, Previewable};
use crate::utils::error::{ModuleError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

type Factory<C> = dyn Fn() -> anyhow::Result<C> + Send + Sync;

type PreviewProbe<C> = fn(&mut C) -> &mut dyn Previewable;
type CancelableProbe<C> = fn(&C) -> &dyn Cancelable;

fn as_previewable<C: Previewable>(command: &mut C) -> &mut dyn Previewable {
    command
}

fn as_cancelable<C: Cancelable>(command: &C) -> &dyn Cancelable {
    command
}

/// 命令型別實作了哪些可選能力
///
/// 探針在建立 ModuleInfo 時登記，使用時才檢查；未登記即視為不支援。
pub struct Capabilities<C> {
    preview: Option<PreviewProbe<C>>,
    cancelable: Option<CancelableProbe<C>>,
}

impl<C> Capabilities<C> {
    pub fn none() -> Self {
        Self {
            preview: None,
            cancelable: None,
        }
    }

    pub fn is_previewable(&self) -> bool {
        self.preview.is_some()
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable.is_some()
    }

    pub fn previewable<'a>(&self, command: &'a mut C) -> Option<&'a mut dyn Previewable> {
        self.preview.map(|probe| probe(command))
    }

    pub fn cancelable<'a>(&self, command: &'a C) -> Option<&'a dyn Cancelable> {
        self.cancelable.map(|probe| probe(command))
    }
}

impl<C> Clone for Capabilities<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Capabilities<C> {}

/// 命令型別的中繼資料與工廠，建立後不可變，由所有模組共享
pub struct ModuleInfo<C> {
    name: String,
    description: Option<String>,
    parameters: Vec<ParameterDescriptor<C>>,
    factory: Arc<Factory<C>>,
    presets: HashMap<String, Value>,
    capabilities: Capabilities<C>,
}

impl<C: Command> ModuleInfo<C> {
    pub fn builder<F>(name: impl Into<String>, factory: F) -> ModuleInfoBuilder<C>
    where
        F: Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    {
        ModuleInfoBuilder::new(name, factory)
    }

    /// 以 `Default` 建構命令的便利版本
    pub fn default_builder(name: impl Into<String>) -> ModuleInfoBuilder<C>
    where
        C: Default,
    {
        ModuleInfoBuilder::new(name, || Ok(C::default()))
    }

    /// 建立新的命令實例；工廠回傳錯誤或 panic 都轉為 `InstantiationError`
    pub fn create_instance(&self) -> Result<C> {
        let factory = Arc::clone(&self.factory);
        match contain_panic(move || factory()) {
            Ok(Ok(command)) => Ok(command),
            Ok(Err(source)) => Err(ModuleError::InstantiationError {
                command: self.name.clone(),
                source,
            }),
            Err(panic_message) => Err(ModuleError::InstantiationError {
                command: self.name.clone(),
                source: anyhow::anyhow!("factory panicked: {}", panic_message),
            }),
        }
    }
}

impl<C> ModuleInfo<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// 所有參數，依宣告順序
    pub fn parameters(&self) -> &[ParameterDescriptor<C>] {
        &self.parameters
    }

    pub fn summaries(&self) -> Vec<ParameterSummary> {
        self.parameters.iter().map(ParameterDescriptor::summary).collect()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &ParameterDescriptor<C>> {
        self.parameters.iter().filter(|p| p.direction().is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ParameterDescriptor<C>> {
        self.parameters.iter().filter(|p| p.direction().is_output())
    }

    pub fn get_input(&self, name: &str) -> Result<&ParameterDescriptor<C>> {
        self.inputs()
            .find(|p| p.name() == name)
            .ok_or_else(|| ModuleError::UnknownParameterError {
                name: name.to_string(),
                direction: Direction::Input,
            })
    }

    pub fn get_output(&self, name: &str) -> Result<&ParameterDescriptor<C>> {
        self.outputs()
            .find(|p| p.name() == name)
            .ok_or_else(|| ModuleError::UnknownParameterError {
                name: name.to_string(),
                direction: Direction::Output,
            })
    }

    pub fn presets(&self) -> &HashMap<String, Value> {
        &self.presets
    }

    pub fn capabilities(&self) -> &Capabilities<C> {
        &self.capabilities
    }

    pub fn is_previewable(&self) -> bool {
        self.capabilities.is_previewable()
    }

    pub fn is_cancelable(&self) -> bool {
        self.capabilities.is_cancelable()
    }
}

impl<C> fmt::Debug for ModuleInfo<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInfo")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("presets", &self.presets)
            .field("previewable", &self.is_previewable())
            .field("cancelable", &self.is_cancelable())
            .finish()
    }
}

pub struct ModuleInfoBuilder<C> {
    name: String,
    description: Option<String>,
    parameters: Vec<ParameterDescriptor<C>>,
    factory: Arc<Factory<C>>,
    presets: HashMap<String, Value>,
    capabilities: Capabilities<C>,
}

impl<C: Command> ModuleInfoBuilder<C> {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            factory: Arc::new(factory),
            presets: HashMap::new(),
            capabilities: Capabilities::none(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parameter(mut self, descriptor: ParameterDescriptor<C>) -> Self {
        self.parameters.push(descriptor);
        self
    }

    pub fn preset(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.presets.insert(name.into(), value.into());
        self
    }

    pub fn previewable(mut self) -> Self
    where
        C: Previewable,
    {
        self.capabilities.preview = Some(as_previewable::<C> as PreviewProbe<C>);
        self
    }

    pub fn cancelable(mut self) -> Self
    where
        C: Cancelable,
    {
        self.capabilities.cancelable = Some(as_cancelable::<C> as CancelableProbe<C>);
        self
    }

    /// 檢查參數名稱唯一、預設值只指向輸入參數
    pub fn build(self) -> Result<ModuleInfo<C>> {
        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if !seen.insert(parameter.name()) {
                return Err(ModuleError::DuplicateParameterError {
                    module: self.name.clone(),
                    name: parameter.name().to_string(),
                });
            }
        }

        for name in self.presets.keys() {
            let is_input = self
                .parameters
                .iter()
                .any(|p| p.name() == name && p.direction().is_input());
            if !is_input {
                return Err(ModuleError::UnknownParameterError {
                    name: name.clone(),
                    direction: Direction::Input,
                });
            }
        }

        tracing::debug!(
            "Built module info '{}' with {} parameters and {} presets",
            self.name,
            self.parameters.len(),
            self.presets.len()
        );

        Ok(ModuleInfo {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            factory: self.factory,
            presets: self.presets,
            capabilities: self.capabilities,
        })
    }
}
