use crate::core::harness::ModuleRunner;
use crate::core::info::ModuleInfo;
use crate::core::module::CommandModule;
use crate::core::report::TracingReporter;
use crate::domain::model::{ParameterSummary, Value};
use crate::domain::ports::{Command, FaultReporter, Module};
use crate::utils::error::{ModuleError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// 型別抹除後的模組工廠，讓不同命令型別可放進同一個註冊表
pub trait ModuleFactory: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str>;

    fn parameters(&self) -> Vec<ParameterSummary>;

    fn create_module(&self, reporter: Arc<dyn FaultReporter>) -> Result<Box<dyn Module>>;
}

impl<C: Command> ModuleFactory for Arc<ModuleInfo<C>> {
    fn name(&self) -> &str {
        ModuleInfo::name(self)
    }

    fn description(&self) -> Option<&str> {
        ModuleInfo::description(self)
    }

    fn parameters(&self) -> Vec<ParameterSummary> {
        self.summaries()
    }

    fn create_module(&self, reporter: Arc<dyn FaultReporter>) -> Result<Box<dyn Module>> {
        let module = CommandModule::new(Arc::clone(self))?.with_reporter(reporter);
        Ok(Box::new(module))
    }
}

/// 以名稱查找模組的註冊表
pub struct ModuleRegistry {
    factories: HashMap<String, Arc<dyn ModuleFactory>>,
    reporter: Arc<dyn FaultReporter>,
    runner: ModuleRunner,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::with_reporter(Arc::new(TracingReporter))
    }

    pub fn with_reporter(reporter: Arc<dyn FaultReporter>) -> Self {
        Self {
            factories: HashMap::new(),
            runner: ModuleRunner::new().with_reporter(Arc::clone(&reporter)),
            reporter,
        }
    }

    pub fn register<C: Command>(&mut self, info: Arc<ModuleInfo<C>>) -> Result<()> {
        self.register_factory(Arc::new(info))
    }

    pub fn register_factory(&mut self, factory: Arc<dyn ModuleFactory>) -> Result<()> {
        let name = factory.name().to_string();
        if self.factories.contains_key(&name) {
            return Err(ModuleError::DuplicateModuleError { name });
        }
        tracing::debug!("📦 Registered module: {}", name);
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ModuleFactory>> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 已註冊名稱，依字母排序
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn reporter(&self) -> Arc<dyn FaultReporter> {
        Arc::clone(&self.reporter)
    }

    pub fn runner(&self) -> &ModuleRunner {
        &self.runner
    }

    pub fn create_module(&self, name: &str) -> Result<Box<dyn Module>> {
        self.create_module_with_reporter(name, self.reporter())
    }

    pub fn create_module_with_reporter(
        &self,
        name: &str,
        reporter: Arc<dyn FaultReporter>,
    ) -> Result<Box<dyn Module>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ModuleError::UnknownModuleError {
                name: name.to_string(),
            })?;
        factory.create_module(reporter)
    }

    /// 建立模組、設定輸入並執行，回傳已執行的模組供讀取輸出
    pub fn run(&self, name: &str, inputs: HashMap<String, Value>) -> Result<Box<dyn Module>> {
        let mut module = self.create_module(name)?;
        module.set_inputs(inputs)?;
        self.runner.execute(module.as_mut())?;
        Ok(module)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
