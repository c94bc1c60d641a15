use crate::core::report::TracingReporter;
use crate::domain::ports::{FaultReporter, Module};
use crate::utils::error::{ModuleError, Result};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};
use std::time::Instant;

thread_local! {
    static CONTAINMENT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

static QUIET_HOOK: Once = Once::new();

/// 在原本的 panic hook 前加一層：被攔截的 panic 只寫入 debug 日誌，
/// 其他 panic 照常交給原 hook
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if is_containing() {
                tracing::debug!("💥 Contained panic: {}", info);
            } else {
                previous(info);
            }
        }));
    });
}

/// 目前執行緒是否位於 `contain_panic` 之內
pub(crate) fn is_containing() -> bool {
    CONTAINMENT_DEPTH.with(|depth| depth.get() > 0)
}

/// 在可恢復的邊界內執行，panic 轉為訊息字串
pub(crate) fn contain_panic<T, F>(func: F) -> std::result::Result<T, String>
where
    F: FnOnce() -> T,
{
    install_quiet_hook();
    CONTAINMENT_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let outcome = panic::catch_unwind(AssertUnwindSafe(func));
    CONTAINMENT_DEPTH.with(|depth| depth.set(depth.get() - 1));
    outcome.map_err(|payload| panic_message(payload.as_ref()))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// 模組執行器：檢查必要輸入後執行一次，不重試
pub struct ModuleRunner {
    reporter: Arc<dyn FaultReporter>,
    enforce_resolution: bool,
}

impl ModuleRunner {
    pub fn new() -> Self {
        Self {
            reporter: Arc::new(TracingReporter),
            enforce_resolution: true,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FaultReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// 關閉時即使必要輸入未解析也照常執行
    pub fn enforce_resolution(mut self, enforce: bool) -> Self {
        self.enforce_resolution = enforce;
        self
    }

    pub fn check_resolved(module: &dyn Module) -> Result<()> {
        let names = module.unresolved_required();
        if names.is_empty() {
            Ok(())
        } else {
            Err(ModuleError::NotResolvedError { names })
        }
    }

    /// 執行模組。只有前置檢查失敗才會回傳錯誤，命令本身的失敗由回報器處理。
    pub fn execute(&self, module: &mut dyn Module) -> Result<()> {
        if self.enforce_resolution {
            Self::check_resolved(module)?;
        }

        let label = module.to_string();
        tracing::debug!("▶️ Running module: {}", label);
        let start = Instant::now();

        // Module::run 自己會攔截命令錯誤；這裡只接住從模組實作本身逃出的 panic
        if let Err(message) = contain_panic(|| module.run()) {
            self.reporter.report(&ModuleError::CommandFault {
                command: label.clone(),
                message: format!("panic: {}", message),
            });
        }

        tracing::debug!("⏹️ Module finished: {} ({:?})", label, start.elapsed());
        Ok(())
    }
}

impl Default for ModuleRunner {
    fn default() -> Self {
        Self::new()
    }
}
