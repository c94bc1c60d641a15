use crate::domain::model::{ParameterSummary, Value};
use crate::utils::error::{ModuleError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// 由外掛作者提供的命令
///
/// 執行失敗可以回傳錯誤，也可能直接 panic；兩者都由模組攔截並回報。
pub trait Command: Send + 'static {
    fn run(&mut self) -> anyhow::Result<()>;
}

/// 可預覽能力：`preview` 產生暫時結果，`cancel` 撤銷預覽造成的變更
pub trait Previewable {
    fn preview(&mut self);
    fn cancel(&mut self);
}

/// 可取消狀態能力
pub trait Cancelable {
    fn is_canceled(&self) -> bool;
    fn cancel_reason(&self) -> Option<String>;
}

/// 執行期錯誤的回報對象
pub trait FaultReporter: Send + Sync {
    fn report(&self, fault: &ModuleError);
}

/// 統一的模組介面，呼叫端只透過它存取命令
pub trait Module: Send + fmt::Display {
    /// 所屬 ModuleInfo 的註冊名稱
    fn info_name(&self) -> &str;

    /// 底層命令實例
    fn delegate_object(&self) -> &dyn Any;

    /// 所有參數的摘要，依宣告順序
    fn parameters(&self) -> Vec<ParameterSummary>;

    fn preview(&mut self);

    fn cancel(&mut self);

    fn get_input(&self, name: &str) -> Result<Value>;

    fn set_input(&mut self, name: &str, value: Value) -> Result<()>;

    fn get_output(&self, name: &str) -> Result<Value>;

    fn set_output(&mut self, name: &str, value: Value) -> Result<()>;

    fn inputs(&self) -> Result<HashMap<String, Value>>;

    fn outputs(&self) -> Result<HashMap<String, Value>>;

    /// 批次設定輸入並標記為已解析
    ///
    /// 全有或全無：任一名稱未知時不寫入任何值；寫入中途型別不符時，
    /// 已寫入的輸入會還原成原值，解析狀態也不變。
    fn set_inputs(&mut self, values: HashMap<String, Value>) -> Result<()> {
        let mut ordered: Vec<(String, Value)> = values.into_iter().collect();
        ordered.sort_by(|(a, _), (b, _)| a.cmp(b));

        let previous = ordered
            .iter()
            .map(|(name, _)| self.get_input(name))
            .collect::<Result<Vec<_>>>()?;

        for (index, (name, value)) in ordered.iter().enumerate() {
            if let Err(err) = self.set_input(name, value.clone()) {
                for ((name, _), original) in ordered.iter().zip(&previous).take(index) {
                    if let Err(restore) = self.set_input(name, original.clone()) {
                        tracing::warn!("⚠️ Could not restore input {}: {}", name, restore);
                    }
                }
                return Err(err);
            }
        }

        for (name, _) in &ordered {
            self.set_resolved(name, true)?;
        }
        Ok(())
    }

    fn is_resolved(&self, name: &str) -> bool;

    fn set_resolved(&mut self, name: &str, resolved: bool) -> Result<()>;

    /// 尚未解析的必要輸入，依宣告順序
    fn unresolved_required(&self) -> Vec<String>;

    /// 執行命令；命令本身的失敗不會傳出
    fn run(&mut self);

    fn is_canceled(&self) -> bool;

    fn cancel_reason(&self) -> Option<String>;
}
