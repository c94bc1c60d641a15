use crate::utils::error::{ModuleError, Result};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 模組參數值（輸入、輸出、預設值皆以此表示）
pub type Value = serde_json::Value;

/// 參數方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
    Both,
}

impl Direction {
    pub fn is_input(self) -> bool {
        matches!(self, Direction::Input | Direction::Both)
    }

    pub fn is_output(self) -> bool {
        matches!(self, Direction::Output | Direction::Both)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
            Direction::Both => write!(f, "input/output"),
        }
    }
}

type Getter<C> = dyn Fn(&C) -> serde_json::Result<Value> + Send + Sync;
type Setter<C> = dyn Fn(&mut C, Value) -> serde_json::Result<()> + Send + Sync;

/// 指向命令某個欄位的存取器對（讀取 / 寫入）
///
/// 在建立 `ModuleInfo` 時由欄位投影產生，之後以名稱動態分派，
/// 不需要執行期反射。
pub struct FieldRef<C> {
    type_name: &'static str,
    get: Arc<Getter<C>>,
    set: Arc<Setter<C>>,
}

impl<C: 'static> FieldRef<C> {
    pub fn new<T, G, M>(get: G, get_mut: M) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
        G: Fn(&C) -> &T + Send + Sync + 'static,
        M: Fn(&mut C) -> &mut T + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            get: Arc::new(move |command: &C| serde_json::to_value(get(command))),
            set: Arc::new(move |command: &mut C, value: Value| {
                // 先完成轉換再寫入，失敗時欄位保持原值
                let typed: T = serde_json::from_value(value.clone())?;
                // 讀回必須與寫入相同：拒絕整數轉浮點、忽略多餘欄位等隱性轉換
                if serde_json::to_value(&typed)? != value {
                    return Err(serde_json::Error::custom("value would not read back unchanged"));
                }
                *get_mut(command) = typed;
                Ok(())
            }),
        }
    }
}

impl<C> FieldRef<C> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<C> Clone for FieldRef<C> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<C> fmt::Debug for FieldRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRef")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// 不含存取器的參數摘要，供只持有 `dyn Module` 的呼叫端查詢
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    pub direction: Direction,
    pub required: bool,
    pub persisted: bool,
    pub type_name: &'static str,
    pub description: Option<String>,
}

/// 單一具名參數的靜態描述
pub struct ParameterDescriptor<C> {
    name: String,
    direction: Direction,
    required: bool,
    persisted: bool,
    description: Option<String>,
    field: FieldRef<C>,
}

impl<C> ParameterDescriptor<C> {
    pub fn new(name: impl Into<String>, direction: Direction, field: FieldRef<C>) -> Self {
        Self {
            name: name.into(),
            direction,
            required: direction.is_input(),
            persisted: true,
            description: None,
            field,
        }
    }

    pub fn input(name: impl Into<String>, field: FieldRef<C>) -> Self {
        Self::new(name, Direction::Input, field)
    }

    pub fn output(name: impl Into<String>, field: FieldRef<C>) -> Self {
        Self::new(name, Direction::Output, field)
    }

    pub fn both(name: impl Into<String>, field: FieldRef<C>) -> Self {
        Self::new(name, Direction::Both, field)
    }

    /// 標記為非必要輸入
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn persist(mut self, persisted: bool) -> Self {
        self.persisted = persisted;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 只有輸入方向的參數才可能是必要的
    pub fn is_required(&self) -> bool {
        self.required && self.direction.is_input()
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn type_name(&self) -> &'static str {
        self.field.type_name()
    }

    pub fn field(&self) -> &FieldRef<C> {
        &self.field
    }

    pub fn summary(&self) -> ParameterSummary {
        ParameterSummary {
            name: self.name.clone(),
            direction: self.direction,
            required: self.is_required(),
            persisted: self.persisted,
            type_name: self.field.type_name(),
            description: self.description.clone(),
        }
    }

    pub(crate) fn read(&self, command: &C) -> Result<Value> {
        Ok((self.field.get)(command)?)
    }

    pub(crate) fn write(&self, command: &mut C, value: Value) -> Result<()> {
        let found = value_kind(&value);
        (self.field.set)(command, value).map_err(|_| ModuleError::TypeMismatchError {
            name: self.name.clone(),
            expected: self.field.type_name(),
            found: found.to_string(),
        })
    }
}

impl<C> Clone for ParameterDescriptor<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            direction: self.direction,
            required: self.required,
            persisted: self.persisted,
            description: self.description.clone(),
            field: self.field.clone(),
        }
    }
}

impl<C> fmt::Debug for ParameterDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("required", &self.required)
            .field("persisted", &self.persisted)
            .field("type_name", &self.field.type_name())
            .finish()
    }
}

/// 用於錯誤訊息的值種類名稱
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Sample {
        count: i64,
        label: String,
        ratio: f64,
    }

    fn count_field() -> FieldRef<Sample> {
        FieldRef::new(|s: &Sample| &s.count, |s: &mut Sample| &mut s.count)
    }

    #[test]
    fn test_direction_visibility() {
        assert!(Direction::Input.is_input());
        assert!(!Direction::Input.is_output());
        assert!(Direction::Output.is_output());
        assert!(!Direction::Output.is_input());
        assert!(Direction::Both.is_input() && Direction::Both.is_output());
    }

    #[test]
    fn test_descriptor_defaults() {
        let input = ParameterDescriptor::input("count", count_field());
        assert!(input.is_required());
        assert!(input.is_persisted());
        assert_eq!(input.type_name(), "i64");

        let output = ParameterDescriptor::output("count", count_field());
        assert!(!output.is_required());

        let optional = ParameterDescriptor::input("count", count_field()).optional();
        assert!(!optional.is_required());
    }

    #[test]
    fn test_read_and_write_through_field() {
        let descriptor = ParameterDescriptor::input("count", count_field());
        let mut sample = Sample::default();

        descriptor.write(&mut sample, json!(42)).unwrap();
        assert_eq!(sample.count, 42);
        assert_eq!(descriptor.read(&sample).unwrap(), json!(42));
    }

    #[test]
    fn test_write_rejects_incompatible_kinds() {
        let count = ParameterDescriptor::input("count", count_field());
        let label = ParameterDescriptor::input(
            "label",
            FieldRef::new(|s: &Sample| &s.label, |s: &mut Sample| &mut s.label),
        );
        let mut sample = Sample {
            count: 7,
            ..Sample::default()
        };

        let err = count.write(&mut sample, json!("seven")).unwrap_err();
        match err {
            ModuleError::TypeMismatchError { name, expected, found } => {
                assert_eq!(name, "count");
                assert_eq!(expected, "i64");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(count.write(&mut sample, json!(1.5)).is_err());
        assert!(label.write(&mut sample, json!(3)).is_err());
        // 失敗的寫入不應改變欄位
        assert_eq!(sample.count, 7);
    }

    #[test]
    fn test_float_field_rejects_integers() {
        let ratio = ParameterDescriptor::input(
            "ratio",
            FieldRef::new(|s: &Sample| &s.ratio, |s: &mut Sample| &mut s.ratio),
        );
        let mut sample = Sample {
            ratio: 0.25,
            ..Sample::default()
        };

        let err = ratio.write(&mut sample, json!(3)).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::TypeMismatchError { ref found, .. } if found == "integer"
        ));
        assert_eq!(sample.ratio, 0.25);

        ratio.write(&mut sample, json!(3.0)).unwrap();
        assert_eq!(ratio.read(&sample).unwrap(), json!(3.0));
    }

    #[test]
    fn test_summary_carries_descriptor_metadata() {
        let summary = ParameterDescriptor::input("count", count_field())
            .optional()
            .persist(false)
            .with_description("how many")
            .summary();

        assert_eq!(summary.name, "count");
        assert_eq!(summary.direction, Direction::Input);
        assert!(!summary.required);
        assert!(!summary.persisted);
        assert_eq!(summary.type_name, "i64");
        assert_eq!(summary.description.as_deref(), Some("how many"));
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(value_kind(&json!(null)), "null");
        assert_eq!(value_kind(&json!(1)), "integer");
        assert_eq!(value_kind(&json!(1.25)), "float");
        assert_eq!(value_kind(&json!([1, 2])), "array");
    }
}
