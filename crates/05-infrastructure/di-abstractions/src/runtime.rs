//! 运行时依赖
//!
//! 生成代码无法静态提供的构造参数（例如导航参数）在请求组件时按次传入。
//! 每次调用都会得到一个新的不可变映射，不会在原地修改共享实例的状态。

use infrastructure_common::{DependencyError, DependencyResult};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 运行时依赖限定符，`None` 表示未限定的默认槽位
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Qualifier(Option<String>);

impl Qualifier {
    /// 未限定的默认槽位
    pub const fn unqualified() -> Self {
        Self(None)
    }

    /// 命名限定符
    pub fn named(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    /// 限定符名称
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(name) => f.write_str(name),
            None => f.write_str("<unqualified>"),
        }
    }
}

impl From<&str> for Qualifier {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for Qualifier {
    fn from(name: String) -> Self {
        Self(Some(name))
    }
}

impl From<Option<&str>> for Qualifier {
    fn from(name: Option<&str>) -> Self {
        Self(name.map(str::to_owned))
    }
}

/// 运行时依赖映射
#[derive(Clone, Default)]
pub struct RuntimeDependencies {
    values: HashMap<Qualifier, Arc<dyn Any + Send + Sync>>,
}

impl RuntimeDependencies {
    /// 创建空映射
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入依赖，同一限定符后写覆盖先写
    pub fn insert<T>(&mut self, qualifier: impl Into<Qualifier>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.values.insert(qualifier.into(), Arc::new(value));
    }

    /// 构建器风格的插入
    pub fn with<T>(mut self, qualifier: impl Into<Qualifier>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.insert(qualifier, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, qualifier: impl Into<Qualifier>) -> bool {
        self.values.contains_key(&qualifier.into())
    }

    /// 所有限定符（已排序）
    pub fn qualifiers(&self) -> Vec<Qualifier> {
        let mut qualifiers: Vec<Qualifier> = self.values.keys().cloned().collect();
        qualifiers.sort();
        qualifiers
    }

    /// 按限定符取出指定类型的依赖
    pub fn get<T>(&self, qualifier: impl Into<Qualifier>) -> DependencyResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let qualifier = qualifier.into();
        let value = self
            .values
            .get(&qualifier)
            .ok_or_else(|| DependencyError::RuntimeDependencyMissing {
                qualifier: qualifier.to_string(),
            })?;

        Arc::clone(value)
            .downcast::<T>()
            .map_err(|_| DependencyError::RuntimeDependencyTypeMismatch {
                qualifier: qualifier.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}

impl fmt::Debug for RuntimeDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeDependencies")
            .field("qualifiers", &self.qualifiers())
            .finish()
    }
}

/// 由 `限定符 => 值` 对构建 [`RuntimeDependencies`]
///
/// ```
/// use di_abstractions::runtime_dependencies;
///
/// let deps = runtime_dependencies!["user_id" => 42_u64, None => String::from("guest")];
/// assert_eq!(*deps.get::<u64>("user_id").unwrap(), 42);
/// ```
#[macro_export]
macro_rules! runtime_dependencies {
    () => {
        $crate::RuntimeDependencies::new()
    };
    ($($qualifier:expr => $value:expr),+ $(,)?) => {{
        let mut deps = $crate::RuntimeDependencies::new();
        $(deps.insert($qualifier, $value);)+
        deps
    }};
}
