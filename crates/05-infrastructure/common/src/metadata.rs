//! 元数据定义
//!
//! 提供组件标识与声明元数据

use crate::lifecycle::{Lifetime, ScopeName};
use std::borrow::{Borrow, Cow};
use std::fmt;

/// 组件标识
///
/// 由组件契约派生的稳定字符串键，用于索引组件缓存。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey(Cow<'static, str>);

impl ComponentKey {
    /// 由静态字符串创建标识
    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    /// 创建新的标识
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    /// 标识字符串
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 获取简短名称（不包含路径前缀）
    pub fn short_name(&self) -> &str {
        self.0
            .rsplit(|c: char| c == '.' || c == ':')
            .find(|part| !part.is_empty())
            .unwrap_or(self.as_str())
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ComponentKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ComponentKey {
    fn from(key: &'static str) -> Self {
        Self::from_static(key)
    }
}

impl From<String> for ComponentKey {
    fn from(key: String) -> Self {
        Self(Cow::Owned(key))
    }
}

/// 组件描述符
///
/// 生成代码为每个组件契约声明一次，之后不再变化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// 组件标识
    pub key: ComponentKey,
    /// 父组件标识
    pub parent: Option<ComponentKey>,
    /// 组件生命周期
    pub lifetime: Lifetime,
    /// 组件描述
    pub description: Option<String>,
}

impl ComponentDescriptor {
    /// 创建新的组件描述符（无父组件、无作用域）
    pub fn new(key: impl Into<ComponentKey>) -> Self {
        Self {
            key: key.into(),
            parent: None,
            lifetime: Lifetime::Singleton,
            description: None,
        }
    }

    /// 设置父组件
    pub fn with_parent(mut self, parent: impl Into<ComponentKey>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// 设置作用域，空名称表示不声明作用域
    pub fn with_scope(mut self, scope: impl Into<ScopeName>) -> Self {
        self.lifetime = ScopeName::parse(Some(scope.into().as_str()))
            .map_or(Lifetime::Singleton, Lifetime::Scoped);
        self
    }

    /// 设置描述
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 声明的作用域名
    pub fn scope(&self) -> Option<&ScopeName> {
        self.lifetime.scope()
    }
}
