//! 组件生命周期定义

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// 作用域名称
///
/// 命名的生命周期边界，通常对应外部的某个界面或会话。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeName(Arc<str>);

impl ScopeName {
    /// 创建作用域名称
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// 名称字符串
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 空名称视为未声明作用域
    pub fn parse(name: Option<&str>) -> Option<Self> {
        name.filter(|n| !n.is_empty()).map(Self::new)
    }
}

impl fmt::Display for ScopeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ScopeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScopeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ScopeName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// 组件生命周期类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// 单例模式 - 缓存到显式移除为止
    #[default]
    Singleton,
    /// 作用域模式 - 作用域结束时从缓存中驱逐
    Scoped(ScopeName),
}

impl Lifetime {
    /// 声明的作用域
    pub fn scope(&self) -> Option<&ScopeName> {
        match self {
            Self::Singleton => None,
            Self::Scoped(name) => Some(name),
        }
    }
}
