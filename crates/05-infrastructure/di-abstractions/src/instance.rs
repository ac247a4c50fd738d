//! 组件实例
//!
//! 运行时核心为每个构建出的组件包装的基础形态：父组件引用、子组件列表、
//! 声明的作用域以及最近一次提供的运行时依赖。

use crate::runtime::RuntimeDependencies;
use chrono::{DateTime, Utc};
use infrastructure_common::{ComponentKey, ScopeName};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// 组件实例唯一ID，按创建顺序递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// 分配新的实例ID
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 组件实例
///
/// 子组件持有父组件的强引用；父组件只保留子组件的弱引用列表用于观测，
/// 子组件的生命周期由作用域驱动，而不是由父组件驱动。
pub struct ComponentInstance {
    id: InstanceId,
    key: ComponentKey,
    scope: Option<ScopeName>,
    parent: Option<Arc<ComponentInstance>>,
    children: Mutex<Vec<Weak<ComponentInstance>>>,
    runtime: RwLock<Arc<RuntimeDependencies>>,
    value: Arc<dyn Any + Send + Sync>,
    created_at: DateTime<Utc>,
}

impl ComponentInstance {
    /// 包装生成构造器产出的实例
    pub fn new(
        key: ComponentKey,
        scope: Option<ScopeName>,
        parent: Option<Arc<ComponentInstance>>,
        value: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            id: InstanceId::next(),
            key,
            scope,
            parent,
            children: Mutex::new(Vec::new()),
            runtime: RwLock::new(Arc::new(RuntimeDependencies::new())),
            value,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    /// 声明的作用域
    pub fn scope(&self) -> Option<&ScopeName> {
        self.scope.as_ref()
    }

    /// 已解析的父组件实例
    pub fn parent(&self) -> Option<&Arc<ComponentInstance>> {
        self.parent.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 生成构造器产出的原始实例
    pub fn value(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.value
    }

    /// 将实例转换为具体类型
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// 记录子组件（弱引用）
    ///
    /// `prune` 为真时顺带清理已经释放的子组件引用。
    pub fn add_child(&self, child: &Arc<ComponentInstance>, prune: bool) {
        let mut children = self.children.lock();
        if prune {
            children.retain(|c| c.strong_count() > 0);
        }
        children.push(Arc::downgrade(child));
    }

    /// 仍然存活的子组件
    pub fn children(&self) -> Vec<Arc<ComponentInstance>> {
        self.children.lock().iter().filter_map(Weak::upgrade).collect()
    }

    /// 子组件引用数（包括已释放的）
    pub fn child_slots(&self) -> usize {
        self.children.lock().len()
    }

    /// 最近一次提供的运行时依赖
    pub fn runtime_dependencies(&self) -> Arc<RuntimeDependencies> {
        Arc::clone(&self.runtime.read())
    }

    /// 整体替换运行时依赖，不做合并
    pub fn replace_runtime_dependencies(&self, dependencies: Arc<RuntimeDependencies>) {
        *self.runtime.write() = dependencies;
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("parent", &self.parent.as_ref().map(|p| p.key()))
            .field("children", &self.child_slots())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
