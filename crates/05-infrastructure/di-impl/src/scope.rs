//! 作用域观察者注册表
//!
//! 按名称缓存作用域；作用域结束时，把订阅它的组件逐个从组件缓存中驱逐。

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use di_abstractions::{ComponentEvictor, ComponentInstance, InstanceId};
use infrastructure_common::{ComponentKey, ScopeName};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 组件作用域
pub struct Scope {
    id: Uuid,
    name: ScopeName,
    created_at: DateTime<Utc>,
    /// 订阅者，按实例ID去重
    observers: Mutex<BTreeMap<InstanceId, ComponentKey>>,
    evictor: Weak<dyn ComponentEvictor>,
}

impl Scope {
    fn new(name: ScopeName, evictor: Weak<dyn ComponentEvictor>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            observers: Mutex::new(BTreeMap::new()),
            evictor,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &ScopeName {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 订阅作用域，同一实例重复订阅无效果
    ///
    /// 实例只能订阅自己声明的作用域，未声明作用域或声明了其他作用域的实例被拒绝。
    /// 返回是否为新增订阅。
    pub fn add_observer(&self, component: &ComponentInstance) -> bool {
        if component.scope() != Some(&self.name) {
            warn!(
                "组件 {} {} 声明的作用域为 {}，拒绝订阅作用域 {}",
                component.key(),
                component.id(),
                component.scope().map_or("<无>", ScopeName::as_str),
                self.name
            );
            return false;
        }

        let mut observers = self.observers.lock();
        if observers.contains_key(&component.id()) {
            return false;
        }
        observers.insert(component.id(), component.key().clone());
        debug!("组件 {} {} 订阅作用域 {}", component.key(), component.id(), self.name);
        true
    }

    /// 检查实例是否订阅了此作用域
    pub fn is_observing(&self, component: &ComponentInstance) -> bool {
        self.observers.lock().contains_key(&component.id())
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// 结束作用域
    ///
    /// 按标识驱逐每个订阅者（不沿子组件列表递归），然后清空订阅者集合。
    /// 返回实际驱逐的组件数量。
    pub fn end(&self) -> usize {
        let observers = std::mem::take(&mut *self.observers.lock());
        if observers.is_empty() {
            return 0;
        }

        let Some(evictor) = self.evictor.upgrade() else {
            warn!("作用域 {} 所属的组件注册表已释放，忽略结束请求", self.name);
            return 0;
        };

        let keys: BTreeSet<ComponentKey> = observers.into_values().collect();
        let evicted = keys.iter().filter(|key| evictor.evict(key)).count();
        info!("作用域 {} 结束，驱逐 {} 个组件", self.name, evicted);
        evicted
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("observers", &self.observer_count())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// 作用域观察者注册表
pub struct ScopeRegistry {
    scopes: DashMap<ScopeName, Arc<Scope>>,
    evictor: Weak<dyn ComponentEvictor>,
}

impl ScopeRegistry {
    /// 创建绑定到指定组件缓存的作用域注册表
    pub fn new(evictor: Weak<dyn ComponentEvictor>) -> Self {
        Self {
            scopes: DashMap::new(),
            evictor,
        }
    }

    /// 获取已存在的作用域，名称缺失或为空时返回 `None`
    pub fn get(&self, name: Option<&str>) -> Option<Arc<Scope>> {
        let name = name.filter(|n| !n.is_empty())?;
        self.scopes.get(name).map(|scope| Arc::clone(scope.value()))
    }

    /// 获取或创建作用域
    pub fn get_or_create(&self, name: impl Into<ScopeName>) -> Arc<Scope> {
        let name = name.into();
        let scope = self.scopes.entry(name.clone()).or_insert_with(|| {
            debug!("创建作用域: {}", name);
            Arc::new(Scope::new(name.clone(), self.evictor.clone()))
        });
        Arc::clone(scope.value())
    }

    /// 结束指定作用域，作用域不存在时不做任何事
    pub fn end(&self, name: &str) -> usize {
        self.get(Some(name)).map_or(0, |scope| scope.end())
    }

    /// 获取作用域守卫，守卫释放时结束作用域
    pub fn guard(&self, name: impl Into<ScopeName>) -> ScopeGuard {
        ScopeGuard::new(self.get_or_create(name))
    }

    /// 所有作用域名称（已排序）
    pub fn names(&self) -> Vec<ScopeName> {
        let mut names: Vec<ScopeName> = self.scopes.iter().map(|s| s.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// 至少有一个订阅者的作用域数量
    pub fn active_len(&self) -> usize {
        self.scopes
            .iter()
            .filter(|scope| scope.value().observer_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl std::fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("scopes", &self.names())
            .finish()
    }
}

/// 作用域守卫
///
/// 外部生命周期（例如界面销毁）结束时释放守卫即可结束作用域。
#[must_use = "守卫释放时作用域立即结束"]
pub struct ScopeGuard {
    scope: Arc<Scope>,
    armed: bool,
}

impl ScopeGuard {
    /// 创建新的作用域守卫
    pub fn new(scope: Arc<Scope>) -> Self {
        Self { scope, armed: true }
    }

    /// 获取作用域
    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    /// 将组件实例挂到此作用域，规则同 [`Scope::add_observer`]
    pub fn attach(&self, component: &ComponentInstance) -> bool {
        self.scope.add_observer(component)
    }

    /// 放弃守卫而不结束作用域
    pub fn disarm(mut self) -> Arc<Scope> {
        self.armed = false;
        Arc::clone(&self.scope)
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.armed {
            self.scope.end();
        }
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("scope", &self.scope.name())
            .field("armed", &self.armed)
            .finish()
    }
}
