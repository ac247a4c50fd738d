//! 组件注册表实现
//!
//! 组件缓存、父组件类型缓存，以及按祖先链自顶向下的组件构建。

use crate::scope::ScopeRegistry;
use di_abstractions::{
    ComponentEvictor, ComponentInstance, ComponentRegistry, ContainerConfig, ContainerStats,
    DeclarationSource, ResolveContext,
};
use infrastructure_common::{ComponentDescriptor, ComponentKey, DependencyError, DependencyResult};
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 注册表计数器
#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    constructions: AtomicU64,
    removals: AtomicU64,
    evictions: AtomicU64,
    resolution_errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

thread_local! {
    /// 当前线程上正在执行构造器的组件，按所属注册表区分
    static IN_CONSTRUCTION: RefCell<Vec<(usize, ComponentKey)>> = RefCell::new(Vec::new());
}

/// 构造器执行标记，释放时出栈
struct ConstructionMark;

impl ConstructionMark {
    fn enter(owner: usize, key: &ComponentKey) -> DependencyResult<Self> {
        IN_CONSTRUCTION.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(o, k)| *o == owner && k == key) {
                let chain = stack
                    .iter()
                    .filter(|(o, _)| *o == owner)
                    .map(|(_, k)| k.as_str())
                    .chain(std::iter::once(key.as_str()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(DependencyError::ReentrantResolution { chain });
            }
            stack.push((owner, key.clone()));
            Ok(Self)
        })
    }
}

impl Drop for ConstructionMark {
    fn drop(&mut self) {
        IN_CONSTRUCTION.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// 组件缓存
///
/// 作用域只持有它的弱引用，通过 [`ComponentEvictor`] 驱逐订阅者。
#[derive(Debug, Default)]
struct ComponentCache {
    entries: RwLock<HashMap<ComponentKey, Arc<ComponentInstance>>>,
    counters: Counters,
}

impl ComponentEvictor for ComponentCache {
    fn evict(&self, key: &ComponentKey) -> bool {
        let evicted = self.entries.write().remove(key).is_some();
        if evicted {
            Counters::bump(&self.counters.evictions);
            debug!("作用域结束，驱逐组件: {}", key);
        }
        evicted
    }
}

/// 组件注册表实现
pub struct ComponentRegistryImpl {
    /// 声明元数据来源
    source: Arc<dyn DeclarationSource>,
    /// 组件缓存
    cache: Arc<ComponentCache>,
    /// 已读取的声明元数据，兼作父组件类型缓存
    descriptors: RwLock<HashMap<ComponentKey, ComponentDescriptor>>,
    /// 作用域观察者注册表
    scopes: ScopeRegistry,
    /// 容器配置
    config: ContainerConfig,
    /// 构建锁，串行化缓存未命中时的构建过程
    ///
    /// 可重入：构造器可以在同一线程上请求其他组件。
    construction: ReentrantMutex<()>,
}

impl ComponentRegistryImpl {
    /// 创建新的组件注册表
    pub fn new(source: Arc<dyn DeclarationSource>, config: ContainerConfig) -> Self {
        let cache = Arc::new(ComponentCache::default());
        let evictor = Arc::downgrade(&cache);
        let scopes = ScopeRegistry::new(evictor);

        Self {
            source,
            cache,
            descriptors: RwLock::new(HashMap::new()),
            scopes,
            config,
            construction: ReentrantMutex::new(()),
        }
    }

    /// 作用域观察者注册表
    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 清空组件缓存与父组件类型缓存
    ///
    /// 只用于隔离测试用例，已订阅的作用域不会收到通知。
    #[cfg(any(test, feature = "test-support"))]
    pub fn reset_all(&self) {
        self.cache.entries.write().clear();
        self.descriptors.write().clear();
    }

    fn lookup(&self, key: &str) -> Option<Arc<ComponentInstance>> {
        let hit = self.cache.entries.read().get(key).cloned();
        if hit.is_some() {
            Counters::bump(&self.cache.counters.cache_hits);
            if self.config.trace_cache_hits {
                debug!("缓存命中: {}", key);
            }
        }
        hit
    }

    /// 读取声明元数据，首次访问后记忆
    fn descriptor(&self, key: &str) -> DependencyResult<ComponentDescriptor> {
        if let Some(descriptor) = self.descriptors.read().get(key) {
            return Ok(descriptor.clone());
        }

        let descriptor = self
            .source
            .describe(key)
            .ok_or_else(|| DependencyError::invalid_component(key))?;
        self.descriptors
            .write()
            .entry(descriptor.key.clone())
            .or_insert_with(|| descriptor.clone());
        Ok(descriptor)
    }

    fn resolve(&self, key: &str) -> DependencyResult<Arc<ComponentInstance>> {
        let descriptor = self.descriptor(key)?;

        let _construction = self.construction.lock();
        // 等待构建锁期间组件可能已经被构建
        if let Some(built) = self.cache.entries.read().get(key).cloned() {
            return Ok(built);
        }

        let (chain, anchor) = self.missing_chain(&descriptor)?;
        let (target, ancestors) = chain.split_last().ok_or_else(|| DependencyError::invalid_component(key))?;

        let mut parent = anchor;
        for ancestor in ancestors {
            parent = Some(self.construct(ancestor, parent)?);
        }
        self.construct(target, parent)
    }

    /// 沿父组件声明向上收集尚未缓存的祖先
    ///
    /// 返回自顶向下的构建链（最后一个是被请求的组件）以及已缓存的最近祖先。
    fn missing_chain(
        &self,
        descriptor: &ComponentDescriptor,
    ) -> DependencyResult<(Vec<ComponentDescriptor>, Option<Arc<ComponentInstance>>)> {
        let mut context = ResolveContext::new(self.config.max_parent_depth);
        context.push(descriptor.key.clone())?;

        let mut chain = vec![descriptor.clone()];
        let mut anchor = None;

        while let Some(parent_key) = chain.last().and_then(|d| d.parent.clone()) {
            if let Some(parent) = self.cache.entries.read().get(&parent_key).cloned() {
                anchor = Some(parent);
                break;
            }
            context.push(parent_key.clone())?;
            chain.push(self.descriptor(parent_key.as_str())?);
        }

        chain.reverse();
        Ok((chain, anchor))
    }

    fn construct(
        &self,
        descriptor: &ComponentDescriptor,
        parent: Option<Arc<ComponentInstance>>,
    ) -> DependencyResult<Arc<ComponentInstance>> {
        let key = &descriptor.key;
        let factory = self
            .source
            .factory(key.as_str())
            .ok_or_else(|| DependencyError::MissingPrimaryConstructor {
                type_name: key.to_string(),
            })?;

        let mark = ConstructionMark::enter(self as *const Self as usize, key)?;
        let value = factory.create(parent.as_ref()).map_err(|e| match e {
            DependencyError::ComponentCreationFailed { .. } => e,
            other => DependencyError::creation_failed(key.as_str(), other),
        })?;
        drop(mark);

        let scope = descriptor.scope().filter(|s| !s.as_str().is_empty()).cloned();
        let instance = Arc::new(ComponentInstance::new(
            key.clone(),
            scope.clone(),
            parent.clone(),
            value,
        ));

        {
            // 提交与作用域订阅在同一把写锁内完成，作用域结束不会漏掉新实例
            let mut entries = self.cache.entries.write();
            entries.insert(key.clone(), Arc::clone(&instance));
            if let Some(scope) = &scope {
                self.scopes.get_or_create(scope.clone()).add_observer(&instance);
            }
        }
        Counters::bump(&self.cache.counters.constructions);

        if let Some(parent) = &parent {
            parent.add_child(&instance, self.config.prune_stale_children);
        }

        info!(
            "构建组件: {} {}, 父组件: {}, 作用域: {}",
            key,
            instance.id(),
            parent.as_ref().map_or("<无>", |p| p.key().as_str()),
            scope.as_ref().map_or("<无>", |s| s.as_str()),
        );
        Ok(instance)
    }
}

impl ComponentRegistry for ComponentRegistryImpl {
    fn get(&self, key: &str) -> DependencyResult<Arc<ComponentInstance>> {
        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }

        let result = self.resolve(key);
        if let Err(e) = &result {
            Counters::bump(&self.cache.counters.resolution_errors);
            match e {
                DependencyError::InvalidComponentKind { .. } => warn!("解析组件失败: {}", e),
                _ => error!("解析组件失败: {}", e),
            }
        }
        result
    }

    fn remove(&self, key: &str) -> Option<Arc<ComponentInstance>> {
        let removed = self.cache.entries.write().remove(key);
        if removed.is_some() {
            Counters::bump(&self.cache.counters.removals);
            debug!("移除组件: {}", key);
        }
        removed
    }

    fn contains(&self, key: &str) -> bool {
        self.cache.entries.read().contains_key(key)
    }

    fn cached_keys(&self) -> Vec<ComponentKey> {
        let mut keys: Vec<ComponentKey> = self.cache.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn stats(&self) -> ContainerStats {
        let counters = &self.cache.counters;
        ContainerStats {
            cached_components: self.cache.entries.read().len(),
            active_scopes: self.scopes.active_len(),
            cache_hits: counters.cache_hits.load(Ordering::Relaxed),
            constructions: counters.constructions.load(Ordering::Relaxed),
            removals: counters.removals.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            resolution_errors: counters.resolution_errors.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ComponentRegistryImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistryImpl")
            .field("cached", &self.cached_keys())
            .field("scopes", &self.scopes)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
