//! 组件图门面
//!
//! 把组件契约映射到注册表中的组件标识，并为每次请求安装运行时依赖。

use crate::registry::ComponentRegistryImpl;
use crate::scope::{Scope, ScopeGuard, ScopeRegistry};
use di_abstractions::{
    ComponentContract, ComponentInstance, ComponentRegistry, ContainerConfig, DeclarationSource,
    RuntimeDependencies,
};
use infrastructure_common::{DependencyError, DependencyResult, ScopeName};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info};

/// 组件图
#[derive(Debug)]
pub struct ComponentGraph {
    registry: ComponentRegistryImpl,
}

impl ComponentGraph {
    /// 使用默认配置创建组件图
    pub fn new(source: impl DeclarationSource + 'static) -> Self {
        Self::with_config(source, ContainerConfig::default())
    }

    /// 使用指定配置创建组件图
    pub fn with_config(source: impl DeclarationSource + 'static, config: ContainerConfig) -> Self {
        Self::from_source(Arc::new(source), config)
    }

    pub fn from_source(source: Arc<dyn DeclarationSource>, config: ContainerConfig) -> Self {
        Self {
            registry: ComponentRegistryImpl::new(source, config),
        }
    }

    /// 底层组件注册表
    pub fn registry(&self) -> &ComponentRegistryImpl {
        &self.registry
    }

    /// 作用域观察者注册表
    pub fn scopes(&self) -> &ScopeRegistry {
        self.registry.scopes()
    }

    /// 获取组件
    ///
    /// 非空的 `runtime` 整体替换实例上一次提供的运行时依赖；为空时沿用已有的依赖。
    pub fn component<C: ComponentContract>(
        &self,
        runtime: RuntimeDependencies,
    ) -> DependencyResult<Component<C>> {
        let instance = self.registry.get(C::KEY)?;
        let value = instance
            .downcast::<C::Instance>()
            .ok_or_else(|| DependencyError::ContractMismatch {
                identity: C::KEY.to_string(),
                expected: std::any::type_name::<C::Instance>(),
            })?;

        let runtime = if runtime.is_empty() {
            instance.runtime_dependencies()
        } else {
            debug!("组件 {} 安装运行时依赖: {:?}", C::KEY, runtime.qualifiers());
            let runtime = Arc::new(runtime);
            instance.replace_runtime_dependencies(Arc::clone(&runtime));
            runtime
        };

        Ok(Component {
            instance,
            value,
            runtime,
            contract: PhantomData,
        })
    }

    /// 不带运行时依赖获取组件
    pub fn get<C: ComponentContract>(&self) -> DependencyResult<Component<C>> {
        self.component::<C>(RuntimeDependencies::new())
    }

    /// 把实例挂到指定作用域，作用域不存在时创建
    ///
    /// 只接受实例自己声明的作用域，其他作用域拒绝订阅（见 [`Scope::add_observer`]）。
    pub fn attach_scope(
        &self,
        name: impl Into<ScopeName>,
        component: &ComponentInstance,
    ) -> Arc<Scope> {
        let scope = self.scopes().get_or_create(name);
        scope.add_observer(component);
        scope
    }

    /// 结束作用域，返回驱逐的组件数量
    pub fn end_scope(&self, name: &str) -> usize {
        self.scopes().end(name)
    }

    /// 获取作用域守卫
    pub fn scope_guard(&self, name: impl Into<ScopeName>) -> ScopeGuard {
        self.scopes().guard(name)
    }
}

/// 类型化的组件句柄
pub struct Component<C: ComponentContract> {
    instance: Arc<ComponentInstance>,
    value: Arc<C::Instance>,
    runtime: Arc<RuntimeDependencies>,
    contract: PhantomData<fn() -> C>,
}

impl<C: ComponentContract> Component<C> {
    /// 底层组件实例
    pub fn instance(&self) -> &Arc<ComponentInstance> {
        &self.instance
    }

    pub fn value(&self) -> &Arc<C::Instance> {
        &self.value
    }

    /// 本次请求生效的运行时依赖
    pub fn runtime(&self) -> &Arc<RuntimeDependencies> {
        &self.runtime
    }

    /// 两个句柄是否指向同一个组件实例
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl<C: ComponentContract> Deref for Component<C> {
    type Target = C::Instance;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<C: ComponentContract> Clone for Component<C> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            value: Arc::clone(&self.value),
            runtime: Arc::clone(&self.runtime),
            contract: PhantomData,
        }
    }
}

impl<C: ComponentContract> std::fmt::Debug for Component<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("key", &C::KEY)
            .field("instance", &self.instance.id())
            .field("runtime", &self.runtime)
            .finish()
    }
}

/// 全局组件图
static GLOBAL_COMPONENT_GRAPH: Lazy<RwLock<Option<Arc<ComponentGraph>>>> =
    Lazy::new(|| RwLock::new(None));

/// 安装全局组件图，返回被替换的旧组件图
pub fn set_global_component_graph(graph: Arc<ComponentGraph>) -> Option<Arc<ComponentGraph>> {
    info!("安装全局组件图");
    GLOBAL_COMPONENT_GRAPH.write().replace(graph)
}

/// 获取全局组件图
pub fn global_component_graph() -> DependencyResult<Arc<ComponentGraph>> {
    GLOBAL_COMPONENT_GRAPH
        .read()
        .clone()
        .ok_or(DependencyError::GraphNotInstalled)
}

/// 卸载全局组件图
pub fn clear_global_component_graph() -> Option<Arc<ComponentGraph>> {
    GLOBAL_COMPONENT_GRAPH.write().take()
}

/// 从全局组件图获取组件
pub fn component<C: ComponentContract>(
    runtime: RuntimeDependencies,
) -> DependencyResult<Component<C>> {
    global_component_graph()?.component::<C>(runtime)
}
