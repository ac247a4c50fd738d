//! 组件工厂抽象接口
//!
//! 代码生成器为每个声明的组件产出一个工厂，运行时核心只负责调用它。

use crate::instance::ComponentInstance;
use infrastructure_common::DependencyResult;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// 组件工厂 trait
///
/// 接收已解析的父组件实例（若有），返回实现组件契约的新实例。
pub trait ComponentFactory: Send + Sync {
    /// 创建组件实例
    fn create(
        &self,
        parent: Option<&Arc<ComponentInstance>>,
    ) -> DependencyResult<Arc<dyn Any + Send + Sync>>;

    /// 工厂产出的类型名称
    fn produces(&self) -> &'static str;
}

/// 闭包工厂包装器
pub struct FnFactory<T, F> {
    factory_fn: F,
    component_type: PhantomData<fn() -> T>,
}

impl<T, F> FnFactory<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(Option<&Arc<ComponentInstance>>) -> DependencyResult<T> + Send + Sync + 'static,
{
    pub fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            component_type: PhantomData,
        }
    }
}

impl<T, F> ComponentFactory for FnFactory<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(Option<&Arc<ComponentInstance>>) -> DependencyResult<T> + Send + Sync + 'static,
{
    fn create(
        &self,
        parent: Option<&Arc<ComponentInstance>>,
    ) -> DependencyResult<Arc<dyn Any + Send + Sync>> {
        let value: Arc<dyn Any + Send + Sync> = Arc::new((self.factory_fn)(parent)?);
        Ok(value)
    }

    fn produces(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T, F> std::fmt::Debug for FnFactory<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFactory")
            .field("produces", &std::any::type_name::<T>())
            .finish()
    }
}
