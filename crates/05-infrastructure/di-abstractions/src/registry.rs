//! 组件注册表抽象接口

use crate::container::ContainerStats;
use crate::instance::ComponentInstance;
use infrastructure_common::{ComponentKey, DependencyResult};
use std::sync::Arc;

/// 组件注册表 trait
///
/// 组件标识到存活组件实例的唯一映射，每个标识同一时刻至多一个实例。
pub trait ComponentRegistry: Send + Sync {
    /// 获取缓存的组件，未命中时连同缺失的祖先一起构建
    fn get(&self, key: &str) -> DependencyResult<Arc<ComponentInstance>>;

    /// 删除缓存条目，不级联、不取消作用域订阅
    fn remove(&self, key: &str) -> Option<Arc<ComponentInstance>>;

    /// 检查组件是否已缓存
    fn contains(&self, key: &str) -> bool;

    /// 所有已缓存的组件标识
    fn cached_keys(&self) -> Vec<ComponentKey>;

    /// 注册表统计信息
    fn stats(&self) -> ContainerStats;
}

/// 组件驱逐接口
///
/// 作用域结束时通过它把订阅者从组件缓存中移除。
pub trait ComponentEvictor: Send + Sync {
    /// 按标识驱逐，返回是否确实移除了条目
    fn evict(&self, key: &ComponentKey) -> bool;
}
