//! # 组件图依赖注入实现
//!
//! 提供组件注册表、作用域观察者注册表与组件门面。
//!
//! 组件按声明的父组件逐层构建并缓存；声明了作用域的组件在作用域结束时被驱逐，
//! 下次请求时重新构建。生成的构造器可以在构建过程中请求其他组件，
//! 但请求正在构建的组件会以 `ReentrantResolution` 立即失败。

pub mod graph;
pub mod registry;
pub mod scope;

pub use graph::{
    clear_global_component_graph, component, global_component_graph, set_global_component_graph,
    Component, ComponentGraph,
};
pub use registry::ComponentRegistryImpl;
pub use scope::{Scope, ScopeGuard, ScopeRegistry};
