//! # Infrastructure Common
//!
//! 组件图运行时的公共类型。
//!
//! ## 核心类型
//!
//! - [`ComponentKey`] - 组件标识
//! - [`ComponentDescriptor`] - 组件声明元数据
//! - [`ScopeName`] / [`Lifetime`] - 作用域与生命周期
//! - [`DependencyError`] - 依赖注入错误
//!
//! ## 设计原则
//!
//! - 声明元数据一经生成即不可变
//! - 所有错误都是声明层面的编程错误，不做重试

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
