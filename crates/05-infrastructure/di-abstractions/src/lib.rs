//! # Dependency Injection Abstractions
//!
//! 组件图依赖注入抽象层，定义生成代码与运行时核心之间的契约。
//!
//! ## 核心接口
//!
//! - [`ComponentFactory`] - 生成的组件构造器
//! - [`DeclarationSource`] / [`ComponentCatalog`] - 组件声明元数据
//! - [`ComponentInstance`] - 组件实例的基础形态
//! - [`RuntimeDependencies`] - 按次调用提供的运行时依赖
//! - [`ComponentRegistry`] - 组件注册表接口

pub mod container;
pub mod declaration;
pub mod factory;
pub mod instance;
pub mod registry;
pub mod resolver;
pub mod runtime;

pub use container::*;
pub use declaration::*;
pub use factory::*;
pub use instance::*;
pub use registry::*;
pub use resolver::*;
pub use runtime::*;
