//! 组件声明
//!
//! 代码生成器把声明式的组件描述转成 [`ComponentCatalog`]，运行时核心只读取其中的元数据并调用工厂。

use crate::factory::{ComponentFactory, FnFactory};
use crate::instance::ComponentInstance;
use infrastructure_common::{ComponentDescriptor, ComponentKey, DependencyError, DependencyResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 组件契约
///
/// 由生成代码为每个可注入组件实现，`Instance` 是工厂产出的具体类型。
pub trait ComponentContract: 'static {
    /// 组件标识
    const KEY: &'static str;

    /// 工厂产出的实例类型
    type Instance: Send + Sync + 'static;

    fn key() -> ComponentKey {
        ComponentKey::from_static(Self::KEY)
    }
}

/// 声明元数据来源
pub trait DeclarationSource: Send + Sync {
    /// 查询组件描述符，未声明时返回 `None`
    fn describe(&self, key: &str) -> Option<ComponentDescriptor>;

    /// 查询组件工厂
    fn factory(&self, key: &str) -> Option<Arc<dyn ComponentFactory>>;

    /// 所有已声明的组件标识
    fn keys(&self) -> Vec<ComponentKey>;
}

/// 单个组件的声明
#[derive(Clone)]
pub struct ComponentDeclaration {
    /// 组件描述符
    pub descriptor: ComponentDescriptor,
    /// 生成的工厂，缺失表示没有可用的主构造器
    pub factory: Option<Arc<dyn ComponentFactory>>,
}

impl std::fmt::Debug for ComponentDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDeclaration")
            .field("descriptor", &self.descriptor)
            .field("factory", &self.factory.as_ref().map(|f| f.produces()))
            .finish()
    }
}

/// 组件声明目录
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    declarations: HashMap<ComponentKey, ComponentDeclaration>,
}

impl ComponentCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明组件及其工厂
    pub fn declare(
        mut self,
        descriptor: ComponentDescriptor,
        factory: impl ComponentFactory + 'static,
    ) -> Self {
        let factory: Arc<dyn ComponentFactory> = Arc::new(factory);
        self.insert(descriptor, Some(factory));
        self
    }

    /// 用闭包声明组件
    pub fn declare_fn<T, F>(self, descriptor: ComponentDescriptor, factory_fn: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Option<&Arc<ComponentInstance>>) -> DependencyResult<T> + Send + Sync + 'static,
    {
        self.declare(descriptor, FnFactory::new(factory_fn))
    }

    /// 声明一个没有构造器的组件
    ///
    /// 仅用于描述生成阶段的失败，[`validate`](Self::validate) 和解析都会报告
    /// [`DependencyError::MissingPrimaryConstructor`]。
    pub fn declare_without_constructor(mut self, descriptor: ComponentDescriptor) -> Self {
        self.insert(descriptor, None);
        self
    }

    fn insert(&mut self, descriptor: ComponentDescriptor, factory: Option<Arc<dyn ComponentFactory>>) {
        let key = descriptor.key.clone();
        if self.declarations.contains_key(&key) {
            tracing::warn!("组件 {} 被重复声明，后一次声明生效", key);
        }
        self.declarations
            .insert(key, ComponentDeclaration { descriptor, factory });
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// 验证目录：缺失构造器、悬空的父组件以及父组件循环
    pub fn validate(&self) -> Result<(), Vec<DependencyError>> {
        let mut errors = Vec::new();

        let mut keys: Vec<&ComponentKey> = self.declarations.keys().collect();
        keys.sort();

        for key in &keys {
            let declaration = &self.declarations[*key];
            if declaration.factory.is_none() {
                errors.push(DependencyError::MissingPrimaryConstructor {
                    type_name: key.to_string(),
                });
            }
            if let Some(parent) = &declaration.descriptor.parent {
                if !self.declarations.contains_key(parent) {
                    errors.push(DependencyError::invalid_component(parent.as_str()));
                }
            }
        }

        // 深度优先搜索检测父组件循环
        let mut visited = HashSet::new();
        for key in keys {
            if let Err(e) = self.check_parent_chain(key, &mut visited) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check_parent_chain<'a>(
        &'a self,
        start: &'a ComponentKey,
        visited: &mut HashSet<&'a ComponentKey>,
    ) -> DependencyResult<()> {
        let mut visiting: Vec<&ComponentKey> = Vec::new();
        let mut current = Some(start);

        while let Some(key) = current {
            if visited.contains(key) {
                break;
            }
            if let Some(pos) = visiting.iter().position(|k| *k == key) {
                let chain = visiting[pos..]
                    .iter()
                    .map(|k| k.as_str())
                    .chain(std::iter::once(key.as_str()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                visited.extend(visiting);
                return Err(DependencyError::CircularParentChain { chain });
            }
            visiting.push(key);
            current = self
                .declarations
                .get(key)
                .and_then(|d| d.descriptor.parent.as_ref());
        }

        visited.extend(visiting);
        Ok(())
    }
}

impl DeclarationSource for ComponentCatalog {
    fn describe(&self, key: &str) -> Option<ComponentDescriptor> {
        self.declarations.get(key).map(|d| d.descriptor.clone())
    }

    fn factory(&self, key: &str) -> Option<Arc<dyn ComponentFactory>> {
        self.declarations.get(key).and_then(|d| d.factory.clone())
    }

    fn keys(&self) -> Vec<ComponentKey> {
        let mut keys: Vec<ComponentKey> = self.declarations.keys().cloned().collect();
        keys.sort();
        keys
    }
}
