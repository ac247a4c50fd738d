//! 解析上下文
//!
//! 沿父组件声明向上收集祖先链，用于检测循环并限制链深度。

use infrastructure_common::{ComponentKey, DependencyError, DependencyResult};

/// 解析上下文
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// 当前解析链，从被请求的组件开始，依次是其父组件
    resolution_chain: Vec<ComponentKey>,
    /// 最大链深度
    max_depth: usize,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(max_depth: usize) -> Self {
        Self {
            resolution_chain: Vec::new(),
            max_depth,
        }
    }

    /// 添加组件到解析链
    pub fn push(&mut self, key: ComponentKey) -> DependencyResult<()> {
        if self.resolution_chain.contains(&key) || self.resolution_chain.len() >= self.max_depth {
            let chain = self
                .resolution_chain
                .iter()
                .chain(std::iter::once(&key))
                .map(ComponentKey::as_str)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DependencyError::CircularParentChain { chain });
        }
        self.resolution_chain.push(key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resolution_chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolution_chain.is_empty()
    }

    /// 按构建顺序（最顶层祖先在前）返回解析链
    pub fn into_top_down(self) -> Vec<ComponentKey> {
        let mut chain = self.resolution_chain;
        chain.reverse();
        chain
    }
}
