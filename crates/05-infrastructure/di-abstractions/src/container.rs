//! 容器配置与统计

use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 父组件链的最大深度，超过即视为声明循环
    pub max_parent_depth: usize,
    /// 是否为缓存命中输出 debug 日志
    pub trace_cache_hits: bool,
    /// 追加子组件时是否清理已释放的子组件引用
    pub prune_stale_children: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_parent_depth: 64,
            trace_cache_hits: false,
            prune_stale_children: true,
        }
    }
}

impl ContainerConfig {
    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文本解析
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 按扩展名从文件加载配置
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let read = || {
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
                path: path.display().to_string(),
                source,
            })
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&read()?),
            Some("json") => Self::from_json_str(&read()?),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_parent_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_parent_depth 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 当前缓存的组件数量
    pub cached_components: usize,
    /// 至少有一个订阅者的作用域数量
    pub active_scopes: usize,
    /// 缓存命中次数
    pub cache_hits: u64,
    /// 新构建的组件数量
    pub constructions: u64,
    /// 显式移除次数
    pub removals: u64,
    /// 作用域结束导致的驱逐次数
    pub evictions: u64,
    /// 解析失败次数
    pub resolution_errors: u64,
}
