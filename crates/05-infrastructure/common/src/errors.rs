//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {path}, 原因: {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("不支持的配置格式: {path}")]
    UnsupportedFormat { path: String },

    #[error("JSON 配置解析失败: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("TOML 配置解析失败: {source}")]
    TomlError {
        #[from]
        source: toml::de::Error,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 依赖注入错误类型
///
/// 这里的错误全部属于声明或使用方式上的编程错误，解析过程不做重试，
/// 也不会留下半构建的组件。
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("{identity} 不是已声明的组件契约")]
    InvalidComponentKind { identity: String },

    #[error("类型 {type_name} 缺少可用的主构造器")]
    MissingPrimaryConstructor { type_name: String },

    #[error("组件创建失败: {identity}, 原因: {source}")]
    ComponentCreationFailed {
        identity: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("父组件声明存在循环: {chain}")]
    CircularParentChain { chain: String },

    #[error("构造器在构建过程中再次请求了正在构建的组件: {chain}")]
    ReentrantResolution { chain: String },

    #[error("组件 {identity} 的实例类型与契约不符, 期望 {expected}")]
    ContractMismatch { identity: String, expected: &'static str },

    #[error("缺少运行时依赖: {qualifier}")]
    RuntimeDependencyMissing { qualifier: String },

    #[error("运行时依赖类型不匹配: {qualifier}, 期望 {expected}")]
    RuntimeDependencyTypeMismatch {
        qualifier: String,
        expected: &'static str,
    },

    #[error("尚未安装全局组件图")]
    GraphNotInstalled,
}

impl DependencyError {
    /// 创建无效组件错误
    pub fn invalid_component(identity: impl Into<String>) -> Self {
        Self::InvalidComponentKind {
            identity: identity.into(),
        }
    }

    /// 包装生成代码的构造失败
    pub fn creation_failed(
        identity: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ComponentCreationFailed {
            identity: identity.into(),
            source: source.into(),
        }
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
