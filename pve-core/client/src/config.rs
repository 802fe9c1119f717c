//! PVE 客户端配置
//!
//! 可以通过构建器方法创建, 也可以从 TOML 加载:
//!
//! ```toml
//! host = "pve1.example.com"
//! port = 8006
//! request_timeout = 60
//!
//! [tls]
//! mode = "custom_ca"
//! path = "/etc/pve/pve-root-ca.pem"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PveError, Result};

/// 协议类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    /// 明文 HTTP, 仅用于本地反向代理或测试
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

/// 响应格式
///
/// 决定请求发送到 `/api2/json` 还是 `/api2/png` (RRD 图表)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Json,
    Png,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Png => "png",
        }
    }
}

/// TLS 证书信任策略
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TlsPolicy {
    /// 使用系统信任库
    #[default]
    System,
    /// 在系统信任库之外额外信任一个 PEM 格式的 CA 证书 (自签名集群)
    CustomCa {
        /// CA 证书路径
        path: PathBuf,
    },
    /// 不校验证书, 必须显式开启
    AcceptInvalid,
}

/// PVE 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PveConfig {
    /// 主机名或地址
    pub host: String,

    /// API 端口
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub scheme: Scheme,

    /// 连接超时, 配置文件中以秒为单位, 可以是小数
    #[serde(with = "duration_secs", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// 请求超时
    #[serde(with = "duration_secs", default = "default_request_timeout")]
    pub request_timeout: Duration,

    #[serde(default)]
    pub tls: TlsPolicy,

    #[serde(default)]
    pub response_type: ResponseType,
}

impl PveConfig {
    /// 使用默认端口和系统信任库创建配置
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            scheme: Scheme::default(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            tls: TlsPolicy::default(),
            response_type: ResponseType::default(),
        }
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PveError::ConfigError(format!("解析配置失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PveError::ConfigError(format!("读取配置文件失败 {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(PveError::ConfigError("host 不能为空".to_string()));
        }
        if self.port == 0 {
            return Err(PveError::ConfigError("port 不能为 0".to_string()));
        }
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(PveError::ConfigError("超时时间必须大于 0".to_string()));
        }
        Ok(())
    }

    /// 设置端口
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn tls(mut self, tls: TlsPolicy) -> Self {
        self.tls = tls;
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// 设置连接超时
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// 设置请求超时
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        self.connect_timeout
    }

    pub fn request_timeout_duration(&self) -> Duration {
        self.request_timeout
    }

    /// API 基础 URL, 例如 `https://pve1:8006/api2/json`
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/api2/{}",
            self.scheme.as_str(),
            self.host,
            self.port,
            self.response_type.as_str()
        )
    }
}

// 默认值函数
fn default_port() -> u16 {
    8006
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// 以秒为单位序列化 Duration, 允许小数 (例如 `0.5`)
mod duration_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("无效的超时时间 {}: {}", secs, e)))
    }
}
