use std::{env, fs, path::Path, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Deserializer};

use crate::{
    error::{Error, Result},
    query::QueryOptions,
};

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "CHRONICLE_CONFIG";
/// 覆盖后端地址的环境变量
pub const API_URL_ENV: &str = "CHRONICLE_API_URL";

/// 应用配置
///
/// 可以从 TOML 文件加载，所有字段都有默认值：
///
/// ```toml
/// [remote]
/// base_url = "http://localhost:3001"
/// resource = "articles"
/// timeout_ms = 10000
///
/// [query]
/// stale_time_ms = 300000
/// retry = 1
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub query: QueryOptions,
}

/// REST 后端的连接配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    /// 文章集合的路径名
    pub resource: String,
    #[serde(rename = "timeout_ms", deserialize_with = "duration_ms")]
    pub timeout: Duration,
    /// 创建文章时是否附带客户端时间戳作为临时 id
    pub provisional_ids: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            resource: "articles".to_string(),
            timeout: Duration::from_secs(10),
            provisional_ids: true,
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 先读取 [`CONFIG_ENV`] 指向的文件（未设置则使用默认值），
    /// 再用 [`API_URL_ENV`] 覆盖后端地址。
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(url) = env::var(API_URL_ENV) {
            config.remote.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.remote.base_url)
            .map_err(|e| Error::Config(format!("base_url `{}`: {}", self.remote.base_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base_url `{}` must use http or https",
                self.remote.base_url
            )));
        }

        if self.remote.resource.trim_matches('/').is_empty() {
            return Err(Error::Config("resource must not be empty".to_string()));
        }

        Ok(())
    }
}

/// 以毫秒整数表示的时长
pub(crate) fn duration_ms<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
