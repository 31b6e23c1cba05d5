use std::io;

use reqwest::StatusCode;

use crate::content::{ArticleId, ValidationError};

pub type Result<T> = core::result::Result<T, Error>;

/// 远端请求失败的底层原因
///
/// - [`RemoteCause::Transport`]：网络、超时或响应体解析失败
/// - [`RemoteCause::Status`]：服务端返回了非 2xx 状态码
/// - [`RemoteCause::MissingId`]：创建成功但响应中没有 id，且未附带临时 id
#[derive(Debug, thiserror::Error)]
pub enum RemoteCause {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("response did not include an article id")]
    MissingId,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 读取文章列表或单篇文章失败
    #[error("failed to fetch articles: {0}")]
    RemoteFetch(RemoteCause),

    /// 后端不存在该 id 的文章
    #[error("article {0} not found")]
    NotFound(ArticleId),

    /// 发布文章失败
    ///
    /// `maybe_created` 为 true 时请求可能已经到达服务端，重试可能产生重复文章。
    #[error("failed to publish article: {cause}")]
    RemoteWrite {
        cause: RemoteCause,
        maybe_created: bool,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// 写入结果未知：文章可能已经在服务端创建
    pub fn maybe_created(&self) -> bool {
        matches!(
            self,
            Error::RemoteWrite {
                maybe_created: true,
                ..
            }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
