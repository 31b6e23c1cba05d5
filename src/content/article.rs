use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};

use super::Category;

pub type ArticleId = i64;

pub const DEFAULT_READ_TIME: &str = "5 min read";

/// 一篇已发布的文章
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(deserialize_with = "lenient_id")]
    pub id: ArticleId,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub content: String,
    pub cover_image: String,
    #[serde(default = "default_read_time")]
    pub read_time: String,
}

/// 尚未分配 id 的文章，由创建表单收集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    pub title: String,
    pub category: Category,
    pub description: String,
    pub content: String,
    pub cover_image: String,
    #[serde(default = "default_read_time")]
    pub read_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("cover image is not a valid URL: {0}")]
    InvalidCoverImage(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

impl Default for ArticleDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            category: Category::Finance,
            description: String::new(),
            content: String::new(),
            cover_image: String::new(),
            read_time: default_read_time(),
        }
    }
}

impl ArticleDraft {
    /// 提交前的客户端校验
    ///
    /// 标题、描述、正文和封面图为必填项，一次性报告所有缺失字段；
    /// 封面图必须是 http(s) 绝对地址。
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing: Vec<&'static str> = [
            ("title", &self.title),
            ("description", &self.description),
            ("content", &self.content),
            ("coverImage", &self.cover_image),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        match Url::parse(self.cover_image.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(ValidationError::InvalidCoverImage(self.cover_image.clone())),
        }
    }

    pub fn into_article(self, id: ArticleId) -> Article {
        Article {
            id,
            title: self.title,
            category: self.category,
            description: self.description,
            content: self.content,
            cover_image: self.cover_image,
            read_time: self.read_time,
        }
    }
}

/// 详情页侧栏的“最新文章”
///
/// 按后端返回的顺序取前 `limit` 篇，排除当前正在阅读的文章。
pub fn latest_articles(all: &[Article], current: ArticleId, limit: usize) -> Vec<&Article> {
    all.iter().filter(|a| a.id != current).take(limit).collect()
}

fn default_read_time() -> String {
    DEFAULT_READ_TIME.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(ArticleId),
    Str(String),
}

impl RawId {
    fn parse<E: serde::de::Error>(self) -> Result<ArticleId, E> {
        match self {
            RawId::Int(id) => Ok(id),
            RawId::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("无法解析文章 id: {}", s))),
        }
    }
}

/// 同时接受数字和数字字符串形式的 id
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<ArticleId, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer)?.parse()
}

pub(crate) fn lenient_opt_id<'de, D>(deserializer: D) -> Result<Option<ArticleId>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer)?
        .map(RawId::parse)
        .transpose()
}
