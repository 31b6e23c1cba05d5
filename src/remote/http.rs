use chrono::Local;
use reqwest::{
    Response, StatusCode,
    header::{self, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ArticleSource;
use crate::{
    config::RemoteConfig,
    content::{Article, ArticleDraft, ArticleId, lenient_opt_id},
    error::{Error, RemoteCause, Result},
};

/// 基于 reqwest 的 REST 客户端
///
/// 对接 `GET /articles`、`GET /articles/{id}` 和 `POST /articles` 三个接口，
/// 集合路径由 [`RemoteConfig::resource`] 决定。
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    collection: String,
    provisional_ids: bool,
}

impl HttpClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .default_headers({
                let mut header = HeaderMap::new();
                header.insert(
                    header::ACCEPT,
                    HeaderValue::from_static("application/json"),
                );
                header
            })
            .timeout(config.timeout)
            .build()?;

        let collection = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.resource.trim_matches('/')
        );

        Ok(Self {
            client,
            collection,
            provisional_ids: config.provisional_ids,
        })
    }

    /// 文章集合的地址
    pub fn collection_url(&self) -> &str {
        &self.collection
    }

    fn item_url(&self, id: ArticleId) -> String {
        format!("{}/{}", self.collection, id)
    }
}

/// 创建请求体：草稿加上可选的临时 id
#[derive(Serialize)]
struct CreateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<ArticleId>,
    #[serde(flatten)]
    draft: &'a ArticleDraft,
}

/// 创建响应：id 可能缺失，以后端返回为准
#[derive(Deserialize)]
struct CreateResponse {
    #[serde(default, deserialize_with = "lenient_opt_id")]
    id: Option<ArticleId>,
    #[serde(flatten)]
    article: ArticleDraft,
}

impl ArticleSource for HttpClient {
    #[instrument(name = "list articles", skip_all)]
    async fn list_articles(&self) -> Result<Vec<Article>> {
        let resp = self
            .client
            .get(&self.collection)
            .send()
            .await
            .map_err(fetch_error)?;

        let resp = ensure_success(resp).map_err(Error::RemoteFetch)?;
        let articles: Vec<Article> = resp.json().await.map_err(fetch_error)?;

        tracing::debug!(count = articles.len(), "articles fetched");
        Ok(articles)
    }

    #[instrument(name = "get article", skip(self))]
    async fn get_article(&self, id: ArticleId) -> Result<Article> {
        let resp = self
            .client
            .get(self.item_url(id))
            .send()
            .await
            .map_err(fetch_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(id));
        }

        let resp = ensure_success(resp).map_err(Error::RemoteFetch)?;
        resp.json().await.map_err(fetch_error)
    }

    #[instrument(name = "create article", skip_all, fields(title = %draft.title))]
    async fn create_article(&self, draft: &ArticleDraft) -> Result<Article> {
        let provisional = self
            .provisional_ids
            .then(|| Local::now().timestamp_millis());

        let resp = self
            .client
            .post(&self.collection)
            .json(&CreateRequest {
                id: provisional,
                draft,
            })
            .send()
            .await
            .map_err(write_error)?;

        let resp = ensure_success(resp).map_err(|cause| Error::RemoteWrite {
            cause,
            maybe_created: false,
        })?;

        // 状态码已成功，此后的失败都意味着文章可能已经创建
        let created: CreateResponse = resp.json().await.map_err(|e| Error::RemoteWrite {
            cause: RemoteCause::Transport(e),
            maybe_created: true,
        })?;

        let id = created.id.or(provisional).ok_or(Error::RemoteWrite {
            cause: RemoteCause::MissingId,
            maybe_created: true,
        })?;

        if provisional.is_some_and(|p| p != id) {
            tracing::debug!(provisional, id, "backend assigned its own id");
        }
        tracing::info!(id, "article published");

        Ok(created.article.into_article(id))
    }
}

fn ensure_success(resp: Response) -> std::result::Result<Response, RemoteCause> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        tracing::debug!(%status, url = %resp.url(), "unexpected response status");
        Err(RemoteCause::Status(status))
    }
}

fn fetch_error(e: reqwest::Error) -> Error {
    Error::RemoteFetch(RemoteCause::Transport(e))
}

/// 连接未建立时请求一定没有到达服务端，其它传输错误（如超时）结果未知
fn write_error(e: reqwest::Error) -> Error {
    let maybe_created = !(e.is_connect() || e.is_builder());
    Error::RemoteWrite {
        cause: RemoteCause::Transport(e),
        maybe_created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Category;

    #[test]
    fn test_urls_join_base_and_resource() {
        let client = HttpClient::new(&RemoteConfig {
            base_url: "http://localhost:3001/".to_string(),
            resource: "/blogs/".to_string(),
            ..RemoteConfig::default()
        })
        .expect("创建客户端失败");

        assert_eq!(client.collection_url(), "http://localhost:3001/blogs");
        assert_eq!(client.item_url(7), "http://localhost:3001/blogs/7");
    }

    #[test]
    fn test_create_request_flattens_draft() {
        let draft = ArticleDraft {
            title: "A".to_string(),
            category: Category::Career,
            ..ArticleDraft::default()
        };

        let body = serde_json::to_value(CreateRequest {
            id: Some(1700000000000),
            draft: &draft,
        })
        .unwrap();
        assert_eq!(body["id"], 1700000000000i64);
        assert_eq!(body["title"], "A");
        assert_eq!(body["category"], "CAREER");
        assert_eq!(body["readTime"], "5 min read");

        let body = serde_json::to_value(CreateRequest {
            id: None,
            draft: &draft,
        })
        .unwrap();
        assert!(body.get("id").is_none());
    }

    #[test]
    fn test_create_response_id_is_optional() {
        let json = r#"{"title":"A","category":"FINANCE","description":"d","content":"c","coverImage":"http://x/y.png","readTime":"5 min read"}"#;
        let created: CreateResponse = serde_json::from_str(json).unwrap();
        assert!(created.id.is_none());

        let json = r#"{"id":"12","title":"A","category":"FINANCE","description":"d","content":"c","coverImage":"http://x/y.png"}"#;
        let created: CreateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(created.id, Some(12));
        assert_eq!(created.article.title, "A");
    }

    #[tokio::test]
    async fn test_connection_refused_is_fetch_error() {
        // 端口 9 (discard) 在测试环境中通常没有监听
        let client = HttpClient::new(&RemoteConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..RemoteConfig::default()
        })
        .expect("创建客户端失败");

        let err = client.list_articles().await.unwrap_err();
        assert!(matches!(err, Error::RemoteFetch(RemoteCause::Transport(_))));

        let err = client
            .create_article(&ArticleDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RemoteWrite { .. }));
        assert!(!err.maybe_created(), "连接失败时文章不可能已创建");
    }
}
