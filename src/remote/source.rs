use std::{future::Future, sync::Arc};

use crate::{
    content::{Article, ArticleDraft, ArticleId},
    error::Result,
};

/// 文章数据来源
///
/// 提供列表、单篇读取和创建三个操作，不保存任何状态，也不做重试。
pub trait ArticleSource: Send + Sync + 'static {
    /// 获取全部文章
    ///
    /// 失败时返回 [`Error::RemoteFetch`](crate::error::Error::RemoteFetch)。
    fn list_articles(&self) -> impl Future<Output = Result<Vec<Article>>> + Send;

    /// 按 id 获取单篇文章
    ///
    /// 文章不存在时返回 [`Error::NotFound`](crate::error::Error::NotFound)，
    /// 其它失败返回 [`Error::RemoteFetch`](crate::error::Error::RemoteFetch)。
    fn get_article(&self, id: ArticleId) -> impl Future<Output = Result<Article>> + Send;

    /// 创建文章，返回带 id 的文章
    ///
    /// 不保证至多一次：请求可能已在服务端生效而客户端只看到失败，
    /// 调用方重试可能产生重复文章。
    fn create_article(&self, draft: &ArticleDraft)
    -> impl Future<Output = Result<Article>> + Send;
}

impl<S: ArticleSource> ArticleSource for Arc<S> {
    fn list_articles(&self) -> impl Future<Output = Result<Vec<Article>>> + Send {
        self.as_ref().list_articles()
    }

    fn get_article(&self, id: ArticleId) -> impl Future<Output = Result<Article>> + Send {
        self.as_ref().get_article(id)
    }

    fn create_article(
        &self,
        draft: &ArticleDraft,
    ) -> impl Future<Output = Result<Article>> + Send {
        self.as_ref().create_article(draft)
    }
}
