use std::sync::Arc;

use crate::{
    content::{Article, ArticleId},
    error::Result,
    form::ArticleForm,
    query::{QueryCache, QueryKey, Subscription},
    remote::ArticleSource,
    view::ViewState,
};

/// 应用程序上下文
///
/// [`App`] 把文章来源、查询缓存、导航状态和创建表单组合在一起，
/// 展示层只通过它读取数据和触发操作。
pub struct App<S> {
    source: Arc<S>,
    cache: QueryCache,
    view: ViewState,
    form: ArticleForm,
}

impl<S: ArticleSource> App<S> {
    /// 创建一个新的 [`App`] 实例，初始显示文章列表
    pub fn new(source: S, cache: QueryCache) -> Self {
        Self {
            source: Arc::new(source),
            cache,
            view: ViewState::default(),
            form: ArticleForm::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn form(&self) -> &ArticleForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ArticleForm {
        &mut self.form
    }

    /// 订阅文章列表 `["articles"]`
    pub fn articles(&self) -> Subscription<Vec<Article>> {
        let source = self.source.clone();
        self.cache.subscribe(QueryKey::articles(), move || {
            let source = source.clone();
            async move { source.list_articles().await }
        })
    }

    /// 订阅单篇文章 `["article", id]`
    pub fn article(&self, id: ArticleId) -> Subscription<Article> {
        let source = self.source.clone();
        self.cache.subscribe(QueryKey::article(id), move || {
            let source = source.clone();
            async move { source.get_article(id).await }
        })
    }

    pub fn show_detail(&mut self, id: ArticleId) {
        self.view.show_detail(id);
    }

    pub fn show_listing(&mut self) {
        self.view.show_listing();
    }

    /// 让当前视图用到的查询失效并重新请求
    pub fn refresh(&self) {
        self.cache.invalidate(&QueryKey::articles());
        if let Some(id) = self.view.selected_article() {
            self.cache.invalidate(&QueryKey::article(id));
        }
    }

    pub async fn submit_form(&mut self) -> Result<Article> {
        self.form.submit(&self.source, &self.cache).await
    }
}
