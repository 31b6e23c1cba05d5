use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use reqwest::StatusCode;

use super::ArticleSource;
use crate::{
    content::{Article, ArticleDraft, ArticleId, Category},
    error::{Error, RemoteCause, Result},
};

/// 内存中的文章来源，记录调用次数并可以模拟失败
#[derive(Default)]
pub(crate) struct FakeSource {
    articles: Mutex<Vec<Article>>,
    lists: AtomicUsize,
    creates: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

pub(crate) fn sample(id: ArticleId) -> Article {
    Article {
        id,
        title: format!("Article {}", id),
        category: Category::ALL[id as usize % 3],
        description: format!("Description {}", id),
        content: format!("Content {}", id),
        cover_image: format!("https://images.example.com/{}.png", id),
        read_time: "5 min read".to_string(),
    }
}

impl FakeSource {
    pub fn with_articles(ids: impl IntoIterator<Item = ArticleId>) -> Self {
        Self {
            articles: Mutex::new(ids.into_iter().map(sample).collect()),
            ..Self::default()
        }
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read_failure(&self) -> Option<Error> {
        self.fail_reads.load(Ordering::SeqCst).then(|| {
            Error::RemoteFetch(RemoteCause::Status(StatusCode::INTERNAL_SERVER_ERROR))
        })
    }
}

impl ArticleSource for FakeSource {
    async fn list_articles(&self) -> Result<Vec<Article>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.read_failure() {
            return Err(e);
        }
        Ok(self.articles.lock().unwrap().clone())
    }

    async fn get_article(&self, id: ArticleId) -> Result<Article> {
        if let Some(e) = self.read_failure() {
            return Err(e);
        }
        self.articles
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    async fn create_article(&self, draft: &ArticleDraft) -> Result<Article> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::RemoteWrite {
                cause: RemoteCause::Status(StatusCode::SERVICE_UNAVAILABLE),
                maybe_created: false,
            });
        }

        let mut articles = self.articles.lock().unwrap();
        let id = articles.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let article = draft.clone().into_article(id);
        articles.push(article.clone());
        Ok(article)
    }
}
