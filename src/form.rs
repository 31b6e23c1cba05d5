use crate::{
    content::{Article, ArticleDraft, ValidationError},
    error::Result,
    query::{QueryCache, QueryKey},
    remote::ArticleSource,
};

/// 表单中可编辑的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Category,
    ReadTime,
    CoverImage,
    Description,
    Content,
}

impl Field {
    /// 按表单中的显示顺序排列
    pub const ALL: [Field; 6] = [
        Field::Title,
        Field::Category,
        Field::ReadTime,
        Field::CoverImage,
        Field::Description,
        Field::Content,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Story Title",
            Field::Category => "Category",
            Field::ReadTime => "Read Time",
            Field::CoverImage => "Cover Image URL",
            Field::Description => "Short Description",
            Field::Content => "Full Story Content",
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(self, Field::ReadTime)
    }
}

/// 表单提交状态
#[derive(Debug, Clone, PartialEq)]
pub enum FormStatus {
    Idle,
    Submitting,
    /// 客户端校验未通过，没有发出请求
    Invalid(ValidationError),
    /// 请求失败，输入保留
    Failed {
        message: String,
        maybe_created: bool,
    },
    Published(Article),
}

/// 创建文章的表单流程
///
/// 校验通过后调用 [`ArticleSource::create_article`]，成功时让文章列表失效、
/// 清空输入并关闭表单；失败时保持打开并保留输入，用户可以再次提交。
#[derive(Debug)]
pub struct ArticleForm {
    draft: ArticleDraft,
    open: bool,
    status: FormStatus,
}

impl Default for ArticleForm {
    fn default() -> Self {
        Self {
            draft: ArticleDraft::default(),
            open: false,
            status: FormStatus::Idle,
        }
    }
}

impl ArticleForm {
    pub fn open(&mut self) {
        self.open = true;
        if matches!(self.status, FormStatus::Published(_)) {
            self.status = FormStatus::Idle;
        }
    }

    /// 关闭表单，已输入的内容保留到下次打开
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> &ArticleDraft {
        &self.draft
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.draft.title,
            Field::Category => self.draft.category.as_str(),
            Field::ReadTime => &self.draft.read_time,
            Field::CoverImage => &self.draft.cover_image,
            Field::Description => &self.draft.description,
            Field::Content => &self.draft.content,
        }
    }

    /// 修改一个字段；分类无法识别时保持原值并返回错误
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        match field {
            Field::Title => self.draft.title = value,
            Field::Category => self.draft.category = value.parse()?,
            Field::ReadTime => self.draft.read_time = value,
            Field::CoverImage => self.draft.cover_image = value,
            Field::Description => self.draft.description = value,
            Field::Content => self.draft.content = value,
        }
        Ok(())
    }

    /// 提交表单
    ///
    /// 校验失败时不会发出请求。失败后再次提交会重新调用
    /// [`ArticleSource::create_article`]，可能产生重复文章。
    pub async fn submit<S: ArticleSource>(
        &mut self,
        source: &S,
        cache: &QueryCache,
    ) -> Result<Article> {
        if let Err(e) = self.draft.validate() {
            tracing::debug!(error = %e, "form validation failed");
            self.status = FormStatus::Invalid(e.clone());
            return Err(e.into());
        }

        self.status = FormStatus::Submitting;

        match source.create_article(&self.draft).await {
            Ok(article) => {
                cache.invalidate(&QueryKey::articles());
                self.draft = ArticleDraft::default();
                self.open = false;
                self.status = FormStatus::Published(article.clone());
                Ok(article)
            }
            Err(e) => {
                tracing::warn!(error = %e, maybe_created = e.maybe_created(), "publish failed");
                self.status = FormStatus::Failed {
                    message: e.to_string(),
                    maybe_created: e.maybe_created(),
                };
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        content::Category,
        error::Error,
        remote::fake::FakeSource,
    };

    fn filled_form() -> ArticleForm {
        let mut form = ArticleForm::default();
        form.open();
        form.set(Field::Title, "A").unwrap();
        form.set(Field::Category, "finance").unwrap();
        form.set(Field::Description, "d").unwrap();
        form.set(Field::Content, "c").unwrap();
        form.set(Field::CoverImage, "http://x/y.png").unwrap();
        form
    }

    #[test]
    fn test_defaults() {
        let form = ArticleForm::default();
        assert!(!form.is_open());
        assert_eq!(form.value(Field::Category), "FINANCE");
        assert_eq!(form.value(Field::ReadTime), "5 min read");
        assert!(!Field::ReadTime.is_required());
    }

    #[test]
    fn test_unknown_category_keeps_previous_value() {
        let mut form = ArticleForm::default();
        form.set(Field::Category, "career").unwrap();

        let err = form.set(Field::Category, "sports").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::UnknownCategory(_))
        ));
        assert_eq!(form.draft().category, Category::Career);
    }

    #[tokio::test]
    async fn test_empty_title_blocks_submission() {
        let source = FakeSource::default();
        let cache = QueryCache::default();
        let mut form = filled_form();
        form.set(Field::Title, "").unwrap();

        let err = form.submit(&source, &cache).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(source.creates(), 0, "校验失败不应发出请求");
        assert!(form.is_open());
        assert_eq!(
            form.status(),
            &FormStatus::Invalid(ValidationError::MissingFields(vec!["title"]))
        );
    }

    #[tokio::test]
    async fn test_publish_refreshes_listing_and_closes() {
        let source = Arc::new(FakeSource::with_articles([1, 2]));
        let cache = QueryCache::default();

        let mut listing = cache.subscribe(QueryKey::articles(), {
            let source = source.clone();
            move || {
                let source = source.clone();
                async move { source.list_articles().await }
            }
        });
        assert_eq!(listing.settled().await.data.map(|a| a.len()), Some(2));

        let mut form = filled_form();
        let article = form.submit(&source, &cache).await.expect("发布失败");

        assert_eq!(article.title, "A");
        assert!(!form.is_open());
        assert_eq!(form.draft(), &ArticleDraft::default());
        assert_eq!(form.status(), &FormStatus::Published(article.clone()));

        // 列表失效后重新请求，包含新文章
        let state = listing.settled().await;
        let articles = state.data.expect("列表应有数据");
        assert_eq!(articles.len(), 3);
        assert!(articles.iter().any(|a| a.id == article.id && a.title == "A"));
        assert_eq!(source.lists(), 2);
    }

    #[tokio::test]
    async fn test_failed_publish_keeps_input_and_allows_resubmit() {
        let source = FakeSource::default();
        let cache = QueryCache::default();
        source.fail_writes(true);

        let mut form = filled_form();
        let err = form.submit(&source, &cache).await.unwrap_err();

        assert!(matches!(err, Error::RemoteWrite { .. }));
        assert!(form.is_open());
        assert_eq!(form.draft().title, "A");
        assert!(matches!(
            form.status(),
            FormStatus::Failed {
                maybe_created: false,
                ..
            }
        ));

        source.fail_writes(false);
        form.submit(&source, &cache).await.expect("重新提交失败");
        assert_eq!(source.creates(), 2);
        assert!(!form.is_open());
    }

    #[test]
    fn test_reopen_after_publish_resets_status() {
        let mut form = ArticleForm {
            status: FormStatus::Published(crate::remote::fake::sample(1)),
            ..ArticleForm::default()
        };

        form.open();
        assert_eq!(form.status(), &FormStatus::Idle);
    }
}
