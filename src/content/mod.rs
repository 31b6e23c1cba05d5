mod article;
mod category;

pub use self::{
    article::{
        Article, ArticleDraft, ArticleId, DEFAULT_READ_TIME, ValidationError, latest_articles,
    },
    category::{Category, CategoryStyle},
};

pub(crate) use self::article::lenient_opt_id;
