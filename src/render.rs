use std::fmt::{self, Display, Formatter};

use crate::{
    content::{Article, Category, latest_articles},
    error::Error,
    form::{ArticleForm, Field, FormStatus},
    query::QueryState,
};

const RULE: &str = "────────────────────────────────────────";
const LATEST_LIMIT: usize = 3;

/// 文章列表视图
pub struct Listing<'a>(pub &'a QueryState<Vec<Article>>);

/// 文章详情视图，带“最新文章”侧栏
pub struct Detail<'a> {
    pub article: &'a QueryState<Article>,
    pub all: &'a QueryState<Vec<Article>>,
}

/// 创建表单视图
pub struct FormView<'a>(pub &'a ArticleForm);

fn badge(category: Category) -> String {
    let style = category.style();
    format!("[{} {}]", style.icon, category)
}

fn loading_panel(f: &mut Formatter<'_>, message: &str) -> fmt::Result {
    writeln!(f, "⏳ {}", message)
}

fn error_panel(f: &mut Formatter<'_>, title: &str, hint: &str) -> fmt::Result {
    writeln!(f, "{}", RULE)?;
    writeln!(f, "✖ {}", title)?;
    writeln!(f, "  {}", hint)?;
    writeln!(f, "{}", RULE)
}

impl Display for Listing<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.0;

        if state.is_loading() {
            return loading_panel(f, "Loading stories...");
        }

        let Some(articles) = state.data.as_deref() else {
            return error_panel(
                f,
                "Failed to load articles",
                "Make sure the article backend is running, then type `refresh`.",
            );
        };

        writeln!(f, "CA Monk Chronicle")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Latest Articles ({})", articles.len())?;
        if state.is_error() {
            writeln!(f, "(refresh failed, showing earlier results)")?;
        }
        writeln!(f)?;

        if articles.is_empty() {
            writeln!(f, "No stories yet. Type `write` to publish the first one.")?;
        }

        for article in articles {
            writeln!(
                f,
                "#{:<4} {} · {}",
                article.id,
                badge(article.category),
                article.read_time
            )?;
            writeln!(f, "      {}", article.title)?;
            writeln!(f, "      {}", article.description)?;
        }
        Ok(())
    }
}

impl Display for Detail<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.article;

        if state.is_loading() {
            return loading_panel(f, "Loading article...");
        }

        let Some(article) = state.data.as_deref() else {
            let title = match state.error.as_deref() {
                Some(Error::NotFound(id)) => format!("Article {} does not exist", id),
                _ => "Failed to load article".to_string(),
            };
            return error_panel(f, &title, "Type `back` to return to the articles.");
        };

        writeln!(f, "{} · {}", badge(article.category), article.read_time)?;
        writeln!(f, "{}", article.title)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "{}", article.description)?;
        writeln!(f)?;
        writeln!(f, "{}", article.content)?;
        writeln!(f)?;
        writeln!(f, "{} #ca", article.category.style().hashtag)?;
        writeln!(f, "Cover: {}", article.cover_image)?;

        if let Some(all) = self.all.data.as_deref() {
            let latest = latest_articles(all, article.id, LATEST_LIMIT);
            if !latest.is_empty() {
                writeln!(f, "{}", RULE)?;
                writeln!(f, "Latest Articles")?;
                for other in latest {
                    writeln!(
                        f,
                        "  #{:<4} {} {} · {}",
                        other.id,
                        badge(other.category),
                        other.title,
                        other.read_time
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl Display for FormView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let form = self.0;

        writeln!(f, "Write Your Story")?;
        writeln!(f, "{}", RULE)?;
        for field in Field::ALL {
            let marker = if field.is_required() { " *" } else { "" };
            let value = form.value(field);
            match field {
                Field::Description | Field::Content => writeln!(
                    f,
                    "{}{}: {} ({} characters)",
                    field.label(),
                    marker,
                    value,
                    value.chars().count()
                )?,
                _ => writeln!(f, "{}{}: {}", field.label(), marker, value)?,
            }
        }

        match form.status() {
            FormStatus::Idle => Ok(()),
            FormStatus::Submitting => writeln!(f, "Publishing..."),
            FormStatus::Invalid(e) => writeln!(f, "✖ {}", e),
            FormStatus::Failed {
                message,
                maybe_created,
            } => {
                writeln!(f, "✖ Failed to publish. Please try again. ({})", message)?;
                if *maybe_created {
                    writeln!(
                        f,
                        "  The story may already have been published. Check the articles before resubmitting."
                    )?;
                }
                Ok(())
            }
            FormStatus::Published(article) => {
                writeln!(f, "✔ Story published successfully! (#{})", article.id)
            }
        }
    }
}

/// 分类选项，用于表单提示
pub fn category_options() -> String {
    Category::ALL
        .iter()
        .map(|c| format!("{} {}", c.style().icon, c.style().label))
        .collect::<Vec<_>>()
        .join(" / ")
}
