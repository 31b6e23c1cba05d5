use std::{fmt::Display, str::FromStr};

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::{
    app::App,
    content::ArticleId,
    error::Result,
    form::Field,
    remote::ArticleSource,
    render::{self, Detail, FormView, Listing},
    view::ViewState,
};

const HELP: &str = "\
Commands:
  list | back        show all articles
  open <id> | <id>   read one article
  write              write a new story
  refresh            reload the current view
  help               show this message
  quit               exit
";

/// 清屏并把光标移到左上角
const SCROLL_TOP: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    List,
    Back,
    Open(ArticleId),
    Write,
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown command `{0}`, type `help` for a list of commands")]
pub struct UnknownCommand(String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = match (words.next(), words.next()) {
            (Some("list"), None) => Command::List,
            (Some("back"), None) => Command::Back,
            (Some("open"), Some(id)) => id
                .parse()
                .map(Command::Open)
                .map_err(|_| UnknownCommand(s.to_string()))?,
            (Some("write" | "new"), None) => Command::Write,
            (Some("refresh"), None) => Command::Refresh,
            (Some("help" | "?"), None) => Command::Help,
            (Some("quit" | "exit" | "q"), None) => Command::Quit,
            (Some(id), None) => id
                .parse()
                .map(Command::Open)
                .map_err(|_| UnknownCommand(s.to_string()))?,
            _ => return Err(UnknownCommand(s.to_string())),
        };

        if words.next().is_some() {
            return Err(UnknownCommand(s.to_string()));
        }
        Ok(command)
    }
}

/// 在标准输入输出上运行交互界面
pub async fn run<S: ArticleSource>(app: App<S>) -> Result<()> {
    run_with(app, BufReader::new(io::stdin()), io::stdout()).await
}

/// 在给定的输入输出上运行交互界面，直到输入结束或收到 `quit`
///
/// 请求失败只会显示错误面板，不会结束会话。
pub async fn run_with<S, R, W>(mut app: App<S>, reader: R, mut out: W) -> Result<()>
where
    S: ArticleSource,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    show(&app, &mut out).await?;

    loop {
        print(&mut out, "> ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => print(&mut out, HELP).await?,
            Ok(Command::List | Command::Back) => {
                app.show_listing();
                show(&app, &mut out).await?;
            }
            Ok(Command::Open(id)) => {
                app.show_detail(id);
                print(&mut out, SCROLL_TOP).await?;
                show(&app, &mut out).await?;
            }
            Ok(Command::Refresh) => {
                app.refresh();
                show(&app, &mut out).await?;
            }
            Ok(Command::Write) => {
                compose(&mut app, &mut lines, &mut out).await?;
                show(&app, &mut out).await?;
            }
            Err(e) => print(&mut out, format!("{}\n", e)).await?,
        }
    }

    Ok(())
}

/// 显示当前视图；首次加载时先显示加载面板
async fn show<S, W>(app: &App<S>, out: &mut W) -> Result<()>
where
    S: ArticleSource,
    W: AsyncWrite + Unpin,
{
    match app.view() {
        ViewState::Listing => {
            let mut articles = app.articles();
            if articles.state().is_loading() {
                print(out, Listing(&articles.state())).await?;
            }
            let state = articles.settled().await;
            print(out, Listing(&state)).await
        }
        ViewState::Detail(id) => {
            let mut article = app.article(id);
            let mut all = app.articles();
            if article.state().is_loading() {
                print(out, Detail {
                    article: &article.state(),
                    all: &all.state(),
                })
                .await?;
            }
            let article = article.settled().await;
            let all = all.settled().await;
            print(out, Detail {
                article: &article,
                all: &all,
            })
            .await
        }
    }
}

/// 逐项填写表单并提交，失败时可以重新提交、修改或取消
async fn compose<S, R, W>(app: &mut App<S>, lines: &mut Lines<R>, out: &mut W) -> Result<()>
where
    S: ArticleSource,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    app.form_mut().open();

    if !fill_fields(app, lines, out).await? {
        app.form_mut().close();
        return Ok(());
    }

    loop {
        print(out, FormView(app.form())).await?;
        print(out, "submit / edit / cancel > ").await?;

        let Some(answer) = lines.next_line().await? else {
            app.form_mut().close();
            return Ok(());
        };

        match answer.trim() {
            "submit" | "s" | "" => {
                // 失败原因已记录在表单状态中
                if app.submit_form().await.is_ok() {
                    return print(out, FormView(app.form())).await;
                }
            }
            "edit" | "e" => {
                if !fill_fields(app, lines, out).await? {
                    app.form_mut().close();
                    return Ok(());
                }
            }
            "cancel" | "c" => {
                app.form_mut().close();
                return Ok(());
            }
            other => print(out, format!("unknown answer `{}`\n", other)).await?,
        }
    }
}

/// 依次询问每个字段，空行保留当前值；输入结束时返回 false
async fn fill_fields<S, R, W>(app: &mut App<S>, lines: &mut Lines<R>, out: &mut W) -> Result<bool>
where
    S: ArticleSource,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    for field in Field::ALL {
        loop {
            if field == Field::Category {
                print(out, format!("({})\n", render::category_options())).await?;
            }
            let marker = if field.is_required() { " *" } else { "" };
            print(
                out,
                format!("{}{} [{}]: ", field.label(), marker, app.form().value(field)),
            )
            .await?;

            let Some(value) = lines.next_line().await? else {
                return Ok(false);
            };
            let value = value.trim();
            if value.is_empty() {
                break;
            }

            match app.form_mut().set(field, value) {
                Ok(()) => break,
                Err(e) => print(out, format!("{}\n", e)).await?,
            }
        }
    }
    Ok(true)
}

async fn print<W: AsyncWrite + Unpin>(out: &mut W, text: impl Display) -> Result<()> {
    out.write_all(text.to_string().as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::{QueryCache, QueryOptions},
        remote::fake::FakeSource,
    };

    fn app(source: FakeSource) -> App<FakeSource> {
        let options = QueryOptions {
            retry: 0,
            ..QueryOptions::default()
        };
        App::new(source, QueryCache::new(options))
    }

    async fn session(app: App<FakeSource>, input: &str) -> String {
        let mut out = Vec::new();
        run_with(app, input.as_bytes(), &mut out)
            .await
            .expect("会话失败");
        String::from_utf8(out).expect("输出不是 UTF-8")
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("list".parse::<Command>().unwrap(), Command::List);
        assert_eq!("open 7".parse::<Command>().unwrap(), Command::Open(7));
        assert_eq!(" 12 ".parse::<Command>().unwrap(), Command::Open(12));
        assert_eq!("new".parse::<Command>().unwrap(), Command::Write);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);

        assert!("open".parse::<Command>().is_err());
        assert!("open x".parse::<Command>().is_err());
        assert!("list all".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }

    #[tokio::test]
    async fn test_browse_session() {
        let output = session(app(FakeSource::with_articles([1, 2])), "open 2\nback\nquit\n").await;

        assert!(output.contains("Latest Articles (2)"));
        assert!(output.contains("Content 2"));
        assert!(output.contains(SCROLL_TOP));
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_end_session() {
        let source = FakeSource::with_articles([1]);
        source.fail_reads(true);

        let output = session(app(source), "open 1\nhelp\n").await;

        assert!(output.contains("Failed to load articles"));
        assert!(output.contains("Failed to load article"));
        assert!(output.contains("Commands:"));
    }

    #[tokio::test]
    async fn test_write_session_publishes() {
        let input = "write\nA\ncareer\n\nhttp://x/y.png\nd\nc\nsubmit\nquit\n";
        let output = session(app(FakeSource::with_articles([1])), input).await;

        assert!(output.contains("Story published successfully!"));
        assert!(output.contains("Latest Articles (2)"));
    }

    #[tokio::test]
    async fn test_write_session_rejects_missing_title() {
        // 标题留空后直接提交，再取消
        let input = "write\n\n\n\nhttp://x/y.png\nd\nc\nsubmit\ncancel\nquit\n";
        let source = FakeSource::with_articles([1]);
        let mut out = Vec::new();
        let app = app(source);

        run_with(app, input.as_bytes(), &mut out).await.unwrap();
        let output = String::from_utf8(out).unwrap();

        assert!(output.contains("missing required fields: title"));
        assert!(!output.contains("Story published successfully!"));
    }
}
