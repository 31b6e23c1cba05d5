pub mod app;
pub mod config;
pub mod console;
pub mod content;
pub mod error;
pub mod form;
pub mod query;
pub mod remote;
pub mod render;
pub mod view;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use app::App;
use config::Config;
use query::QueryCache;
use remote::HttpClient;

/// 日志级别的环境变量，例如 `CHRONICLE_LOG=chronicle=debug`
pub const LOG_ENV: &str = "CHRONICLE_LOG";

pub async fn run() -> error::Result<()> {
    // 日志写到 stderr，避免打乱交互界面
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env(LOG_ENV))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    tracing::info!(base_url = %config.remote.base_url, "starting");

    let client = HttpClient::new(&config.remote)?;
    let cache = QueryCache::new(config.query);
    let _gc = cache.spawn_gc();

    console::run(App::new(client, cache)).await
}
