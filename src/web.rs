#![cfg(not(tarpaulin_include))]

use kari_dashboard::app;
use kari_dashboard::config::Config;
use std::env;

/// Main entry point for the upload service
///
/// Settings come from `DASHBOARD_*` environment variables and may be
/// overridden on the command line:
///
/// * `--bind <addr>` - listen address, default `127.0.0.1:3000`
/// * `--static-dir <dir>` - directory served for every non-API path
/// * `--max-upload-mb <n>` - request body limit for uploads
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,tower_http=debug")).init();

    let mut config = Config::from_env()?;
    let unknown = config.apply_args(env::args().skip(1))?;
    if !unknown.is_empty() {
        log::warn!("ignoring arguments {unknown:?}");
    }

    app::run(config).await
}
