use anyhow::Context;
use scribe::domain::config::{ApiConfig, LogConfig};
use scribe::kernel::config::load_config;
use scribe_logger::Logger;
use scribe_server::Server;

fn init_logger(log: &LogConfig) -> anyhow::Result<Logger> {
    let builder = Logger::builder().name(env!("CARGO_PKG_NAME")).env_filter(log.filter.clone());

    let logger = match &log.dir {
        Some(dir) if log.json => builder.path(dir).json().init()?,
        Some(dir) => builder.path(dir).init()?,
        None => builder.init()?,
    };
    Ok(logger)
}

#[scribe_runtime::main(server)]
async fn main() -> anyhow::Result<()> {
    let cfg: ApiConfig =
        load_config(Some("server")).context("Critical: Configuration is malformed")?;

    let _log = init_logger(&cfg.log)?;

    Server::builder().config(cfg).build().await?.run().await
}
