//! Serve command

use crate::app::ServeArgs;
use anyhow::Result;
use citerag_core::Config;

pub async fn run(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    citerag_server::start_server(config).await
}
