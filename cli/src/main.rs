mod cli;
mod opts;

use anyhow::Result;
use clap::Parser;
use opts::{Opts, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    cli::init_logger(opts.log_level.into());
    let settings = Settings::from_opts(opts)?;
    cli::run(settings).await
}
