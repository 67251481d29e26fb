use clap::Parser;
use color_eyre::eyre::{self, Context};
use std::path::PathBuf;
use torii_config::Configuration;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Demo server guarding its forms with CSRF tokens and keeping state in server-side sessions
#[derive(Parser)]
#[command(about, author, version)]
struct Args {
    /// Path to the configuration file
    #[clap(long, short)]
    config: PathBuf,
}

async fn boot() -> eyre::Result<()> {
    let args = Args::parse();
    let config = Configuration::load(args.config)
        .await
        .wrap_err("Failed to load the configuration")?;
    torii_observability::initialise()?;

    torii::http::run(&config).await
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(boot())
}
