use std::path::PathBuf;

use clap::Parser;

use learn_swiping::Config;

#[derive(Parser)]
#[command(name = "learn-swiping", about = "Flashcard learning service", version)]
struct Args {
    /// Path to a TOML config file (default: $LEARN_SWIPING_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    learn_swiping::serve(config).await
}
