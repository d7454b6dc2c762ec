use clap::Parser;
use unusual_flow::cli::{Cli, Commands};
use unusual_flow::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())?;

    let _telemetry = unusual_flow::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Scan(args) => args.execute(&config).await?,
        Commands::Sweep(args) => args.execute(&config).await?,
        Commands::Status(args) => args.execute(&config).await?,
        Commands::Config => println!("{:#?}", config),
    }

    Ok(())
}
