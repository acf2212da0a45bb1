use clap::Parser;
use blacklist_gateway::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Sync(args) => cli::sync::run(args).await,
        Command::Sign(args) => cli::sign::run(args),
    }
}
