//! emolabel CLI entry point

use clap::Parser;
use emolabel::cli::{self, Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("EMOLABEL_LOG"))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Login(args) => cli::login::run(args).await,
        Commands::Logout(args) => cli::logout::run(args).await,
        Commands::Status(args) => cli::status::run(args).await,
        Commands::Annotate(args) => cli::annotate::run(args).await,
        Commands::Test(args) => cli::test::run(args).await,
        Commands::Consistency(args) => cli::consistency::run(args).await,
        Commands::Admin(args) => cli::admin::run(args).await,
        Commands::Config(args) => cli::config::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
