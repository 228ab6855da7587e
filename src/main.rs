use std::net::SocketAddr;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use estate::api::{ApiError, EstateArgs};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "estate",
    version,
    about = "Estate tax, liquidity and heir income projection"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, env = "ESTATE_LISTEN", default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },
    /// Print one projection as JSON.
    Project(EstateArgs),
    /// Print the projection with and without planning levers.
    Compare(EstateArgs),
    /// Find the smallest charitable bequest that meets a total tax target.
    SolveBequest {
        #[command(flatten)]
        args: EstateArgs,
        #[arg(long, default_value_t = 0.0)]
        target_total_tax: f64,
    },
}

async fn run(cli: Cli) -> Result<(), ApiError> {
    let output = match cli.command {
        Command::Serve { listen } => return estate::api::run_http_server(listen).await,
        Command::Project(args) => estate::api::render_projection(args)?,
        Command::Compare(args) => estate::api::render_comparison(args)?,
        Command::SolveBequest {
            args,
            target_total_tax,
        } => estate::api::render_bequest_solve(args, target_total_tax)?,
    };
    println!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("estate=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
