use crate::demo::{run_demo, run_preview, DemoArgs, PreviewArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hireloop::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Hireloop",
    about = "Run and demonstrate the candidate communication service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Send a templated batch to a seeded roster and print the outcome
    Demo(DemoArgs),
    /// Resolve merge fields in a piece of text against sample values
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed recipients from a roster CSV instead of the built-in demo roster
    #[arg(long)]
    pub(crate) roster_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Preview(args) => run_preview(args),
    }
}
