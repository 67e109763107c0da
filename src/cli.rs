use crate::commands::{run_classify, run_evaluate, run_validate, ClassifyArgs, EvaluateArgs, ValidateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use collections_strategy::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "collections-strategy",
    about = "Classify collection accounts and run operator-authored strategies",
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
    /// Classify accounts with the ordered rule list
    Classify(ClassifyArgs),
    /// Walk a strategy graph for every account in a file
    Evaluate(EvaluateArgs),
    /// Report authoring issues in a strategy graph
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Classify(args) => run_classify(args),
        Command::Evaluate(args) => run_evaluate(args),
        Command::Validate(args) => run_validate(args),
    }
}
