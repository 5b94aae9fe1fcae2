use crate::offline::{run_score, run_validate, ScoreArgs, ValidateArgs};
use crate::server;
use cellscan::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "CellScan",
    about = "Serve and check the CellScan risk-assessment quiz",
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
    /// Work with question and risk-band files without starting the server
    Quiz {
        #[command(subcommand)]
        command: QuizCommand,
    },
}

#[derive(Subcommand, Debug)]
enum QuizCommand {
    /// Check that a question set and band table load and fit together
    Validate(ValidateArgs),
    /// Score a recorded set of answers and print the matching risk band
    Score(ScoreArgs),
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
        Command::Quiz {
            command: QuizCommand::Validate(args),
        } => run_validate(args),
        Command::Quiz {
            command: QuizCommand::Score(args),
        } => run_score(args),
    }
}
