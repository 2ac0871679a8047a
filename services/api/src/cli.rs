use crate::demo::{run_certification, run_demo, CertificationArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use esg_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "ESG Engine",
    about = "Run and demonstrate the ESG scoring, certification and entitlement engine",
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
    /// Look up the score tier and certificate badge for a score
    Certification(CertificationArgs),
    /// Run an end-to-end demo: questionnaire, scoring, report, subscription and consultation
    Demo(DemoArgs),
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
        Command::Certification(args) => run_certification(args),
        Command::Demo(args) => run_demo(args),
    }
}
