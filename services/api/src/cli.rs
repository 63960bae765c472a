use crate::score::{run_score, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use incident_watch::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "incident-watch",
    about = "Incident report intake with distress scoring and urgent escalation",
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
    /// Insert the sample reports into the configured store and backfill statuses
    Seed,
    /// Segment and score a narrative with the configured sentiment model
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
    /// Load the sample reports before accepting traffic
    #[arg(long)]
    pub(crate) seed: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed => server::seed().await,
        Command::Score(args) => run_score(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["incident-watch-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from([
            "incident-watch-api",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--seed",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(8080));
                assert!(args.seed);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn score_requires_text() {
        assert!(Cli::try_parse_from(["incident-watch-api", "score"]).is_err());
        let cli = Cli::try_parse_from(["incident-watch-api", "score", "--text", "I was hurt."])
            .expect("parses");
        assert!(matches!(cli.command, Some(Command::Score(_))));
    }
}
