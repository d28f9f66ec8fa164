use crate::demo::{run_demo, run_shape, run_versions, DemoArgs, ShapeArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use pactum::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Pactum API",
    about = "Serve and inspect the Pactum API versioning and migration engine",
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
    /// Print the version registry with capabilities and deprecations
    Versions,
    /// Shape a JSON payload for a given API version
    Shape(ShapeArgs),
    /// Walk through plan, validate, execute and rollback against in-memory infrastructure
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
        Command::Versions => run_versions(),
        Command::Shape(args) => run_shape(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_to_serve_when_no_subcommand() {
        let cli = Cli::try_parse_from(["pactum-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_shape_arguments() {
        let cli = Cli::try_parse_from([
            "pactum-api",
            "shape",
            "--api-version",
            "1.0",
            "payload.json",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Shape(args)) => {
                assert_eq!(args.api_version, "1.0");
                assert_eq!(args.file, PathBuf::from("payload.json"));
            }
            other => panic!("expected shape command, got {other:?}"),
        }
    }

    #[test]
    fn demo_accepts_a_usage_export() {
        let cli = Cli::try_parse_from(["pactum-api", "demo", "--usage-csv", "usage.csv"])
            .expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.usage_csv, Some(PathBuf::from("usage.csv")));
                assert_eq!(args.tenant, "acme");
            }
            other => panic!("expected demo command, got {other:?}"),
        }
    }
}
