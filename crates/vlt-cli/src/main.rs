use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::error;
use tracing_subscriber::FmtSubscriber;
use vlt_cli::cli::{Cli, Commands};
use vlt_cli::commands;

fn main() {
    let cli = Cli::parse();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install tracing subscriber");
    }

    let result = match &cli.command {
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Verify(args) => commands::verify::run(args),
        Commands::Evaluate(args) => commands::evaluate::run(args),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            generate(*shell, &mut command, "vlt", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
