use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod diagnosis;
mod parsing;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("dnc_solver=debug,info")
    } else {
        EnvFilter::new("dnc_solver=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Diagnose(args) => {
            cli::diagnose::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Pairwise(args) => {
            cli::pairwise::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Taxa(args) => {
            cli::taxa::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
