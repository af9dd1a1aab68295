use clap::Parser;
use schempaste::error::error_chain;
use schempaste::{logger, run, Cli, DefaultLoader};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init();

    tracing::info!("Starting schempaste");
    tracing::debug!("CLI arguments: {:?}", cli);

    let result = cli
        .into_config()
        .and_then(|config| run(&config, &DefaultLoader));

    match result {
        Ok(summary) => {
            tracing::info!("Done, {} schematic(s) pasted", summary.pasted.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}
