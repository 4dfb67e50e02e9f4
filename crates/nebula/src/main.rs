mod bindings;
mod cli;
mod paths;
mod run;

use std::process::ExitCode;

use anyhow::Result;
use cli::Command;

fn main() -> Result<ExitCode> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Check { shader }) => {
            let passed = run::check(&shader)?;
            Ok(if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(Command::Where) => run::print_where().map(|()| ExitCode::SUCCESS),
        None => run::run(cli.run).map(|()| ExitCode::SUCCESS),
    }
}
