use std::process::ExitCode;

use clap::Parser;
use kalculator::{AppError, CLIArguments, allocate_main};
use tracing::error;

fn main() -> ExitCode {
    let args = CLIArguments::parse();
    args.logging.init();

    match allocate_main(args.allocate) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err.downcast_ref::<AppError>().map_or("other", AppError::kind);
            error!(kind, "{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
