//! depgate - dependency scheduling and date-conflict validation

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = depgate::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
