//! lagtex - annotated Agda sources to reusable LaTeX macros

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = lagtex::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
