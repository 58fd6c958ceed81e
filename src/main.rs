//! docsh - shell-command includes for AsciiDoc

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = docsh::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
