//! icpfind CLI entry point.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match icpfind_cli::run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(icpfind_cli::error::exit_code_from_error(&err))
        },
    }
}
