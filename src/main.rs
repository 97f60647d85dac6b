use std::process::ExitCode;

fn main() -> ExitCode {
    match shardpack::app::run_cli(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
