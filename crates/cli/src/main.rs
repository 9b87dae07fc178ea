use std::process::ExitCode;

fn main() -> ExitCode {
    stockroom_cli::run()
}
