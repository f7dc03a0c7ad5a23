use std::process::ExitCode;

fn main() -> ExitCode {
    expensy_cli::run()
}
