use std::process::ExitCode;

fn main() -> ExitCode {
    archscribe::cli::run()
}
