use std::process::ExitCode;

fn main() -> ExitCode {
    copo_cli::run()
}
