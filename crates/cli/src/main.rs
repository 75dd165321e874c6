use std::process::ExitCode;

fn main() -> ExitCode {
    jargon_jar_cli::run()
}
