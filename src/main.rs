use clap::Parser;
use fin_analyst::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
