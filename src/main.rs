use clap::Parser;

use gridpaint::{cli, logger};

fn main() -> std::process::ExitCode {
    let args = cli::CliArgs::parse();

    // --log-file with no value writes to the default session log
    let log_file = args
        .log_file
        .as_ref()
        .map(|p| p.clone().unwrap_or_else(logger::default_log_path));
    logger::init(args.verbose, log_file.as_deref());

    cli::run(args)
}
