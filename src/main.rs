//! Marquee CLI binary.

use std::io::Write;
use std::process;

use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use marquee::cli::args::*;
use marquee::cli::commands::*;

fn main() {
    let args = MarqueeArgs::parse();

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error, // Quiet mode
        1 => LevelFilter::Warn,  // Default
        2 => LevelFilter::Info,  // Verbose
        _ => LevelFilter::Debug, // Very verbose (3+)
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(args: MarqueeArgs) -> anyhow::Result<()> {
    let command = command_name(&args.command);
    execute_command(args).with_context(|| format!("{command} failed"))
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Index(_) => "index",
        Command::Recommend(_) => "recommend",
        Command::Similar(_) => "similar",
        Command::Stats => "stats",
        Command::Compact => "compact",
    }
}
