//! silo-gt CLI binary.

use std::io::Write;
use std::process;

use clap::Parser;
use env_logger::{Builder, Env};
use log::LevelFilter;

use silo_gt::cli::args::*;
use silo_gt::cli::commands::*;

/// Build the logger: `-v`/`-q` win over `RUST_LOG`, which wins over `warn`.
fn logger(filter: Option<LevelFilter>) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = filter {
        builder.filter_level(level);
    }
    builder.format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
    builder
}

fn main() {
    let args = GroundtruthArgs::parse();
    logger(args.log_filter()).init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
