use anyhow::Result;
use clap::Parser;
use erasure_cli::args::CliArgs;
use erasure_cli::{driver, tracing_config};
use std::io::Write;

fn main() -> Result<()> {
    // No-op unless ERASURE_LOG or RUST_LOG is set.
    tracing_config::init_tracing();

    let args = CliArgs::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    driver::run(&args, &mut out)?;
    out.flush()?;
    Ok(())
}
