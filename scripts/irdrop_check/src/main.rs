use anyhow::Context;
use clap::Parser;
use irdrop_check::Args;
use log::LevelFilter;

pub fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .try_init();

    let config = args.run_config()?;
    let summary = irdrop::run(&config).context("IR drop check failed")?;
    println!("{}", summary.outcome);
    Ok(())
}
