mod args;

use std::{fs::File, io};

use anyhow::{Context, Error};
use clap::Parser;
use simpleio::Benchmark;
use tracing::{event, Level};
use tracing_subscriber::{prelude::*, EnvFilter, FmtSubscriber};

use crate::args::CliArgs;

fn main() {
    let args = CliArgs::parse();

    if let Err(error) = init_tracing() {
        eprintln!("failed to set up logging:\n{:?}", error);
        std::process::exit(1);
    }

    // Run main
    let result = try_main(args);

    // Report any otherwise unhandled errors
    if let Err(error) = result {
        event!(Level::ERROR, "failed:\n{:?}", error);
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<(), Error> {
    // Logs go to stderr, stdout only carries the report
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::builder().parse("info"))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_writer(io::stderr)
        .with_target(false)
        .finish()
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn try_main(args: CliArgs) -> Result<(), Error> {
    let config = args.to_config()?;

    // Set up the benchmark, with the log file receiving per-thread results
    let mut benchmark = Benchmark::new(config, Box::new(io::stdout()))?;
    if let Some(path) = &args.log {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        benchmark = benchmark.with_detail(Box::new(file));
    }

    event!(
        Level::INFO,
        dir = %args.target_dir.display(),
        name = %args.name,
        threads = args.threads.get(),
        "starting benchmark"
    );
    benchmark.start()?;

    Ok(())
}
