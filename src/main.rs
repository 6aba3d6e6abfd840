use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

pub mod config;
use config::app_config::{PROBE_COUNT, load_config};
use config::args::Args;
pub mod error;
use error::TripperError;
pub mod http_probe;
use http_probe::{prelude::*, report};
pub mod logging;
pub mod pipeline;
use pipeline::aggregator::Aggregator;
pub mod reporter;
use reporter::{render_json, render_text};
pub mod trace;

#[tokio::main]
async fn main() {
    let started = Instant::now();

    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    logging::init_logging(args.debug);

    if let Err(err) = run(&args, started).await {
        eprintln!("tripper: {}", report(&err));
        std::process::exit(1);
    }
}

async fn run(args: &Args, started: Instant) -> Result<(), TripperError> {
    let config = load_config(args)?;
    let client = Arc::new(ProbeClient::from_config(&config)?);

    log::debug!("probing {} with {} concurrent requests", config.url, PROBE_COUNT);
    let result = Aggregator::new(&config, client, PROBE_COUNT)
        .run(started)
        .await?;

    if config.json {
        println!("{}", render_json(&result)?);
    } else {
        print!("{}", render_text(&result, config.url.as_str()));
    }
    Ok(())
}
