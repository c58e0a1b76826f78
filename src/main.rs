use std::error::Error;
use std::thread;

use clap::Parser;
use env_logger::Builder;
use log::{debug, info, LevelFilter};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

use routesync::cli::{query_daemon, Args, Command, RunOptions};
use routesync::{config, serve};

fn run_daemon(options: &RunOptions, runtime: &Runtime) -> Result<(), Box<dyn Error>> {
    let mut config = config::from_file(&options.config_path)?;
    debug!(
        "Found {} peers in {}",
        config.peers.len(),
        options.config_path
    );
    if let Some(api) = options.api {
        config.api_addr = api;
    }

    let (stop_tx, stop_rx) = oneshot::channel::<i32>();
    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            stop_tx.send(signal).ok();
        }
    });

    let shutdown = async {
        if let Ok(signal) = stop_rx.await {
            info!("Received signal {}", signal);
        }
    };
    runtime
        .block_on(serve(config, options.stdin, shutdown))
        .map_err(|err| err as Box<dyn Error>)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let (crate_level, other_level) = match args.verbose {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        2 => (LevelFilter::Trace, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };
    Builder::new()
        .filter(Some("routesync"), crate_level)
        .filter(None, other_level)
        .init();
    info!("Logging at levels {}/{}", crate_level, other_level);

    let runtime = Runtime::new()?;
    match &args.cmd {
        Command::Run(options) => run_daemon(options, &runtime)?,
        _ => runtime.block_on(query_daemon(&args)),
    }
    Ok(())
}
