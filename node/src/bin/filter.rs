use clap::{Arg, Command};
use commonware_macros::select;
use commonware_runtime::{tokio, Metrics as _, Runner};
use finality_node::{run, Config};
use tracing::{debug, error, info};

fn main() {
    // Parse arguments
    let matches = Command::new("filter")
        .about("maintain a filtered copy of block bundles")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .help("Path to the YAML configuration")
                .required(true),
        )
        .get_matches();

    // Load config
    let path = matches
        .get_one::<String>("config")
        .expect("config is required");
    let config = Config::load(path).unwrap_or_else(|err| {
        eprintln!("could not load config {path}: {err}");
        std::process::exit(1);
    });
    let level = config.level().expect("level validated with config");

    // Create logger
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .with_line_number(true)
            .with_file(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_max_level(level).init();
    }
    info!(path, "loaded config");

    // Run until the pipeline stops or we are interrupted
    let executor = tokio::Runner::default();
    let result = executor.start(|context| async move {
        let result = select! {
            result = run(context.clone(), config) => {
                result
            },
            _ = ::tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                Ok(())
            },
        };
        debug!(metrics = %context.encode(), "final metrics");
        result
    });
    if let Err(err) = result {
        error!(?err, "filter failed");
        std::process::exit(1);
    }
}
