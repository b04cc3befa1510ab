mod cache;
mod cli;
mod error;
mod heatmap;
mod index;
mod normalize;
mod overlap;
mod progress;
mod provider;
mod service;
mod utils;

/// Main entry point of the application.
///
/// This function orchestrates the entire workflow:
/// 1. Parses command-line arguments and sets up logging.
/// 2. Determines the number of threads used to load index tables.
/// 3. Builds the provider, the process-wide constituent cache and the service.
/// 4. Runs the requested command and prints its JSON result.
///
/// Request failures are printed as `{"error", "kind"}` and exit with 2 for
/// caller mistakes, 1 otherwise.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if startup or output fails.
fn main() -> anyhow::Result<()> {
    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();
    init_logging(&args);

    let effective_threads = match args.threads {
        Some(n) if n > 0 => {
            let max_threads = num_cpus::get();
            if n > max_threads {
                log::warn!("Limiting thread count to {} (max available)", max_threads);
                Some(max_threads)
            } else {
                Some(n)
            }
        }
        Some(_) => return Err(anyhow::anyhow!("Number of threads must be a positive integer")),
        None => None,
    };
    log::debug!(
        "Using {} thread(s), data in {}",
        effective_threads.unwrap_or_else(rayon::current_num_threads),
        args.data_dir.display()
    );

    let provider = std::sync::Arc::new(provider::CsvDirectoryProvider::new(&args.data_dir));
    let cache = std::sync::Arc::new(cache::ConstituentCache::new(provider));
    let service = service::OverlapService::new(cache).with_progress(!args.quiet);

    let outcome = if let Some(n) = effective_threads {
        let local_pool = utils::configure_thread_pool(n)?;
        local_pool.install(|| run(&service, &args.command))
    } else {
        run(&service, &args.command)
    };
    log::debug!(
        "Finished in {:.3}s with {} cached index tables",
        total_start.elapsed().as_secs_f64(),
        service.cache().len()
    );

    match outcome {
        Ok(value) => print_json(&value, args.pretty),
        Err(err) => {
            log::error!("{}", err);
            let body = serde_json::json!({ "error": err.to_string(), "kind": err.kind() });
            print_json(&body, args.pretty)?;
            std::process::exit(if err.is_client_error() { 2 } else { 1 });
        }
    }
}

/// Runs one command against the service and returns its JSON response.
fn run(service: &service::OverlapService, command: &cli::Command) -> error::Result<serde_json::Value> {
    match command {
        cli::Command::Providers => to_json(&index::providers()),
        cli::Command::Indices { source } => to_json(&*service.list_indices(source)?),
        cli::Command::Components { code, source } => to_json(&*service.get_components(code, source)?),
        cli::Command::Overlap(selection) => to_json(&service.get_overlap(&cli::load_selection(selection)?)?),
        cli::Command::Heatmap(selection) => to_json(&service.get_heatmap(&cli::load_selection(selection)?)?),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> error::Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| error::OverlapError::Internal(format!("Failed to encode response: {}", e)))
}

fn print_json(value: &serde_json::Value, pretty: bool) -> anyhow::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    anyhow::Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins unless `--verbose`/`--quiet` is given.
fn init_logging(args: &cli::Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}
