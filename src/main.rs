use clap::Parser;
use color_eyre::Result;
use dtgrid::cli::{apply_args, initial_cell};
use dtgrid::{AppConfig, Args, CacheManager, ConfigManager, APP_NAME};
use std::fs::OpenOptions;
use std::path::PathBuf;

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(config_manager) => match config_manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Configuration file written to: {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration file: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.clear_cache {
        match CacheManager::new(APP_NAME) {
            Ok(cache) => {
                match cache.clear_all() {
                    Ok(removed) => {
                        println!("Cache cleared successfully ({} entries removed)", removed)
                    }
                    Err(e) => {
                        eprintln!("Error clearing cache: {}", e);
                        std::process::exit(1);
                    }
                }
                return Ok(Some(()));
            }
            Err(_e) => {
                println!("No cache to clear");
                return Ok(Some(()));
            }
        }
    }

    Ok(None)
}

/// Where the log goes: `--log-file`, else the cache directory.
fn log_path(args: &Args) -> Result<PathBuf> {
    if let Some(path) = &args.log_file {
        return Ok(path.clone());
    }
    let cache = CacheManager::new(APP_NAME)?;
    cache.ensure_cache_dir()?;
    Ok(cache.cache_file(dtgrid::cache::LOG_FILE))
}

/// Log to a file; the terminal belongs to the TUI.
fn init_logging(args: &Args) {
    let file = log_path(args).and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| color_eyre::eyre::eyre!("{}: {}", path.display(), e))
    });
    match file {
        Ok(file) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .format_timestamp_millis()
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        Err(e) => eprintln!("Logging disabled, cannot open log file: {}", e),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    init_logging(&args);

    let mut config = match AppConfig::load(APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = apply_args(&mut config, &args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    let cell = match initial_cell(&args) {
        Ok(cell) => cell,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = dtgrid::run(config, cell) {
        log::error!("{:#}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
