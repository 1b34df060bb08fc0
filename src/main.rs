use anyhow::Result;
use clap::Parser;
use leviathan::{config, sources, Args, Config, ConsoleReporter, LeviathanEngine};
use log::{error, LevelFilter};
use std::process;
use std::sync::Arc;

const BANNER: &str = r#"
    __            _       __  __
   / /   ___ _  _(_)___ _/ /_/ /_  ____ _____
  / /   / _ \ |/ / / __ `/ __/ __ \/ __ `/ __ \
 / /___/  __/   / / /_/ / /_/ / / / /_/ / / / /
/_____/\___/|__/_/\__,_/\__/_/ /_/\__,_/_/ /_/

        Concurrent Subdomain Enumeration
"#;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else if args.silent {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    if !args.silent {
        println!("{}", BANNER);
    }

    let mut config = match config::load_config(args.config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    args.apply_to(&mut config);

    if args.list_sources {
        list_sources(&config);
        return Ok(());
    }

    let domain = match args.domain.as_deref() {
        Some(domain) if !domain.trim().is_empty() => domain,
        _ => {
            error!("No domain provided. Usage: leviathan -d example.com");
            process::exit(1);
        }
    };

    let reporter = Arc::new(ConsoleReporter::new(args.silent));
    let engine = match LeviathanEngine::new(config, reporter) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = engine.run(domain).await {
        error!("Enumeration failed: {}", e);
        process::exit(1);
    }

    Ok(())
}

fn list_sources(config: &Config) {
    println!("Available sources:\n");

    for source in sources::get_all_sources(config) {
        let info = source.info();
        let marker = if info.needs_key { " *" } else { "" };
        let status = match (source.is_enabled(), info.is_default) {
            (true, true) => "enabled",
            (true, false) => "enabled (opt-in)",
            (false, _) => "no API key",
        };
        println!("  {:<16}{}", format!("{}{}", info.name, marker), status);
    }

    println!("\n* = Requires API key");
    println!("\nSet keys with:");
    for (source, var) in config::API_KEY_ENV_VARS {
        println!("  {:<16}{}", source, var);
    }
}
