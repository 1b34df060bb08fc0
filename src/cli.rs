use crate::types::Config;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "leviathan",
    about = "Concurrent subdomain enumeration across public data sources",
    long_about = "Leviathan queries certificate transparency logs, SecurityTrails, Shodan and VirusTotal\nconcurrently, deduplicates what they return and can check which subdomains resolve.\n\nAPI keys are read from SECURITYTRAILS_API_KEY, SHODAN_API_KEY and VIRUSTOTAL_API_KEY\n(a .env file in the working directory is honored)."
)]
pub struct Args {
    /// Target domain to enumerate
    #[arg(short = 'd', long = "domain", value_name = "DOMAIN", required_unless_present = "list_sources")]
    pub domain: Option<String>,

    /// Maximum concurrent DNS lookups during liveness validation [default: 20]
    #[arg(short = 'c', long = "concurrency", value_name = "N")]
    pub concurrency: Option<usize>,

    /// Proxy URL (http, https or socks5)
    #[arg(short = 'p', long = "proxy", value_name = "URL")]
    pub proxy: Option<String>,

    /// Specific sources to use (comma-separated)
    #[arg(short = 's', long = "sources", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// HTTP request timeout in seconds
    #[arg(short = 't', long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Check which subdomains resolve
    #[arg(short = 'r', long = "resolve")]
    pub resolve: bool,

    /// Configuration file path (TOML)
    #[arg(long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Silent mode (only output subdomains)
    #[arg(long = "silent")]
    pub silent: bool,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// List all available sources
    #[arg(long = "list-sources")]
    pub list_sources: bool,
}

impl Args {
    /// Command-line flags take precedence over file and environment settings.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.resolver.concurrency = concurrency;
        }
        if let Some(proxy) = &self.proxy {
            config.proxy = Some(proxy.clone());
        }
        if let Some(sources) = &self.sources {
            config.sources = sources.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if self.resolve {
            config.resolver.enabled = true;
        }
    }
}
