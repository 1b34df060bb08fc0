// src/output.rs
use crate::types::{LeviathanError, RunReport};
use std::io::Write;

/// Append-only sink for discovery events and the final listing.
pub trait Reporter: Send + Sync {
    fn discovered(&self, subdomain: &str, source: &str);

    fn source_skipped(&self, _source: &str, _reason: &str) {}

    fn source_failed(&self, _source: &str, _error: &LeviathanError) {}

    fn final_listing(&self, report: &RunReport) -> Result<(), LeviathanError>;
}

/// Discards everything.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn discovered(&self, _subdomain: &str, _source: &str) {}

    fn final_listing(&self, _report: &RunReport) -> Result<(), LeviathanError> {
        Ok(())
    }
}

pub struct ConsoleReporter {
    silent: bool,
}

impl ConsoleReporter {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    pub fn write_report<W: Write>(&self, writer: &mut W, report: &RunReport) -> Result<(), LeviathanError> {
        if self.silent {
            for subdomain in &report.subdomains {
                writeln!(writer, "{}", subdomain).map_err(output_error)?;
            }
            return Ok(());
        }

        writeln!(writer, "\n=== Unique Subdomains Found ===").map_err(output_error)?;
        match &report.liveness {
            Some(results) => {
                for result in results {
                    if result.active {
                        writeln!(writer, "{} [active] {}", result.subdomain, result.addresses.join(", "))
                            .map_err(output_error)?;
                    } else {
                        writeln!(writer, "{} [inactive]", result.subdomain).map_err(output_error)?;
                    }
                }
            }
            None => {
                for subdomain in &report.subdomains {
                    writeln!(writer, "{}", subdomain).map_err(output_error)?;
                }
            }
        }
        writeln!(writer, "==============================").map_err(output_error)?;

        write!(
            writer,
            "[*] {}: {} unique subdomains from {} sources",
            report.domain,
            report.stats.unique_subdomains,
            report.stats.sources_used.len()
        )
        .map_err(output_error)?;
        if let Some(active) = report.stats.active_count {
            write!(writer, ", {} active", active).map_err(output_error)?;
        }
        writeln!(writer, " in {:.2}s", report.stats.duration.as_secs_f64()).map_err(output_error)?;

        Ok(())
    }
}

impl Reporter for ConsoleReporter {
    fn discovered(&self, subdomain: &str, _source: &str) {
        if !self.silent {
            println!("Subdomain found: {}", subdomain);
        }
    }

    fn source_skipped(&self, source: &str, reason: &str) {
        if !self.silent {
            println!("{} not configured ({}). Skipping results.", source, reason);
        }
    }

    fn source_failed(&self, source: &str, error: &LeviathanError) {
        if !self.silent {
            println!("Error querying {}: {}", source, error);
        }
    }

    fn final_listing(&self, report: &RunReport) -> Result<(), LeviathanError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.write_report(&mut handle, report)
    }
}

fn output_error(e: std::io::Error) -> LeviathanError {
    LeviathanError::OutputError(e.to_string())
}
