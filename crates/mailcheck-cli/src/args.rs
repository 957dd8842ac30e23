//! Command line arguments

use clap::Parser;
use mailcheck_common::Config;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mailcheck")]
#[command(version)]
#[command(about = "Audit the SPF, DKIM, DMARC, DNSSEC and MX setup of a mail domain", long_about = None)]
pub struct Cli {
    /// Domain to audit
    #[arg(short, long, default_value = "example.com")]
    pub domain: String,

    /// Nameserver to query (overrides the configured one)
    #[arg(short, long, value_name = "IP")]
    pub nameserver: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Directory receiving a copy of the JSON report
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", env = "MAILCHECK_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Override configuration values given on the command line
    pub fn apply(&self, config: &mut Config) {
        if let Some(nameserver) = &self.nameserver {
            config.resolver.nameserver = nameserver.clone();
        }
        if let Some(output) = &self.output {
            config.output.directory = Some(output.clone());
        }
    }
}
