use crate::config::ConfigLayer;
use crate::domain::model::SyncMode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "urllist-sync")]
#[command(about = "Synchronize a Netskope URL list with a domain feed")]
pub struct CliConfig {
    /// Local file or http(s) URL with the domains
    #[arg(short = 's', long)]
    pub source: Option<String>,

    /// Name of the target URL list
    #[arg(short = 'l', long = "urlist")]
    pub urlist: Option<String>,

    /// API token
    #[arg(short = 't', long)]
    pub token: Option<String>,

    /// Tenant host, e.g. tenant.goskope.com
    #[arg(short = 'n', long = "nskp")]
    pub nskp: Option<String>,

    /// Append to the list instead of replacing its content
    #[arg(short = 'a', long = "add")]
    pub add: bool,

    /// Create the list when it does not exist
    #[arg(short = 'c', long)]
    pub create: bool,

    /// Deploy pending changes after a successful sync
    #[arg(short = 'd', long)]
    pub deploy: bool,

    /// TOML file with defaults; flags given here win
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Header of the domain column in tabular sources
    #[arg(long)]
    pub domain_column: Option<String>,

    /// Read, normalize and plan chunks without calling the list API
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Flags that were not given stay `None`, so lower layers can fill them.
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            source: self.source.clone(),
            list_name: self.urlist.clone(),
            token: self.token.clone(),
            tenant: self.nskp.clone(),
            mode: self.add.then_some(SyncMode::Append),
            create_if_missing: self.create.then_some(true),
            deploy: self.deploy.then_some(true),
            domain_column: self.domain_column.clone(),
            ..ConfigLayer::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let cli = CliConfig::parse_from([
            "urllist-sync",
            "-s",
            "https://hole.cert.pl/domains/v2/domains.txt",
            "-l",
            "UL-test",
            "-t",
            "tok",
            "-n",
            "acme.goskope.com",
            "-a",
            "-d",
        ]);

        let layer = cli.to_layer();
        assert_eq!(layer.list_name.as_deref(), Some("UL-test"));
        assert_eq!(layer.tenant.as_deref(), Some("acme.goskope.com"));
        assert_eq!(layer.mode, Some(SyncMode::Append));
        assert_eq!(layer.deploy, Some(true));
        assert_eq!(layer.create_if_missing, None);
    }

    #[test]
    fn test_unset_switches_do_not_override() {
        let cli = CliConfig::parse_from(["urllist-sync", "--config", "sync.toml", "--dry-run"]);

        assert!(cli.dry_run);
        assert_eq!(cli.config, Some(PathBuf::from("sync.toml")));
        let layer = cli.to_layer();
        assert!(layer.mode.is_none());
        assert!(layer.deploy.is_none());
        assert!(layer.source.is_none());
    }
}
