// Configuration module - loads the TOML plugin configuration
//
// Every key is optional and falls back to the sample configuration below.
// Credentials starting with `$` are expanded from the environment, so the
// file itself does not have to hold secrets.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::filter::{CollectorSelection, FilterConfigError, FilterSet, NameFilter};
use crate::ovirt::client::TlsOptions;

/// Sample configuration printed by `--sample-config`
pub const SAMPLE_CONFIG: &str = r#"## oVirt Engine URL to be monitored and its credential
ovirturl = "https://ovirt-engine.local/ovirt-engine/api"
username = "user@internal"
password = "secret"
timeout = "10s"

## Optional TLS config
# tls_ca = "/path/to/cafile"
## Use TLS but skip chain & host verification
# insecure_skip_verify = false

## Optional alias tag for internal metrics
# internal_alias = ""

## Filter clusters by name, default is no filtering
## cluster names can be specified as glob patterns
# clusters_include = []
# clusters_exclude = []

## Filter hosts by name, default is no filtering
## host names can be specified as glob patterns
# hosts_include = []
# hosts_exclude = []

## Filter VMs by name, default is no filtering
## VM names can be specified as glob patterns
# vms_include = []
# vms_exclude = []

## Filter collectors by name, default is all collectors
# collectors_include = []
# collectors_exclude = []

#### collector names available are ####
## Datacenters: datacenter stats in ovirtstat_datacenter measurement
## GlusterVolumes: gluster volume stats in ovirtstat_glustervolume measurement
## Hosts: hypervisor/host stats in ovirtstat_host measurement
## StorageDomains: storage domain stats in ovirtstat_storagedomain measurement
## VMs: virtual machine stats in ovirtstat_vm measurement
"#;

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("error parsing URL for oVirt: {0}")]
    InvalidUrl(String),

    #[error("error parsing {what} filters: {source}")]
    Filter {
        what: &'static str,
        #[source]
        source: FilterConfigError,
    },
}

/// Plugin configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Engine API URL, e.g. `https://engine.local/ovirt-engine/api`
    #[serde(rename = "ovirturl")]
    pub ovirt_url: String,
    pub username: String,
    pub password: String,

    /// Per-call HTTP timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    pub tls_ca: Option<PathBuf>,
    pub insecure_skip_verify: bool,

    /// Value of the `alias` tag on the internal metric
    pub internal_alias: String,

    pub clusters_include: Vec<String>,
    pub clusters_exclude: Vec<String>,
    pub hosts_include: Vec<String>,
    pub hosts_exclude: Vec<String>,
    pub vms_include: Vec<String>,
    pub vms_exclude: Vec<String>,
    pub collectors_include: Vec<String>,
    pub collectors_exclude: Vec<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        PluginConfig {
            ovirt_url: "https://ovirt-engine.local/ovirt-engine/api".to_string(),
            username: "user@internal".to_string(),
            password: "secret".to_string(),
            timeout: Duration::from_secs(10),
            tls_ca: None,
            insecure_skip_verify: false,
            internal_alias: String::new(),
            clusters_include: Vec::new(),
            clusters_exclude: Vec::new(),
            hosts_include: Vec::new(),
            hosts_exclude: Vec::new(),
            vms_include: Vec::new(),
            vms_exclude: Vec::new(),
            collectors_include: Vec::new(),
            collectors_exclude: Vec::new(),
        }
    }
}

impl PluginConfig {
    /// Reads and validates the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = PluginConfig::parse(&raw)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration text
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut config: PluginConfig = toml::from_str(raw)?;
        config.username = expand_var(&config.username);
        config.password = expand_var(&config.password);
        config.validate()?;
        Ok(config)
    }

    /// Checks the URL and every filter pattern
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine_url()?;
        self.filters()?;
        self.collector_selection()?;
        Ok(())
    }

    pub fn engine_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.ovirt_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.ovirt_url, e)))?;
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!("{}: missing host", self.ovirt_url)));
        }
        Ok(url)
    }

    /// Engine host name, used as the `ovirt-engine` tag
    pub fn engine_host(&self) -> Result<String, ConfigError> {
        Ok(self.engine_url()?.host_str().unwrap_or_default().to_string())
    }

    pub fn filters(&self) -> Result<FilterSet, ConfigError> {
        let build = |what: &'static str, include: &[String], exclude: &[String]| {
            NameFilter::new(include, exclude).map_err(|source| ConfigError::Filter { what, source })
        };
        Ok(FilterSet {
            clusters: build("clusters", &self.clusters_include, &self.clusters_exclude)?,
            hosts: build("hosts", &self.hosts_include, &self.hosts_exclude)?,
            vms: build("VMs", &self.vms_include, &self.vms_exclude)?,
        })
    }

    pub fn collector_selection(&self) -> Result<CollectorSelection, ConfigError> {
        CollectorSelection::new(&self.collectors_include, &self.collectors_exclude).map_err(
            |source| ConfigError::Filter {
                what: "collectors",
                source,
            },
        )
    }

    pub fn tls_options(&self) -> TlsOptions {
        TlsOptions {
            ca_bundle: self.tls_ca.clone(),
            insecure_skip_verify: self.insecure_skip_verify,
        }
    }
}

/// Expands `$VAR` and `${VAR}` references when the value starts with `$`
///
/// Unset variables expand to an empty string.
pub fn expand_var(value: &str) -> String {
    if !value.starts_with('$') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let name: String = if chars.peek() == Some(&'{') {
            chars.next();
            chars.by_ref().take_while(|c| *c != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(c) = chars.peek().copied() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                name.push(c);
                chars.next();
            }
            name
        };
        out.push_str(&std::env::var(&name).unwrap_or_default());
    }
    out
}
