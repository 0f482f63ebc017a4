use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::{EndpointConfig, ReconnectPolicy, RelaySettings};
use crate::infrastructure::backends::LineTimeouts;

/// Name reserved for the local terminal connection
pub const CONSOLE_NAME: &str = "console";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "relay-bridge",
    version = "0.1.0",
    about = "Relays chat between line-based backends and the local console, reconnecting on failure"
)]
pub struct Config {
    /// Backend to bridge, as comma-separated key=value pairs, e.g.
    /// name=irc,host=irc.example.net,port=6667,identity=relay,channel=#chat,lost-delay=15
    #[arg(long = "backend", env = "RELAY_BACKENDS", value_delimiter = ';')]
    pub backends: Vec<BackendSpec>,

    /// Log verbosity of the console connection (0 = off .. 5 = trace)
    #[arg(long, default_value = "3")]
    pub console_verbosity: u8,

    /// Message that makes a backend acknowledge and disconnect itself
    #[arg(long, env = "RELAY_SHUTDOWN_PHRASE", default_value = "gtfo")]
    pub shutdown_phrase: String,

    /// Reply sent before disconnecting on the shutdown phrase
    #[arg(long, default_value = "KAY CU")]
    pub shutdown_reply: String,

    /// TCP connect timeout in seconds
    #[arg(long, default_value = "10")]
    pub connect_timeout: u64,

    /// Seconds of silence before a keepalive probe is sent
    #[arg(long, default_value = "60")]
    pub keepalive: u64,

    /// Metrics server port (disabled when unset)
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Minimum allowed port (ports below 1024 are privileged)
const MIN_USER_PORT: u16 = 1024;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backends.is_empty() {
            anyhow::bail!("At least one --backend is required");
        }

        let mut names = HashSet::new();
        for backend in &self.backends {
            if backend.name == CONSOLE_NAME {
                anyhow::bail!("Backend name '{}' is reserved", CONSOLE_NAME);
            }
            if !names.insert(backend.name.as_str()) {
                anyhow::bail!("Duplicate backend name '{}'", backend.name);
            }
        }

        if self.connect_timeout == 0 {
            anyhow::bail!("Connect timeout cannot be 0");
        }

        if self.keepalive == 0 {
            anyhow::bail!("Keepalive interval cannot be 0");
        }

        if let Some(port) = self.metrics_port {
            Self::validate_port(port, "metrics")?;
        }

        self.to_relay_settings()?;
        Ok(())
    }

    fn validate_port(port: u16, name: &str) -> anyhow::Result<()> {
        if port == 0 {
            anyhow::bail!("Invalid {} port: port cannot be 0", name);
        }
        if port < MIN_USER_PORT {
            anyhow::bail!(
                "Invalid {} port: {} is a privileged port (< {}). Use a port >= {}",
                name,
                port,
                MIN_USER_PORT,
                MIN_USER_PORT
            );
        }
        Ok(())
    }

    pub fn to_relay_settings(&self) -> Result<RelaySettings> {
        RelaySettings::new(self.shutdown_phrase.clone(), self.shutdown_reply.clone())
    }

    pub fn to_line_timeouts(&self) -> LineTimeouts {
        LineTimeouts {
            connect: Duration::from_secs(self.connect_timeout),
            keepalive: Duration::from_secs(self.keepalive),
        }
    }
}

/// One `--backend` entry
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSpec {
    pub name: String,
    pub endpoint: EndpointConfig,
    pub verbosity: u8,
    pub reconnect: ReconnectPolicy,
    pub honors_shutdown_phrase: bool,
}

impl FromStr for BackendSpec {
    type Err = DomainError;

    fn from_str(spec: &str) -> Result<Self> {
        let mut name = None;
        let mut host = None;
        let mut port = None;
        let mut identity = "relay".to_string();
        let mut channel = String::new();
        let mut password = String::new();
        let mut verbosity = 3;
        let defaults = ReconnectPolicy::default();
        let mut lost_delay = defaults.lost_delay();
        let mut failed_delay = defaults.failed_delay();
        let mut honors_shutdown_phrase = true;

        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected key=value, got '{}'", pair)))?;
            match key.trim() {
                "name" => name = Some(value.to_string()),
                "host" => host = Some(value.to_string()),
                "port" => port = Some(parse_number::<u16>(key, value)?),
                "identity" | "nick" => identity = value.to_string(),
                "channel" => channel = value.to_string(),
                "password" => password = value.to_string(),
                "verbosity" => verbosity = parse_number::<u8>(key, value)?,
                "lost-delay" => lost_delay = Duration::from_secs(parse_number(key, value)?),
                "failed-delay" => failed_delay = Duration::from_secs(parse_number(key, value)?),
                "shutdown" => honors_shutdown_phrase = parse_flag(key, value)?,
                other => return Err(invalid(format!("unknown key '{}'", other))),
            }
        }

        let name = name.ok_or_else(|| invalid("missing 'name'".to_string()))?;
        let host = host.ok_or_else(|| invalid(format!("backend '{}' is missing 'host'", name)))?;
        let port = port.ok_or_else(|| invalid(format!("backend '{}' is missing 'port'", name)))?;

        Ok(Self {
            endpoint: EndpointConfig::new(host, port, identity, channel)?.with_password(password),
            name,
            verbosity,
            reconnect: ReconnectPolicy::new(lost_delay, failed_delay)?,
            honors_shutdown_phrase,
        })
    }
}

fn invalid(message: String) -> DomainError {
    DomainError::InvalidBackendSpec(message)
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(format!("'{}' expects a number, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(format!("'{}' expects true or false, got '{}'", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(backends: &[&str]) -> Config {
        let mut args = vec!["relay-bridge".to_string()];
        for backend in backends {
            args.push("--backend".to_string());
            args.push(backend.to_string());
        }
        Config::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parses_full_backend_spec() {
        let spec: BackendSpec =
            "name=irc,host=irc.example.net,port=6667,nick=relay,channel=#chat,password=pw,verbosity=4,lost-delay=15,failed-delay=30,shutdown=false"
                .parse()
                .unwrap();

        assert_eq!(spec.name, "irc");
        assert_eq!(spec.endpoint.address(), "irc.example.net:6667");
        assert_eq!(spec.endpoint.identity(), "relay");
        assert_eq!(spec.endpoint.channel(), "#chat");
        assert_eq!(spec.endpoint.password(), Some("pw"));
        assert_eq!(spec.verbosity, 4);
        assert_eq!(spec.reconnect.lost_delay(), Duration::from_secs(15));
        assert_eq!(spec.reconnect.failed_delay(), Duration::from_secs(30));
        assert!(!spec.honors_shutdown_phrase);
    }

    #[test]
    fn test_backend_spec_defaults() {
        let spec: BackendSpec = "name=voice,host=localhost,port=64738".parse().unwrap();
        assert_eq!(spec.reconnect, ReconnectPolicy::default());
        assert_eq!(spec.verbosity, 3);
        assert!(spec.honors_shutdown_phrase);
    }

    #[test]
    fn test_rejects_bad_backend_specs() {
        assert!("host=localhost,port=1".parse::<BackendSpec>().is_err());
        assert!("name=a,port=1".parse::<BackendSpec>().is_err());
        assert!("name=a,host=localhost,port=nope".parse::<BackendSpec>().is_err());
        assert!("name=a,host=localhost,port=1,color=red".parse::<BackendSpec>().is_err());
        assert!("name=a,host=localhost,port=1,lost-delay=0".parse::<BackendSpec>().is_err());
        assert!("name=a,host=localhost,port=0".parse::<BackendSpec>().is_err());
    }

    #[test]
    fn test_validate_accepts_two_backends() {
        let config = config_with(&[
            "name=voice,host=localhost,port=64738",
            "name=irc,host=localhost,port=6667",
        ]);
        assert!(config.validate().is_ok());
        assert_eq!(config.to_relay_settings().unwrap(), RelaySettings::default());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_reserved_names() {
        let duplicate = config_with(&[
            "name=irc,host=localhost,port=6667",
            "name=irc,host=localhost,port=6668",
        ]);
        assert!(duplicate.validate().is_err());

        let reserved = config_with(&["name=console,host=localhost,port=6667"]);
        assert!(reserved.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_privileged_metrics_port() {
        let mut config = config_with(&["name=irc,host=localhost,port=6667"]);
        config.metrics_port = Some(80);
        assert!(config.validate().is_err());
    }
}
