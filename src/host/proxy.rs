//! # Proxy Configuration
//!
//! In-process model of the I/O thread's proxy resolution state. A
//! [`RequestContext`] owns one [`ProxyResolutionService`], whose config
//! service is swapped wholesale by `reset_config_service`: nothing from the
//! previous configuration survives a reset.
//!
//! ## Rules string
//!
//! ```text
//! rules   := entry (";" entry)*
//! entry   := [url_scheme "="] server ("," server)*
//! server  := ["scheme://"] host [":" port] | "direct://"
//! ```
//!
//! A bare entry applies to every URL scheme. `socks=` entries are the
//! fallback used when no scheme-specific list matches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::constants::{pac, ports};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyParseError {
    #[error("proxy entry '{entry}' has no host")]
    EmptyHost { entry: String },

    #[error("proxy entry '{entry}' has an invalid port")]
    InvalidPort { entry: String },

    #[error("unsupported proxy scheme '{scheme}'")]
    UnknownProxyScheme { scheme: String },

    #[error("unsupported url scheme '{scheme}' in proxy rules")]
    UnknownUrlScheme { scheme: String },

    #[error("invalid PAC url '{url}': {reason}")]
    InvalidPacUrl { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyScheme {
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyScheme {
    fn parse(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            "socks" | "socks4" => Some(Self::Socks4),
            "socks5" => Some(Self::Socks5),
            _ => None,
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => ports::HTTP,
            Self::Https => ports::HTTPS,
            Self::Socks4 | Self::Socks5 => ports::SOCKS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyServer {
    Direct,
    Proxy {
        scheme: ProxyScheme,
        host: String,
        port: u16,
    },
}

impl ProxyServer {
    /// Parse one server; `default_scheme` applies when no `scheme://` prefix is given
    pub fn parse(entry: &str, default_scheme: ProxyScheme) -> Result<Self, ProxyParseError> {
        let entry = entry.trim();

        let (scheme, rest) = match entry.split_once("://") {
            Some((prefix, _)) if prefix.eq_ignore_ascii_case("direct") => return Ok(Self::Direct),
            Some((prefix, rest)) => {
                let scheme = ProxyScheme::parse(prefix).ok_or_else(|| {
                    ProxyParseError::UnknownProxyScheme {
                        scheme: prefix.to_string(),
                    }
                })?;
                (scheme, rest)
            }
            None => (default_scheme, entry),
        };

        let (host, port) = split_host_port(rest).ok_or_else(|| ProxyParseError::InvalidPort {
            entry: entry.to_string(),
        })?;
        if host.is_empty() {
            return Err(ProxyParseError::EmptyHost {
                entry: entry.to_string(),
            });
        }

        Ok(Self::Proxy {
            scheme,
            host: host.to_string(),
            port: port.unwrap_or_else(|| scheme.default_port()),
        })
    }
}

impl fmt::Display for ProxyServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct://"),
            Self::Proxy { scheme, host, port } => write!(f, "{}://{}:{}", scheme.as_str(), host, port),
        }
    }
}

/// Split `host[:port]`, keeping bracketed IPv6 literals intact. Returns
/// `None` when a port is present but not a valid `u16`.
fn split_host_port(value: &str) -> Option<(&str, Option<u16>)> {
    let (host, port) = if let Some(stripped) = value.strip_prefix('[') {
        let close = stripped.find(']')?;
        let host = &value[..close + 2];
        let after = &stripped[close + 1..];
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => return None,
        }
    } else {
        match value.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (value, None),
        }
    };

    match port {
        Some(port) => port.parse::<u16>().ok().map(|p| (host, Some(p))),
        None => Some((host, None)),
    }
}

/// Manual proxy rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRules {
    /// Applies to every URL scheme without a scheme-specific list
    pub single: Vec<ProxyServer>,
    /// Lists keyed by URL scheme (`http`, `https`, `ftp`)
    pub per_scheme: BTreeMap<String, Vec<ProxyServer>>,
    /// Used when nothing else matches (`socks=` entries)
    pub fallback: Vec<ProxyServer>,
}

impl ProxyRules {
    pub fn parse_from_string(rules: &str) -> Result<Self, ProxyParseError> {
        let mut parsed = Self::default();

        for entry in rules.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once('=') {
                Some((url_scheme, list)) => {
                    let url_scheme = url_scheme.trim().to_ascii_lowercase();
                    match url_scheme.as_str() {
                        "http" | "https" | "ftp" => {
                            let servers = parse_server_list(list, ProxyScheme::Http)?;
                            parsed.per_scheme.entry(url_scheme).or_default().extend(servers);
                        }
                        "socks" => {
                            parsed
                                .fallback
                                .extend(parse_server_list(list, ProxyScheme::Socks4)?);
                        }
                        _ => return Err(ProxyParseError::UnknownUrlScheme { scheme: url_scheme }),
                    }
                }
                None => parsed
                    .single
                    .extend(parse_server_list(entry, ProxyScheme::Http)?),
            }
        }

        Ok(parsed)
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.per_scheme.is_empty() && self.fallback.is_empty()
    }

    /// Servers to try for a URL with the given scheme, in order
    pub fn servers_for(&self, url_scheme: &str) -> &[ProxyServer] {
        if let Some(servers) = self.per_scheme.get(url_scheme) {
            return servers;
        }
        if !self.single.is_empty() {
            return &self.single;
        }
        &self.fallback
    }
}

fn parse_server_list(list: &str, default_scheme: ProxyScheme) -> Result<Vec<ProxyServer>, ProxyParseError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ProxyServer::parse(s, default_scheme))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyConfig {
    Direct,
    AutoDetect,
    PacUrl(Url),
    Rules(ProxyRules),
}

impl ProxyConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::AutoDetect => "auto_detect",
            Self::PacUrl(_) => "pac_url",
            Self::Rules(_) => "rules",
        }
    }
}

/// Unparsed `setProxyConfig` input, turned into a [`ProxyConfig`] on the
/// I/O thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfigRequest {
    pub rules: String,
    pub pac_url: Option<String>,
}

impl ProxyConfigRequest {
    /// A non-empty `pac_url` wins over `rules`
    pub fn into_config(self) -> Result<ProxyConfig, ProxyParseError> {
        match self.pac_url.as_deref().filter(|p| !p.is_empty()) {
            Some(pac::DIRECT) => Ok(ProxyConfig::Direct),
            Some(pac::AUTO) => Ok(ProxyConfig::AutoDetect),
            Some(pac_url) => Url::parse(pac_url)
                .map(ProxyConfig::PacUrl)
                .map_err(|e| ProxyParseError::InvalidPacUrl {
                    url: pac_url.to_string(),
                    reason: e.to_string(),
                }),
            None => ProxyRules::parse_from_string(&self.rules).map(ProxyConfig::Rules),
        }
    }
}

/// Source of the active proxy configuration
pub trait ProxyConfigService: Send + Sync + fmt::Debug {
    fn latest_config(&self) -> ProxyConfig;
}

/// Config service that always reports the configuration it was built with
#[derive(Debug, Clone)]
pub struct FixedProxyConfigService {
    config: ProxyConfig,
}

impl FixedProxyConfigService {
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }
}

impl ProxyConfigService for FixedProxyConfigService {
    fn latest_config(&self) -> ProxyConfig {
        self.config.clone()
    }
}

#[derive(Debug)]
pub struct ProxyResolutionService {
    config_service: Box<dyn ProxyConfigService>,
    generation: u64,
}

impl ProxyResolutionService {
    pub fn new(config_service: Box<dyn ProxyConfigService>) -> Self {
        Self {
            config_service,
            generation: 0,
        }
    }

    /// Replace the config service. The previous service is dropped.
    pub fn reset_config_service(&mut self, config_service: Box<dyn ProxyConfigService>) {
        self.config_service = config_service;
        self.generation += 1;
        debug!(
            generation = self.generation,
            kind = self.config_service.latest_config().kind(),
            "Proxy config service replaced"
        );
    }

    pub fn config(&self) -> ProxyConfig {
        self.config_service.latest_config()
    }

    /// Number of resets since construction
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Candidate servers for `url`. PAC and auto-detect configurations are
    /// not evaluated here and resolve to a direct connection.
    pub fn resolve(&self, url: &Url) -> Vec<ProxyServer> {
        match self.config() {
            ProxyConfig::Rules(rules) => {
                let servers = rules.servers_for(url.scheme());
                if servers.is_empty() {
                    vec![ProxyServer::Direct]
                } else {
                    servers.to_vec()
                }
            }
            ProxyConfig::Direct | ProxyConfig::AutoDetect | ProxyConfig::PacUrl(_) => {
                vec![ProxyServer::Direct]
            }
        }
    }
}

impl Default for ProxyResolutionService {
    fn default() -> Self {
        Self::new(Box::new(FixedProxyConfigService::new(ProxyConfig::AutoDetect)))
    }
}

/// Per-profile network state owned by the I/O thread
#[derive(Debug, Default)]
pub struct RequestContext {
    proxy_resolution_service: ProxyResolutionService,
}

impl RequestContext {
    pub fn new(proxy_resolution_service: ProxyResolutionService) -> Self {
        Self {
            proxy_resolution_service,
        }
    }

    pub fn proxy_resolution_service(&self) -> &ProxyResolutionService {
        &self.proxy_resolution_service
    }

    pub fn proxy_resolution_service_mut(&mut self) -> &mut ProxyResolutionService {
        &mut self.proxy_resolution_service
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(scheme: ProxyScheme, host: &str, port: u16) -> ProxyServer {
        ProxyServer::Proxy {
            scheme,
            host: host.to_string(),
            port,
        }
    }

    #[test]
    fn test_bare_entry_applies_to_all_schemes() {
        let rules = ProxyRules::parse_from_string("foopy:8080").unwrap();
        assert_eq!(rules.single, vec![proxy(ProxyScheme::Http, "foopy", 8080)]);
        assert_eq!(rules.servers_for("https"), rules.servers_for("http"));
    }

    #[test]
    fn test_per_scheme_and_fallback_lists() {
        let rules =
            ProxyRules::parse_from_string("http=foopy:80, bar; https=socks5://secure;socks=sox")
                .unwrap();

        assert_eq!(
            rules.servers_for("http"),
            &[
                proxy(ProxyScheme::Http, "foopy", 80),
                proxy(ProxyScheme::Http, "bar", 80)
            ]
        );
        assert_eq!(
            rules.servers_for("https"),
            &[proxy(ProxyScheme::Socks5, "secure", 1080)]
        );
        assert_eq!(rules.servers_for("ftp"), &[proxy(ProxyScheme::Socks4, "sox", 1080)]);
    }

    #[test]
    fn test_direct_and_ipv6_servers() {
        let rules = ProxyRules::parse_from_string("[::1]:3128,direct://").unwrap();
        assert_eq!(
            rules.single,
            vec![proxy(ProxyScheme::Http, "[::1]", 3128), ProxyServer::Direct]
        );
    }

    #[test]
    fn test_malformed_rules_are_rejected() {
        assert!(matches!(
            ProxyRules::parse_from_string("foopy:notaport"),
            Err(ProxyParseError::InvalidPort { .. })
        ));
        assert!(matches!(
            ProxyRules::parse_from_string("gopher=foopy"),
            Err(ProxyParseError::UnknownUrlScheme { .. })
        ));
        assert!(matches!(
            ProxyRules::parse_from_string("quic://foopy"),
            Err(ProxyParseError::UnknownProxyScheme { .. })
        ));
        assert!(matches!(
            ProxyRules::parse_from_string(":80"),
            Err(ProxyParseError::EmptyHost { .. })
        ));
    }

    #[test]
    fn test_empty_rules_resolve_direct() {
        let rules = ProxyRules::parse_from_string("  ;  ").unwrap();
        assert!(rules.is_empty());

        let mut service = ProxyResolutionService::default();
        service.reset_config_service(Box::new(FixedProxyConfigService::new(ProxyConfig::Rules(rules))));
        let url = Url::parse("http://example.com").unwrap();
        assert_eq!(service.resolve(&url), vec![ProxyServer::Direct]);
    }

    #[test]
    fn test_pac_sentinels() {
        let request = |pac_url: &str| ProxyConfigRequest {
            rules: "ignored:1".to_string(),
            pac_url: Some(pac_url.to_string()),
        };

        assert_eq!(request(pac::DIRECT).into_config().unwrap(), ProxyConfig::Direct);
        assert_eq!(request(pac::AUTO).into_config().unwrap(), ProxyConfig::AutoDetect);
        assert_eq!(
            request("http://wpad/proxy.pac").into_config().unwrap(),
            ProxyConfig::PacUrl(Url::parse("http://wpad/proxy.pac").unwrap())
        );
        assert!(request("not a url").into_config().is_err());

        let empty_pac = ProxyConfigRequest {
            rules: "foopy".to_string(),
            pac_url: Some(String::new()),
        };
        assert_eq!(empty_pac.into_config().unwrap().kind(), "rules");
    }

    #[test]
    fn test_reset_replaces_previous_config() {
        let mut service = ProxyResolutionService::default();
        assert_eq!(service.config(), ProxyConfig::AutoDetect);

        service.reset_config_service(Box::new(FixedProxyConfigService::new(ProxyConfig::Rules(
            ProxyRules::parse_from_string("http=a:1").unwrap(),
        ))));
        service.reset_config_service(Box::new(FixedProxyConfigService::new(ProxyConfig::Direct)));

        assert_eq!(service.config(), ProxyConfig::Direct);
        assert_eq!(service.generation(), 2);
    }
}
