// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the configuration file and its merging with the command
//! line.

use std::fmt::{self, Write};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use querent::context::{self, ResolutionMode};
use querent::dnssec::TrustAnchors;
use querent::transaction::Preference;

use crate::args::Options;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Builds the context configuration from the configuration file named
/// in `options` (if any), overridden by the rest of `options`.
pub fn load(options: &Options) -> Result<context::Config> {
    let mut file_config = match options.config {
        Some(ref path) => load_file(path).context("failed to load the configuration file")?,
        None => FileConfig::default(),
    };

    if !options.upstreams.is_empty() {
        file_config.upstreams = options.upstreams.iter().map(|u| u.0).collect();
    }
    if options.recursing {
        file_config.resolution_mode = ConfigResolutionMode::Recursing;
    }
    if options.tcp_only {
        file_config.transport = ConfigTransport::TcpOnly;
    } else if options.udp_only {
        file_config.transport = ConfigTransport::UdpOnly;
    }
    if let Some(timeout) = options.timeout {
        file_config.timeout = timeout;
    }
    if let Some(retries) = options.retries {
        file_config.retries = retries;
    }

    let config = file_config.into_context_config()?;
    log_config_summary(&config);
    Ok(config)
}

/// Reads and parses the configuration file at `path`.
fn load_file(path: &Path) -> Result<FileConfig> {
    let dir = match path.parent() {
        Some(p) => p,
        None => return Err(anyhow!("the configuration file path has no parent")),
    };
    let raw_config = fs::read(path).context("failed to read the configuration file")?;
    let mut config: FileConfig =
        toml::from_slice(&raw_config).context("failed to parse the configuration file")?;

    // A relative trust anchor file is found next to the configuration
    // file.
    if let Some(ref mut anchor_path) = config.trust_anchor_file {
        if anchor_path.is_relative() {
            *anchor_path = dir.join(&anchor_path);
        }
    }
    Ok(config)
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
fn log_config_summary(config: &context::Config) {
    if !log_enabled!(Debug) {
        return;
    }

    let mut message = format!(
        "Configuration loaded:\n\
         Mode:          {:?}\n\
         Transport:     {:?}\n\
         Timeout:       {} ms x {} retries\n\
         Trust anchors: {}\n\
         Servers:       ",
        config.resolution_mode,
        config.preference,
        config.timeout.as_millis(),
        config.retries,
        config.trust_anchors.len(),
    );
    let servers = config.servers();
    if servers.is_empty() {
        message.push_str("none");
    }
    for server in servers {
        // Writing to a String cannot fail.
        let _ = write!(message, "\n  {server}");
    }
    debug!("{}", message);
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub resolution_mode: ConfigResolutionMode,
    #[serde(default)]
    pub transport: ConfigTransport,
    #[serde(default)]
    pub upstreams: Vec<SocketAddr>,
    pub root_servers: Option<Vec<SocketAddr>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// The timeout of each try, in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_udp_payload_size")]
    pub udp_payload_size: u16,
    /// Trust anchors given inline, replacing the built-in root anchors.
    pub trust_anchors: Option<ConfigTrustAnchors>,
    /// A file of trust anchors, replacing the built-in root anchors.
    pub trust_anchor_file: Option<PathBuf>,
    #[serde(default)]
    pub dnssec_allowed_skew: u32,
}

fn default_limit() -> usize {
    context::Config::default().limit
}

fn default_timeout() -> u64 {
    context::Config::default().timeout.as_millis() as u64
}

fn default_retries() -> u32 {
    context::Config::default().retries
}

fn default_udp_payload_size() -> u16 {
    context::Config::default().udp_payload_size
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            resolution_mode: ConfigResolutionMode::default(),
            transport: ConfigTransport::default(),
            upstreams: Vec::new(),
            root_servers: None,
            limit: default_limit(),
            timeout: default_timeout(),
            retries: default_retries(),
            udp_payload_size: default_udp_payload_size(),
            trust_anchors: None,
            trust_anchor_file: None,
            dnssec_allowed_skew: 0,
        }
    }
}

impl FileConfig {
    /// Converts the file configuration into a [`context::Config`],
    /// reading the trust anchor file if one is named.
    fn into_context_config(self) -> Result<context::Config> {
        let trust_anchors = match (self.trust_anchors, self.trust_anchor_file) {
            (Some(_), Some(_)) => {
                return Err(anyhow!(
                    "trust_anchors and trust_anchor_file are mutually exclusive"
                ))
            }
            (Some(anchors), None) => anchors.0,
            (None, Some(path)) => fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?
                .parse()
                .with_context(|| format!("failed to parse {}", path.display()))?,
            (None, None) => TrustAnchors::default(),
        };

        let defaults = context::Config::default();
        Ok(context::Config {
            resolution_mode: self.resolution_mode.into(),
            preference: self.transport.into(),
            upstreams: self.upstreams,
            root_servers: self.root_servers.unwrap_or(defaults.root_servers),
            limit: self.limit,
            timeout: Duration::from_millis(self.timeout),
            retries: self.retries,
            udp_payload_size: self.udp_payload_size,
            trust_anchors,
            dnssec_allowed_skew: self.dnssec_allowed_skew,
            notify_on_cancel: false,
        })
    }
}

/// A deserializable wrapper over [`ResolutionMode`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub enum ConfigResolutionMode {
    #[default]
    #[serde(rename = "stub")]
    Stub,
    #[serde(rename = "recursing")]
    Recursing,
}

impl From<ConfigResolutionMode> for ResolutionMode {
    fn from(config_mode: ConfigResolutionMode) -> Self {
        match config_mode {
            ConfigResolutionMode::Stub => Self::Stub,
            ConfigResolutionMode::Recursing => Self::Recursing,
        }
    }
}

/// A deserializable wrapper over [`Preference`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub enum ConfigTransport {
    #[default]
    #[serde(rename = "udp-first")]
    UdpFirst,
    #[serde(rename = "udp-only")]
    UdpOnly,
    #[serde(rename = "tcp-only")]
    TcpOnly,
}

impl From<ConfigTransport> for Preference {
    fn from(config_transport: ConfigTransport) -> Self {
        match config_transport {
            ConfigTransport::UdpFirst => Self::UdpFirst,
            ConfigTransport::UdpOnly => Self::UdpOnly,
            ConfigTransport::TcpOnly => Self::TcpOnly,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER QUERENT TYPES FOR SERDE                              //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type
/// from [`querent`], using its [`FromStr`](std::str::FromStr)
/// implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper over a [`querent`]
        /// type.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigTrustAnchors, TrustAnchors, "trust anchors");
