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

//! Implementation of the context [`Config`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use crate::dnssec::TrustAnchors;
use crate::error::UsageError;
use crate::transaction::{Preference, Settings};

/// How a context resolves names.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ResolutionMode {
    /// Send recursive queries to the configured upstream resolvers.
    #[default]
    Stub,
    /// Iterate from the root servers, following referrals.
    Recursing,
}

/// The configuration of a [`Context`](super::Context).
#[derive(Clone, Debug)]
pub struct Config {
    pub resolution_mode: ResolutionMode,
    pub preference: Preference,
    /// The recursive resolvers used in stub mode.
    pub upstreams: Vec<SocketAddr>,
    /// The servers recursion starts from.
    pub root_servers: Vec<SocketAddr>,
    /// The maximum number of outstanding requests.
    pub limit: usize,
    /// How long to wait for each try.
    pub timeout: Duration,
    pub retries: u32,
    pub udp_payload_size: u16,
    pub trust_anchors: TrustAnchors,
    /// How far (in seconds) signatures may be outside their validity
    /// period.
    pub dnssec_allowed_skew: u32,
    pub notify_on_cancel: bool,
}

/// IPv4 and IPv6 addresses of a handful of the root servers.
const ROOT_SERVERS: [IpAddr; 8] = [
    IpAddr::V4(Ipv4Addr::new(198, 41, 0, 4)),
    IpAddr::V4(Ipv4Addr::new(192, 33, 4, 12)),
    IpAddr::V4(Ipv4Addr::new(199, 7, 91, 13)),
    IpAddr::V4(Ipv4Addr::new(192, 5, 5, 241)),
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x503, 0xba3e, 0, 0, 0, 0x2, 0x30)),
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x500, 0x2, 0, 0, 0, 0, 0xc)),
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x500, 0x2d, 0, 0, 0, 0, 0xd)),
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x500, 0x2f, 0, 0, 0, 0, 0xf)),
];

/// The smallest EDNS UDP payload size we will advertise.
const MIN_UDP_PAYLOAD_SIZE: u16 = 512;

impl Default for Config {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            resolution_mode: ResolutionMode::default(),
            preference: settings.preference,
            upstreams: Vec::new(),
            root_servers: ROOT_SERVERS
                .iter()
                .map(|ip| SocketAddr::new(*ip, 53))
                .collect(),
            limit: settings.limit,
            timeout: Duration::from_secs(2),
            retries: settings.retries,
            udp_payload_size: settings.udp_payload_size,
            trust_anchors: TrustAnchors::default(),
            dnssec_allowed_skew: 0,
            notify_on_cancel: settings.notify_on_cancel,
        }
    }
}

impl Config {
    /// Checks that the configuration is usable.
    pub fn check(&self) -> Result<(), UsageError> {
        let servers = match self.resolution_mode {
            ResolutionMode::Stub => &self.upstreams,
            ResolutionMode::Recursing => &self.root_servers,
        };
        if servers.is_empty() {
            Err(UsageError::NoUpstreams)
        } else if self.limit == 0 {
            Err(UsageError::BadConfig("the outstanding limit must be positive"))
        } else if self.timeout.is_zero() {
            Err(UsageError::BadConfig("the timeout must be positive"))
        } else if self.udp_payload_size < MIN_UDP_PAYLOAD_SIZE {
            Err(UsageError::BadConfig("the UDP payload size must be at least 512"))
        } else {
            Ok(())
        }
    }

    /// Returns the upstreams queries go to.
    pub fn servers(&self) -> &[SocketAddr] {
        match self.resolution_mode {
            ResolutionMode::Stub => &self.upstreams,
            ResolutionMode::Recursing => &self.root_servers,
        }
    }

    /// Returns the transaction manager settings.
    pub fn settings(&self) -> Settings {
        Settings {
            limit: self.limit,
            retries: self.retries,
            preference: self.preference,
            udp_payload_size: self.udp_payload_size,
            notify_on_cancel: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_needs_upstreams_in_stub_mode() {
        let mut config = Config::default();
        assert_eq!(config.check(), Err(UsageError::NoUpstreams));
        config.resolution_mode = ResolutionMode::Recursing;
        assert_eq!(config.check(), Ok(()));
        assert_eq!(config.servers().len(), ROOT_SERVERS.len());
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut config = Config {
            upstreams: vec!["192.0.2.1:53".parse().unwrap()],
            ..Config::default()
        };
        assert_eq!(config.check(), Ok(()));
        config.udp_payload_size = 100;
        assert!(matches!(config.check(), Err(UsageError::BadConfig(_))));
        config.udp_payload_size = 1232;
        config.timeout = Duration::ZERO;
        assert!(matches!(config.check(), Err(UsageError::BadConfig(_))));
    }
}
