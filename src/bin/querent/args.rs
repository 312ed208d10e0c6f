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

//! Implements command-line argument parsing.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};

use querent::rr::Type;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// The Querent DNS lookup tool
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    #[clap(flatten)]
    pub options: Options,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up records of any type
    General {
        name: String,
        /// The record type, by mnemonic or as TYPEnnn
        #[clap(default_value = "A", value_parser = parse_type)]
        rr_type: Type,
    },
    /// Look up the IPv4 and IPv6 addresses of a name
    Address { name: String },
    /// Look up the hostname of an IP address
    Hostname { address: IpAddr },
    /// Look up the SRV records of a service name
    Service { name: String },
}

/// Options shared by every command. Those given override the
/// configuration file.
#[derive(Debug, Parser)]
pub struct Options {
    /// Set the configuration file to use
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Add an upstream resolver
    #[clap(
        long = "upstream",
        global = true,
        use_value_delimiter = true,
        value_name = "IP[:PORT]"
    )]
    pub upstreams: Vec<Upstream>,

    /// Iterate from the root servers instead of asking upstreams
    #[clap(long, global = true)]
    pub recursing: bool,

    /// Use only TCP
    #[clap(long, global = true, conflicts_with = "udp_only")]
    pub tcp_only: bool,

    /// Use only UDP, even after a truncated response
    #[clap(long, global = true)]
    pub udp_only: bool,

    /// Set the timeout of each try, in milliseconds
    #[clap(long, global = true, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Set how many times a query is retried
    #[clap(long, global = true, value_name = "N")]
    pub retries: Option<u32>,

    /// Validate answers with DNSSEC and report their status
    #[clap(long, global = true)]
    pub dnssec: bool,

    /// Report only answers that validate as secure
    #[clap(long, global = true)]
    pub only_secure: bool,

    /// Print the response as a dict tree instead of records
    #[clap(long, global = true)]
    pub dict: bool,

    /// Log more (repeat for even more)
    #[clap(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_type(text: &str) -> Result<Type, String> {
    text.parse().map_err(|e: &str| e.to_owned())
}

/// An upstream resolver given on the command line, with or without a
/// port. The port defaults to 53.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Upstream(pub SocketAddr);

impl FromStr for Upstream {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse() {
            Ok(Self(addr))
        } else if let Ok(ip) = s.parse::<IpAddr>() {
            Ok(Self(SocketAddr::new(ip, 53)))
        } else {
            Err(anyhow!("expected an IP address, optionally with a port"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_port_defaults_to_53() {
        let upstream: Upstream = "192.0.2.1".parse().unwrap();
        assert_eq!(upstream.0, "192.0.2.1:53".parse().unwrap());
        let upstream: Upstream = "[2001:db8::1]:5353".parse().unwrap();
        assert_eq!(upstream.0.port(), 5353);
        assert!("resolver.example".parse::<Upstream>().is_err());
    }

    #[test]
    fn commands_parse() {
        let args = Args::parse_from(["querent", "general", "example.", "MX", "--dnssec", "-vv"]);
        match args.command {
            Command::General { rr_type, .. } => assert_eq!(rr_type, Type::MX),
            command => panic!("parsed {command:?}"),
        }
        assert!(args.options.dnssec);
        assert_eq!(args.options.verbose, 2);

        let args =
            Args::parse_from(["querent", "--upstream", "192.0.2.1,192.0.2.2", "address", "a."]);
        assert_eq!(args.options.upstreams.len(), 2);
    }
}
