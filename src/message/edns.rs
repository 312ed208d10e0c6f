// Copyright 2022 Matthew Ingwersen.
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

//! EDNS(0) support ([RFC 6891]).
//!
//! The OPT pseudo-RR is not kept among a [`Message`](super::Message)'s
//! additional records. It is lifted into an [`Edns`] structure on
//! decoding and written back as the last additional record on encoding.
//!
//! [RFC 6891]: https://datatracker.ietf.org/doc/html/rfc6891

use super::constants::DO_MASK;
use super::error::{CodecError, Result};

/// The EDNS parameters of a message.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Edns {
    /// The largest UDP payload the sender can reassemble (carried in
    /// the CLASS field of the OPT record).
    pub udp_payload_size: u16,
    pub version: u8,
    /// The DO ("DNSSEC OK") bit.
    pub dnssec_ok: bool,
    pub options: Vec<EdnsOption>,
}

/// An EDNS option ([RFC 6891 § 6.1.2]).
///
/// [RFC 6891 § 6.1.2]: https://datatracker.ietf.org/doc/html/rfc6891#section-6.1.2
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Vec<u8>,
}

impl Edns {
    /// Creates EDNS(0) parameters with no options.
    pub fn new(udp_payload_size: u16, dnssec_ok: bool) -> Self {
        Self {
            udp_payload_size,
            version: 0,
            dnssec_ok,
            options: Vec::new(),
        }
    }

    /// Interprets the CLASS, TTL, and RDATA of an OPT record. The upper
    /// eight bits of the extended RCODE are returned alongside.
    pub(super) fn from_opt(class: u16, ttl: u32, rdata: &[u8]) -> Result<(Self, u8)> {
        let [extended_rcode, version, flags_high, flags_low] = ttl.to_be_bytes();
        let flags = u16::from_be_bytes([flags_high, flags_low]);
        let mut options = Vec::new();
        let mut rest = rdata;
        while !rest.is_empty() {
            if rest.len() < 4 {
                return Err(CodecError::TruncatedField);
            }
            let code = u16::from_be_bytes([rest[0], rest[1]]);
            let len = u16::from_be_bytes([rest[2], rest[3]]) as usize;
            let data = rest.get(4..4 + len).ok_or(CodecError::TruncatedField)?;
            options.push(EdnsOption {
                code,
                data: data.to_vec(),
            });
            rest = &rest[4 + len..];
        }
        let edns = Self {
            udp_payload_size: class,
            version,
            dnssec_ok: flags & DO_MASK != 0,
            options,
        };
        Ok((edns, extended_rcode))
    }

    /// Returns the TTL field of the OPT record.
    pub(super) fn opt_ttl(&self, extended_rcode: u8) -> u32 {
        let flags = if self.dnssec_ok { DO_MASK } else { 0 };
        (extended_rcode as u32) << 24 | (self.version as u32) << 16 | flags as u32
    }

    /// Serializes the options as OPT RDATA.
    pub(super) fn opt_rdata(&self) -> Result<Vec<u8>> {
        let mut rdata = Vec::new();
        for option in &self.options {
            let len = u16::try_from(option.data.len()).or(Err(CodecError::RdataLength))?;
            rdata.extend_from_slice(&option.code.to_be_bytes());
            rdata.extend_from_slice(&len.to_be_bytes());
            rdata.extend_from_slice(&option.data);
        }
        if rdata.len() > u16::MAX as usize {
            Err(CodecError::RdataLength)
        } else {
            Ok(rdata)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_fields_round_trip() {
        let (edns, extended_rcode) =
            Edns::from_opt(1232, 0x0100_8000, b"\x00\x0a\x00\x02\xab\xcd").unwrap();
        assert_eq!(extended_rcode, 1);
        assert_eq!(edns.udp_payload_size, 1232);
        assert!(edns.dnssec_ok);
        assert_eq!(
            edns.options,
            [EdnsOption {
                code: 10,
                data: vec![0xab, 0xcd]
            }]
        );
        assert_eq!(edns.opt_ttl(1), 0x0100_8000);
        assert_eq!(edns.opt_rdata().unwrap(), b"\x00\x0a\x00\x02\xab\xcd");
    }

    #[test]
    fn truncated_options_are_rejected() {
        assert_eq!(
            Edns::from_opt(512, 0, b"\x00\x0a\x00\x05\xab"),
            Err(CodecError::TruncatedField)
        );
        assert_eq!(Edns::from_opt(512, 0, b"\x00"), Err(CodecError::TruncatedField));
    }
}
