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

//! Provides the [`Type`] structure for DNS RR types.

use std::fmt;
use std::str::FromStr;

use super::descriptor::{describe, type_by_name};

////////////////////////////////////////////////////////////////////////
// RR TYPES                                                           //
////////////////////////////////////////////////////////////////////////

/// Represents the RR type of a DNS record.
///
/// An RR type is represented on the wire as an unsigned 16-bit integer.
/// Hence this is basically a wrapper around `u16` with nice
/// [`Debug`](fmt::Debug), [`Display`](fmt::Display), and [`FromStr`]
/// implementations for working with the common textual representations
/// of RR types. Names come from the descriptor table (see
/// [`describe`]), so every type it knows displays by name. Constants for
/// the types this crate works with directly are provided.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Type(u16);

impl Type {
    pub const A: Type = Type(1);
    pub const NS: Type = Type(2);
    pub const CNAME: Type = Type(5);
    pub const SOA: Type = Type(6);
    pub const NULL: Type = Type(10);
    pub const PTR: Type = Type(12);
    pub const MX: Type = Type(15);
    pub const TXT: Type = Type(16);
    pub const AAAA: Type = Type(28);
    pub const SRV: Type = Type(33);
    pub const DNAME: Type = Type(39);
    pub const OPT: Type = Type(41);
    pub const DS: Type = Type(43);
    pub const RRSIG: Type = Type(46);
    pub const NSEC: Type = Type(47);
    pub const DNSKEY: Type = Type(48);
    pub const NSEC3: Type = Type(50);
    pub const NSEC3PARAM: Type = Type(51);
    pub const HIP: Type = Type(55);
    pub const CDS: Type = Type(59);
    pub const CDNSKEY: Type = Type(60);
    pub const TSIG: Type = Type(250);
    pub const ANY: Type = Type(255);
    pub const TA: Type = Type(32768);
    pub const DLV: Type = Type(32769);
}

impl From<u16> for Type {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Type> for u16 {
    fn from(rr_type: Type) -> Self {
        rr_type.0
    }
}

impl FromStr for Type {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        // type_by_name uses zero for "no match", but TYPE0 is a valid
        // (if reserved) way to spell zero.
        match type_by_name(text) {
            0 if !text.eq_ignore_ascii_case("TYPE0") => Err("unknown type"),
            value => Ok(Self(value)),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let descriptor = describe(self.0);
        if self.0 != 0 && descriptor.code == self.0 {
            f.write_str(descriptor.name)
        } else {
            write!(f, "TYPE{}", self.0) // RFC 3597 § 5
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_displays_according_to_rfc3597() {
        // TYPE65280 is from the private use range, so it should always
        // be unknown.
        let rr_type = Type::from(0xff00);
        assert_eq!(rr_type.to_string(), "TYPE65280");
        assert_eq!(Type::from(70).to_string(), "TYPE70");
        assert_eq!(Type::NSEC3PARAM.to_string(), "NSEC3PARAM");
        assert_eq!(Type::DLV.to_string(), "DLV");
    }

    #[test]
    fn type_parses_according_to_rfc3597() {
        // Again, TYPE65280 is from the private use range.
        let type_a: Type = "TYPE1".parse().unwrap();
        let type_65280: Type = "TYPE65280".parse().unwrap();
        assert_eq!(type_a, Type::A);
        assert_eq!(u16::from(type_65280), 65280);
        assert_eq!("rrsig".parse::<Type>(), Ok(Type::RRSIG));
        assert_eq!("TYPE0".parse::<Type>(), Ok(Type::from(0)));
        assert!("bogus".parse::<Type>().is_err());
    }
}
