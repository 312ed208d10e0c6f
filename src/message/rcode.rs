// Copyright 2021 Matthew Ingwersen.
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

//! Implementation of the [`Rcode`] type.

use std::fmt;

use super::constants::MAX_RCODE;

////////////////////////////////////////////////////////////////////////
// RCODES                                                             //
////////////////////////////////////////////////////////////////////////

/// The (extended) RCODE of a DNS message.
///
/// [RFC 1035 § 4.1.1] defines a four-bit RCODE in the header; [RFC
/// 6891 § 6.1.3] extends it to twelve bits, with the upper eight
/// carried in the OPT record. The names of the constants are those
/// listed by the IANA.
///
/// [RFC 1035 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
/// [RFC 6891 § 6.1.3]: https://datatracker.ietf.org/doc/html/rfc6891#section-6.1.3
#[derive(Copy, Clone, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Rcode(u16);

impl Rcode {
    pub const NOERROR: Self = Self(0);
    pub const FORMERR: Self = Self(1);
    pub const SERVFAIL: Self = Self(2);
    pub const NXDOMAIN: Self = Self(3);
    pub const NOTIMP: Self = Self(4);
    pub const REFUSED: Self = Self(5);
    pub const YXDOMAIN: Self = Self(6);
    pub const YXRRSET: Self = Self(7);
    pub const NXRRSET: Self = Self(8);
    pub const NOTAUTH: Self = Self(9);
    pub const NOTZONE: Self = Self(10);
    pub const BADVERS: Self = Self(16);
    pub const BADCOOKIE: Self = Self(23);

    /// Returns whether the value needs EDNS to be represented.
    pub fn is_extended(self) -> bool {
        self.0 > 0x0f
    }

    /// Returns the four bits carried in the message header.
    pub fn header_bits(self) -> u8 {
        (self.0 & 0x0f) as u8
    }

    /// Returns the eight bits carried in the OPT record.
    pub fn extended_bits(self) -> u8 {
        (self.0 >> 4) as u8
    }

    /// Combines the header and OPT portions of an RCODE.
    pub fn from_parts(header_bits: u8, extended_bits: u8) -> Self {
        Self(((extended_bits as u16) << 4) | (header_bits & 0x0f) as u16)
    }
}

impl TryFrom<u16> for Rcode {
    type Error = IntoRcodeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value > MAX_RCODE {
            Err(IntoRcodeError)
        } else {
            Ok(Self(value))
        }
    }
}

impl From<Rcode> for u16 {
    fn from(rcode: Rcode) -> Self {
        rcode.0
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Self::NOERROR => "NOERROR",
            Self::FORMERR => "FORMERR",
            Self::SERVFAIL => "SERVFAIL",
            Self::NXDOMAIN => "NXDOMAIN",
            Self::NOTIMP => "NOTIMP",
            Self::REFUSED => "REFUSED",
            Self::YXDOMAIN => "YXDOMAIN",
            Self::YXRRSET => "YXRRSET",
            Self::NXRRSET => "NXRRSET",
            Self::NOTAUTH => "NOTAUTH",
            Self::NOTZONE => "NOTZONE",
            Self::BADVERS => "BADVERS",
            Self::BADCOOKIE => "BADCOOKIE",
            _ => return write!(f, "RCODE{}", self.0),
        };
        f.write_str(name)
    }
}

impl fmt::Debug for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a value does not fit in twelve bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IntoRcodeError;

impl fmt::Display for IntoRcodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("not a valid RCODE")
    }
}

impl std::error::Error for IntoRcodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_combine() {
        let rcode = Rcode::from_parts(0, 1);
        assert_eq!(rcode, Rcode::BADVERS);
        assert!(rcode.is_extended());
        assert_eq!(rcode.header_bits(), 0);
        assert_eq!(rcode.extended_bits(), 1);
        assert!(!Rcode::NXDOMAIN.is_extended());
    }

    #[test]
    fn twelve_bit_limit_is_enforced() {
        assert!(Rcode::try_from(4095).is_ok());
        assert_eq!(Rcode::try_from(4096), Err(IntoRcodeError));
        assert_eq!(Rcode::SERVFAIL.to_string(), "SERVFAIL");
        assert_eq!(Rcode::try_from(3841).unwrap().to_string(), "RCODE3841");
    }
}
