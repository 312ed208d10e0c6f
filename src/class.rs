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

//! Implementation of the [`Class`] type for DNS classes.

use std::fmt;
use std::str::FromStr;

use crate::util::{parse_numeric_suffix, Caseless};

/// Represents a class in the DNS.
///
/// A class is represented on the wire as an unsigned 16-bit integer, so
/// this is basically a wrapper around [`u16`] with nice
/// [`Debug`](fmt::Debug), [`Display`](fmt::Display), and [`FromStr`]
/// implementations, as well as constants for the defined classes. The
/// only class in common use is [`IN`](Class::IN). The
/// [`NONE`](Class::NONE) and [`ANY`](Class::ANY) values are only
/// meaningful in questions and dynamic updates.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Class(u16);

impl Class {
    // RFC 1035. We don't include CS because it's no longer listed by
    // the IANA.
    pub const IN: Self = Self(1);
    pub const CH: Self = Self(3);
    pub const HS: Self = Self(4);

    // RFC 2136 and RFC 1035.
    pub const NONE: Self = Self(254);
    pub const ANY: Self = Self(255);
}

/// The classes known by name, in the order in which they are matched.
const CLASS_NAMES: [(&str, Class); 5] = [
    ("IN", Class::IN),
    ("CH", Class::CH),
    ("HS", Class::HS),
    ("NONE", Class::NONE),
    ("ANY", Class::ANY),
];

/// Looks up a class code by its textual name.
///
/// `CLASSnnn` pseudo-names (RFC 3597 § 5) produce their numeric value;
/// otherwise the name is matched case-insensitively against the known
/// classes. Zero (which is not a valid class) is returned when nothing
/// matches.
pub fn class_by_name(name: &str) -> u16 {
    if let Some(value) = parse_numeric_suffix(name, "CLASS") {
        return value;
    }
    CLASS_NAMES
        .iter()
        .find(|(known, _)| Caseless(known) == Caseless(name))
        .map_or(0, |(_, class)| class.0)
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        Class(value)
    }
}

impl From<Class> for u16 {
    fn from(class: Class) -> Self {
        class.0
    }
}

impl FromStr for Class {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if let Some((_, class)) = CLASS_NAMES
            .iter()
            .find(|(known, _)| Caseless(known) == Caseless(text))
        {
            Ok(*class)
        } else if text
            .get(0..5)
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case("CLASS"))
        {
            text[5..]
                .parse::<u16>()
                .map(Self::from)
                .or(Err("class value is not a valid unsigned 16-bit integer"))
        } else {
            Err("unknown class")
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", *self)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match CLASS_NAMES.iter().find(|(_, class)| class == self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "CLASS{}", self.0), // RFC 3597 § 5
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_according_to_rfc3597() {
        // CLASS65280 is from the private use range, so it should always
        // be unknown.
        let class = Class::from(0xff00);
        assert_eq!(class.to_string(), "CLASS65280");
        assert_eq!(Class::NONE.to_string(), "NONE");
    }

    #[test]
    fn parses_according_to_rfc3597() {
        // Again, CLASS65280 is from the private use range.
        let class_in: Class = "CLASS1".parse().unwrap();
        let class_65280: Class = "CLASS65280".parse().unwrap();
        assert_eq!(class_in, Class::IN);
        assert_eq!(u16::from(class_65280), 65280);
        assert_eq!("any".parse::<Class>(), Ok(Class::ANY));
    }

    #[test]
    fn class_by_name_works() {
        assert_eq!(class_by_name("IN"), 1);
        assert_eq!(class_by_name("ch"), 3);
        assert_eq!(class_by_name("NONE"), 254);
        assert_eq!(class_by_name("CLASS42"), 42);
        assert_eq!(class_by_name("CLASS"), 0);
        assert_eq!(class_by_name("bogus"), 0);
    }
}
