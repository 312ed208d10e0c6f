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

//! Implementation of the [`Label`] type.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A borrowed label of a [`Name`](super::Name), not including its
/// length octet. The null label is empty.
#[derive(Clone, Copy)]
pub struct Label<'a>(&'a [u8]);

impl<'a> Label<'a> {
    /// Wraps `octets` as a label. The caller must ensure that `octets`
    /// is no longer than 63 octets.
    pub(super) fn new(octets: &'a [u8]) -> Self {
        Self(octets)
    }

    /// Returns the octets of the label.
    pub fn octets(&self) -> &'a [u8] {
        self.0
    }

    /// Returns the length of the label.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether this is the null label.
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether the label is `*`.
    pub fn is_asterisk(&self) -> bool {
        self.0 == b"*"
    }
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for octet in self.0 {
            if *octet == b'.' {
                f.write_str("\\.")?;
            } else if *octet == b'\\' {
                f.write_str("\\\\")?;
            } else if octet.is_ascii_graphic() {
                write!(f, "{}", *octet as char)?;
            } else {
                write!(f, "\\{:03}", *octet)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

/// In accordance with RFC 1034 § 3.1 (clarified by RFC 4343),
/// comparison of `Label`s is ASCII-case-insensitive.
impl PartialEq for Label<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(other.0)
    }
}

impl Eq for Label<'_> {}

impl PartialOrd for Label<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Labels are ordered "as unsigned left-justified octet strings" with
/// uppercase ASCII letters treated as lowercase ([RFC 4034 § 6.1]).
///
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
impl Ord for Label<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

impl Hash for Label<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.0.len() as u8);
        for octet in self.0 {
            state.write_u8(octet.to_ascii_lowercase());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_escapes_special_octets() {
        assert_eq!(Label::new(b"a.b\\c").to_string(), "a\\.b\\\\c");
        assert_eq!(Label::new(b"\x00 x").to_string(), "\\000\\032x");
    }

    #[test]
    fn comparison_is_case_insensitive() {
        assert_eq!(Label::new(b"ExAmple"), Label::new(b"example"));
        assert!(Label::new(b"a") < Label::new(b"B"));
        assert!(Label::new(b"ab") > Label::new(b"A"));
    }
}
