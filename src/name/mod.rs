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

//! Implementation of data structures related to domain names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::str::FromStr;

use arrayvec::ArrayVec;

mod error;
mod label;
mod wire;
pub use error::Error;
pub use label::Label;

/// The maximum number of labels in a domain name.
const MAX_N_LABELS: usize = 128;

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
const MAX_LABEL_LEN: usize = 63;

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// An owned, validated domain name.
///
/// A `Name` holds the uncompressed on-the-wire representation defined
/// in [RFC 1035 § 3.1], which always ends with the null label. Names
/// can be constructed:
///
/// * through the [`FromStr`] implementation (a trailing dot is
///   optional; names are always treated as absolute);
/// * from uncompressed on-the-wire names through
///   [`Name::try_from_uncompressed`];
/// * from compressed on-the-wire names through
///   [`Name::try_from_compressed`]; and
/// * from a list of labels through [`Name::from_labels`].
///
/// Equality and hashing are ASCII-case-insensitive. The [`Ord`]
/// implementation is DNSSEC's canonical ordering.
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
#[derive(Clone)]
pub struct Name {
    wire: Box<[u8]>,
    n_labels: u8,
}

#[allow(clippy::len_without_is_empty)] // A domain name is never empty!
impl Name {
    /// Wraps a wire representation that has already been validated.
    fn from_validated_wire(wire: Box<[u8]>, n_labels: usize) -> Self {
        debug_assert!(n_labels >= 1 && n_labels <= MAX_N_LABELS);
        Self {
            wire,
            n_labels: n_labels as u8,
        }
    }

    /// Returns a `Name` representing the DNS root, `.`.
    pub fn root() -> Self {
        Self::from_validated_wire(Box::new([0]), 1)
    }

    /// Builds an absolute name from non-null labels, listed from the
    /// leftmost. The null label is appended automatically.
    pub fn from_labels<'a, I>(labels: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut wire = ArrayVec::<u8, MAX_WIRE_LEN>::new();
        let mut n_labels = 1;
        for label in labels {
            if label.is_empty() {
                return Err(Error::NullNonTerminal);
            } else if label.len() > MAX_LABEL_LEN {
                return Err(Error::LabelTooLong);
            }
            wire.try_push(label.len() as u8).or(Err(Error::NameTooLong))?;
            wire.try_extend_from_slice(label).or(Err(Error::NameTooLong))?;
            n_labels += 1;
        }
        wire.try_push(0).or(Err(Error::NameTooLong))?;
        Ok(Self::from_validated_wire(wire.as_slice().into(), n_labels))
    }

    /// Returns a new `Name` formed by prepending `label` to this one.
    pub fn prepend(&self, label: &[u8]) -> Result<Self, Error> {
        if label.is_empty() {
            return Err(Error::NullNonTerminal);
        } else if label.len() > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        } else if self.wire.len() + label.len() + 1 > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        }
        let mut wire = Vec::with_capacity(self.wire.len() + label.len() + 1);
        wire.push(label.len() as u8);
        wire.extend_from_slice(label);
        wire.extend_from_slice(&self.wire);
        Ok(Self::from_validated_wire(wire.into(), self.len() + 1))
    }

    /// Returns whether this `Name` is equal to or a subdomain of
    /// `other`.
    pub fn eq_or_subdomain_of(&self, other: &Name) -> bool {
        self.len() >= other.len()
            && self
                .labels()
                .rev()
                .zip(other.labels().rev())
                .all(|(a, b)| a == b)
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.n_labels == 1
    }

    /// Returns whether the `Name` is a wildcard domain name (i.e.,
    /// whether its first label is `*`).
    pub fn is_wildcard(&self) -> bool {
        self.labels().next().map_or(false, |label| label.is_asterisk())
    }

    /// Returns an iterator over labels in this `Name`, ending with the
    /// null label.
    pub fn labels(&self) -> Labels {
        Labels::new(self)
    }

    /// Returns the number of labels in this `Name`, including the null
    /// label.
    pub fn len(&self) -> usize {
        self.n_labels as usize
    }

    /// Returns a copy of this `Name` with all ASCII letters lowercase,
    /// as required for the canonical form of [RFC 4034 § 6.2].
    ///
    /// [RFC 4034 § 6.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.2
    pub fn to_lowercase(&self) -> Self {
        let mut name = self.clone();
        // Length octets are below 64, so they are unaffected.
        name.wire.make_ascii_lowercase();
        name
    }

    /// Returns the superdomain obtained by skipping the first `skip`
    /// labels of the `Name`, or `None` if there aren't enough labels.
    pub fn superdomain(&self, skip: usize) -> Option<Name> {
        if skip < self.len() {
            let start = self.label_offsets()[skip] as usize;
            Some(Self::from_validated_wire(
                self.wire[start..].into(),
                self.len() - skip,
            ))
        } else {
            None
        }
    }

    /// Tries to parse a compressed name present at index `start` of the
    /// provided buffer. Pointers are followed; indices given in
    /// pointers are treated as equivalent to indices in `octets` (so
    /// generally one will pass an entire DNS message in `octets`). Two
    /// things are returned on success:
    ///
    /// * a new `Name`; and
    /// * the number of contiguous octets read at `start`. If a pointer
    ///   label is present at `start`, this value will be 2.
    pub fn try_from_compressed(octets: &[u8], start: usize) -> Result<(Self, usize), Error> {
        wire::parse_compressed_name(octets, start)
    }

    /// Tries to parse an uncompressed name present at the start of the
    /// provided buffer. Extra data is ignored. The name is returned
    /// along with its length in octets.
    pub fn try_from_uncompressed(octets: &[u8]) -> Result<(Self, usize), Error> {
        wire::parse_uncompressed_name(octets)
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// `Name`.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the on-the-wire representation of the `Name` starting
    /// with the `n`-th label. This panics if `n >= self.len()`.
    pub fn wire_repr_from(&self, n: usize) -> &[u8] {
        &self.wire[self.label_offsets()[n] as usize..]
    }

    /// Returns the offsets of each label in the wire representation.
    fn label_offsets(&self) -> ArrayVec<u8, MAX_N_LABELS> {
        let mut offsets = ArrayVec::new();
        let mut offset = 0;
        while offsets.len() < self.len() {
            offsets.push(offset as u8);
            offset += self.wire[offset] as usize + 1;
        }
        offsets
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            for label in self.labels().filter(|label| !label.is_null()) {
                write!(f, "{}.", label)?;
            }
            Ok(())
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The [`Ord`] implementation for `Name` employs DNSSEC's canonical
/// ordering of domain names. Per [RFC 4034 § 6.1], `Name`s are ordered
/// as strings of labels read from right to left.
///
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.labels()
            .rev()
            .zip(other.labels().rev())
            .map(|(a, b)| a.cmp(&b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.len().cmp(&other.len()))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in self.labels() {
            label.hash(state);
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the [`Label`]s in a [`Name`].
///
/// To use this iterator, construct one from a [`Name`] using
/// [`Name::labels`].
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    name: &'a Name,
    offsets: ArrayVec<u8, MAX_N_LABELS>,
    front: usize,
    back: usize,
}

impl Labels<'_> {
    fn new(name: &Name) -> Labels {
        Labels {
            name,
            offsets: name.label_offsets(),
            front: 0,
            back: name.len(),
        }
    }
}

impl<'a> Iterator for Labels<'a> {
    type Item = Label<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let offset = self.offsets[self.front] as usize;
            let len = self.name.wire[offset] as usize;
            self.front += 1;
            Some(Label::new(&self.name.wire[offset + 1..offset + 1 + len]))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Labels<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            self.back -= 1;
            let offset = self.offsets[self.back] as usize;
            let len = self.name.wire[offset] as usize;
            Some(Label::new(&self.name.wire[offset + 1..offset + 1 + len]))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for Labels<'_> {}

impl FusedIterator for Labels<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING OF NAMES FROM RUST STRINGS                                 //
////////////////////////////////////////////////////////////////////////

/// Allows for conversion of a Rust [`str`] into a [`Name`]. The passed
/// string must be strictly ASCII. Escape sequences as defined by
/// [RFC 4343 § 2.1] are supported. A name without a trailing dot is
/// still treated as absolute.
///
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::StrEmpty);
        } else if s == "." {
            return Ok(Name::root());
        }

        let mut remaining_octets: &[u8] = s.as_ref();
        let mut labels: ArrayVec<ArrayVec<u8, MAX_LABEL_LEN>, MAX_N_LABELS> = ArrayVec::new();
        let mut current = ArrayVec::<u8, MAX_LABEL_LEN>::new();
        let mut pending = false;

        // NOTE: to check that the string is ASCII, it suffices to check
        // that each octet is ASCII as we go. This is because all
        // multi-byte characters start with an octet that is not ASCII.
        while let Some(&octet) = remaining_octets.first() {
            if octet == b'.' {
                if current.is_empty() {
                    return Err(Error::NullNonTerminal);
                }
                labels
                    .try_push(std::mem::take(&mut current))
                    .or(Err(Error::NameTooLong))?;
                pending = false;
                remaining_octets = &remaining_octets[1..];
                continue;
            }
            let (value, consumed) = if octet == b'\\' {
                let (value, consumed) = parse_escape(&remaining_octets[1..])?;
                (value, consumed + 1)
            } else if !octet.is_ascii() {
                return Err(Error::StrNotAscii);
            } else {
                (octet, 1)
            };
            current.try_push(value).or(Err(Error::LabelTooLong))?;
            pending = true;
            remaining_octets = &remaining_octets[consumed..];
        }
        if pending {
            labels.try_push(current).or(Err(Error::NameTooLong))?;
        }
        Name::from_labels(labels.iter().map(|label| label.as_slice()))
    }
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash that introduces the
/// escape sequence.
fn parse_escape(remaining_octets: &[u8]) -> Result<(u8, usize), Error> {
    if remaining_octets.is_empty() {
        Err(Error::InvalidEscape)
    } else if remaining_octets[0].is_ascii_digit() {
        if remaining_octets.len() < 3
            || !remaining_octets[1].is_ascii_digit()
            || !remaining_octets[2].is_ascii_digit()
        {
            Err(Error::InvalidEscape)
        } else {
            let hundreds = (remaining_octets[0] - b'0') as usize;
            let tens = (remaining_octets[1] - b'0') as usize;
            let ones = (remaining_octets[2] - b'0') as usize;
            let value = 100 * hundreds + 10 * tens + ones;
            if value > 255 {
                Err(Error::InvalidEscape)
            } else {
                Ok((value as u8, 3))
            }
        }
    } else {
        Ok((remaining_octets[0], 1))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    #[test]
    fn root_has_expected_characteristics() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.len(), 1);
        assert_eq!(root.wire_repr(), &[0]);
        assert_eq!(root.to_string(), ".");
    }

    #[test]
    fn is_wildcard_works() {
        assert!(name("*.querent.test.").is_wildcard());
        assert!(!name("querent.test.").is_wildcard());
        assert!(name("*.*.querent.test.").is_wildcard());
        assert!(!name("x.*.querent.test.").is_wildcard());
    }

    #[test]
    fn superdomain_works() {
        let subdomain = name("subdomain.example.test.");
        assert_eq!(subdomain.superdomain(0), Some(subdomain.clone()));
        assert_eq!(subdomain.superdomain(1), Some(name("example.test.")));
        assert_eq!(subdomain.superdomain(2), Some(name("test.")));
        assert_eq!(subdomain.superdomain(3), Some(Name::root()));
        assert_eq!(subdomain.superdomain(4), None);
    }

    #[test]
    fn labels_iterator_works() {
        let name = name("a.b.example.test.");
        let labels: Vec<&[u8]> = name.labels().map(|l| l.octets()).collect();
        assert_eq!(labels, [&b"a"[..], b"b", b"example", b"test", b""]);
        let reversed: Vec<&[u8]> = name.labels().rev().map(|l| l.octets()).collect();
        assert_eq!(reversed, [&b""[..], b"test", b"example", b"b", b"a"]);
        assert_eq!(name.labels().len(), 5);
    }

    #[test]
    fn eq_or_subdomain_of_works() {
        let subdomain = name("subdomain.example.test.");
        let domain = name("EXAMPLE.test.");
        let root = Name::root();
        assert!(subdomain.eq_or_subdomain_of(&subdomain));
        assert!(subdomain.eq_or_subdomain_of(&domain));
        assert!(subdomain.eq_or_subdomain_of(&root));
        assert!(!domain.eq_or_subdomain_of(&subdomain));
        assert!(!root.eq_or_subdomain_of(&domain));
        assert!(!domain.eq_or_subdomain_of(&name("other.test.")));
        assert!(!domain.eq_or_subdomain_of(&name("example.com.")));
    }

    #[test]
    fn equality_and_hash_ignore_case() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(name("Example.TEST."));
        assert!(set.contains(&name("example.test.")));
        assert_ne!(name("example.test."), name("example.tests."));
    }

    #[test]
    fn wire_repr_from_works() {
        let name = name("a.bb.ccc.");
        assert_eq!(name.wire_repr_from(0), b"\x01a\x02bb\x03ccc\x00");
        assert_eq!(name.wire_repr_from(1), b"\x02bb\x03ccc\x00");
        assert_eq!(name.wire_repr_from(3), b"\x00");
    }

    #[test]
    fn ord_works() {
        // This ordered list is from RFC 4034 § 6.1, which defines the
        // canonical ordering of domain names.
        let names: Vec<Name> = [
            "example.",
            "a.example.",
            "yljkjljk.a.example.",
            "Z.a.example.",
            "zABC.a.EXAMPLE.",
            "z.example.",
            "\\001.z.example.",
            "*.z.example.",
            "\\200.z.example.",
        ]
        .into_iter()
        .map(name)
        .collect();

        for (i, ni) in names.iter().enumerate() {
            for (j, nj) in names.iter().enumerate() {
                assert_eq!(i.cmp(&j), ni.cmp(nj));
            }
        }
    }

    #[test]
    fn fromstr_works() {
        assert_eq!(name("example.test.").wire_repr(), b"\x07example\x04test\x00");
        assert_eq!(name("example.test").wire_repr(), b"\x07example\x04test\x00");
        assert_eq!(name("."), Name::root());
    }

    #[test]
    fn fromstr_rejects_bad_input() {
        assert_eq!("".parse::<Name>(), Err(Error::StrEmpty));
        assert_eq!("✈.aero.".parse::<Name>(), Err(Error::StrNotAscii));
        assert_eq!("a.b..c.".parse::<Name>(), Err(Error::NullNonTerminal));
        assert_eq!(".a".parse::<Name>(), Err(Error::NullNonTerminal));
        assert_eq!(
            "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx.".parse::<Name>(),
            Err(Error::LabelTooLong)
        );
        let long = "x.".repeat(128);
        assert_eq!(long.parse::<Name>(), Err(Error::NameTooLong));
    }

    #[test]
    fn fromstr_escaping_works() {
        let escaped = name("\\000.\\\\\\..");
        assert_eq!(escaped.wire_repr(), b"\x01\x00\x02\\.\x00");
        assert_eq!(escaped.to_string(), "\\000.\\\\\\..");
    }

    #[test]
    fn fromstr_rejects_invalid_escapes() {
        assert_eq!("\\00".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("\\00x.".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("\\256.".parse::<Name>(), Err(Error::InvalidEscape));
    }

    #[test]
    fn to_lowercase_works() {
        let name = name("UPPERCASE.Domain.Test.");
        assert_eq!(name.to_lowercase().wire_repr(), b"\x09uppercase\x06domain\x04test\x00");
    }

    #[test]
    fn prepend_works() {
        let parent = name("example.test.");
        assert_eq!(parent.prepend(b"*").unwrap(), name("*.example.test."));
        assert_eq!(parent.prepend(b""), Err(Error::NullNonTerminal));
    }
}
