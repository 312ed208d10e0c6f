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

//! Implementation of the [`TrustAnchors`] type.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::class::Class;
use crate::name::Name;
use crate::rr::{Field, Record, Type};
use crate::util::decode_hex;

/// The DS records of the IANA root zone KSKs: KSK-2017 and KSK-2024.
const ROOT_DS: [(u16, &str); 2] = [
    (
        20326,
        "E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D",
    ),
    (
        38696,
        "683D2D0ACB8C9B712A1948B27F741219298D0A450D612C483AF444A4C0FB2B16",
    ),
];

/// An ordered set of trust anchors: DS or DNSKEY records that are
/// trusted without validation.
///
/// The set is read-only during validation. To change it, build a new
/// one and swap it in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrustAnchors {
    anchors: Vec<Record>,
}

impl TrustAnchors {
    /// Returns the IANA root trust anchors.
    pub fn root() -> Self {
        let anchors = ROOT_DS
            .iter()
            .filter_map(|&(key_tag, digest)| {
                let digest = decode_hex(digest)?;
                Some(Record::new(
                    Name::root(),
                    Type::DS,
                    Class::IN,
                    0,
                    vec![
                        Field::U16(key_tag),
                        Field::U8(8),
                        Field::U8(2),
                        Field::Octets(digest),
                    ],
                ))
            })
            .collect();
        Self { anchors }
    }

    /// Returns an empty set. Nothing validates against it.
    pub fn empty() -> Self {
        Self {
            anchors: Vec::new(),
        }
    }

    /// Builds a set from DS and DNSKEY records. Records of other types
    /// are rejected.
    pub fn new(anchors: Vec<Record>) -> Result<Self, AnchorError> {
        for (index, record) in anchors.iter().enumerate() {
            if !matches!(record.rr_type, Type::DS | Type::DNSKEY) {
                return Err(AnchorError::new(index + 1, AnchorErrorKind::UnsupportedType));
            }
        }
        Ok(Self { anchors })
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<Record> {
        self.anchors.iter()
    }

    /// Returns the deepest anchored zone that `name` is in.
    pub fn closest_zone(&self, name: &Name) -> Option<&Name> {
        self.anchors
            .iter()
            .map(|anchor| &anchor.owner)
            .filter(|zone| name.eq_or_subdomain_of(zone))
            .max_by_key(|zone| zone.len())
    }

    /// Returns the anchors for exactly `zone`.
    pub fn for_zone<'a>(&'a self, zone: &'a Name) -> impl Iterator<Item = &'a Record> + 'a {
        self.anchors.iter().filter(move |anchor| anchor.owner == *zone)
    }
}

impl Default for TrustAnchors {
    fn default() -> Self {
        Self::root()
    }
}

/// Parses anchors in presentation format, one per line:
///
/// ```text
/// <zone> [<ttl>] [IN] DS <key tag> <algorithm> <digest type> <hex digest>
/// <zone> [<ttl>] [IN] DNSKEY <flags> <protocol> <algorithm> <base64 key>
/// ```
///
/// Blank lines and lines starting with `;` or `#` are ignored.
impl FromStr for TrustAnchors {
    type Err = AnchorError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut anchors = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            let record = parse_anchor(line).map_err(|kind| AnchorError::new(index + 1, kind))?;
            anchors.push(record);
        }
        Ok(Self { anchors })
    }
}

fn parse_anchor(line: &str) -> Result<Record, AnchorErrorKind> {
    let mut tokens = line.split_whitespace().peekable();
    let zone: Name = tokens
        .next()
        .ok_or(AnchorErrorKind::Syntax)?
        .parse()
        .or(Err(AnchorErrorKind::BadName))?;

    let mut ttl = 0;
    if let Some(value) = tokens.peek().and_then(|t| t.parse::<u32>().ok()) {
        ttl = value;
        tokens.next();
    }
    if tokens.peek().map_or(false, |t| t.eq_ignore_ascii_case("IN")) {
        tokens.next();
    }
    let rr_type: Type = tokens
        .next()
        .ok_or(AnchorErrorKind::Syntax)?
        .parse()
        .or(Err(AnchorErrorKind::Syntax))?;

    let mut number = |max: u32| -> Result<u32, AnchorErrorKind> {
        tokens
            .next()
            .and_then(|t| t.parse::<u32>().ok())
            .filter(|&n| n <= max)
            .ok_or(AnchorErrorKind::Syntax)
    };
    let mut fields = match rr_type {
        Type::DS => vec![
            Field::U16(number(0xffff)? as u16),
            Field::U8(number(0xff)? as u8),
            Field::U8(number(0xff)? as u8),
        ],
        Type::DNSKEY => vec![
            Field::U16(number(0xffff)? as u16),
            Field::U8(number(0xff)? as u8),
            Field::U8(number(0xff)? as u8),
        ],
        _ => return Err(AnchorErrorKind::UnsupportedType),
    };
    let data: String = tokens.collect();
    let data = if rr_type == Type::DS {
        decode_hex(&data)
    } else {
        BASE64.decode(data.as_bytes()).ok()
    };
    match data {
        Some(data) if !data.is_empty() => fields.push(Field::Octets(data)),
        _ => return Err(AnchorErrorKind::Syntax),
    }
    Ok(Record::new(zone, rr_type, Class::IN, ttl, fields))
}

/// An error parsing trust anchors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AnchorError {
    line: usize,
    kind: AnchorErrorKind,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum AnchorErrorKind {
    Syntax,
    BadName,
    UnsupportedType,
}

impl AnchorError {
    fn new(line: usize, kind: AnchorErrorKind) -> Self {
        Self { line, kind }
    }

    /// The (one-based) line or record number of the error.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Display for AnchorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let what = match self.kind {
            AnchorErrorKind::Syntax => "syntax error",
            AnchorErrorKind::BadName => "bad zone name",
            AnchorErrorKind::UnsupportedType => "anchors must be DS or DNSKEY records",
        };
        write!(f, "trust anchor {}: {what}", self.line)
    }
}

impl std::error::Error for AnchorError {}

/// DNSKEY parameters in presentation form.
#[cfg(test)]
pub(crate) struct DnskeyText {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: &'static str,
}

#[cfg(test)]
impl DnskeyText {
    pub fn fields(&self) -> Vec<Field> {
        vec![
            Field::U16(self.flags),
            Field::U8(self.protocol),
            Field::U8(self.algorithm),
            Field::Octets(BASE64.decode(self.public_key).unwrap()),
        ]
    }

    pub fn to_rdata(&self) -> Vec<u8> {
        crate::rr::rdata::canonical_rdata(Type::DNSKEY, &self.fields()).unwrap()
    }
}

/// The root zone's KSK-2017.
#[cfg(test)]
pub(crate) const ROOT_KSK_2017: DnskeyText = DnskeyText {
    flags: 257,
    protocol: 3,
    algorithm: 8,
    public_key: concat!(
        "AwEAAaz/tAm8yTn4Mfeh5eyI96WSVexTBAvkMgJzkKTOiW1vkIbzxeF3",
        "+/4RgWOq7HrxRixHlFlExOLAJr5emLvN7SWXgnLh4+B5xQlNVz8Og8kv",
        "ArMtNROxVQuCaSnIDdD5LKyWbRd2n9WGe2R8PzgCmr3EgVLrjyBxWezF",
        "0jLHwVN8efS3rCj/EWgvIWgb9tarpVUDK/b58Da+sqqls3eNbuv7pr+e",
        "oZG+SrDK6nWeL3c6H5Apxz7LjVc1uTIdsIXxuOLYA4/ilBmSVIzuDWfd",
        "RUfhHdY6+cn8HFRm+2hM8AnXGXws9555KrUB5qihylGa8subX2Nn6UwN",
        "R1AkUTV74bU="
    ),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_anchors_are_ds_records() {
        let anchors = TrustAnchors::root();
        assert_eq!(anchors.len(), 2);
        let tags: Vec<_> = anchors.iter().filter_map(|a| a.rdata[0].as_u16()).collect();
        assert_eq!(tags, [20326, 38696]);
        let zone: Name = "www.example.".parse().unwrap();
        assert_eq!(anchors.closest_zone(&zone), Some(&Name::root()));
    }

    #[test]
    fn anchors_parse_from_text() {
        let text = "\
; local anchors
example. 3600 IN DS 12345 13 2 0123 4567
example. DNSKEY 257 3 13 AQID
sub.example. DS 1 8 1 abcd
";
        let anchors: TrustAnchors = text.parse().unwrap();
        assert_eq!(anchors.len(), 3);
        let first = anchors.iter().next().unwrap();
        assert_eq!(first.ttl, 3600);
        assert_eq!(first.rdata[3], Field::Octets(vec![0x01, 0x23, 0x45, 0x67]));
        let second = anchors.iter().nth(1).unwrap();
        assert_eq!(second.rr_type, Type::DNSKEY);
        assert_eq!(second.rdata[3], Field::Octets(vec![1, 2, 3]));

        let name: Name = "a.sub.example.".parse().unwrap();
        let sub: Name = "sub.example.".parse().unwrap();
        assert_eq!(anchors.closest_zone(&name), Some(&sub));
        assert_eq!(anchors.for_zone(&sub).count(), 1);
    }

    #[test]
    fn bad_anchors_report_line() {
        let err = "example. DS 1 8 2 abcd\nexample. A 192.0.2.1\n"
            .parse::<TrustAnchors>()
            .unwrap_err();
        assert_eq!(err.line(), 2);
        assert!("example. DS 1 300 2 abcd".parse::<TrustAnchors>().is_err());
        assert!("example. DS 1 8 2".parse::<TrustAnchors>().is_err());
    }
}
