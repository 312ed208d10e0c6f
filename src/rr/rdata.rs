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

//! Descriptor-driven reading and writing of RDATA.
//!
//! RDATA is split into a list of [`Field`]s according to the
//! [`Descriptor`] of its type. A decoded field remembers how it was
//! laid out (its width or length prefix), so it can be written back
//! without consulting the descriptor; the descriptor is only needed to
//! decide whether names may be compressed, and to check on encoding
//! that a field list fits the type.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::descriptor::{describe, field_kind, Descriptor, FieldKind};
use super::Type;
use crate::message::{CodecError, CodecResult as Result};
use crate::name::Name;
use crate::util::encode_hex;

////////////////////////////////////////////////////////////////////////
// FIELDS                                                             //
////////////////////////////////////////////////////////////////////////

/// A single decoded RDATA field.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Field {
    U8(u8),
    U16(u16),
    U32(u32),
    /// A 48-bit value (TSIG time signed).
    U48(u64),
    Name(Name),
    /// Data written as is: fixed-width fields, self-describing items,
    /// and data extending to the end of the RDATA.
    Octets(Vec<u8>),
    /// Data with a one-octet length prefix.
    Counted8(Vec<u8>),
    /// Data with a two-octet length prefix.
    Counted16(Vec<u8>),
}

const U48_MAX: u64 = 0xffff_ffff_ffff;

impl Field {
    /// Writes the field in uncompressed form to `out`.
    pub fn write_uncompressed(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::U8(value) => out.push(*value),
            Self::U16(value) => out.extend_from_slice(&value.to_be_bytes()),
            Self::U32(value) => out.extend_from_slice(&value.to_be_bytes()),
            Self::U48(value) => {
                if *value > U48_MAX {
                    return Err(CodecError::FieldOverflow);
                }
                out.extend_from_slice(&value.to_be_bytes()[2..]);
            }
            Self::Name(name) => out.extend_from_slice(name.wire_repr()),
            Self::Octets(octets) => out.extend_from_slice(octets),
            Self::Counted8(octets) => {
                let len = u8::try_from(octets.len()).or(Err(CodecError::InvalidField))?;
                out.push(len);
                out.extend_from_slice(octets);
            }
            Self::Counted16(octets) => {
                let len = u16::try_from(octets.len()).or(Err(CodecError::InvalidField))?;
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(octets);
            }
        }
        Ok(())
    }

    /// Returns whether this field has the right shape for `kind`.
    pub fn fits(&self, kind: FieldKind) -> bool {
        use FieldKind::*;
        match (self, kind) {
            (Self::U8(_), Int8 | Alg) => true,
            (Self::U16(_), Int16 | FieldKind::Type | CertAlg) => true,
            (Self::U32(_), Int32 | Period | Time) => true,
            (Self::U48(_), TsigTime) => true,
            (Self::Name(_), Dname) => true,
            (Self::Counted8(octets), Str | Tag | Nsec3Salt | Nsec3NextOwner) => octets.len() <= 255,
            (Self::Counted16(octets), Int16Data) => octets.len() <= 65535,
            (Self::Octets(octets), kind) => match fixed_width(kind) {
                Some(width) => octets.len() == width,
                None => match kind {
                    Apl | Hip | SvcParam => self_describing_len(kind, octets) == Some(octets.len()),
                    _ => extends_to_end(kind),
                },
            },
            _ => false,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::U8(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::U16(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the data of an `Octets`, `Counted8`, or `Counted16`
    /// field (without any length prefix).
    pub fn as_octets(&self) -> Option<&[u8]> {
        match self {
            Self::Octets(octets) | Self::Counted8(octets) | Self::Counted16(octets) => Some(octets),
            _ => None,
        }
    }
}

/// Returns the width of a fixed-width field kind that is represented
/// by [`Field::Octets`].
fn fixed_width(kind: FieldKind) -> Option<usize> {
    match kind {
        FieldKind::A => Some(4),
        FieldKind::Aaaa | FieldKind::Loc => Some(16),
        FieldKind::Eui48 => Some(6),
        FieldKind::Ilnp64 | FieldKind::Eui64 => Some(8),
        _ => None,
    }
}

/// Returns whether a field kind takes the rest of the RDATA.
fn extends_to_end(kind: FieldKind) -> bool {
    use FieldKind::*;
    matches!(
        kind,
        Unknown | Wks | B64 | Hex | Nsap | Atma | IpsecKey | Nsec | LongStr
    )
}

/// Computes the length of a self-describing item at the start of
/// `octets` from its internal length fields.
fn self_describing_len(kind: FieldKind, octets: &[u8]) -> Option<usize> {
    if octets.len() < 4 {
        return None;
    }
    let u16_at = |i: usize| u16::from_be_bytes([octets[i], octets[i + 1]]) as usize;
    match kind {
        // Family (2), prefix (1), negation flag and AFD length (1).
        FieldKind::Apl => Some(4 + (octets[3] & 0x7f) as usize),
        // HIT length (1), algorithm (1), public key length (2).
        FieldKind::Hip => Some(4 + octets[0] as usize + u16_at(2)),
        // Key (2), value length (2).
        FieldKind::SvcParam => Some(4 + u16_at(2)),
        _ => None,
    }
}

////////////////////////////////////////////////////////////////////////
// READING                                                            //
////////////////////////////////////////////////////////////////////////

/// Reads the RDATA of an RR of type `rr_type` occupying `rdlength`
/// octets at index `start` of `message`. Names may be compressed, so
/// `message` must be the whole message.
///
/// Empty RDATA yields an empty field list, whatever the type.
pub fn read_rdata(
    rr_type: Type,
    message: &[u8],
    start: usize,
    rdlength: u16,
) -> Result<Vec<Field>> {
    let end = start + rdlength as usize;
    if end > message.len() {
        return Err(CodecError::TruncatedField);
    } else if rdlength == 0 {
        return Ok(Vec::new());
    }

    let descriptor = describe(rr_type.into());
    let mut fields = Vec::new();
    let mut cursor = start;
    loop {
        if cursor == end && fields.len() >= descriptor.minimum() {
            break;
        } else if fields.len() >= descriptor.max_fields as usize && descriptor.variable.is_none() {
            return Err(CodecError::RdataLength);
        }
        let kind = field_kind(descriptor, fields.len());
        let (field, len) = read_field(kind, message, cursor, end)?;
        fields.push(field);
        cursor += len;
    }
    Ok(fields)
}

/// Reads a single field of the given kind at `cursor`, not going past
/// `end`. Returns the field and the number of octets consumed.
fn read_field(
    kind: FieldKind,
    message: &[u8],
    cursor: usize,
    end: usize,
) -> Result<(Field, usize)> {
    use FieldKind::*;
    let rest = &message[cursor..end];
    let take = |n: usize| rest.get(..n).ok_or(CodecError::TruncatedField);

    let result = match kind {
        Int8 | Alg => (Field::U8(take(1)?[0]), 1),
        Int16 | FieldKind::Type | CertAlg => {
            let octets = take(2)?;
            (Field::U16(u16::from_be_bytes([octets[0], octets[1]])), 2)
        }
        Int32 | Period | Time => {
            let octets = take(4)?;
            let value = u32::from_be_bytes([octets[0], octets[1], octets[2], octets[3]]);
            (Field::U32(value), 4)
        }
        TsigTime => {
            let mut buf = [0; 8];
            buf[2..].copy_from_slice(take(6)?);
            (Field::U48(u64::from_be_bytes(buf)), 6)
        }
        Dname => {
            let (name, len) = Name::try_from_compressed(message, cursor)?;
            if cursor + len > end {
                return Err(CodecError::TruncatedField);
            }
            (Field::Name(name), len)
        }
        Str | Tag | Nsec3Salt | Nsec3NextOwner => {
            let len = take(1)?[0] as usize;
            let octets = take(1 + len)?;
            (Field::Counted8(octets[1..].to_vec()), 1 + len)
        }
        Int16Data => {
            let prefix = take(2)?;
            let len = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
            let octets = take(2 + len)?;
            (Field::Counted16(octets[2..].to_vec()), 2 + len)
        }
        Apl | Hip | SvcParam => {
            let len = self_describing_len(kind, rest).ok_or(CodecError::TruncatedField)?;
            (Field::Octets(take(len)?.to_vec()), len)
        }
        kind => match fixed_width(kind) {
            Some(width) => (Field::Octets(take(width)?.to_vec()), width),
            None => (Field::Octets(rest.to_vec()), rest.len()),
        },
    };
    Ok(result)
}

////////////////////////////////////////////////////////////////////////
// WRITING                                                            //
////////////////////////////////////////////////////////////////////////

/// Checks that `fields` fits the layout of `descriptor`.
pub fn check_fields(descriptor: &Descriptor, fields: &[Field]) -> Result<()> {
    if fields.is_empty() {
        return Ok(());
    } else if fields.len() < descriptor.minimum() || fields.len() > descriptor.maximum() {
        return Err(CodecError::InvalidField);
    }
    for (index, field) in fields.iter().enumerate() {
        if let Field::U48(value) = field {
            if *value > U48_MAX {
                return Err(CodecError::FieldOverflow);
            }
        }
        if !field.fits(field_kind(descriptor, index)) {
            return Err(CodecError::InvalidField);
        }
    }
    Ok(())
}

/// Returns whether names in the RDATA of `rr_type` are lowercased in
/// the canonical form (RFC 4034 § 6.2, as amended by RFC 6840 § 5.1).
fn lowercases_names(rr_type: Type) -> bool {
    matches!(
        u16::from(rr_type),
        2..=9 | 12 | 14 | 15 | 17 | 18 | 21 | 24 | 26 | 30 | 33 | 35 | 36 | 38 | 39 | 46
    )
}

/// Serializes RDATA in the canonical form used for DNSSEC: no
/// compression, and names lowercased for the types that call for it.
pub fn canonical_rdata(rr_type: Type, fields: &[Field]) -> Result<Vec<u8>> {
    let lowercase = lowercases_names(rr_type);
    let mut out = Vec::new();
    for field in fields {
        match field {
            Field::Name(name) if lowercase => {
                out.extend_from_slice(name.to_lowercase().wire_repr())
            }
            field => field.write_uncompressed(&mut out)?,
        }
    }
    Ok(out)
}

////////////////////////////////////////////////////////////////////////
// PRESENTATION                                                       //
////////////////////////////////////////////////////////////////////////

/// Displays RDATA in a presentation format. Types without a
/// descriptor use the generic `\# length hex` form of RFC 3597 § 5.
pub struct DisplayRdata<'a> {
    pub rr_type: Type,
    pub fields: &'a [Field],
}

impl fmt::Display for DisplayRdata<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let descriptor = describe(self.rr_type.into());
        if descriptor.code != u16::from(self.rr_type) || descriptor.code == 0 {
            let mut octets = Vec::new();
            for field in self.fields {
                field.write_uncompressed(&mut octets).map_err(|_| fmt::Error)?;
            }
            return write!(f, "\\# {} {}", octets.len(), encode_hex(&octets));
        }

        for (index, field) in self.fields.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            let kind = if index < descriptor.maximum() {
                field_kind(descriptor, index)
            } else {
                FieldKind::Unknown
            };
            match (field, kind) {
                (Field::U8(v), _) => write!(f, "{v}")?,
                (Field::U16(v), FieldKind::Type) => write!(f, "{}", Type::from(*v))?,
                (Field::U16(v), _) => write!(f, "{v}")?,
                (Field::U32(v), _) => write!(f, "{v}")?,
                (Field::U48(v), _) => write!(f, "{v}")?,
                (Field::Name(name), _) => write!(f, "{name}")?,
                (Field::Octets(o), FieldKind::A) if o.len() == 4 => {
                    write!(f, "{}", Ipv4Addr::new(o[0], o[1], o[2], o[3]))?
                }
                (Field::Octets(o), FieldKind::Aaaa) if o.len() == 16 => {
                    let mut array = [0; 16];
                    array.copy_from_slice(o);
                    write!(f, "{}", Ipv6Addr::from(array))?
                }
                (Field::Octets(o), FieldKind::B64) => f.write_str(&BASE64.encode(o))?,
                (Field::Counted8(o), FieldKind::Str | FieldKind::Tag) => {
                    f.write_str("\"")?;
                    for octet in o {
                        match octet {
                            b'"' | b'\\' => write!(f, "\\{}", *octet as char)?,
                            0x20..=0x7e => write!(f, "{}", *octet as char)?,
                            _ => write!(f, "\\{:03}", octet)?,
                        }
                    }
                    f.write_str("\"")?;
                }
                (Field::Octets(o) | Field::Counted8(o) | Field::Counted16(o), _) => {
                    if o.is_empty() {
                        f.write_str("-")?
                    } else {
                        f.write_str(&encode_hex(o))?
                    }
                }
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(rr_type: Type, rdata: &[u8]) -> Result<Vec<Field>> {
        read_rdata(rr_type, rdata, 0, rdata.len() as u16)
    }

    #[test]
    fn soa_keeps_field_widths() {
        let rdata = b"\x02ns\x00\x04mail\x00\xff\xff\xff\xfe\x00\x00\x0e\x10\
                      \x00\x00\x07\x08\x00\x09\x3a\x80\x00\x00\x01\x2c";
        let fields = read_all(Type::SOA, rdata).unwrap();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[2], Field::U32(0xffff_fffe));
        assert_eq!(fields[6], Field::U32(300));
        assert_eq!(canonical_rdata(Type::SOA, &fields).unwrap(), rdata);
    }

    #[test]
    fn unknown_types_are_opaque() {
        let fields = read_all(Type::from(65280), b"\x01\x02\x03").unwrap();
        assert_eq!(fields, [Field::Octets(vec![1, 2, 3])]);
        let display = DisplayRdata {
            rr_type: Type::from(65280),
            fields: &fields,
        };
        assert_eq!(display.to_string(), "\\# 3 010203");
    }

    #[test]
    fn empty_rdata_is_allowed() {
        assert_eq!(read_all(Type::A, b"").unwrap(), []);
    }

    #[test]
    fn rdata_must_be_consumed_exactly() {
        assert_eq!(read_all(Type::A, b"\x01\x02\x03\x04\x05"), Err(CodecError::RdataLength));
        assert_eq!(read_all(Type::A, b"\x01\x02\x03"), Err(CodecError::TruncatedField));
        assert_eq!(read_all(Type::MX, b"\x00\x0a\x04mail"), Err(CodecError::TruncatedField));
        // RDLENGTH reaching past the message.
        assert_eq!(read_rdata(Type::A, b"\x01\x02", 0, 4), Err(CodecError::TruncatedField));
    }

    #[test]
    fn txt_reads_variable_strings() {
        let fields = read_all(Type::TXT, b"\x03abc\x00\x01d").unwrap();
        assert_eq!(
            fields,
            [
                Field::Counted8(b"abc".to_vec()),
                Field::Counted8(vec![]),
                Field::Counted8(b"d".to_vec())
            ]
        );
        let display = DisplayRdata {
            rr_type: Type::TXT,
            fields: &fields,
        };
        assert_eq!(display.to_string(), "\"abc\" \"\" \"d\"");
    }

    #[test]
    fn hip_reads_trailing_names() {
        let rdata = b"\x02\x08\x00\x03hhkkk\x03rvs\x00";
        let fields = read_all(Type::HIP, rdata).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], Field::Octets(b"\x02\x08\x00\x03hhkkk".to_vec()));
        assert_eq!(fields[1], Field::Name("rvs.".parse().unwrap()));
    }

    #[test]
    fn tsig_time_is_48_bits() {
        let descriptor = describe(250);
        let name: Name = "hmac-sha256.".parse().unwrap();
        let mut fields = vec![
            Field::Name(name),
            Field::U48(U48_MAX),
            Field::U16(300),
            Field::Counted16(vec![0xaa; 32]),
            Field::U16(1),
            Field::U16(0),
            Field::Counted16(vec![]),
        ];
        assert_eq!(check_fields(descriptor, &fields), Ok(()));
        fields[1] = Field::U48(U48_MAX + 1);
        assert_eq!(check_fields(descriptor, &fields), Err(CodecError::FieldOverflow));
    }

    #[test]
    fn check_fields_rejects_mismatched_layouts() {
        let a = describe(1);
        assert_eq!(check_fields(a, &[Field::Octets(vec![1, 2, 3, 4])]), Ok(()));
        assert_eq!(check_fields(a, &[Field::Octets(vec![1, 2, 3])]), Err(CodecError::InvalidField));
        assert_eq!(check_fields(a, &[Field::U32(1)]), Err(CodecError::InvalidField));
        assert_eq!(
            check_fields(a, &[Field::Octets(vec![0; 4]), Field::Octets(vec![0; 4])]),
            Err(CodecError::InvalidField)
        );
    }

    #[test]
    fn canonical_form_lowercases_only_listed_types() {
        let name: Name = "MAIL.Example.".parse().unwrap();
        let mx = [Field::U16(10), Field::Name(name.clone())];
        assert_eq!(canonical_rdata(Type::MX, &mx).unwrap(), b"\x00\x0a\x04mail\x07example\x00");
        let nsec = [Field::Name(name), Field::Octets(vec![0, 1, 0x40])];
        assert_eq!(
            canonical_rdata(Type::NSEC, &nsec).unwrap(),
            b"\x04MAIL\x07Example\x00\x00\x01\x40"
        );
    }

    #[test]
    fn canonical_form_lowercases_nxt() {
        let name: Name = "Next.Example.".parse().unwrap();
        let nxt = [Field::Name(name), Field::Octets(vec![0x40])];
        assert_eq!(
            canonical_rdata(Type::from(30), &nxt).unwrap(),
            b"\x04next\x07example\x00\x40"
        );
        assert!(lowercases_names(Type::from(38)));
        assert!(!lowercases_names(Type::from(37)));
    }
}
