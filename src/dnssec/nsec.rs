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

//! NSEC and NSEC3 helpers for proving that a delegation is unsigned.

use sha1::{Digest, Sha1};

use crate::name::Name;
use crate::rr::{Record, Type};
use crate::util::encode_base32hex;

/// NSEC3 records with more iterations than this are ignored
/// ([RFC 9276 § 3.2]).
///
/// [RFC 9276 § 3.2]: https://datatracker.ietf.org/doc/html/rfc9276#section-3.2
pub const MAX_NSEC3_ITERATIONS: u16 = 150;

/// The only NSEC3 hash algorithm, SHA-1.
const NSEC3_SHA1: u8 = 1;

/// Returns whether a type bitmap ([RFC 4034 § 4.1.2]) has the bit for
/// `rr_type` set. Malformed bitmaps contain nothing past the error.
///
/// [RFC 4034 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-4.1.2
pub fn bitmap_contains(mut bitmap: &[u8], rr_type: Type) -> bool {
    let code = u16::from(rr_type);
    let (window, offset) = ((code >> 8) as u8, (code & 0xff) as usize);
    while let [block, len, rest @ ..] = bitmap {
        let len = *len as usize;
        if len == 0 || len > 32 || rest.len() < len {
            return false;
        }
        if *block == window {
            return rest[..len]
                .get(offset / 8)
                .map_or(false, |octet| octet & (0x80 >> (offset % 8)) != 0);
        }
        bitmap = &rest[len..];
    }
    false
}

/// Computes the NSEC3 hash of `name` ([RFC 5155 § 5]).
///
/// [RFC 5155 § 5]: https://datatracker.ietf.org/doc/html/rfc5155#section-5
pub fn nsec3_hash(name: &Name, salt: &[u8], iterations: u16) -> Vec<u8> {
    let name = name.to_lowercase();
    let mut hasher = Sha1::new();
    hasher.update(name.wire_repr());
    hasher.update(salt);
    let mut digest = hasher.finalize();
    for _ in 0..iterations {
        let mut hasher = Sha1::new();
        hasher.update(digest);
        hasher.update(salt);
        digest = hasher.finalize();
    }
    digest.to_vec()
}

/// Returns the type bitmap of an NSEC or NSEC3 record.
fn type_bitmap(record: &Record) -> Option<&[u8]> {
    match record.rr_type {
        Type::NSEC => record.rdata.get(1)?.as_octets(),
        // The bitmap of an NSEC3 record may be empty.
        Type::NSEC3 => match record.rdata.get(5) {
            Some(field) => field.as_octets(),
            None => Some(&[]),
        },
        _ => None,
    }
}

/// Returns whether an NSEC or NSEC3 record's bitmap describes a
/// delegation without a DS RRset: NS is present while DS and SOA are
/// absent.
pub fn denies_ds(record: &Record) -> bool {
    match type_bitmap(record) {
        Some(bitmap) => {
            bitmap_contains(bitmap, Type::NS)
                && !bitmap_contains(bitmap, Type::DS)
                && !bitmap_contains(bitmap, Type::SOA)
        }
        None => false,
    }
}

/// Returns whether `record` is an NSEC record owned by `name`.
pub fn nsec_matches(record: &Record, name: &Name) -> bool {
    record.rr_type == Type::NSEC && record.owner == *name
}

/// Returns whether `record` is an NSEC3 record whose hashed owner
/// matches `name`.
pub fn nsec3_matches(record: &Record, name: &Name) -> bool {
    if record.rr_type != Type::NSEC3 {
        return false;
    }
    let (algorithm, iterations, salt) = match (
        record.rdata.first().and_then(|f| f.as_u8()),
        record.rdata.get(2).and_then(|f| f.as_u16()),
        record.rdata.get(3).and_then(|f| f.as_octets()),
    ) {
        (Some(algorithm), Some(iterations), Some(salt)) => (algorithm, iterations, salt),
        _ => return false,
    };
    if algorithm != NSEC3_SHA1 || iterations > MAX_NSEC3_ITERATIONS {
        return false;
    }

    let zone = match record.owner.superdomain(1) {
        Some(zone) => zone,
        None => return false,
    };
    if !name.eq_or_subdomain_of(&zone) {
        return false;
    }
    let hashed = encode_base32hex(&nsec3_hash(name, salt, iterations));
    record
        .owner
        .labels()
        .next()
        .map_or(false, |label| label.octets().eq_ignore_ascii_case(hashed.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::Field;
    use crate::util::decode_hex;

    #[test]
    fn bitmap_lookup_works() {
        // A MX RRSIG NSEC, from RFC 4034 § 4.3.
        let bitmap = [0x00, 0x06, 0x40, 0x01, 0x00, 0x00, 0x00, 0x03];
        assert!(bitmap_contains(&bitmap, Type::A));
        assert!(bitmap_contains(&bitmap, Type::MX));
        assert!(bitmap_contains(&bitmap, Type::RRSIG));
        assert!(bitmap_contains(&bitmap, Type::NSEC));
        assert!(!bitmap_contains(&bitmap, Type::NS));
        assert!(!bitmap_contains(&bitmap, Type::DNSKEY));
        assert!(!bitmap_contains(&bitmap, Type::TA));
        assert!(!bitmap_contains(&[0x00, 0x06, 0x40], Type::A));
    }

    #[test]
    fn nsec3_hash_matches_published_vectors() {
        // RFC 5155 appendix A.
        let salt = decode_hex("aabbccdd").unwrap();
        let hash = nsec3_hash(&"example.".parse().unwrap(), &salt, 12);
        assert_eq!(encode_base32hex(&hash), "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom");
        let hash = nsec3_hash(&"a.EXAMPLE.".parse().unwrap(), &salt, 12);
        assert_eq!(encode_base32hex(&hash), "35mthgpgcu1qg68fab165klnsnk3dpvl");
    }

    #[test]
    fn delegation_without_ds_is_recognized() {
        // NS RRSIG NSEC
        let bitmap = vec![0x00, 0x06, 0x20, 0x00, 0x00, 0x00, 0x00, 0x03];
        let nsec = Record::new(
            "sub.example.".parse().unwrap(),
            Type::NSEC,
            Class::IN,
            300,
            vec![
                Field::Name("z.example.".parse().unwrap()),
                Field::Octets(bitmap),
            ],
        );
        assert!(denies_ds(&nsec));
        assert!(nsec_matches(&nsec, &"SUB.example.".parse().unwrap()));

        // NS SOA RRSIG NSEC: a zone apex, not a delegation
        let mut apex = nsec.clone();
        apex.rdata[1] = Field::Octets(vec![0x00, 0x06, 0x22, 0x00, 0x00, 0x00, 0x00, 0x03]);
        assert!(!denies_ds(&apex));
    }

    #[test]
    fn nsec3_owner_matches_hashed_name() {
        let salt = decode_hex("aabbccdd").unwrap();
        let nsec3 = |iterations| {
            Record::new(
                "35MTHGPGCU1QG68FAB165KLNSNK3DPVL.example.".parse().unwrap(),
                Type::NSEC3,
                Class::IN,
                300,
                vec![
                    Field::U8(1),
                    Field::U8(0),
                    Field::U16(iterations),
                    Field::Counted8(salt.clone()),
                    Field::Counted8(vec![0; 20]),
                    Field::Octets(vec![0x00, 0x01, 0x20]),
                ],
            )
        };
        let name: Name = "a.example.".parse().unwrap();
        assert!(nsec3_matches(&nsec3(12), &name));
        assert!(denies_ds(&nsec3(12)));
        assert!(!nsec3_matches(&nsec3(11), &name));
        assert!(!nsec3_matches(&nsec3(200), &name));
        assert!(!nsec3_matches(&nsec3(12), &"a.example.org.".parse().unwrap()));
    }
}
