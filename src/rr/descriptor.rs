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

//! The RR descriptor table.
//!
//! Every RR type this crate knows has a [`Descriptor`] giving the
//! sequence of [`FieldKind`]s that make up its RDATA. The wire codec
//! uses it to split RDATA into fields; types without an entry are
//! handled as opaque data per [RFC 3597].
//!
//! Type codes below [`DENSE_LIMIT`] are looked up by direct indexing.
//! The few registered types above that (TA and DLV) live in a short
//! tail that is searched linearly.
//!
//! [RFC 3597]: https://datatracker.ietf.org/doc/html/rfc3597

use lazy_static::lazy_static;

use crate::util::{parse_numeric_suffix, Caseless};

////////////////////////////////////////////////////////////////////////
// FIELD KINDS                                                        //
////////////////////////////////////////////////////////////////////////

/// The kind of a single RDATA field, which determines how it is laid
/// out on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldKind {
    /// Opaque data extending to the end of the RDATA.
    Unknown,
    /// An IPv4 address (4 octets).
    A,
    /// A domain name.
    Dname,
    Int8,
    Int16,
    Int32,
    /// A 32-bit TTL-like period.
    Period,
    /// The WKS protocol and bitmap, to the end of the RDATA.
    Wks,
    /// A character string with a one-octet length prefix.
    Str,
    /// An RR type (2 octets).
    Type,
    /// A DNSSEC algorithm number (1 octet).
    Alg,
    /// A 32-bit time in seconds since the epoch, in serial-number
    /// arithmetic.
    Time,
    /// Base 64 data (in presentation format) to the end of the RDATA.
    B64,
    Nsap,
    /// Hexadecimal data (in presentation format) to the end of the
    /// RDATA.
    Hex,
    /// An IPv6 address (16 octets).
    Aaaa,
    /// A LOC record body (16 octets).
    Loc,
    Atma,
    /// A certificate type (2 octets).
    CertAlg,
    /// One APL address prefix item.
    Apl,
    IpsecKey,
    /// An NSEC-style type bitmap, to the end of the RDATA.
    Nsec,
    /// The NSEC3 salt, with a one-octet length prefix.
    Nsec3Salt,
    /// The NSEC3 next hashed owner, with a one-octet length prefix.
    Nsec3NextOwner,
    /// Data with a two-octet length prefix.
    Int16Data,
    /// A 48-bit time, as used by TSIG.
    TsigTime,
    /// The HIT and public key of a HIP record.
    Hip,
    /// A 64-bit ILNP locator or node ID.
    Ilnp64,
    Eui48,
    Eui64,
    /// A CAA tag, with a one-octet length prefix.
    Tag,
    /// A character string extending to the end of the RDATA.
    LongStr,
    /// One SVCB/HTTPS service parameter (key, length, value).
    SvcParam,
}

////////////////////////////////////////////////////////////////////////
// DESCRIPTORS                                                        //
////////////////////////////////////////////////////////////////////////

/// Describes the RDATA layout of an RR type.
#[derive(Debug, Eq, PartialEq)]
pub struct Descriptor {
    /// The type code described.
    pub code: u16,
    /// The mnemonic of the type.
    pub name: &'static str,
    /// The minimum number of fields in non-empty RDATA.
    pub min_fields: u8,
    /// The number of fields in `layout` that are always consulted
    /// before `variable`.
    pub max_fields: u8,
    pub layout: &'static [FieldKind],
    /// The kind of any further (repeated) fields.
    pub variable: Option<FieldKind>,
    /// Whether names in the RDATA may be compressed (RFC 3597 § 4).
    pub compressible: bool,
    /// The number of domain names in the fixed layout.
    pub name_fields: u8,
}

impl Descriptor {
    /// Returns the minimum number of RDATA fields.
    pub fn minimum(&self) -> usize {
        self.min_fields as usize
    }

    /// Returns the maximum number of RDATA fields. When a variable
    /// field kind exists, this is 65535, since RDATA cannot be longer
    /// than that.
    pub fn maximum(&self) -> usize {
        if self.variable.is_some() {
            65535
        } else {
            self.max_fields as usize
        }
    }
}

/// Returns the kind of field `index` of RDATA described by
/// `descriptor`.
///
/// # Panics
///
/// The caller must ensure that `index < descriptor.max_fields` or that
/// the descriptor has a variable field kind. Otherwise, this panics.
pub fn field_kind(descriptor: &Descriptor, index: usize) -> FieldKind {
    if index < descriptor.max_fields as usize {
        descriptor.layout[index]
    } else {
        match descriptor.variable {
            Some(kind) => kind,
            None => panic!(
                "field index {} out of range for RR type {}",
                index, descriptor.code
            ),
        }
    }
}

/// Type codes below this value are found by indexing.
pub const DENSE_LIMIT: u16 = 259;

/// Returns the descriptor for `code`.
///
/// This never fails: types that are reserved, unassigned, or simply
/// unknown resolve to the descriptor for type 0, which treats the
/// whole RDATA as one opaque field.
pub fn describe(code: u16) -> &'static Descriptor {
    let found = if code < DENSE_LIMIT {
        DENSE_INDEX[code as usize]
    } else {
        SPARSE_TAIL.iter().find(|d| d.code == code)
    };
    found.unwrap_or(&DESCRIPTORS[0])
}

/// Looks up a type code by its textual name.
///
/// `TYPEnnn` pseudo-names produce their numeric value. Otherwise the
/// name is matched case-insensitively against the descriptor table,
/// and then against the meta-query types. Zero is returned when
/// nothing matches.
pub fn type_by_name(name: &str) -> u16 {
    if let Some(value) = parse_numeric_suffix(name, "TYPE") {
        return value;
    }
    if let Some(descriptor) = DESCRIPTORS[1..]
        .iter()
        .find(|d| Caseless(d.name) == Caseless(name))
    {
        return descriptor.code;
    }
    match Caseless(name) {
        Caseless("IXFR") => 251,
        Caseless("AXFR") => 252,
        Caseless("MAILB") => 253,
        Caseless("MAILA") => 254,
        Caseless("ANY") => 255,
        _ => 0,
    }
}

lazy_static! {
    /// Direct index over the dense range of the table.
    static ref DENSE_INDEX: [Option<&'static Descriptor>; DENSE_LIMIT as usize] = {
        let mut index = [None; DENSE_LIMIT as usize];
        for descriptor in DESCRIPTORS.iter().take_while(|d| d.code < DENSE_LIMIT) {
            index[descriptor.code as usize] = Some(descriptor);
        }
        index
    };

    /// The entries above the dense range.
    static ref SPARSE_TAIL: &'static [Descriptor] = {
        let start = DESCRIPTORS
            .iter()
            .position(|d| d.code >= DENSE_LIMIT)
            .unwrap_or(DESCRIPTORS.len());
        &DESCRIPTORS[start..]
    };
}

////////////////////////////////////////////////////////////////////////
// THE TABLE                                                          //
////////////////////////////////////////////////////////////////////////

use FieldKind::*;

const fn fixed(
    code: u16,
    name: &'static str,
    min_fields: u8,
    layout: &'static [FieldKind],
    name_fields: u8,
) -> Descriptor {
    Descriptor {
        code,
        name,
        min_fields,
        max_fields: layout.len() as u8,
        layout,
        variable: None,
        compressible: false,
        name_fields,
    }
}

const fn compressible(code: u16, name: &'static str, layout: &'static [FieldKind]) -> Descriptor {
    let mut name_fields = 0;
    let mut i = 0;
    while i < layout.len() {
        if matches!(layout[i], Dname) {
            name_fields += 1;
        }
        i += 1;
    }
    Descriptor {
        code,
        name,
        min_fields: layout.len() as u8,
        max_fields: layout.len() as u8,
        layout,
        variable: None,
        compressible: true,
        name_fields,
    }
}

const fn variable(
    code: u16,
    name: &'static str,
    min_fields: u8,
    layout: &'static [FieldKind],
    variable: FieldKind,
) -> Descriptor {
    Descriptor {
        code,
        name,
        min_fields,
        max_fields: layout.len() as u8,
        layout,
        variable: Some(variable),
        compressible: false,
        name_fields: 0,
    }
}

const OPAQUE: &[FieldKind] = &[Unknown];
const DS_LAYOUT: &[FieldKind] = &[Int16, Alg, Int8, Hex];
const DNSKEY_LAYOUT: &[FieldKind] = &[Int16, Int8, Alg, B64];
const KEY_LAYOUT: &[FieldKind] = &[Int16, Int8, Int8, B64];
const TLSA_LAYOUT: &[FieldKind] = &[Int8, Int8, Int8, Hex];
const SIG_LAYOUT: &[FieldKind] = &[Type, Alg, Int8, Int32, Time, Time, Int16, Dname, B64];
const SVCB_LAYOUT: &[FieldKind] = &[Int16, Dname];

/// All descriptors, sorted by type code. The first entry must be the
/// type 0 fallback.
static DESCRIPTORS: &[Descriptor] = &[
    fixed(0, "TYPE0", 0, OPAQUE, 0),
    fixed(1, "A", 1, &[A], 0),
    compressible(2, "NS", &[Dname]),
    compressible(3, "MD", &[Dname]),
    compressible(4, "MF", &[Dname]),
    compressible(5, "CNAME", &[Dname]),
    compressible(6, "SOA", &[Dname, Dname, Int32, Period, Period, Period, Period]),
    compressible(7, "MB", &[Dname]),
    compressible(8, "MG", &[Dname]),
    compressible(9, "MR", &[Dname]),
    fixed(10, "NULL", 1, OPAQUE, 0),
    fixed(11, "WKS", 2, &[A, Wks], 0),
    compressible(12, "PTR", &[Dname]),
    fixed(13, "HINFO", 2, &[Str, Str], 0),
    compressible(14, "MINFO", &[Dname, Dname]),
    compressible(15, "MX", &[Int16, Dname]),
    variable(16, "TXT", 1, &[], Str),
    fixed(17, "RP", 2, &[Dname, Dname], 2),
    fixed(18, "AFSDB", 2, &[Int16, Dname], 1),
    fixed(19, "X25", 1, &[Str], 0),
    fixed(20, "ISDN", 1, &[Str, Str], 0),
    fixed(21, "RT", 2, &[Int16, Dname], 1),
    fixed(22, "NSAP", 1, &[Nsap], 0),
    fixed(23, "NSAP-PTR", 1, &[Str], 0),
    fixed(24, "SIG", 9, SIG_LAYOUT, 1),
    fixed(25, "KEY", 4, KEY_LAYOUT, 0),
    fixed(26, "PX", 3, &[Int16, Dname, Dname], 2),
    fixed(27, "GPOS", 3, &[Str, Str, Str], 0),
    fixed(28, "AAAA", 1, &[Aaaa], 0),
    fixed(29, "LOC", 1, &[Loc], 0),
    fixed(30, "NXT", 2, &[Dname, Unknown], 1),
    fixed(31, "EID", 1, &[Hex], 0),
    fixed(32, "NIMLOC", 1, &[Hex], 0),
    fixed(33, "SRV", 4, &[Int16, Int16, Int16, Dname], 1),
    fixed(34, "ATMA", 1, &[Atma], 0),
    fixed(35, "NAPTR", 6, &[Int16, Int16, Str, Str, Str, Dname], 1),
    fixed(36, "KX", 2, &[Int16, Dname], 1),
    fixed(37, "CERT", 4, &[CertAlg, Int16, Alg, B64], 0),
    fixed(38, "A6", 1, OPAQUE, 0),
    fixed(39, "DNAME", 1, &[Dname], 1),
    fixed(40, "SINK", 1, &[Int8, Int8, Int8, B64], 0),
    fixed(41, "OPT", 1, OPAQUE, 0),
    variable(42, "APL", 0, &[Apl], Apl),
    fixed(43, "DS", 4, DS_LAYOUT, 0),
    fixed(44, "SSHFP", 3, &[Int8, Int8, Hex], 0),
    fixed(45, "IPSECKEY", 1, &[IpsecKey], 0),
    fixed(46, "RRSIG", 9, SIG_LAYOUT, 1),
    fixed(47, "NSEC", 1, &[Dname, Nsec], 1),
    fixed(48, "DNSKEY", 4, DNSKEY_LAYOUT, 0),
    fixed(49, "DHCID", 1, &[B64], 0),
    fixed(50, "NSEC3", 5, &[Int8, Int8, Int16, Nsec3Salt, Nsec3NextOwner, Nsec], 0),
    fixed(51, "NSEC3PARAM", 4, &[Int8, Int8, Int16, Nsec3Salt], 0),
    fixed(52, "TLSA", 4, TLSA_LAYOUT, 0),
    fixed(53, "SMIMEA", 4, TLSA_LAYOUT, 0),
    // HIP ends with zero or more rendezvous server names.
    variable(55, "HIP", 1, &[Hip], Dname),
    variable(56, "NINFO", 1, &[], Str),
    fixed(57, "RKEY", 4, KEY_LAYOUT, 0),
    fixed(58, "TALINK", 2, &[Dname, Dname], 2),
    fixed(59, "CDS", 4, DS_LAYOUT, 0),
    fixed(60, "CDNSKEY", 4, DNSKEY_LAYOUT, 0),
    fixed(61, "OPENPGPKEY", 1, &[B64], 0),
    fixed(62, "CSYNC", 2, &[Int32, Int16, Nsec], 0),
    fixed(63, "ZONEMD", 4, &[Int32, Int8, Int8, Hex], 0),
    Descriptor {
        name_fields: 1,
        ..variable(64, "SVCB", 2, SVCB_LAYOUT, SvcParam)
    },
    Descriptor {
        name_fields: 1,
        ..variable(65, "HTTPS", 2, SVCB_LAYOUT, SvcParam)
    },
    variable(99, "SPF", 1, &[], Str),
    fixed(104, "NID", 2, &[Int16, Ilnp64], 0),
    fixed(105, "L32", 2, &[Int16, A], 0),
    fixed(106, "L64", 2, &[Int16, Ilnp64], 0),
    fixed(107, "LP", 2, &[Int16, Dname], 1),
    fixed(108, "EUI48", 1, &[Eui48], 0),
    fixed(109, "EUI64", 1, &[Eui64], 0),
    // TKEY and TSIG count each length-prefixed field as one.
    fixed(249, "TKEY", 7, &[Dname, Time, Time, Int16, Int16, Int16Data, Int16Data], 1),
    fixed(250, "TSIG", 7, &[Dname, TsigTime, Int16, Int16Data, Int16, Int16, Int16Data], 1),
    fixed(251, "IXFR", 1, OPAQUE, 0),
    fixed(252, "AXFR", 1, OPAQUE, 0),
    fixed(253, "MAILB", 1, OPAQUE, 0),
    fixed(254, "MAILA", 1, OPAQUE, 0),
    fixed(255, "ANY", 1, OPAQUE, 0),
    fixed(256, "URI", 3, &[Int16, Int16, LongStr], 0),
    fixed(257, "CAA", 3, &[Int8, Tag, LongStr], 0),
    variable(258, "AVC", 1, &[], Str),
    // The sparse tail.
    fixed(32768, "TA", 4, DS_LAYOUT, 0),
    fixed(32769, "DLV", 4, DS_LAYOUT, 0),
];

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_starts_with_fallback() {
        assert_eq!(DESCRIPTORS[0].code, 0);
        for pair in DESCRIPTORS.windows(2) {
            assert!(pair[0].code < pair[1].code, "{} >= {}", pair[0].code, pair[1].code);
        }
    }

    #[test]
    fn describe_returns_queried_code_or_fallback() {
        let reserved = [54, 100, 101, 102, 103];
        for code in 0..DENSE_LIMIT {
            let descriptor = describe(code);
            if descriptor.code != code {
                assert_eq!(descriptor.code, 0, "code {code}");
                assert!(!DESCRIPTORS.iter().any(|d| d.code == code));
            }
            if reserved.contains(&code) {
                assert_eq!(descriptor.code, 0);
            }
        }
        assert_eq!(describe(1).name, "A");
        assert_eq!(describe(258).name, "AVC");
        assert_eq!(describe(32768).code, 32768);
        assert_eq!(describe(32769).code, 32769);
        assert_eq!(describe(32770).code, 0);
        assert_eq!(describe(65535).code, 0);
    }

    #[test]
    fn layouts_are_consistent() {
        for descriptor in DESCRIPTORS {
            assert!(descriptor.min_fields as usize <= descriptor.maximum());
            assert_eq!(descriptor.max_fields as usize, descriptor.layout.len());
            let names = descriptor.layout.iter().filter(|k| **k == Dname).count();
            assert_eq!(descriptor.name_fields as usize, names, "{}", descriptor.name);
        }
    }

    #[test]
    fn only_rfc1035_types_are_compressible() {
        let compressible: Vec<&str> = DESCRIPTORS
            .iter()
            .filter(|d| d.compressible)
            .map(|d| d.name)
            .collect();
        assert_eq!(
            compressible,
            ["NS", "MD", "MF", "CNAME", "SOA", "MB", "MG", "MR", "PTR", "MINFO", "MX"]
        );
    }

    #[test]
    fn field_kind_handles_variable_fields() {
        let hip = describe(55);
        assert_eq!(field_kind(hip, 0), Hip);
        assert_eq!(field_kind(hip, 1), Dname);
        assert_eq!(field_kind(hip, 5), Dname);
        assert_eq!(hip.maximum(), 65535);
        let txt = describe(16);
        assert_eq!(field_kind(txt, 0), Str);
        assert_eq!(field_kind(describe(6), 6), Period);
        assert_eq!(describe(6).maximum(), 7);
    }

    #[test]
    #[should_panic]
    fn field_kind_rejects_out_of_range_index() {
        field_kind(describe(1), 1);
    }

    #[test]
    fn type_by_name_works() {
        assert_eq!(type_by_name("TYPE61"), 61);
        assert_eq!(type_by_name("AAAA"), 28);
        assert_eq!(type_by_name("aaaa"), 28);
        assert_eq!(type_by_name("bogus"), 0);
        assert_eq!(type_by_name("NSAP-PTR"), 23);
        assert_eq!(type_by_name("DLV"), 32769);
        assert_eq!(type_by_name("axfr"), 252);
        assert_eq!(type_by_name("TYPE"), 0);
        assert_eq!(type_by_name(""), 0);
    }
}
