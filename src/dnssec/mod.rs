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

//! DNSSEC validation.
//!
//! The [`Validator`] groups records into RRsets and, for each one,
//! builds a chain RRSIG → DNSKEY → DS → ... up to a trust anchor from
//! the records it was given. An RRset below a delegation that a signed
//! NSEC or NSEC3 record proves to have no DS RRset is insecure. The
//! validator performs no I/O; callers gather the support records.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::debug;

use crate::class::Class;
use crate::name::Name;
use crate::rr::rdata::canonical_rdata;
use crate::rr::{Field, Record, Type};

pub mod anchor;
pub mod crypto;
pub mod nsec;

pub use anchor::{AnchorError, TrustAnchors};

/// The DNSKEY flag marking a zone key.
const ZONE_KEY_FLAG: u16 = 0x0100;

/// The only valid DNSKEY protocol value.
const DNSKEY_PROTOCOL: u8 = 3;

////////////////////////////////////////////////////////////////////////
// STATUS AND ERRORS                                                  //
////////////////////////////////////////////////////////////////////////

/// The DNSSEC status of a set of records.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    Secure,
    Bogus,
    Indeterminate,
    Insecure,
    /// Validation was not requested.
    NotPerformed,
}

impl Status {
    /// Returns the numeric code of the status.
    pub fn code(self) -> u32 {
        match self {
            Self::Secure => 400,
            Self::Bogus => 401,
            Self::Indeterminate => 402,
            Self::Insecure => 403,
            Self::NotPerformed => 404,
        }
    }

    /// Ranks statuses for combination; the highest rank wins.
    fn rank(self) -> u8 {
        match self {
            Self::NotPerformed | Self::Secure => 0,
            Self::Insecure => 1,
            Self::Indeterminate => 2,
            Self::Bogus => 3,
        }
    }

    /// Combines the statuses of two RRsets.
    pub fn combine(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Self::Secure => "secure",
            Self::Bogus => "bogus",
            Self::Indeterminate => "indeterminate",
            Self::Insecure => "insecure",
            Self::NotPerformed => "not performed",
        };
        f.write_str(text)
    }
}

/// Why a chain of trust could not be established.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ValidationError {
    /// The data is provably wrong: a bad signature or digest, an
    /// expired signature, or unsigned data that should be signed.
    Bogus(String),
    /// The chain could not be built from the available records.
    Indeterminate(String),
}

impl ValidationError {
    pub fn status(&self) -> Status {
        match self {
            Self::Bogus(_) => Status::Bogus,
            Self::Indeterminate(_) => Status::Indeterminate,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bogus(reason) => write!(f, "bogus: {reason}"),
            Self::Indeterminate(reason) => write!(f, "indeterminate: {reason}"),
        }
    }
}

impl std::error::Error for ValidationError {}

type Verdict<T> = Result<T, ValidationError>;

fn bogus<T>(reason: String) -> Verdict<T> {
    Err(ValidationError::Bogus(reason))
}

fn indeterminate<T>(reason: String) -> Verdict<T> {
    Err(ValidationError::Indeterminate(reason))
}

/// The outcome of a successful run over one RRset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Security {
    Secure,
    Insecure,
}

/// The keys of a zone, once its DNSKEY RRset has been authenticated.
#[derive(Clone, Debug)]
enum ZoneKeys {
    Trusted(Vec<Record>),
    Insecure,
}

////////////////////////////////////////////////////////////////////////
// VALIDATOR                                                          //
////////////////////////////////////////////////////////////////////////

/// Validates `records` against `anchors`, using `support` (DNSKEY, DS,
/// NSEC, NSEC3 and RRSIG records) to build chains of trust. `now` is
/// the current time in seconds since the epoch, modulo 2³².
pub fn validate(
    records: &[Record],
    support: &[Record],
    anchors: &TrustAnchors,
    now: u32,
) -> Status {
    Validator::new(anchors, now).validate(records, support)
}

/// A DNSSEC validator for a fixed set of anchors and a fixed time.
#[derive(Clone, Debug)]
pub struct Validator<'a> {
    anchors: &'a TrustAnchors,
    now: u32,
    skew: u32,
}

impl<'a> Validator<'a> {
    pub fn new(anchors: &'a TrustAnchors, now: u32) -> Self {
        Self {
            anchors,
            now,
            skew: 0,
        }
    }

    /// Allows signatures to be up to `skew` seconds outside their
    /// validity period.
    pub fn with_skew(mut self, skew: u32) -> Self {
        self.skew = skew;
        self
    }

    /// Validates every RRset in `records` and combines the results.
    /// RRSIG records in `records` are treated as support.
    pub fn validate(&self, records: &[Record], support: &[Record]) -> Status {
        let mut run = Run {
            validator: self,
            pool: records.iter().chain(support).collect(),
            keys: HashMap::new(),
            visiting: HashSet::new(),
        };

        let rrsets = group_rrsets(records);
        if rrsets.is_empty() {
            return Status::Indeterminate;
        }
        let mut status = Status::Secure;
        for rrset in rrsets {
            let rrset_status = match run.validate_rrset(&rrset) {
                Ok(Security::Secure) => Status::Secure,
                Ok(Security::Insecure) => Status::Insecure,
                Err(e) => {
                    debug!("{} {} failed validation: {e}", rrset[0].owner, rrset[0].rr_type);
                    e.status()
                }
            };
            status = status.combine(rrset_status);
        }
        status
    }
}

/// Groups records into RRsets by owner, type and class, keeping the
/// order of first appearance. RRSIG records are left out.
fn group_rrsets(records: &[Record]) -> Vec<Vec<&Record>> {
    let mut rrsets: Vec<Vec<&Record>> = Vec::new();
    for record in records.iter().filter(|r| r.rr_type != Type::RRSIG) {
        let existing = rrsets.iter_mut().find(|rrset| {
            let first = rrset[0];
            first.owner == record.owner
                && first.rr_type == record.rr_type
                && first.class == record.class
        });
        match existing {
            Some(rrset) => rrset.push(record),
            None => rrsets.push(vec![record]),
        }
    }
    rrsets
}

/// The state of a single validation run.
struct Run<'v, 'r> {
    validator: &'v Validator<'v>,
    pool: Vec<&'r Record>,
    keys: HashMap<Name, Verdict<ZoneKeys>>,
    visiting: HashSet<Name>,
}

impl<'v, 'r> Run<'v, 'r> {
    /// Returns the RRset of the given owner, type and class.
    fn rrset(&self, owner: &Name, rr_type: Type, class: Class) -> Vec<&'r Record> {
        self.pool
            .iter()
            .copied()
            .filter(|r| r.rr_type == rr_type && r.class == class && r.owner == *owner)
            .collect()
    }

    /// Returns the RRSIG records covering the given RRset.
    fn signatures(&self, owner: &Name, rr_type: Type, class: Class) -> Vec<&'r Record> {
        self.pool
            .iter()
            .copied()
            .filter(|r| {
                r.type_covered() == Some(rr_type) && r.class == class && r.owner == *owner
            })
            .collect()
    }

    fn validate_rrset(&mut self, rrset: &[&Record]) -> Verdict<Security> {
        let owner = &rrset[0].owner;
        let anchor_zone = match self.validator.anchors.closest_zone(owner) {
            Some(zone) => zone.clone(),
            None => return indeterminate(format!("no trust anchor covers {owner}")),
        };
        let class = rrset[0].class;
        if self.signatures(owner, rrset[0].rr_type, class).is_empty() {
            if self.proven_insecure(&anchor_zone, owner, class) {
                Ok(Security::Insecure)
            } else {
                bogus(format!("{owner} {} is unsigned", rrset[0].rr_type))
            }
        } else {
            self.verify_signed(rrset, &anchor_zone)
        }
    }

    /// Verifies an RRset that must carry a signature.
    fn verify_signed(&mut self, rrset: &[&Record], anchor_zone: &Name) -> Verdict<Security> {
        let owner = &rrset[0].owner;
        let rr_type = rrset[0].rr_type;
        let mut last_error = None;
        for sig in self.signatures(owner, rr_type, rrset[0].class) {
            let signer = match sig.rdata.get(7).and_then(Field::as_name) {
                Some(signer) => signer,
                None => continue,
            };
            if !owner.eq_or_subdomain_of(signer) || !signer.eq_or_subdomain_of(anchor_zone) {
                last_error = Some(ValidationError::Bogus(format!(
                    "{owner} {rr_type} is signed by {signer}, outside its zone"
                )));
                continue;
            }
            // A DS RRset belongs to the parent side of the cut.
            if rr_type == Type::DS && signer == owner {
                continue;
            }
            match self.zone_keys(signer) {
                Ok(ZoneKeys::Insecure) => return Ok(Security::Insecure),
                Ok(ZoneKeys::Trusted(keys)) => {
                    let keys: Vec<&Record> = keys.iter().collect();
                    match self.verify_rrsig(rrset, sig, &keys) {
                        Ok(()) => return Ok(Security::Secure),
                        Err(e) => last_error = Some(e),
                    }
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            ValidationError::Bogus(format!("no usable signature over {owner} {rr_type}"))
        }))
    }

    /// Returns whether a validated NSEC or NSEC3 record proves that a
    /// delegation between `anchor_zone` and `owner` has no DS RRset.
    fn proven_insecure(&mut self, anchor_zone: &Name, owner: &Name, class: Class) -> bool {
        let mut cut = owner.clone();
        while cut != *anchor_zone && cut.eq_or_subdomain_of(anchor_zone) {
            let proofs: Vec<&Record> = self
                .pool
                .iter()
                .copied()
                .filter(|r| r.class == class)
                .filter(|r| nsec::nsec_matches(r, &cut) || nsec::nsec3_matches(r, &cut))
                .filter(|r| nsec::denies_ds(r))
                .collect();
            for proof in proofs {
                let rrset = self.rrset(&proof.owner, proof.rr_type, class);
                if self.verify_signed(&rrset, anchor_zone).is_ok() {
                    debug!("{cut} is proven to be an unsigned delegation");
                    return true;
                }
            }
            cut = match cut.superdomain(1) {
                Some(parent) => parent,
                None => break,
            };
        }
        false
    }

    /// Returns the authenticated keys of `zone`, consulting the cache.
    fn zone_keys(&mut self, zone: &Name) -> Verdict<ZoneKeys> {
        if let Some(cached) = self.keys.get(zone) {
            return cached.clone();
        }
        if !self.visiting.insert(zone.clone()) {
            return indeterminate(format!("the chain of trust for {zone} loops"));
        }
        let result = self.find_zone_keys(zone);
        self.visiting.remove(zone);
        self.keys.insert(zone.clone(), result.clone());
        result
    }

    fn find_zone_keys(&mut self, zone: &Name) -> Verdict<ZoneKeys> {
        let anchors = self.validator.anchors;
        let dnskeys = self.rrset(zone, Type::DNSKEY, Class::IN);
        let zone_anchors: Vec<&Record> = anchors.for_zone(zone).collect();

        let entry_points: Vec<&Record> = if !zone_anchors.is_empty() {
            let supported: Vec<&Record> = zone_anchors
                .into_iter()
                .filter(|anchor| anchor.rr_type == Type::DNSKEY || ds_is_supported(anchor))
                .collect();
            if supported.is_empty() {
                return Ok(ZoneKeys::Insecure);
            }
            dnskeys
                .iter()
                .copied()
                .filter(|key| supported.iter().any(|anchor| anchor_matches(anchor, key)))
                .collect()
        } else {
            let anchor_zone = match anchors.closest_zone(zone) {
                Some(anchor_zone) => anchor_zone.clone(),
                None => return indeterminate(format!("no trust anchor covers {zone}")),
            };
            let ds_set = self.rrset(zone, Type::DS, Class::IN);
            if ds_set.is_empty() {
                return if self.proven_insecure(&anchor_zone, zone, Class::IN) {
                    Ok(ZoneKeys::Insecure)
                } else {
                    indeterminate(format!("no DS RRset for {zone}"))
                };
            }
            if self.verify_signed(&ds_set, &anchor_zone)? == Security::Insecure {
                return Ok(ZoneKeys::Insecure);
            }
            let supported: Vec<&Record> =
                ds_set.into_iter().filter(|ds| ds_is_supported(ds)).collect();
            if supported.is_empty() {
                return Ok(ZoneKeys::Insecure);
            }
            dnskeys
                .iter()
                .copied()
                .filter(|key| supported.iter().any(|ds| ds_matches(ds, key)))
                .collect()
        };

        if dnskeys.is_empty() {
            return indeterminate(format!("no DNSKEY RRset for {zone}"));
        } else if entry_points.is_empty() {
            return bogus(format!("no DNSKEY of {zone} matches its DS or anchor"));
        }
        let mut last_error = None;
        for sig in self.signatures(zone, Type::DNSKEY, Class::IN) {
            if sig.rdata.get(7).and_then(Field::as_name) != Some(zone) {
                continue;
            }
            match self.verify_rrsig(&dnskeys, sig, &entry_points) {
                Ok(()) => {
                    return Ok(ZoneKeys::Trusted(dnskeys.into_iter().cloned().collect()));
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            ValidationError::Bogus(format!("the DNSKEY RRset of {zone} is not self-signed"))
        }))
    }

    /// Verifies one RRSIG over `rrset` against any of `keys`.
    fn verify_rrsig(&self, rrset: &[&Record], sig: &Record, keys: &[&Record]) -> Verdict<()> {
        let owner = &rrset[0].owner;
        let rrsig = match Rrsig::from_record(sig) {
            Some(rrsig) => rrsig,
            None => return bogus(format!("malformed RRSIG over {owner}")),
        };
        if rrsig.type_covered != rrset[0].rr_type {
            return bogus(format!("RRSIG over {owner} covers the wrong type"));
        }

        let now = self.validator.now;
        let skew = self.validator.skew;
        if !serial_le(rrsig.inception, now.wrapping_add(skew)) {
            return bogus(format!("RRSIG over {owner} is not yet valid"));
        } else if !serial_le(now.wrapping_sub(skew), rrsig.expiration) {
            return bogus(format!("RRSIG over {owner} has expired"));
        } else if !crypto::supports_algorithm(rrsig.algorithm) {
            return indeterminate(format!("unsupported algorithm {}", rrsig.algorithm));
        }

        let data = signed_data(rrset, &sig.rdata)?;
        for key in keys {
            let (flags, protocol, algorithm, public_key) = match key.rdata.as_slice() {
                [Field::U16(flags), Field::U8(protocol), Field::U8(algorithm), key] => {
                    (*flags, *protocol, *algorithm, key.as_octets().unwrap_or_default())
                }
                _ => continue,
            };
            if flags & ZONE_KEY_FLAG == 0
                || protocol != DNSKEY_PROTOCOL
                || algorithm != rrsig.algorithm
            {
                continue;
            }
            let rdata = canonical_rdata(Type::DNSKEY, &key.rdata).ok();
            if rdata.map(|rdata| crypto::key_tag(&rdata)) != Some(rrsig.key_tag) {
                continue;
            }
            if crypto::verify(algorithm, public_key, &data, rrsig.signature) {
                return Ok(());
            }
        }
        bogus(format!("no key verifies the RRSIG over {owner} {}", rrset[0].rr_type))
    }
}

////////////////////////////////////////////////////////////////////////
// HELPERS                                                            //
////////////////////////////////////////////////////////////////////////

/// The fields of an RRSIG record that validation looks at.
struct Rrsig<'a> {
    type_covered: Type,
    algorithm: u8,
    expiration: u32,
    inception: u32,
    key_tag: u16,
    signature: &'a [u8],
}

impl<'a> Rrsig<'a> {
    fn from_record(record: &'a Record) -> Option<Self> {
        match record.rdata.as_slice() {
            [
                Field::U16(covered),
                Field::U8(algorithm),
                Field::U8(_),
                Field::U32(_),
                Field::U32(expiration),
                Field::U32(inception),
                Field::U16(key_tag),
                Field::Name(_),
                signature,
            ] => Some(Self {
                type_covered: Type::from(*covered),
                algorithm: *algorithm,
                expiration: *expiration,
                inception: *inception,
                key_tag: *key_tag,
                signature: signature.as_octets()?,
            }),
            _ => None,
        }
    }
}

/// Compares timestamps with serial number arithmetic ([RFC 1982]).
///
/// [RFC 1982]: https://datatracker.ietf.org/doc/html/rfc1982
fn serial_le(a: u32, b: u32) -> bool {
    b.wrapping_sub(a) < 1 << 31
}

/// Builds the data an RRSIG signs ([RFC 4034 § 3.1.8.1]) from the
/// RRset and the RRSIG's RDATA fields. The signature field, if
/// present, is ignored.
///
/// [RFC 4034 § 3.1.8.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-3.1.8.1
fn signed_data(rrset: &[&Record], rrsig: &[Field]) -> Verdict<Vec<u8>> {
    let malformed = || ValidationError::Bogus("malformed RRSIG".to_owned());
    let (labels, original_ttl, signer) = match rrsig {
        [_, _, Field::U8(labels), Field::U32(ttl), _, _, _, Field::Name(signer), ..] => {
            (*labels as usize, *ttl, signer)
        }
        _ => return Err(malformed()),
    };

    let mut data = Vec::new();
    for field in &rrsig[..7] {
        field.write_uncompressed(&mut data).map_err(|_| malformed())?;
    }
    data.extend_from_slice(signer.to_lowercase().wire_repr());

    // Expand wildcards: the RRSIG labels field counts the labels of the
    // name that was signed, excluding the root and any leading "*".
    let owner = &rrset[0].owner;
    let mut owner_labels = owner.len() - 1;
    if owner.is_wildcard() {
        owner_labels -= 1;
    }
    let owner = if labels > owner_labels {
        return bogus(format!("RRSIG labels exceed those of {owner}"));
    } else if labels < owner_labels {
        owner
            .superdomain(owner.len() - 1 - labels)
            .and_then(|closest| closest.prepend(b"*").ok())
            .ok_or_else(malformed)?
    } else {
        owner.clone()
    };
    let owner = owner.to_lowercase();

    let mut rdatas = Vec::with_capacity(rrset.len());
    for record in rrset {
        let rdata = canonical_rdata(record.rr_type, &record.rdata).map_err(|_| {
            ValidationError::Bogus(format!("unencodable record at {}", record.owner))
        })?;
        rdatas.push(rdata);
    }
    rdatas.sort_unstable();
    rdatas.dedup();

    let rr_type = u16::from(rrset[0].rr_type).to_be_bytes();
    let class = u16::from(rrset[0].class).to_be_bytes();
    for rdata in rdatas {
        let rdlength = u16::try_from(rdata.len()).map_err(|_| malformed())?;
        data.extend_from_slice(owner.wire_repr());
        data.extend_from_slice(&rr_type);
        data.extend_from_slice(&class);
        data.extend_from_slice(&original_ttl.to_be_bytes());
        data.extend_from_slice(&rdlength.to_be_bytes());
        data.extend_from_slice(&rdata);
    }
    Ok(data)
}

/// Returns whether the digest type and algorithm of a DS record are
/// supported.
fn ds_is_supported(ds: &Record) -> bool {
    match ds.rdata.as_slice() {
        [_, Field::U8(algorithm), Field::U8(digest_type), _] => {
            crypto::supports_algorithm(*algorithm) && crypto::supports_digest(*digest_type)
        }
        _ => false,
    }
}

/// Returns whether a DS record refers to a DNSKEY record.
fn ds_matches(ds: &Record, dnskey: &Record) -> bool {
    let (key_tag, algorithm, digest_type, digest) = match ds.rdata.as_slice() {
        [Field::U16(tag), Field::U8(algorithm), Field::U8(digest_type), digest] => {
            (*tag, *algorithm, *digest_type, digest.as_octets())
        }
        _ => return false,
    };
    let rdata = match canonical_rdata(Type::DNSKEY, &dnskey.rdata) {
        Ok(rdata) => rdata,
        Err(_) => return false,
    };
    dnskey.rdata.get(2).and_then(Field::as_u8) == Some(algorithm)
        && crypto::key_tag(&rdata) == key_tag
        && crypto::ds_digest(digest_type, &dnskey.owner, &rdata).as_deref() == digest
}

/// Returns whether a trust anchor (DS or DNSKEY) refers to a DNSKEY
/// record.
fn anchor_matches(anchor: &Record, dnskey: &Record) -> bool {
    if anchor.rr_type == Type::DNSKEY {
        anchor.rdata == dnskey.rdata
    } else {
        ds_matches(anchor, dnskey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::rand::SystemRandom;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    const NOW: u32 = 1_700_000_000;

    struct Signer {
        zone: Name,
        pair: Ed25519KeyPair,
        dnskey: Record,
        key_tag: u16,
    }

    impl Signer {
        fn new(zone: &str) -> Self {
            let rng = SystemRandom::new();
            let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
            let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
            let zone: Name = zone.parse().unwrap();
            let dnskey = Record::new(
                zone.clone(),
                Type::DNSKEY,
                Class::IN,
                3600,
                vec![
                    Field::U16(257),
                    Field::U8(3),
                    Field::U8(15),
                    Field::Octets(pair.public_key().as_ref().to_vec()),
                ],
            );
            let key_tag = crypto::key_tag(&canonical_rdata(Type::DNSKEY, &dnskey.rdata).unwrap());
            Self {
                zone,
                pair,
                dnskey,
                key_tag,
            }
        }

        fn ds(&self) -> Record {
            let rdata = canonical_rdata(Type::DNSKEY, &self.dnskey.rdata).unwrap();
            let digest = crypto::ds_digest(2, &self.zone, &rdata).unwrap();
            Record::new(
                self.zone.clone(),
                Type::DS,
                Class::IN,
                3600,
                vec![
                    Field::U16(self.key_tag),
                    Field::U8(15),
                    Field::U8(2),
                    Field::Octets(digest),
                ],
            )
        }

        fn sign_valid(&self, rrset: &[&Record], inception: u32, expiration: u32) -> Record {
            let owner = &rrset[0].owner;
            let mut labels = owner.len() as u8 - 1;
            if owner.is_wildcard() {
                labels -= 1;
            }
            let mut rdata = vec![
                Field::U16(rrset[0].rr_type.into()),
                Field::U8(15),
                Field::U8(labels),
                Field::U32(rrset[0].ttl),
                Field::U32(expiration),
                Field::U32(inception),
                Field::U16(self.key_tag),
                Field::Name(self.zone.clone()),
            ];
            let data = signed_data(rrset, &rdata).unwrap();
            rdata.push(Field::Octets(self.pair.sign(&data).as_ref().to_vec()));
            Record::new(owner.clone(), Type::RRSIG, Class::IN, rrset[0].ttl, rdata)
        }

        fn sign(&self, rrset: &[&Record]) -> Record {
            self.sign_valid(rrset, NOW - 3600, NOW + 3600)
        }

        /// Returns the DNSKEY RRset and its self-signature.
        fn keys(&self) -> Vec<Record> {
            vec![self.dnskey.clone(), self.sign(&[&self.dnskey])]
        }
    }

    fn a_record(owner: &str, last: u8) -> Record {
        Record::new(
            owner.parse().unwrap(),
            Type::A,
            Class::IN,
            300,
            vec![Field::Octets(vec![192, 0, 2, last])],
        )
    }

    fn anchored(signer: &Signer) -> TrustAnchors {
        TrustAnchors::new(vec![signer.ds()]).unwrap()
    }

    #[test]
    fn signed_rrset_is_secure() {
        let example = Signer::new("example.");
        let a1 = a_record("www.example.", 1);
        let a2 = a_record("www.example.", 2);
        let sig = example.sign(&[&a2, &a1]);
        let anchors = anchored(&example);
        let records = vec![a1, a2, sig];
        assert_eq!(validate(&records, &example.keys(), &anchors, NOW), Status::Secure);
    }

    #[test]
    fn tampered_rrset_is_bogus() {
        let example = Signer::new("example.");
        let a = a_record("www.example.", 1);
        let sig = example.sign(&[&a]);
        let anchors = anchored(&example);
        let records = vec![a_record("www.example.", 66), sig];
        assert_eq!(validate(&records, &example.keys(), &anchors, NOW), Status::Bogus);
    }

    #[test]
    fn expired_signature_is_bogus_unless_skewed() {
        let example = Signer::new("example.");
        let a = a_record("www.example.", 1);
        let sig = example.sign_valid(&[&a], NOW - 7200, NOW - 60);
        let anchors = anchored(&example);
        let records = vec![a, sig];
        let support = example.keys();
        assert_eq!(validate(&records, &support, &anchors, NOW), Status::Bogus);
        let validator = Validator::new(&anchors, NOW).with_skew(300);
        assert_eq!(validator.validate(&records, &support), Status::Secure);
    }

    #[test]
    fn missing_chain_is_indeterminate() {
        let example = Signer::new("example.");
        let a = a_record("www.example.", 1);
        let sig = example.sign(&[&a]);
        let records = vec![a, sig];

        // No anchor covers the data.
        let other = Signer::new("example.org.");
        let anchors = anchored(&other);
        assert_eq!(validate(&records, &example.keys(), &anchors, NOW), Status::Indeterminate);

        // The DNSKEY RRset is not available.
        let anchors = anchored(&example);
        assert_eq!(validate(&records, &[], &anchors, NOW), Status::Indeterminate);
        assert_eq!(validate(&[], &[], &anchors, NOW), Status::Indeterminate);
    }

    #[test]
    fn chain_follows_delegations() {
        let parent = Signer::new("example.");
        let child = Signer::new("sub.example.");
        let a = a_record("host.sub.example.", 1);
        let sig = child.sign(&[&a]);
        let ds = child.ds();
        let ds_sig = parent.sign(&[&ds]);

        let mut support = parent.keys();
        support.extend(child.keys());
        support.push(ds);
        support.push(ds_sig);
        let anchors = anchored(&parent);
        let records = vec![a, sig];
        assert_eq!(validate(&records, &support, &anchors, NOW), Status::Secure);

        // Without the DS RRset the chain breaks.
        support.truncate(4);
        assert_eq!(validate(&records, &support, &anchors, NOW), Status::Indeterminate);
    }

    #[test]
    fn unsigned_delegation_is_insecure_with_proof() {
        let parent = Signer::new("example.");
        let a = a_record("host.sub.example.", 1);
        // NS RRSIG NSEC
        let nsec = Record::new(
            "sub.example.".parse().unwrap(),
            Type::NSEC,
            Class::IN,
            300,
            vec![
                Field::Name("zzz.example.".parse().unwrap()),
                Field::Octets(vec![0x00, 0x06, 0x20, 0x00, 0x00, 0x00, 0x00, 0x03]),
            ],
        );
        let nsec_sig = parent.sign(&[&nsec]);
        let anchors = anchored(&parent);
        let records = vec![a];

        assert_eq!(validate(&records, &parent.keys(), &anchors, NOW), Status::Bogus);
        let mut support = parent.keys();
        support.push(nsec);
        support.push(nsec_sig);
        assert_eq!(validate(&records, &support, &anchors, NOW), Status::Insecure);
    }

    #[test]
    fn wildcard_expansion_verifies() {
        let example = Signer::new("example.");
        let wildcard = a_record("*.example.", 1);
        let sig = example.sign(&[&wildcard]);
        let mut expanded = wildcard.clone();
        expanded.owner = "foo.example.".parse().unwrap();
        let mut expanded_sig = sig;
        expanded_sig.owner = expanded.owner.clone();
        let anchors = anchored(&example);
        let records = vec![expanded, expanded_sig];
        assert_eq!(validate(&records, &example.keys(), &anchors, NOW), Status::Secure);
    }

    #[test]
    fn dnskey_anchor_is_trusted_directly() {
        let example = Signer::new("example.");
        let a = a_record("www.example.", 1);
        let sig = example.sign(&[&a]);
        let anchors = TrustAnchors::new(vec![example.dnskey.clone()]).unwrap();
        let records = vec![a, sig];
        assert_eq!(validate(&records, &example.keys(), &anchors, NOW), Status::Secure);
    }

    #[test]
    fn statuses_combine_by_severity() {
        assert_eq!(Status::Secure.combine(Status::Insecure), Status::Insecure);
        assert_eq!(Status::Bogus.combine(Status::Indeterminate), Status::Bogus);
        assert_eq!(Status::Insecure.combine(Status::Indeterminate), Status::Indeterminate);
        assert_eq!(Status::Secure.combine(Status::Secure), Status::Secure);
        assert_eq!(Status::Insecure.code(), 403);
    }

    #[test]
    fn serial_comparison_wraps() {
        assert!(serial_le(1, 2));
        assert!(serial_le(u32::MAX, 1));
        assert!(!serial_le(2, 1));
    }
}
