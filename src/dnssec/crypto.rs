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

//! Key tags, DS digests, and signature verification.

use ring::signature::{self, RsaPublicKeyComponents, UnparsedPublicKey};
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha384};

use crate::name::Name;

/// Computes the key tag of DNSKEY RDATA ([RFC 4034 appendix B]).
///
/// [RFC 4034 appendix B]: https://datatracker.ietf.org/doc/html/rfc4034#appendix-B
pub fn key_tag(dnskey_rdata: &[u8]) -> u16 {
    let mut acc: u32 = 0;
    for (i, octet) in dnskey_rdata.iter().enumerate() {
        if i & 1 == 0 {
            acc += (*octet as u32) << 8;
        } else {
            acc += *octet as u32;
        }
    }
    acc += (acc >> 16) & 0xffff;
    (acc & 0xffff) as u16
}

/// Returns whether a DS digest type is supported.
pub fn supports_digest(digest_type: u8) -> bool {
    matches!(digest_type, 1 | 2 | 4)
}

/// Computes the digest of a DS record for the key with RDATA
/// `dnskey_rdata` owned by `owner` ([RFC 4034 § 5.1.4]). Unsupported
/// digest types yield `None`.
///
/// [RFC 4034 § 5.1.4]: https://datatracker.ietf.org/doc/html/rfc4034#section-5.1.4
pub fn ds_digest(digest_type: u8, owner: &Name, dnskey_rdata: &[u8]) -> Option<Vec<u8>> {
    let owner = owner.to_lowercase();
    let owner = owner.wire_repr();
    let digest = match digest_type {
        1 => {
            let mut hasher = Sha1::new();
            hasher.update(owner);
            hasher.update(dnskey_rdata);
            hasher.finalize().to_vec()
        }
        2 => {
            let mut hasher = Sha256::new();
            hasher.update(owner);
            hasher.update(dnskey_rdata);
            hasher.finalize().to_vec()
        }
        4 => {
            let mut hasher = Sha384::new();
            hasher.update(owner);
            hasher.update(dnskey_rdata);
            hasher.finalize().to_vec()
        }
        _ => return None,
    };
    Some(digest)
}

/// Returns whether a signing algorithm is supported.
pub fn supports_algorithm(algorithm: u8) -> bool {
    matches!(algorithm, 5 | 7 | 8 | 10 | 13 | 14 | 15)
}

/// Verifies `sig` over `data` with a DNSKEY public key. Unsupported
/// algorithms and malformed keys never verify.
pub fn verify(algorithm: u8, public_key: &[u8], data: &[u8], sig: &[u8]) -> bool {
    match algorithm {
        5 | 7 => verify_rsa(
            &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY,
            public_key,
            data,
            sig,
        ),
        8 => verify_rsa(
            &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY,
            public_key,
            data,
            sig,
        ),
        10 => verify_rsa(
            &signature::RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY,
            public_key,
            data,
            sig,
        ),
        13 => verify_ecdsa(&signature::ECDSA_P256_SHA256_FIXED, 64, public_key, data, sig),
        14 => verify_ecdsa(&signature::ECDSA_P384_SHA384_FIXED, 96, public_key, data, sig),
        15 => {
            public_key.len() == 32
                && UnparsedPublicKey::new(&signature::ED25519, public_key)
                    .verify(data, sig)
                    .is_ok()
        }
        _ => false,
    }
}

/// Splits an RSA public key in the format of [RFC 3110 § 2] into its
/// exponent and modulus.
///
/// [RFC 3110 § 2]: https://datatracker.ietf.org/doc/html/rfc3110#section-2
fn parse_rsa_key(key: &[u8]) -> Option<(&[u8], &[u8])> {
    let (exponent_len, rest) = match key.split_first()? {
        (&0, rest) => {
            let len = rest.get(..2)?;
            (u16::from_be_bytes([len[0], len[1]]) as usize, &rest[2..])
        }
        (&len, rest) => (len as usize, rest),
    };
    let exponent = rest.get(..exponent_len)?;
    let modulus = &rest[exponent_len..];
    if exponent.is_empty() || modulus.is_empty() {
        None
    } else {
        Some((exponent, modulus))
    }
}

fn verify_rsa(
    params: &'static signature::RsaParameters,
    public_key: &[u8],
    data: &[u8],
    sig: &[u8],
) -> bool {
    match parse_rsa_key(public_key) {
        Some((e, n)) => RsaPublicKeyComponents { n, e }.verify(params, data, sig).is_ok(),
        None => false,
    }
}

fn verify_ecdsa(
    params: &'static signature::EcdsaVerificationAlgorithm,
    key_len: usize,
    public_key: &[u8],
    data: &[u8],
    sig: &[u8],
) -> bool {
    if public_key.len() != key_len || sig.len() != key_len {
        return false;
    }
    // Ring expects an uncompressed SEC1 point.
    let mut point = Vec::with_capacity(1 + key_len);
    point.push(0x04);
    point.extend_from_slice(public_key);
    UnparsedPublicKey::new(params, &point).verify(data, sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dnssec::anchor::ROOT_KSK_2017;
    use crate::util::decode_hex;
    use ring::rand::SystemRandom;
    use ring::signature::{EcdsaKeyPair, Ed25519KeyPair, KeyPair};

    #[test]
    fn root_ksk_key_tag_and_digest() {
        let rdata = ROOT_KSK_2017.to_rdata();
        assert_eq!(key_tag(&rdata), 20326);
        let expected =
            decode_hex("E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D").unwrap();
        assert_eq!(ds_digest(2, &Name::root(), &rdata), Some(expected));
        assert_eq!(ds_digest(3, &Name::root(), &rdata), None);
    }

    #[test]
    fn rsa_keys_are_split() {
        assert_eq!(
            parse_rsa_key(&[1, 3, 0xaa, 0xbb]),
            Some((&[3][..], &[0xaa, 0xbb][..]))
        );
        assert_eq!(
            parse_rsa_key(&[0, 0, 1, 3, 0xaa]),
            Some((&[3][..], &[0xaa][..]))
        );
        assert_eq!(parse_rsa_key(&[4, 1, 2]), None);
        assert_eq!(parse_rsa_key(&[]), None);
    }

    #[test]
    fn ecdsa_signatures_verify() {
        let rng = SystemRandom::new();
        let alg = &signature::ECDSA_P256_SHA256_FIXED_SIGNING;
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(alg, &rng).unwrap();
        let pair = EcdsaKeyPair::from_pkcs8(alg, pkcs8.as_ref(), &rng).unwrap();
        let sig = pair.sign(&rng, b"signed data").unwrap();
        // DNSKEY form omits the leading 0x04.
        let public_key = &pair.public_key().as_ref()[1..];
        assert!(verify(13, public_key, b"signed data", sig.as_ref()));
        assert!(!verify(13, public_key, b"other data", sig.as_ref()));
        assert!(!verify(14, public_key, b"signed data", sig.as_ref()));
    }

    #[test]
    fn ed25519_signatures_verify() {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let sig = pair.sign(b"data");
        assert!(verify(15, pair.public_key().as_ref(), b"data", sig.as_ref()));
        assert!(!verify(16, pair.public_key().as_ref(), b"data", sig.as_ref()));
    }
}
