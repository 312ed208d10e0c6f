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

//! Crate-private utilities.

/// A wrapper around [`str`] references whose [`PartialEq`] and [`Eq`]
/// implementations are ASCII-case-insensitive.
pub struct Caseless<'a>(pub &'a str);

impl PartialEq for Caseless<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(other.0)
    }
}

impl Eq for Caseless<'_> {}

/// Parses the decimal number following a `TYPE` or `CLASS` style
/// prefix. Like C's `atoi`, this reads leading digits and stops at the
/// first non-digit; unlike it, values that do not fit in a `u16`
/// produce zero rather than wrapping.
pub fn parse_numeric_suffix(text: &str, prefix: &str) -> Option<u16> {
    if text.len() <= prefix.len() || !text.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, tail) = text.split_at(prefix.len());
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
    Some(tail[..digits].parse::<u16>().unwrap_or(0))
}

/// Converts a nibble into an ASCII hex character. Lower-case hex digits
/// are used. The passed value must be less than 16.
pub fn nibble_to_ascii_hex_digit(nibble: u8) -> u8 {
    assert!(nibble < 16);
    if nibble < 10 {
        b'0' + nibble
    } else {
        b'a' + nibble - 10
    }
}

/// Converts an ASCII hexadecimal digit to its numeric value. This
/// returns [`None`] if `digit` is not one of the ASCII characters
/// `0` through `9`, `A` through `F`, or `a` through `f`.
pub fn ascii_hex_digit_to_nibble(digit: u8) -> Option<u8> {
    if digit.is_ascii_digit() {
        Some(digit - b'0')
    } else if (b'A'..=b'F').contains(&digit) {
        Some(digit - b'A' + 10)
    } else if (b'a'..=b'f').contains(&digit) {
        Some(digit - b'a' + 10)
    } else {
        None
    }
}

/// Encodes `octets` as lower-case hexadecimal.
pub fn encode_hex(octets: &[u8]) -> String {
    let mut text = String::with_capacity(2 * octets.len());
    for octet in octets {
        text.push(nibble_to_ascii_hex_digit(octet >> 4) as char);
        text.push(nibble_to_ascii_hex_digit(octet & 0xf) as char);
    }
    text
}

/// Decodes hexadecimal text. Whitespace is ignored, since presentation
/// formats commonly split long digests into groups.
pub fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let mut nibbles = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .map(ascii_hex_digit_to_nibble);
    let mut octets = Vec::with_capacity(text.len() / 2);
    while let Some(high) = nibbles.next() {
        let low = nibbles.next()??;
        octets.push(high? << 4 | low);
    }
    Some(octets)
}

/// Encodes `octets` in the "base32hex" alphabet of RFC 4648 § 7,
/// lower-case and without padding, as used for NSEC3 owner names.
pub fn encode_base32hex(octets: &[u8]) -> String {
    const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";
    let mut text = String::with_capacity((octets.len() * 8 + 4) / 5);
    let mut buffer = 0u16;
    let mut n_bits = 0;
    for &octet in octets {
        buffer = (buffer << 8) | octet as u16;
        n_bits += 8;
        while n_bits >= 5 {
            n_bits -= 5;
            text.push(ALPHABET[((buffer >> n_bits) & 0x1f) as usize] as char);
        }
    }
    if n_bits > 0 {
        text.push(ALPHABET[((buffer << (5 - n_bits)) & 0x1f) as usize] as char);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numeric_suffix_works() {
        assert_eq!(parse_numeric_suffix("TYPE61", "TYPE"), Some(61));
        assert_eq!(parse_numeric_suffix("type61x", "TYPE"), Some(61));
        assert_eq!(parse_numeric_suffix("TYPE70000", "TYPE"), Some(0));
        assert_eq!(parse_numeric_suffix("TYPE", "TYPE"), None);
        assert_eq!(parse_numeric_suffix("CLASS1", "TYPE"), None);
    }

    #[test]
    fn hex_works() {
        assert_eq!(encode_hex(b"\x00\xab\x7f"), "00ab7f");
        assert_eq!(decode_hex("00AB 7f"), Some(vec![0x00, 0xab, 0x7f]));
        assert_eq!(decode_hex("abc"), None);
        assert_eq!(decode_hex("zz"), None);
    }

    #[test]
    fn base32hex_works() {
        // Test vectors from RFC 4648 § 10.
        assert_eq!(encode_base32hex(b""), "");
        assert_eq!(encode_base32hex(b"f"), "co");
        assert_eq!(encode_base32hex(b"fo"), "cpng");
        assert_eq!(encode_base32hex(b"foo"), "cpnmu");
        assert_eq!(encode_base32hex(b"foob"), "cpnmuog");
        assert_eq!(encode_base32hex(b"fooba"), "cpnmuoj1");
        assert_eq!(encode_base32hex(b"foobar"), "cpnmuoj1e8");
    }
}
