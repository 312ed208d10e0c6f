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

//! Implementation of parsing of on-the-wire names.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_WIRE_LEN};

////////////////////////////////////////////////////////////////////////
// PARSING OF UNCOMPRESSED ON-THE-WIRE NAMES                          //
////////////////////////////////////////////////////////////////////////

/// Parses an uncompressed name present at the beginning of `octets`.
/// This is the implementation of [`Name::try_from_uncompressed`].
pub fn parse_uncompressed_name(octets: &[u8]) -> Result<(Name, usize), Error> {
    let mut offset = 0;
    let mut n_labels = 0;
    loop {
        let label_len = *octets.get(offset).ok_or(Error::UnexpectedEom)?;
        if label_len & 0xc0 == 0xc0 {
            // Pointers are not allowed here.
            return Err(Error::InvalidPointer);
        } else if label_len & 0xc0 != 0 {
            return Err(Error::UnknownLabelType);
        } else if label_len > MAX_LABEL_LEN as u8 {
            return Err(Error::LabelTooLong);
        }
        n_labels += 1;
        offset += label_len as usize + 1;
        if offset > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        } else if label_len == 0 {
            break;
        }
    }
    let name = Name::from_validated_wire(octets[..offset].into(), n_labels);
    Ok((name, offset))
}

////////////////////////////////////////////////////////////////////////
// PARSING OF COMPRESSED ON-THE-WIRE NAMES                            //
////////////////////////////////////////////////////////////////////////

/// Parses a compressed name starting at index `start` of `octets`.
/// Pointers are followed. Indices given in pointers are treated as
/// indices of `octets`, so the intention is for an entire DNS message
/// to be passed in `octets`. This is the implementation of
/// [`Name::try_from_compressed`].
///
/// Since every pointer must point strictly before the chunk that
/// contains it, each chunk starts earlier than the last, and parsing
/// always terminates.
pub fn parse_compressed_name(octets: &[u8], start: usize) -> Result<(Name, usize), Error> {
    let mut next_chunk = Some(start);
    let mut wire_len_of_first_chunk = None;
    let mut n_labels = 0;
    let mut wire_repr = ArrayVec::<u8, MAX_WIRE_LEN>::new();

    while let Some(chunk_start) = next_chunk {
        let mut finished_with_chunk = false;
        let mut index = chunk_start;

        while !finished_with_chunk {
            let len = *octets.get(index).ok_or(Error::UnexpectedEom)?;
            if len & 0xc0 == 0xc0 {
                next_chunk = Some(parse_pointer(octets, chunk_start, index)? as usize);
                index += 2;
                finished_with_chunk = true;
            } else if len & 0xc0 != 0 {
                return Err(Error::UnknownLabelType);
            } else if len > MAX_LABEL_LEN as u8 {
                return Err(Error::LabelTooLong);
            } else {
                let end_of_label = index + len as usize + 1;
                if end_of_label > octets.len() {
                    return Err(Error::UnexpectedEom);
                }
                wire_repr
                    .try_extend_from_slice(&octets[index..end_of_label])
                    .or(Err(Error::NameTooLong))?;
                n_labels += 1;
                if len == 0 {
                    next_chunk = None;
                    finished_with_chunk = true;
                }
                index = end_of_label;
            }
        }

        wire_len_of_first_chunk.get_or_insert(index - start);
    }

    let name = Name::from_validated_wire(wire_repr.as_slice().into(), n_labels);
    Ok((name, wire_len_of_first_chunk.unwrap_or(0)))
}

/// Parses a pointer at `index` in `octets`. This also checks that the
/// pointer refers to an index *earlier* than the start of the chunk it
/// is in (`chunk_start`).
fn parse_pointer(octets: &[u8], chunk_start: usize, index: usize) -> Result<u16, Error> {
    if index + 1 < octets.len() {
        let pointer_bytes = [octets[index], octets[index + 1]];
        let pointer = u16::from_be_bytes(pointer_bytes) & !0xc000;
        if (pointer as usize) >= chunk_start {
            // According to RFC 1035 § 4.1.4, pointers point to a
            // *prior* occurrence of the name. (Importantly, this
            // prevents loops!)
            Err(Error::InvalidPointer)
        } else {
            Ok(pointer)
        }
    } else {
        Err(Error::UnexpectedEom)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_parsing_works() {
        let (name, len) = parse_uncompressed_name(b"\x01a\x04test\x00extra").unwrap();
        assert_eq!(len, 9);
        assert_eq!(name.wire_repr(), b"\x01a\x04test\x00");
        assert_eq!(name.len(), 3);
    }

    #[test]
    fn uncompressed_parsing_rejects_bad_names() {
        assert_eq!(parse_uncompressed_name(b"\x01a"), Err(Error::UnexpectedEom));
        assert_eq!(parse_uncompressed_name(b"\xc0\x00"), Err(Error::InvalidPointer));
        assert_eq!(parse_uncompressed_name(b"\x40"), Err(Error::UnknownLabelType));
        let mut long = Vec::new();
        for _ in 0..128 {
            long.extend_from_slice(b"\x01x");
        }
        long.push(0);
        assert_eq!(parse_uncompressed_name(&long), Err(Error::NameTooLong));
    }

    #[test]
    fn compressed_parsing_follows_backward_pointers() {
        let message = b"\x04test\x00\x01a\xc0\x00\x01b\xc0\x06";
        let (name, len) = parse_compressed_name(message, 6).unwrap();
        assert_eq!(len, 4);
        assert_eq!(name.wire_repr(), b"\x01a\x04test\x00");
        let (name, len) = parse_compressed_name(message, 10).unwrap();
        assert_eq!(len, 4);
        assert_eq!(name.wire_repr(), b"\x01b\x01a\x04test\x00");
        assert_eq!(name.len(), 4);
    }

    #[test]
    fn compressed_parsing_rejects_forward_and_self_pointers() {
        let forward = b"\x01a\xc0\x04\x00";
        assert_eq!(parse_compressed_name(forward, 0), Err(Error::InvalidPointer));
        let self_pointer = b"\xc0\x00";
        assert_eq!(parse_compressed_name(self_pointer, 0), Err(Error::InvalidPointer));
        // This pointer is earlier than itself, but not earlier than the
        // start of its chunk.
        let into_chunk = b"\x00\x01a\xc0\x01";
        assert_eq!(parse_compressed_name(into_chunk, 1), Err(Error::InvalidPointer));
    }

    #[test]
    fn compressed_parsing_rejects_long_pointer_chains() {
        // Each chunk is a 63-octet label and a pointer to the chunk
        // before it.
        let mut octets = vec![63];
        octets.extend_from_slice(&[b'x'; 63]);
        octets.push(0);
        let mut starts = vec![0];
        for _ in 0..3 {
            let previous = *starts.last().unwrap() as u16;
            starts.push(octets.len());
            octets.push(63);
            octets.extend_from_slice(&[b'x'; 63]);
            octets.extend_from_slice(&(0xc000 | previous).to_be_bytes());
        }
        let (name, len) = parse_compressed_name(&octets, starts[2]).unwrap();
        assert_eq!(len, 66);
        assert_eq!(name.wire_repr().len(), 193);
        assert_eq!(parse_compressed_name(&octets, starts[3]), Err(Error::NameTooLong));
    }

    #[test]
    fn compressed_parsing_rejects_truncation() {
        assert_eq!(parse_compressed_name(b"\x03ab", 0), Err(Error::UnexpectedEom));
        assert_eq!(parse_compressed_name(b"\x00\xc0", 1), Err(Error::UnexpectedEom));
        assert_eq!(parse_compressed_name(b"", 0), Err(Error::UnexpectedEom));
    }
}
