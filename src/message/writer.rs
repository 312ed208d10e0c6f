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

//! Implementation of the [`Writer`] type and the message encoder.

use std::collections::HashMap;

use super::constants::*;
use super::error::{CodecError, Result};
use super::{Message, Question};
use crate::name::Name;
use crate::rr::descriptor::describe;
use crate::rr::rdata::check_fields;
use crate::rr::{Field, Record, Type};

////////////////////////////////////////////////////////////////////////
// ENCODING                                                           //
////////////////////////////////////////////////////////////////////////

/// Whether the encoder compresses names ([RFC 1035 § 4.1.4]).
///
/// With compression enabled, owner names, question names, and names in
/// the RDATA of the RFC 1035 types marked compressible in the
/// descriptor table may be replaced (in part) by pointers to earlier
/// occurrences.
///
/// [RFC 1035 § 4.1.4]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Compression {
    #[default]
    Enabled,
    Disabled,
}

/// Encodes `message` into a new buffer.
pub fn encode(message: &Message, compression: Compression) -> Result<Vec<u8>> {
    if message.rcode.is_extended() && message.edns.is_none() {
        return Err(CodecError::ExtendedRcodeWithoutEdns);
    }
    let opt_count = message.edns.is_some() as usize;

    let mut writer = Writer::new(compression);
    writer.write_header(message)?;
    writer.write_count(message.questions.len())?;
    writer.write_count(message.answers.len())?;
    writer.write_count(message.authorities.len())?;
    writer.write_count(message.additionals.len() + opt_count)?;

    for question in &message.questions {
        writer.add_question(question)?;
    }
    for rr in message
        .answers
        .iter()
        .chain(&message.authorities)
        .chain(&message.additionals)
    {
        writer.add_rr(rr)?;
    }
    if let Some(ref edns) = message.edns {
        writer.try_push(&[0])?;
        writer.try_push_u16(Type::OPT.into())?;
        writer.try_push_u16(edns.udp_payload_size)?;
        writer.try_push_u32(edns.opt_ttl(message.rcode.extended_bits()))?;
        let rdata = edns.opt_rdata()?;
        writer.try_push_u16(rdata.len() as u16)?;
        writer.try_push(&rdata)?;
    }
    Ok(writer.finish())
}

////////////////////////////////////////////////////////////////////////
// WRITER                                                             //
////////////////////////////////////////////////////////////////////////

/// A buffer that serializes a DNS message.
///
/// Questions and records are appended in order. The writer remembers
/// where each name suffix it has written starts, so that later names
/// sharing a suffix can point to it.
pub struct Writer {
    octets: Vec<u8>,
    compression: Compression,
    prior_names: HashMap<Name, u16>,
}

impl Writer {
    /// Creates a new `Writer` with an empty buffer.
    pub fn new(compression: Compression) -> Self {
        Self {
            octets: Vec::with_capacity(512),
            compression,
            prior_names: HashMap::new(),
        }
    }

    /// Writes the first four octets of the header.
    fn write_header(&mut self, message: &Message) -> Result<()> {
        let flags = &message.flags;
        let mut high = u8::from(message.opcode) << OPCODE_SHIFT;
        let mut low = message.rcode.header_bits();
        for (set, mask) in [
            (flags.qr, QR_MASK),
            (flags.aa, AA_MASK),
            (flags.tc, TC_MASK),
            (flags.rd, RD_MASK),
        ] {
            if set {
                high |= mask;
            }
        }
        for (set, mask) in [(flags.ra, RA_MASK), (flags.ad, AD_MASK), (flags.cd, CD_MASK)] {
            if set {
                low |= mask;
            }
        }
        self.try_push_u16(message.id)?;
        self.try_push(&[high, low])
    }

    fn write_count(&mut self, count: usize) -> Result<()> {
        let count = u16::try_from(count).or(Err(CodecError::TooManyRecords))?;
        self.try_push_u16(count)
    }

    /// Adds a [`Question`].
    pub fn add_question(&mut self, question: &Question) -> Result<()> {
        self.write_name(&question.qname, true)?;
        self.try_push_u16(question.qtype.into())?;
        self.try_push_u16(question.qclass.into())
    }

    /// Adds a resource record.
    pub fn add_rr(&mut self, rr: &Record) -> Result<()> {
        let descriptor = describe(rr.rr_type.into());
        check_fields(descriptor, &rr.rdata)?;

        self.write_name(&rr.owner, true)?;
        self.try_push_u16(rr.rr_type.into())?;
        self.try_push_u16(rr.class.into())?;
        self.try_push_u32(rr.ttl)?;
        let rdlength_index = self.octets.len();
        self.try_push_u16(0)?;

        let rdata_start = self.octets.len();
        for field in &rr.rdata {
            match field {
                Field::Name(name) => self.write_name(name, descriptor.compressible)?,
                field => field.write_uncompressed(&mut self.octets)?,
            }
        }
        let rdlength =
            u16::try_from(self.octets.len() - rdata_start).or(Err(CodecError::RdataLength))?;
        self.octets[rdlength_index..rdlength_index + 2].copy_from_slice(&rdlength.to_be_bytes());
        Ok(())
    }

    /// Writes a name, compressing it if allowed. Every suffix written
    /// out in full is remembered as a pointer target.
    fn write_name(&mut self, name: &Name, compressible: bool) -> Result<()> {
        let compress = compressible && self.compression == Compression::Enabled;
        for (skip, label) in name.labels().enumerate() {
            if label.is_null() {
                break;
            }
            if let Some(suffix) = name.superdomain(skip) {
                if compress {
                    if let Some(&pointer) = self.prior_names.get(&suffix) {
                        return self.try_push_u16(0xc000 | pointer);
                    }
                }
                let position = self.octets.len();
                if self.compression == Compression::Enabled && position <= POINTER_MAX {
                    self.prior_names.entry(suffix).or_insert(position as u16);
                }
            }
            self.try_push(&[label.len() as u8])?;
            self.try_push(label.octets())?;
        }
        self.try_push(&[0])
    }

    fn try_push(&mut self, data: &[u8]) -> Result<()> {
        self.octets.extend_from_slice(data);
        Ok(())
    }

    fn try_push_u16(&mut self, data: u16) -> Result<()> {
        self.try_push(&data.to_be_bytes())
    }

    fn try_push_u32(&mut self, data: u32) -> Result<()> {
        self.try_push(&data.to_be_bytes())
    }

    /// Returns the serialized message.
    pub fn finish(self) -> Vec<u8> {
        self.octets
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::reader::decode;
    use super::super::{Edns, Rcode};
    use super::*;
    use crate::class::Class;

    fn sample_message() -> Message {
        let owner: Name = "example.com.".parse().unwrap();
        let ns = |host: &str| {
            Record::new(
                owner.clone(),
                Type::NS,
                Class::IN,
                86400,
                vec![Field::Name(host.parse().unwrap())],
            )
        };
        let mut message = Message::query(Question::new(owner.clone(), Type::NS, Class::IN), 0x1234);
        message.flags.qr = true;
        message.flags.ra = true;
        message.answers.push(ns("a.iana-servers.net."));
        message.answers.push(ns("b.iana-servers.net."));
        message.additionals.push(Record::new(
            "a.iana-servers.net.".parse().unwrap(),
            Type::A,
            Class::IN,
            3600,
            vec![Field::Octets(vec![199, 43, 135, 53])],
        ));
        message.additionals.push(Record::new(
            owner,
            Type::from(65280),
            Class::IN,
            0,
            vec![Field::Octets(b"\x07example\x03com\x00".to_vec())],
        ));
        message.edns = Some(Edns::new(1232, true));
        message
    }

    #[test]
    fn encode_decode_round_trip() {
        let message = sample_message();
        for compression in [Compression::Enabled, Compression::Disabled] {
            let octets = encode(&message, compression).unwrap();
            assert_eq!(decode(&octets).unwrap(), message);
        }
    }

    #[test]
    fn compression_shrinks_and_preserves_meaning() {
        let message = sample_message();
        let compressed = encode(&message, Compression::Enabled).unwrap();
        let uncompressed = encode(&message, Compression::Disabled).unwrap();
        assert!(compressed.len() < uncompressed.len());
        assert_eq!(decode(&compressed).unwrap(), decode(&uncompressed).unwrap());
        // The owner of the first answer is a pointer to the question.
        assert_eq!(&compressed[29..31], b"\xc0\x0c");
    }

    #[test]
    fn unknown_rdata_is_never_compressed() {
        let message = sample_message();
        let octets = encode(&message, Compression::Enabled).unwrap();
        let needle = b"\x00\x0d\x07example\x03com\x00";
        assert!(octets.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn extended_rcode_needs_edns() {
        let mut message = sample_message();
        message.rcode = Rcode::BADVERS;
        let octets = encode(&message, Compression::Enabled).unwrap();
        assert_eq!(decode(&octets).unwrap().rcode, Rcode::BADVERS);
        message.edns = None;
        assert_eq!(
            encode(&message, Compression::Enabled),
            Err(CodecError::ExtendedRcodeWithoutEdns)
        );
    }

    #[test]
    fn encode_rejects_mismatched_rdata() {
        let mut message = sample_message();
        message.answers[0].rdata = vec![Field::U16(1)];
        assert_eq!(encode(&message, Compression::Enabled), Err(CodecError::InvalidField));
    }

    #[test]
    fn encode_rejects_oversized_sections() {
        let mut message = sample_message();
        let record = message.answers[0].clone();
        message.answers = vec![record; 65536];
        assert_eq!(encode(&message, Compression::Enabled), Err(CodecError::TooManyRecords));
    }
}
