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

//! Implementation of the [`Reader`] type and the message decoder.

use std::fmt;

use super::constants::*;
use super::edns::Edns;
use super::error::{CodecError, Result};
use super::{Flags, Message, Opcode, Question, Rcode};
use crate::name::Name;
use crate::rr::rdata::read_rdata;
use crate::rr::{Field, Record, Type};

////////////////////////////////////////////////////////////////////////
// DECODING                                                           //
////////////////////////////////////////////////////////////////////////

/// Decodes a complete DNS message.
///
/// The whole buffer must be consumed; an OPT record in the additional
/// section is lifted into [`Message::edns`].
pub fn decode(octets: &[u8]) -> Result<Message> {
    let mut reader = Reader::try_from(octets)?;
    let mut message = reader.header();

    for _ in 0..reader.qdcount() {
        message.questions.push(reader.read_question()?);
    }
    for _ in 0..reader.ancount() {
        message.answers.push(reader.read_rr()?);
    }
    for _ in 0..reader.nscount() {
        message.authorities.push(reader.read_rr()?);
    }
    let mut extended_rcode = 0;
    for _ in 0..reader.arcount() {
        let rr = reader.read_rr()?;
        if rr.rr_type == Type::OPT {
            if message.edns.is_some() {
                return Err(CodecError::MultipleOpt);
            } else if !rr.owner.is_root() {
                return Err(CodecError::OptOwnerNotRoot);
            }
            let rdata = rr.rdata.first().and_then(Field::as_octets).unwrap_or(&[]);
            let (edns, upper_bits) = Edns::from_opt(rr.class.into(), rr.ttl, rdata)?;
            message.edns = Some(edns);
            extended_rcode = upper_bits;
        } else {
            message.additionals.push(rr);
        }
    }
    message.rcode = Rcode::from_parts(reader.rcode_bits(), extended_rcode);

    if reader.at_eom() {
        Ok(message)
    } else {
        Err(CodecError::TrailingData)
    }
}

/// Decodes only the header and question section of a message. This is
/// used for datagrams that were cut short, where the remaining
/// sections cannot be trusted.
pub fn decode_header_and_questions(octets: &[u8]) -> Result<Message> {
    let mut reader = Reader::try_from(octets)?;
    let mut message = reader.header();
    for _ in 0..reader.qdcount() {
        message.questions.push(reader.read_question()?);
    }
    Ok(message)
}

////////////////////////////////////////////////////////////////////////
// READER                                                             //
////////////////////////////////////////////////////////////////////////

/// A "frame" around a buffer containing a DNS message that enables
/// reading the message data.
///
/// A `Reader` is constructed using its [`TryFrom`] implementation. Any
/// underlying buffer for a reader must contain at least a full DNS
/// message header of 12 octets; otherwise the construction will fail.
///
/// Header information can be read at any time. Questions and RRs are
/// read using a cursor, which is initially set to the first octet
/// after the header, so [`Reader::read_question`] and
/// [`Reader::read_rr`] must be called in message order.
#[derive(Eq, PartialEq)]
pub struct Reader<'a> {
    octets: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    /// Returns the 16-bit ID of the message.
    pub fn id(&self) -> u16 {
        u16::from_be_bytes([self.octets[0], self.octets[1]])
    }

    /// Returns the header flags.
    pub fn flags(&self) -> Flags {
        let (high, low) = (self.octets[2], self.octets[3]);
        Flags {
            qr: high & QR_MASK != 0,
            aa: high & AA_MASK != 0,
            tc: high & TC_MASK != 0,
            rd: high & RD_MASK != 0,
            ra: low & RA_MASK != 0,
            ad: low & AD_MASK != 0,
            cd: low & CD_MASK != 0,
        }
    }

    /// Returns the message's opcode.
    pub fn opcode(&self) -> Opcode {
        Opcode::from_bits((self.octets[2] & OPCODE_MASK) >> OPCODE_SHIFT)
    }

    /// Returns the four RCODE bits of the header.
    pub fn rcode_bits(&self) -> u8 {
        self.octets[3] & RCODE_MASK
    }

    pub fn qdcount(&self) -> u16 {
        self.count_at(4)
    }

    pub fn ancount(&self) -> u16 {
        self.count_at(6)
    }

    pub fn nscount(&self) -> u16 {
        self.count_at(8)
    }

    pub fn arcount(&self) -> u16 {
        self.count_at(10)
    }

    fn count_at(&self, index: usize) -> u16 {
        u16::from_be_bytes([self.octets[index], self.octets[index + 1]])
    }

    /// Returns a [`Message`] with the header fields filled in and empty
    /// sections.
    fn header(&self) -> Message {
        Message {
            id: self.id(),
            flags: self.flags(),
            opcode: self.opcode(),
            rcode: Rcode::from_parts(self.rcode_bits(), 0),
            ..Default::default()
        }
    }

    /// Reads a [`Question`] starting at the current cursor.
    ///
    /// This method is atomic, in that the cursor is not changed on
    /// failure.
    pub fn read_question(&mut self) -> Result<Question> {
        let (qname, qname_len) = Name::try_from_compressed(self.octets, self.cursor)?;
        let qname_end = self.cursor + qname_len;
        let qtype = read_u16(self.octets, qname_end)?.into();
        let qclass = read_u16(self.octets, qname_end + 2)?.into();
        self.cursor = qname_end + 4;
        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }

    /// Reads a resource record at the current cursor.
    ///
    /// This method is atomic, in that the cursor is not changed on
    /// failure.
    pub fn read_rr(&mut self) -> Result<Record> {
        let (owner, owner_len) = Name::try_from_compressed(self.octets, self.cursor)?;
        let owner_end = self.cursor + owner_len;
        let rr_type: Type = read_u16(self.octets, owner_end)?.into();
        let class = read_u16(self.octets, owner_end + 2)?.into();
        let ttl = read_u32(self.octets, owner_end + 4)?;
        let rdlength = read_u16(self.octets, owner_end + 8)?;
        let rdata = read_rdata(rr_type, self.octets, owner_end + 10, rdlength)?;
        self.cursor = owner_end + 10 + rdlength as usize;
        Ok(Record {
            owner,
            rr_type,
            class,
            ttl,
            rdata,
        })
    }

    /// Returns whether the `Reader`'s cursor has reached the end of the
    /// message.
    pub fn at_eom(&self) -> bool {
        self.cursor >= self.octets.len()
    }
}

impl<'a> TryFrom<&'a [u8]> for Reader<'a> {
    type Error = CodecError;

    fn try_from(octets: &'a [u8]) -> Result<Self> {
        if octets.len() >= HEADER_SIZE {
            Ok(Self {
                octets,
                cursor: HEADER_SIZE,
            })
        } else {
            Err(CodecError::HeaderTooShort)
        }
    }
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reader")
            .field("id", &self.id())
            .field("flags", &self.flags())
            .field("opcode", &self.opcode())
            .field("rcode_bits", &self.rcode_bits())
            .field("qdcount", &self.qdcount())
            .field("ancount", &self.ancount())
            .field("nscount", &self.nscount())
            .field("arcount", &self.arcount())
            .field("cursor", &self.cursor)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// HELPERS FOR READING MULTI-BYTE INTEGERS                            //
////////////////////////////////////////////////////////////////////////

/// Reads a network-byte-order `u16` at `index` of `octets`.
fn read_u16(octets: &[u8], index: usize) -> Result<u16> {
    match octets.get(index..index + 2) {
        Some(&[a, b]) => Ok(u16::from_be_bytes([a, b])),
        _ => Err(CodecError::TruncatedField),
    }
}

/// Reads a network-byte-order `u32` at `index` of `octets`.
fn read_u32(octets: &[u8], index: usize) -> Result<u32> {
    match octets.get(index..index + 4) {
        Some(&[a, b, c, d]) => Ok(u32::from_be_bytes([a, b, c, d])),
        _ => Err(CodecError::TruncatedField),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
