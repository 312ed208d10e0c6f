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

//! The DNS message wire codec.
//!
//! [`Message::decode`] and [`Message::encode`] convert between the
//! wire format of [RFC 1035 § 4] and the owned [`Message`] structure.
//! RDATA is split into fields according to the
//! [descriptor table](crate::rr::descriptor).
//!
//! [RFC 1035 § 4]: https://datatracker.ietf.org/doc/html/rfc1035#section-4

mod constants;
mod edns;
mod error;
mod opcode;
mod question;
mod rcode;
pub mod reader;
pub mod writer;
pub use edns::{Edns, EdnsOption};
pub use error::{CodecError, Result as CodecResult};
pub use opcode::Opcode;
pub use question::Question;
pub use rcode::{IntoRcodeError, Rcode};
pub use reader::Reader;
pub use writer::{Compression, Writer};

use crate::rr::Record;

/// The header flags of a DNS message.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Flags {
    pub qr: bool,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    /// Authentic data (RFC 4035 § 3.2.3).
    pub ad: bool,
    /// Checking disabled (RFC 4035 § 3.2.2).
    pub cd: bool,
}

/// A decoded DNS message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    pub id: u16,
    pub flags: Flags,
    pub opcode: Opcode,
    /// The full twelve-bit RCODE. Values above 15 need [`Edns`].
    pub rcode: Rcode,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    /// Additional records, not including the OPT record.
    pub additionals: Vec<Record>,
    pub edns: Option<Edns>,
}

impl Message {
    /// Builds a standard query with the RD bit set.
    pub fn query(question: Question, id: u16) -> Self {
        Self {
            id,
            flags: Flags {
                rd: true,
                ..Default::default()
            },
            questions: vec![question],
            ..Default::default()
        }
    }

    /// Decodes a message; see [`reader::decode`].
    pub fn decode(octets: &[u8]) -> CodecResult<Self> {
        reader::decode(octets)
    }

    /// Encodes the message with name compression.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        writer::encode(self, Compression::Enabled)
    }

    /// Encodes the message with the given compression setting.
    pub fn encode_with(&self, compression: Compression) -> CodecResult<Vec<u8>> {
        writer::encode(self, compression)
    }

    /// Returns the first question, if any.
    pub fn question(&self) -> Option<&Question> {
        self.questions.first()
    }
}
