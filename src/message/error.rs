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

//! Implementation of the [`CodecError`] type.

use std::fmt;

use crate::name;

/// An error signaling that a DNS message could not be encoded or
/// decoded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CodecError {
    /// A compression pointer did not point strictly before the chunk
    /// containing it.
    BadCompression,

    /// An extended RCODE (above 15) was set, but the message has no
    /// EDNS OPT record to carry its upper bits.
    ExtendedRcodeWithoutEdns,

    /// A 48-bit field was given a value that does not fit.
    FieldOverflow,

    /// The message is shorter than the 12-octet header.
    HeaderTooShort,

    /// On encoding, an RDATA field does not fit the layout of its RR
    /// type.
    InvalidField,

    /// More than one OPT record was present.
    MultipleOpt,

    /// A label was longer than 63 octets, or a name longer than 255.
    NameTooLong,

    /// An OPT record was owned by a name other than the root.
    OptOwnerNotRoot,

    /// RDATA did not consume exactly RDLENGTH octets (or would not fit
    /// in 65,535 octets when encoding).
    RdataLength,

    /// A section has more than 65,535 entries.
    TooManyRecords,

    /// Octets remained after the last section.
    TrailingData,

    /// The message ended in the middle of a field.
    TruncatedField,

    /// A name contained a label type other than a normal label or a
    /// pointer.
    UnknownLabelType,
}

impl From<name::Error> for CodecError {
    fn from(err: name::Error) -> Self {
        match err {
            name::Error::InvalidPointer => Self::BadCompression,
            name::Error::UnexpectedEom => Self::TruncatedField,
            name::Error::UnknownLabelType => Self::UnknownLabelType,
            _ => Self::NameTooLong,
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::BadCompression => f.write_str("bad compression pointer"),
            Self::ExtendedRcodeWithoutEdns => f.write_str("extended RCODE requires EDNS"),
            Self::FieldOverflow => f.write_str("field value does not fit its width"),
            Self::HeaderTooShort => f.write_str("header too short"),
            Self::InvalidField => f.write_str("RDATA field does not fit the RR type"),
            Self::MultipleOpt => f.write_str("more than one OPT record"),
            Self::NameTooLong => f.write_str("label or name too long"),
            Self::OptOwnerNotRoot => f.write_str("OPT record not owned by the root"),
            Self::RdataLength => f.write_str("RDATA length mismatch"),
            Self::TooManyRecords => f.write_str("too many records in a section"),
            Self::TrailingData => f.write_str("trailing data after message"),
            Self::TruncatedField => f.write_str("unexpected end of message in field"),
            Self::UnknownLabelType => f.write_str("unknown label type"),
        }
    }
}

impl std::error::Error for CodecError {}

/// The type returned by fallible codec functions.
pub type Result<T> = std::result::Result<T, CodecError>;
