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

//! The crate-wide [`Error`] type and the numeric return codes.

use std::fmt;
use std::io;

use crate::dict::DictError;
use crate::io::TransportError;
use crate::message::CodecError;
use crate::name;

/// Numeric return codes, as exposed through [`Error::return_code`].
pub mod return_code {
    pub const GOOD: u32 = 0;
    pub const GENERIC_ERROR: u32 = 1;
    pub const BAD_DOMAIN_NAME: u32 = 300;
    pub const BAD_CONTEXT: u32 = 301;
    pub const CONTEXT_UPDATE_FAIL: u32 = 302;
    pub const UNKNOWN_TRANSACTION: u32 = 303;
    pub const NO_SUCH_LIST_ITEM: u32 = 304;
    pub const NO_SUCH_DICT_NAME: u32 = 305;
    pub const WRONG_TYPE_REQUESTED: u32 = 306;
    pub const NO_SUCH_EXTENSION: u32 = 307;
    pub const EXTENSION_MISFORMAT: u32 = 308;
    pub const DNSSEC_WITH_STUB_DISALLOWED: u32 = 309;
}

/// A misuse of the API by the caller.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum UsageError {
    /// The transaction ID is not (or no longer) outstanding.
    UnknownTransaction,
    /// The outstanding transaction limit has been reached.
    TooManyTransactions,
    /// A caller-supplied domain name could not be parsed.
    BadDomainName(name::Error),
    /// No upstream resolvers are configured.
    NoUpstreams,
    /// DNSSEC was requested, but there are no trust anchors.
    DnssecWithoutAnchors,
    /// A configuration value is out of range.
    BadConfig(&'static str),
    /// An extension name is not recognized.
    NoSuchExtension(String),
    /// An extension has a value of the wrong type or range.
    ExtensionMisformat(String),
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownTransaction => f.write_str("unknown transaction"),
            Self::TooManyTransactions => f.write_str("too many outstanding transactions"),
            Self::BadDomainName(e) => write!(f, "bad domain name: {e}"),
            Self::NoUpstreams => f.write_str("no upstream resolvers configured"),
            Self::DnssecWithoutAnchors => f.write_str("DNSSEC requested without trust anchors"),
            Self::BadConfig(what) => write!(f, "bad configuration: {what}"),
            Self::NoSuchExtension(name) => write!(f, "no such extension: {name}"),
            Self::ExtensionMisformat(name) => write!(f, "misformatted extension: {name}"),
        }
    }
}

impl std::error::Error for UsageError {}

/// Any error the library reports.
#[derive(Debug)]
pub enum Error {
    Usage(UsageError),
    Codec(CodecError),
    Transport(TransportError),
    /// No response arrived within the retry budget.
    Timeout,
    /// The transaction was cancelled.
    Cancelled,
    /// Iterative resolution could not make progress.
    Recursion(String),
    Dict(DictError),
    /// Setting up sockets or the runtime failed.
    Io(io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Returns the numeric return code of the error.
    pub fn return_code(&self) -> u32 {
        use return_code::*;
        match self {
            Self::Usage(e) => match e {
                UsageError::UnknownTransaction => UNKNOWN_TRANSACTION,
                UsageError::BadDomainName(_) => BAD_DOMAIN_NAME,
                UsageError::NoUpstreams => BAD_CONTEXT,
                UsageError::BadConfig(_) => CONTEXT_UPDATE_FAIL,
                UsageError::DnssecWithoutAnchors => DNSSEC_WITH_STUB_DISALLOWED,
                UsageError::NoSuchExtension(_) => NO_SUCH_EXTENSION,
                UsageError::ExtensionMisformat(_) => EXTENSION_MISFORMAT,
                UsageError::TooManyTransactions => GENERIC_ERROR,
            },
            Self::Dict(e) => match e {
                DictError::NoSuchListItem => NO_SUCH_LIST_ITEM,
                DictError::NoSuchDictName => NO_SUCH_DICT_NAME,
                DictError::WrongTypeRequested => WRONG_TYPE_REQUESTED,
            },
            _ => GENERIC_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Usage(e) => e.fmt(f),
            Self::Codec(e) => write!(f, "malformed message: {e}"),
            Self::Transport(e) => write!(f, "transport failure: {e}"),
            Self::Timeout => f.write_str("no response within the retry budget"),
            Self::Cancelled => f.write_str("transaction cancelled"),
            Self::Recursion(reason) => write!(f, "recursion failed: {reason}"),
            Self::Dict(e) => e.fmt(f),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Usage(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Dict(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Timeout | Self::Cancelled | Self::Recursion(_) => None,
        }
    }
}

impl From<UsageError> for Error {
    fn from(e: UsageError) -> Self {
        Self::Usage(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<DictError> for Error {
    fn from(e: DictError) -> Self {
        Self::Dict(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<name::Error> for Error {
    fn from(e: name::Error) -> Self {
        Self::Usage(UsageError::BadDomainName(e))
    }
}
