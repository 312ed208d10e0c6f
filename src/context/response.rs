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

//! Results of lookups: [`Response`], [`Outcome`], and the request
//! [`Extensions`].

use std::net::{IpAddr, SocketAddr};

use crate::dict::{Dict, List, Value};
use crate::dnssec::Status;
use crate::error::{Error, UsageError};
use crate::message::{Message, Rcode};
use crate::name::Name;
use crate::rr::{Record, Type};
use crate::transaction::{Mode, TransactionId};

/// Numeric callback types, as exposed through
/// [`Outcome::callback_type`].
pub mod callback_type {
    pub const COMPLETE: u32 = 700;
    pub const CANCEL: u32 = 701;
    pub const TIMEOUT: u32 = 702;
    pub const ERROR: u32 = 703;
}

/// Numeric response statuses, as exposed through [`Response::status`].
pub mod response_status {
    pub const GOOD: u32 = 900;
    pub const NO_NAME: u32 = 901;
    pub const ALL_TIMEOUT: u32 = 902;
    pub const NO_SECURE_ANSWERS: u32 = 903;
}

/// The values an extension flag may take in an extension dict.
pub const EXTENSION_TRUE: u32 = 1;
pub const EXTENSION_FALSE: u32 = 0;

/// The `answer_type` of DNS answers.
const NAMETYPE_DNS: u32 = 800;

/// The record types an address lookup asks for.
const ADDRESS_TYPES: [Type; 2] = [Type::A, Type::AAAA];

////////////////////////////////////////////////////////////////////////
// EXTENSIONS                                                         //
////////////////////////////////////////////////////////////////////////

/// Per-request options.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Extensions {
    /// Validate the replies and report their DNSSEC status.
    pub dnssec_return_status: bool,
    /// Validate the replies and return only the secure ones.
    pub dnssec_return_only_secure: bool,
    /// Include the records used to validate each reply.
    pub dnssec_return_validation_chain: bool,
}

impl Extensions {
    /// Reads extensions from a dict of flags, each set to
    /// [`EXTENSION_TRUE`] or [`EXTENSION_FALSE`].
    pub fn from_dict(dict: &Dict) -> Result<Self, UsageError> {
        let mut extensions = Self::default();
        for (name, value) in dict.iter() {
            let flag = match name {
                "dnssec_return_status" => &mut extensions.dnssec_return_status,
                "dnssec_return_only_secure" => &mut extensions.dnssec_return_only_secure,
                "dnssec_return_validation_chain" => {
                    &mut extensions.dnssec_return_validation_chain
                }
                _ => return Err(UsageError::NoSuchExtension(name.to_owned())),
            };
            *flag = match value.as_int() {
                Ok(EXTENSION_TRUE) => true,
                Ok(EXTENSION_FALSE) => false,
                _ => return Err(UsageError::ExtensionMisformat(name.to_owned())),
            };
        }
        Ok(extensions)
    }

    /// Returns whether any extension asks for validation.
    pub fn wants_dnssec(&self) -> bool {
        self.dnssec_return_status
            || self.dnssec_return_only_secure
            || self.dnssec_return_validation_chain
    }
}

////////////////////////////////////////////////////////////////////////
// RESPONSES                                                          //
////////////////////////////////////////////////////////////////////////

/// One reply from an upstream, for one of the queries of a lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    pub message: Message,
    pub upstream: SocketAddr,
    pub mode: Mode,
    /// The DNSSEC status, if validation was requested.
    pub dnssec_status: Option<Status>,
    /// The records used for validation, if requested.
    pub validation_chain: Vec<Record>,
}

impl Reply {
    /// Returns whether the reply answers its question, directly or
    /// through aliases.
    pub fn has_answers(&self) -> bool {
        match self.message.question() {
            Some(question) => {
                self.message.rcode == Rcode::NOERROR
                    && self.message.answers.iter().any(|rr| {
                        rr.rr_type == question.qtype || question.qtype == Type::ANY
                    })
            }
            None => false,
        }
    }
}

/// The result of a completed lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub replies: Vec<Reply>,
    /// Whether only secure replies were asked for. Insecure ones have
    /// been dropped already.
    pub(super) only_secure: bool,
    /// The replies dropped for being insecure.
    pub(super) dropped_insecure: usize,
}

impl Response {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            only_secure: false,
            dropped_insecure: 0,
        }
    }

    /// Keeps only the secure replies.
    pub(super) fn retain_secure(&mut self) {
        let before = self.replies.len();
        self.replies
            .retain(|reply| reply.dnssec_status == Some(Status::Secure));
        self.only_secure = true;
        self.dropped_insecure = before - self.replies.len();
    }

    /// Returns the response status code.
    pub fn status(&self) -> u32 {
        if self.only_secure && self.replies.is_empty() && self.dropped_insecure > 0 {
            response_status::NO_SECURE_ANSWERS
        } else if self.replies.iter().any(Reply::has_answers) {
            response_status::GOOD
        } else {
            response_status::NO_NAME
        }
    }

    /// Returns the name the answers are for, after following any
    /// CNAME chain in the first reply.
    pub fn canonical_name(&self) -> Option<Name> {
        let message = &self.replies.first()?.message;
        let mut name = message.question()?.qname.clone();
        // Bounded by the number of records, so that CNAME loops end.
        for _ in 0..message.answers.len() {
            let next = message
                .answers
                .iter()
                .find(|rr| rr.rr_type == Type::CNAME && rr.owner == name)
                .and_then(Record::target);
            match next {
                Some(target) => name = target.clone(),
                None => break,
            }
        }
        Some(name)
    }

    /// Returns the addresses of every A and AAAA answer.
    pub fn just_address_answers(&self) -> Vec<IpAddr> {
        self.replies
            .iter()
            .flat_map(|reply| reply.message.answers.iter())
            .filter(|rr| ADDRESS_TYPES.contains(&rr.rr_type))
            .filter_map(Record::ip_addr)
            .collect()
    }

    /// Returns the combined DNSSEC status of the replies, if they were
    /// validated.
    pub fn dnssec_status(&self) -> Option<Status> {
        self.replies
            .iter()
            .filter_map(|reply| reply.dnssec_status)
            .reduce(Status::combine)
    }
}

impl From<&Response> for Dict {
    fn from(response: &Response) -> Self {
        let mut dict = Dict::new();
        dict.set("status", response.status());
        dict.set("answer_type", NAMETYPE_DNS);
        if let Some(name) = response.canonical_name() {
            dict.set("canonical_name", Value::Bindata(name.wire_repr().to_vec()));
        }

        let mut tree = List::new();
        for reply in &response.replies {
            let mut reply_dict = Dict::from(&reply.message);
            if let Some(status) = reply.dnssec_status {
                reply_dict.set("dnssec_status", status.code());
            }
            if !reply.validation_chain.is_empty() {
                let chain: List = reply
                    .validation_chain
                    .iter()
                    .map(|rr| Value::Dict(rr.into()))
                    .collect();
                reply_dict.set("validation_chain", chain);
            }
            tree.push(reply_dict);
        }
        dict.set("replies_tree", tree);

        let addresses: List = response
            .just_address_answers()
            .into_iter()
            .map(|ip| {
                let (family, octets) = match ip {
                    IpAddr::V4(v4) => ("IPv4", v4.octets().to_vec()),
                    IpAddr::V6(v6) => ("IPv6", v6.octets().to_vec()),
                };
                let address: Dict = [
                    ("address_type", Value::from(family)),
                    ("address_data", Value::Bindata(octets)),
                ]
                .into_iter()
                .collect();
                Value::Dict(address)
            })
            .collect();
        if !addresses.is_empty() {
            dict.set("just_address_answers", addresses);
        }
        dict
    }
}

////////////////////////////////////////////////////////////////////////
// OUTCOMES                                                           //
////////////////////////////////////////////////////////////////////////

/// How a lookup ended, as delivered to its callback.
#[derive(Debug)]
pub enum Outcome {
    Complete(Response),
    Cancelled,
    TimedOut,
    Failed(Error),
}

/// The callback of a lookup. It is invoked at most once.
pub type Callback = Box<dyn FnOnce(TransactionId, Outcome) + Send>;

impl Outcome {
    /// Returns the numeric callback type.
    pub fn callback_type(&self) -> u32 {
        match self {
            Self::Complete(_) => callback_type::COMPLETE,
            Self::Cancelled => callback_type::CANCEL,
            Self::TimedOut => callback_type::TIMEOUT,
            Self::Failed(_) => callback_type::ERROR,
        }
    }

    /// Converts the outcome of a lookup into a `Result`.
    pub fn into_result(self) -> Result<Response, Error> {
        match self {
            Self::Complete(response) => Ok(response),
            Self::Cancelled => Err(Error::Cancelled),
            Self::TimedOut => Err(Error::Timeout),
            Self::Failed(e) => Err(e),
        }
    }

    /// Builds the response dict for the outcome. Only completed lookups
    /// have one, except that timeouts report
    /// [`ALL_TIMEOUT`](response_status::ALL_TIMEOUT).
    pub fn to_dict(&self) -> Option<Dict> {
        match self {
            Self::Complete(response) => Some(response.into()),
            Self::TimedOut => {
                let mut dict = Dict::new();
                dict.set("status", response_status::ALL_TIMEOUT);
                Some(dict)
            }
            Self::Cancelled | Self::Failed(_) => None,
        }
    }
}

impl From<Result<Response, Error>> for Outcome {
    fn from(result: Result<Response, Error>) -> Self {
        match result {
            Ok(response) => Self::Complete(response),
            Err(Error::Cancelled) => Self::Cancelled,
            Err(Error::Timeout) => Self::TimedOut,
            Err(e) => Self::Failed(e),
        }
    }
}
