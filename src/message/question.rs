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

//! Implementation of the [`Question`] type.

use std::fmt;

use crate::class::Class;
use crate::name::Name;
use crate::rr::Type;

/// The question of a DNS query.
///
/// Defined in [RFC 1035 § 4.1.2], a DNS question includes the QNAME,
/// the QTYPE, and the QCLASS. While the original specification does
/// not rule out having multiple questions per message, in practice
/// only one question per message is used.
///
/// Since [`Name`] equality ignores ASCII case, two `Question`s compare
/// equal exactly when a response echoing one answers the other.
///
/// [RFC 1035 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.2
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    pub qname: Name,
    pub qtype: Type,
    pub qclass: Class,
}

impl Question {
    pub fn new(qname: Name, qtype: Type, qclass: Class) -> Self {
        Self {
            qname,
            qtype,
            qclass,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.qname, self.qclass, self.qtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_matching_ignores_case() {
        let sent = Question::new("Example.COM.".parse().unwrap(), Type::A, Class::IN);
        let echoed = Question::new("example.com.".parse().unwrap(), Type::A, Class::IN);
        assert_eq!(sent, echoed);
        assert_ne!(sent, Question::new(echoed.qname.clone(), Type::AAAA, Class::IN));
        assert_eq!(sent.to_string(), "Example.COM. IN A");
    }
}
