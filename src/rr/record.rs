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

//! Implementation of the [`Record`] type.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::rdata::{DisplayRdata, Field};
use super::Type;
use crate::class::Class;
use crate::name::Name;

/// A resource record with decoded RDATA.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Record {
    pub owner: Name,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: u32,
    pub rdata: Vec<Field>,
}

impl Record {
    pub fn new(owner: Name, rr_type: Type, class: Class, ttl: u32, rdata: Vec<Field>) -> Self {
        Self {
            owner,
            rr_type,
            class,
            ttl,
            rdata,
        }
    }

    /// Returns the address held by an A or AAAA record.
    pub fn ip_addr(&self) -> Option<IpAddr> {
        match (self.rr_type, self.rdata.first()) {
            (Type::A, Some(Field::Octets(o))) if o.len() == 4 => {
                Some(Ipv4Addr::new(o[0], o[1], o[2], o[3]).into())
            }
            (Type::AAAA, Some(Field::Octets(o))) if o.len() == 16 => {
                let mut array = [0; 16];
                array.copy_from_slice(o);
                Some(Ipv6Addr::from(array).into())
            }
            _ => None,
        }
    }

    /// Returns the type covered by an RRSIG record.
    pub fn type_covered(&self) -> Option<Type> {
        if self.rr_type == Type::RRSIG {
            self.rdata.first().and_then(Field::as_u16).map(Type::from)
        } else {
            None
        }
    }

    /// Returns the target name of a CNAME (or similar single-name)
    /// record.
    pub fn target(&self) -> Option<&Name> {
        self.rdata.iter().find_map(Field::as_name)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.owner,
            self.ttl,
            self.class,
            self.rr_type,
            DisplayRdata {
                rr_type: self.rr_type,
                fields: &self.rdata
            }
        )
    }
}
