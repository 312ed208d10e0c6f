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

//! A tagged tree of dictionaries, lists, integers and binary data.
//!
//! Responses and extensions are exchanged with callers as [`Dict`]s.
//! Every container owns its children outright, so cloning a `Dict`
//! copies the whole subtree. Accessors check the type of the requested
//! item and report a [`DictError`] on a mismatch.

use std::collections::BTreeMap;
use std::fmt;

use crate::message::{Message, Question};
use crate::rr::{Field, Record};

/// An error from a typed accessor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DictError {
    NoSuchListItem,
    NoSuchDictName,
    WrongTypeRequested,
}

impl fmt::Display for DictError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoSuchListItem => f.write_str("list index out of range"),
            Self::NoSuchDictName => f.write_str("name not in dict"),
            Self::WrongTypeRequested => f.write_str("item has a different type"),
        }
    }
}

impl std::error::Error for DictError {}

pub type Result<T> = std::result::Result<T, DictError>;

/// The type of a [`Value`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DataType {
    Dict,
    List,
    Int,
    Bindata,
}

/// A single item of a [`Dict`] or [`List`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Dict(Dict),
    List(List),
    Int(u32),
    Bindata(Vec<u8>),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Dict(_) => DataType::Dict,
            Self::List(_) => DataType::List,
            Self::Int(_) => DataType::Int,
            Self::Bindata(_) => DataType::Bindata,
        }
    }

    pub fn as_dict(&self) -> Result<&Dict> {
        match self {
            Self::Dict(dict) => Ok(dict),
            _ => Err(DictError::WrongTypeRequested),
        }
    }

    pub fn as_list(&self) -> Result<&List> {
        match self {
            Self::List(list) => Ok(list),
            _ => Err(DictError::WrongTypeRequested),
        }
    }

    pub fn as_int(&self) -> Result<u32> {
        match self {
            Self::Int(value) => Ok(*value),
            _ => Err(DictError::WrongTypeRequested),
        }
    }

    pub fn as_bindata(&self) -> Result<&[u8]> {
        match self {
            Self::Bindata(data) => Ok(data),
            _ => Err(DictError::WrongTypeRequested),
        }
    }
}

impl From<Dict> for Value {
    fn from(dict: Dict) -> Self {
        Self::Dict(dict)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Self::List(list)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Self::Bindata(data)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Bindata(text.as_bytes().to_vec())
    }
}

////////////////////////////////////////////////////////////////////////
// DICT                                                               //
////////////////////////////////////////////////////////////////////////

/// A dictionary from names to [`Value`]s, ordered by name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dict(BTreeMap<String, Value>);

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names in the dict, in order.
    pub fn names(&self) -> List {
        self.0.keys().map(|name| Value::from(name.as_str())).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.0.get(name).ok_or(DictError::NoSuchDictName)
    }

    pub fn data_type(&self, name: &str) -> Result<DataType> {
        self.get(name).map(Value::data_type)
    }

    pub fn get_dict(&self, name: &str) -> Result<&Dict> {
        self.get(name)?.as_dict()
    }

    pub fn get_list(&self, name: &str) -> Result<&List> {
        self.get(name)?.as_list()
    }

    pub fn get_int(&self, name: &str) -> Result<u32> {
        self.get(name)?.as_int()
    }

    pub fn get_bindata(&self, name: &str) -> Result<&[u8]> {
        self.get(name)?.as_bindata()
    }

    /// Sets `name`, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_owned(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Result<Value> {
        self.0.remove(name).ok_or(DictError::NoSuchDictName)
    }
}

impl<'a> FromIterator<(&'a str, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (&'a str, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }
}

////////////////////////////////////////////////////////////////////////
// LIST                                                               //
////////////////////////////////////////////////////////////////////////

/// An index-addressed list of [`Value`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct List(Vec<Value>);

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<Value> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Result<&Value> {
        self.0.get(index).ok_or(DictError::NoSuchListItem)
    }

    pub fn data_type(&self, index: usize) -> Result<DataType> {
        self.get(index).map(Value::data_type)
    }

    pub fn get_dict(&self, index: usize) -> Result<&Dict> {
        self.get(index)?.as_dict()
    }

    pub fn get_list(&self, index: usize) -> Result<&List> {
        self.get(index)?.as_list()
    }

    pub fn get_int(&self, index: usize) -> Result<u32> {
        self.get(index)?.as_int()
    }

    pub fn get_bindata(&self, index: usize) -> Result<&[u8]> {
        self.get(index)?.as_bindata()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    /// Sets the item at `index`. An index one past the end appends.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        match index.cmp(&self.0.len()) {
            std::cmp::Ordering::Less => self.0[index] = value.into(),
            std::cmp::Ordering::Equal => self.0.push(value.into()),
            std::cmp::Ordering::Greater => return Err(DictError::NoSuchListItem),
        }
        Ok(())
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

////////////////////////////////////////////////////////////////////////
// CONVERSIONS                                                        //
////////////////////////////////////////////////////////////////////////

fn field_value(field: &Field) -> Value {
    match field {
        Field::U8(value) => Value::Int(*value as u32),
        Field::U16(value) => Value::Int(*value as u32),
        Field::U32(value) => Value::Int(*value),
        // A 48-bit value does not fit an integer item.
        Field::U48(value) => Value::Bindata(value.to_be_bytes()[2..].to_vec()),
        Field::Name(name) => Value::Bindata(name.wire_repr().to_vec()),
        Field::Octets(data) | Field::Counted8(data) | Field::Counted16(data) => {
            Value::Bindata(data.clone())
        }
    }
}

impl From<&Question> for Dict {
    fn from(question: &Question) -> Self {
        [
            ("qname", Value::Bindata(question.qname.wire_repr().to_vec())),
            ("qtype", Value::Int(u16::from(question.qtype) as u32)),
            ("qclass", Value::Int(u16::from(question.qclass) as u32)),
        ]
        .into_iter()
        .collect()
    }
}

/// Converts a record into `{name, type, class, ttl, rdata}`. The rdata
/// dict holds `rdata_raw` (uncompressed wire form), a `fields` list,
/// and for address records `ipv4_address` or `ipv6_address`.
impl From<&Record> for Dict {
    fn from(record: &Record) -> Self {
        let mut raw = Vec::new();
        for field in &record.rdata {
            // Only an out-of-range U48 can fail, and the codec never
            // produces one.
            if field.write_uncompressed(&mut raw).is_err() {
                raw.clear();
                break;
            }
        }
        let mut rdata = Dict::new();
        rdata.set("rdata_raw", raw);
        rdata.set("fields", record.rdata.iter().map(field_value).collect::<List>());
        match record.ip_addr() {
            Some(std::net::IpAddr::V4(addr)) => rdata.set("ipv4_address", addr.octets().to_vec()),
            Some(std::net::IpAddr::V6(addr)) => rdata.set("ipv6_address", addr.octets().to_vec()),
            None => (),
        }

        let mut dict = Dict::new();
        dict.set("name", record.owner.wire_repr().to_vec());
        dict.set("type", u16::from(record.rr_type) as u32);
        dict.set("class", u16::from(record.class) as u32);
        dict.set("ttl", record.ttl);
        dict.set("rdata", rdata);
        dict
    }
}

/// Converts a message into the reply layout: `header`, `question`,
/// `answer`, `authority` and `additional`.
impl From<&Message> for Dict {
    fn from(message: &Message) -> Self {
        let flag = |set: bool| Value::Int(set as u32);
        let header: Dict = [
            ("id", Value::Int(message.id as u32)),
            ("qr", flag(message.flags.qr)),
            ("opcode", Value::Int(u8::from(message.opcode) as u32)),
            ("aa", flag(message.flags.aa)),
            ("tc", flag(message.flags.tc)),
            ("rd", flag(message.flags.rd)),
            ("ra", flag(message.flags.ra)),
            ("ad", flag(message.flags.ad)),
            ("cd", flag(message.flags.cd)),
            ("rcode", Value::Int(u16::from(message.rcode) as u32)),
        ]
        .into_iter()
        .collect();
        let records =
            |rrs: &[Record]| -> List { rrs.iter().map(|rr| Value::Dict(rr.into())).collect() };

        let mut dict = Dict::new();
        dict.set("header", header);
        if let Some(question) = message.question() {
            dict.set("question", Dict::from(question));
        }
        dict.set("answer", records(&message.answers));
        dict.set("authority", records(&message.authorities));
        dict.set("additional", records(&message.additionals));
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::Type;

    #[test]
    fn typed_accessors_check_types() {
        let mut dict = Dict::new();
        dict.set("count", 3u32);
        dict.set("blob", vec![1u8, 2]);
        assert_eq!(dict.get_int("count"), Ok(3));
        assert_eq!(dict.get_bindata("blob"), Ok(&[1, 2][..]));
        assert_eq!(dict.get_list("count"), Err(DictError::WrongTypeRequested));
        assert_eq!(dict.get_int("missing"), Err(DictError::NoSuchDictName));
        assert_eq!(dict.data_type("blob"), Ok(DataType::Bindata));
        assert_eq!(dict.names().get_bindata(0), Ok(&b"blob"[..]));
    }

    #[test]
    fn list_set_appends_only_at_end() {
        let mut list = List::new();
        list.set(0, 7u32).unwrap();
        list.set(0, 8u32).unwrap();
        assert_eq!(list.set(5, 9u32), Err(DictError::NoSuchListItem));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get_int(0), Ok(8));
        assert_eq!(list.get_dict(1), Err(DictError::NoSuchListItem));
    }

    #[test]
    fn clone_is_deep() {
        let mut inner = Dict::new();
        inner.set("x", 1u32);
        let mut outer = Dict::new();
        outer.set("inner", inner);
        let copy = outer.clone();
        let mut replacement = Dict::new();
        replacement.set("x", 2u32);
        outer.set("inner", replacement);
        assert_eq!(copy.get_dict("inner").unwrap().get_int("x"), Ok(1));
    }

    #[test]
    fn record_conversion() {
        let record = Record::new(
            "a.example.".parse().unwrap(),
            Type::A,
            Class::IN,
            60,
            vec![Field::Octets(vec![192, 0, 2, 1])],
        );
        let dict = Dict::from(&record);
        assert_eq!(dict.get_int("type"), Ok(1));
        assert_eq!(dict.get_int("ttl"), Ok(60));
        let rdata = dict.get_dict("rdata").unwrap();
        assert_eq!(rdata.get_bindata("ipv4_address"), Ok(&[192, 0, 2, 1][..]));
        assert_eq!(rdata.get_bindata("rdata_raw"), Ok(&[192, 0, 2, 1][..]));
    }
}
