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

//! Iterative resolution for the recursing mode.
//!
//! Starting at the root servers, non-recursive queries are sent and
//! referrals followed down the tree until a server answers. Server
//! addresses come from glue in the referral when it is present and
//! from nested address lookups otherwise.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use log::debug;

use super::Inner;
use crate::class::Class;
use crate::error::{Error, Result};
use crate::message::{Message, Question, Rcode};
use crate::name::Name;
use crate::rr::Type;
use crate::transaction::{Exchange, Query};

/// The most referrals followed for one question.
const MAX_REFERRALS: usize = 16;

/// How deeply lookups of server addresses (and CNAME targets) may nest.
const MAX_DEPTH: usize = 4;

/// How many nameserver names are tried when a referral has no glue.
const MAX_GLUELESS_TARGETS: usize = 3;

type BoxedExchange<'a> = Pin<Box<dyn Future<Output = Result<Exchange>> + Send + 'a>>;

/// Resolves `question` iteratively from the configured root servers.
pub(super) fn resolve<'a>(
    inner: &'a Arc<Inner>,
    question: Question,
    dnssec_ok: bool,
    depth: usize,
) -> BoxedExchange<'a> {
    Box::pin(async move {
        let mut zone = Name::root();
        let mut servers = inner.config.root_servers.clone();

        for _ in 0..MAX_REFERRALS {
            let mut query = Query::new(question.clone(), servers.clone());
            query.recursion_desired = false;
            query.dnssec_ok = dnssec_ok;
            query.checking_disabled = dnssec_ok;
            let exchange = inner.query(query).await?;

            let (cut, targets) = match referral(&exchange.message, &question.qname, &zone) {
                Some(referral) => referral,
                None => return follow_cname(inner, exchange, &question, dnssec_ok, depth).await,
            };
            debug!("{question}: referred from {zone} to {cut} by {}", exchange.upstream);

            // Glue is assumed to be reachable on the port the referral
            // came from.
            let port = exchange.upstream.port();
            let mut next = glue(&exchange.message, &targets, port);
            if next.is_empty() {
                next = resolve_targets(inner, &targets, port, depth).await;
            }
            if next.is_empty() {
                return Err(Error::Recursion(format!("no usable servers for {cut}")));
            }
            zone = cut;
            servers = next;
        }
        Err(Error::Recursion(format!(
            "more than {MAX_REFERRALS} referrals for {question}"
        )))
    })
}

/// If `message` is a referral to a zone below `zone` that contains
/// `qname`, returns the zone cut and the names of its servers.
fn referral(message: &Message, qname: &Name, zone: &Name) -> Option<(Name, Vec<Name>)> {
    if message.rcode != Rcode::NOERROR || !message.answers.is_empty() {
        return None;
    }
    let cut = message
        .authorities
        .iter()
        .find(|rr| {
            rr.rr_type == Type::NS
                && rr.owner != *zone
                && rr.owner.eq_or_subdomain_of(zone)
                && qname.eq_or_subdomain_of(&rr.owner)
        })?
        .owner
        .clone();
    let targets = message
        .authorities
        .iter()
        .filter(|rr| rr.rr_type == Type::NS && rr.owner == cut)
        .filter_map(|rr| rr.target().cloned())
        .collect();
    Some((cut, targets))
}

/// Collects the addresses given for `targets` in the additional
/// section.
fn glue(message: &Message, targets: &[Name], port: u16) -> Vec<SocketAddr> {
    message
        .additionals
        .iter()
        .filter(|rr| matches!(rr.rr_type, Type::A | Type::AAAA) && targets.contains(&rr.owner))
        .filter_map(|rr| rr.ip_addr())
        .map(|ip| SocketAddr::new(ip, port))
        .collect()
}

/// Looks up the addresses of nameservers named in a referral without
/// glue, stopping at the first that has any.
async fn resolve_targets(
    inner: &Arc<Inner>,
    targets: &[Name],
    port: u16,
    depth: usize,
) -> Vec<SocketAddr> {
    if depth >= MAX_DEPTH {
        debug!("not resolving nameserver addresses at depth {depth}");
        return Vec::new();
    }
    for target in targets.iter().take(MAX_GLUELESS_TARGETS) {
        let mut addresses = Vec::new();
        for rr_type in [Type::A, Type::AAAA] {
            let question = Question::new(target.clone(), rr_type, Class::IN);
            match resolve(inner, question, false, depth + 1).await {
                Ok(exchange) => addresses.extend(
                    exchange
                        .message
                        .answers
                        .iter()
                        .filter(|rr| rr.rr_type == rr_type)
                        .filter_map(|rr| rr.ip_addr())
                        .map(|ip| SocketAddr::new(ip, port)),
                ),
                Err(e) => debug!("could not resolve nameserver {target}: {e}"),
            }
        }
        if !addresses.is_empty() {
            return addresses;
        }
    }
    Vec::new()
}

/// Restarts resolution at the target of a CNAME answer that does not
/// itself answer the question. The target's answers are appended to
/// the original message.
async fn follow_cname(
    inner: &Arc<Inner>,
    mut exchange: Exchange,
    question: &Question,
    dnssec_ok: bool,
    depth: usize,
) -> Result<Exchange> {
    let answers = &exchange.message.answers;
    let answered = answers
        .iter()
        .any(|rr| rr.rr_type == question.qtype || question.qtype == Type::ANY);
    let target = match answers.iter().find(|rr| rr.rr_type == Type::CNAME) {
        Some(cname) if !answered && question.qtype != Type::CNAME => cname.target().cloned(),
        _ => None,
    };
    let target = match target {
        Some(target) if depth < MAX_DEPTH => target,
        _ => return Ok(exchange),
    };

    debug!("{question}: following CNAME to {target}");
    let restarted = Question::new(target, question.qtype, question.qclass);
    let rest = resolve(inner, restarted, dnssec_ok, depth + 1).await?;
    exchange.message.rcode = rest.message.rcode;
    exchange.message.answers.extend(rest.message.answers);
    Ok(exchange)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use tokio::net::UdpSocket;

    use super::*;
    use crate::context::{Config, Context, Extensions, ResolutionMode};
    use crate::rr::{Field, Record};

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    fn ns(owner: &str, target: &str) -> Record {
        Record::new(
            name(owner),
            Type::NS,
            Class::IN,
            3600,
            vec![Field::Name(name(target))],
        )
    }

    fn a(owner: &str, address: [u8; 4]) -> Record {
        Record::new(
            name(owner),
            Type::A,
            Class::IN,
            3600,
            vec![Field::Octets(address.to_vec())],
        )
    }

    #[test]
    fn referrals_must_descend() {
        let mut message = Message::default();
        message.authorities.push(ns("example.", "ns.example."));
        let qname = name("www.example.");

        let (cut, targets) = referral(&message, &qname, &Name::root()).unwrap();
        assert_eq!(cut, name("example."));
        assert_eq!(targets, vec![name("ns.example.")]);
        assert!(referral(&message, &qname, &name("example.")).is_none());
        assert!(referral(&message, &name("www.example.org."), &Name::root()).is_none());

        message.answers.push(a("www.example.", [192, 0, 2, 1]));
        assert!(referral(&message, &qname, &Name::root()).is_none());
    }

    #[test]
    fn glue_is_matched_to_targets() {
        let mut message = Message::default();
        message.additionals.push(a("ns.example.", [192, 0, 2, 53]));
        message.additionals.push(a("other.example.", [192, 0, 2, 54]));
        let servers = glue(&message, &[name("ns.example.")], 53);
        assert_eq!(servers, vec!["192.0.2.53:53".parse().unwrap()]);
    }

    /// Serves the root zone at 127.0.0.1 and `example.` at 127.0.0.2,
    /// on the same port.
    async fn start_hierarchy() -> SocketAddr {
        let root = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = root.local_addr().unwrap().port();
        let child = UdpSocket::bind((Ipv4Addr::new(127, 0, 0, 2), port))
            .await
            .unwrap();

        for (socket, is_root) in [(root, true), (child, false)] {
            tokio::spawn(async move {
                let mut buf = vec![0; 65535];
                loop {
                    let (len, source) = socket.recv_from(&mut buf).await.unwrap();
                    let query = Message::decode(&buf[..len]).unwrap();
                    let question = query.question().unwrap().clone();
                    let mut response = query.clone();
                    response.flags.qr = true;
                    response.edns = None;
                    if query.flags.rd {
                        response.rcode = Rcode::REFUSED;
                    } else if is_root {
                        response.authorities.push(ns("example.", "ns.example."));
                        response.additionals.push(a("ns.example.", [127, 0, 0, 2]));
                    } else if question.qname == name("alias.example.") {
                        response.flags.aa = true;
                        response.answers.push(Record::new(
                            question.qname.clone(),
                            Type::CNAME,
                            Class::IN,
                            300,
                            vec![Field::Name(name("www.example."))],
                        ));
                    } else {
                        response.flags.aa = true;
                        response.answers.push(a("www.example.", [192, 0, 2, 80]));
                    }
                    let octets = response.encode().unwrap();
                    socket.send_to(&octets, source).await.unwrap();
                }
            });
        }
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[tokio::test]
    async fn referrals_are_followed_from_the_root() {
        let root = start_hierarchy().await;
        let context = Context::new(Config {
            resolution_mode: ResolutionMode::Recursing,
            root_servers: vec![root],
            timeout: Duration::from_millis(500),
            ..Config::default()
        })
        .unwrap();

        let response = context
            .general("www.example.", Type::A, &Extensions::default())
            .await
            .unwrap();
        assert_eq!(response.just_address_answers(), vec![IpAddr::from([192, 0, 2, 80])]);
        assert_eq!(response.replies[0].upstream.ip(), IpAddr::from([127, 0, 0, 2]));

        let response = context
            .general("alias.example.", Type::A, &Extensions::default())
            .await
            .unwrap();
        assert_eq!(response.canonical_name(), Some(name("www.example.")));
        assert_eq!(response.just_address_answers(), vec![IpAddr::from([192, 0, 2, 80])]);
    }
}
