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

//! The transaction manager.
//!
//! The [`Manager`] owns every outstanding query, but performs no I/O of
//! its own. It is driven by three kinds of events: a response arrived
//! ([`Manager::handle_response`]), a per-try timer fired
//! ([`Manager::handle_timeout`]), or a transmission failed
//! ([`Manager::handle_transport_error`]). Each event may produce a
//! [`Step`] that the driver must carry out: either transmit a query, or
//! deliver a result to a callback.
//!
//! A transaction moves through these states:
//!
//! ```text
//! Created → Sent(UDP) → [TimedOut → Sent(retry) | Truncated → Sent(TCP)]
//!         → Completed | Cancelled | Failed
//! ```
//!
//! Responses are matched by wire ID, by the upstream and transport they
//! came from, and by the echoed question. Anything else is dropped, so
//! that spoofed or stray responses can never complete a transaction.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use log::debug;
use rand::Rng;

use crate::error::{Error, UsageError};
use crate::io::TransportError;
use crate::message::reader::decode_header_and_questions;
use crate::message::{Edns, Message, Question};

////////////////////////////////////////////////////////////////////////
// PUBLIC TYPES                                                       //
////////////////////////////////////////////////////////////////////////

/// Identifies a transaction for its whole lifetime, across retries and
/// transport changes. This is distinct from the 16-bit message ID.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The transport used for a transmission.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Mode {
    Udp,
    Tcp,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("UDP"),
            Self::Tcp => f.write_str("TCP"),
        }
    }
}

/// Which transports may be used.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Preference {
    /// UDP, falling back to TCP after a truncated response.
    #[default]
    UdpFirst,
    UdpOnly,
    TcpOnly,
}

/// Tunables of a [`Manager`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    /// The maximum number of outstanding transactions.
    pub limit: usize,
    /// How many times a query is retried after a timeout or transport
    /// failure.
    pub retries: u32,
    pub preference: Preference,
    /// The UDP payload size advertised through EDNS.
    pub udp_payload_size: u16,
    /// Whether a cancelled transaction's callback is invoked with
    /// [`Completion::Cancelled`].
    pub notify_on_cancel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limit: 1024,
            retries: 2,
            preference: Preference::UdpFirst,
            udp_payload_size: 1232,
            notify_on_cancel: false,
        }
    }
}

/// A query to submit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Query {
    pub question: Question,
    /// The upstreams to try, in order; retries rotate through them.
    pub upstreams: Vec<SocketAddr>,
    pub recursion_desired: bool,
    pub dnssec_ok: bool,
    pub checking_disabled: bool,
}

impl Query {
    /// Creates a recursive query without DNSSEC bits.
    pub fn new(question: Question, upstreams: Vec<SocketAddr>) -> Self {
        Self {
            question,
            upstreams,
            recursion_desired: true,
            dnssec_ok: false,
            checking_disabled: false,
        }
    }
}

/// A request to the driver to send a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transmit {
    pub id: TransactionId,
    /// The serial number of this transmission. Timers and transport
    /// errors are reported back with it, so that stale ones are ignored.
    pub attempt: u32,
    pub upstream: SocketAddr,
    pub mode: Mode,
    pub octets: Vec<u8>,
}

/// Data received by the driver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Received {
    pub source: SocketAddr,
    pub mode: Mode,
    pub octets: Vec<u8>,
    /// Whether a datagram was cut short by the receive buffer.
    pub truncated: bool,
}

/// A matched response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Exchange {
    pub message: Message,
    pub upstream: SocketAddr,
    pub mode: Mode,
}

/// How a transaction ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Completion {
    Answered(Exchange),
    Cancelled,
    TimedOut,
    Failed(TransportError),
}

/// The callback invoked when a transaction ends. Being `FnOnce`, it
/// cannot be invoked twice.
pub type Callback = Box<dyn FnOnce(TransactionId, Completion) + Send>;

/// A pending callback invocation. The driver calls
/// [`Delivery::deliver`] once it no longer holds the manager's lock.
#[must_use]
pub struct Delivery {
    pub id: TransactionId,
    pub completion: Completion,
    callback: Callback,
}

impl Delivery {
    pub fn deliver(self) {
        (self.callback)(self.id, self.completion)
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("id", &self.id)
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}

/// An action the driver must carry out.
#[derive(Debug)]
pub enum Step {
    Transmit(Transmit),
    Deliver(Delivery),
}

////////////////////////////////////////////////////////////////////////
// MANAGER                                                            //
////////////////////////////////////////////////////////////////////////

struct Transaction {
    query: Query,
    wire_id: u16,
    octets: Vec<u8>,
    mode: Mode,
    attempt: u32,
    failures: u32,
    upstream_index: usize,
    truncation_retried: bool,
    last_error: Option<TransportError>,
    created: Instant,
    callback: Callback,
}

impl Transaction {
    fn upstream(&self) -> SocketAddr {
        self.query.upstreams[self.upstream_index]
    }

    fn transmit(&self, id: TransactionId) -> Transmit {
        Transmit {
            id,
            attempt: self.attempt,
            upstream: self.upstream(),
            mode: self.mode,
            octets: self.octets.clone(),
        }
    }
}

/// The table of outstanding transactions. See the [module
/// documentation](self).
pub struct Manager {
    settings: Settings,
    transactions: HashMap<TransactionId, Transaction>,
    wire_ids: HashMap<u16, TransactionId>,
    next_id: u64,
}

impl Manager {
    /// Creates a manager. The limit is capped at the number of distinct
    /// wire IDs.
    pub fn new(mut settings: Settings) -> Self {
        settings.limit = settings.limit.min(u16::MAX as usize);
        Self {
            settings,
            transactions: HashMap::new(),
            wire_ids: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the number of outstanding transactions.
    pub fn outstanding(&self) -> usize {
        self.transactions.len()
    }

    /// Returns whether `id` is outstanding.
    pub fn is_outstanding(&self, id: TransactionId) -> bool {
        self.transactions.contains_key(&id)
    }

    /// Allocates a fresh transaction ID without creating a transaction.
    /// Drivers use this to name composite operations in the same
    /// namespace.
    pub fn allocate_id(&mut self) -> TransactionId {
        let id = TransactionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Submits a query. On success, the first transmission is returned
    /// along with the new transaction's ID.
    pub fn submit(
        &mut self,
        query: Query,
        callback: Callback,
    ) -> Result<(TransactionId, Transmit), Error> {
        if self.transactions.len() >= self.settings.limit {
            return Err(UsageError::TooManyTransactions.into());
        } else if query.upstreams.is_empty() {
            return Err(UsageError::NoUpstreams.into());
        }

        let wire_id = self.fresh_wire_id();
        let mut message = Message::query(query.question.clone(), wire_id);
        message.flags.rd = query.recursion_desired;
        message.flags.cd = query.checking_disabled;
        message.edns = Some(Edns::new(self.settings.udp_payload_size, query.dnssec_ok));
        let octets = message.encode()?;

        let mode = match self.settings.preference {
            Preference::TcpOnly => Mode::Tcp,
            Preference::UdpFirst | Preference::UdpOnly => Mode::Udp,
        };
        let id = self.allocate_id();
        let transaction = Transaction {
            query,
            wire_id,
            octets,
            mode,
            attempt: 0,
            failures: 0,
            upstream_index: 0,
            truncation_retried: false,
            last_error: None,
            created: Instant::now(),
            callback,
        };
        let transmit = transaction.transmit(id);
        debug!(
            "transaction {id}: sending {} to {} over {mode}",
            transaction.query.question,
            transaction.upstream()
        );
        self.transactions.insert(id, transaction);
        self.wire_ids.insert(wire_id, id);
        Ok((id, transmit))
    }

    /// Picks a random wire ID not used by any outstanding transaction.
    fn fresh_wire_id(&self) -> u16 {
        let mut rng = rand::thread_rng();
        loop {
            let wire_id = rng.gen();
            if !self.wire_ids.contains_key(&wire_id) {
                return wire_id;
            }
        }
    }

    /// Handles received data, which may or may not answer an
    /// outstanding transaction.
    pub fn handle_response(&mut self, received: Received) -> Option<Step> {
        // A message that only partly decodes is good for nothing but a
        // switch to TCP.
        let (message, partial) = match Message::decode(&received.octets) {
            Ok(message) => (message, false),
            Err(e) => {
                let fallback = decode_header_and_questions(&received.octets)
                    .ok()
                    .filter(|m| m.flags.tc || received.truncated);
                match fallback {
                    Some(message) => (message, true),
                    None => {
                        debug!("dropping undecodable response from {}: {e}", received.source);
                        return None;
                    }
                }
            }
        };
        if !message.flags.qr {
            debug!("dropping non-response from {}", received.source);
            return None;
        }

        let id = *self.wire_ids.get(&message.id)?;
        let transaction = self.transactions.get_mut(&id)?;
        if received.source != transaction.upstream() || received.mode != transaction.mode {
            debug!(
                "transaction {id}: dropping response from unexpected source {} over {}",
                received.source, received.mode
            );
            return None;
        } else if message.questions.len() != 1
            || message.questions[0] != transaction.query.question
        {
            debug!("transaction {id}: dropping response with mismatched question");
            return None;
        }

        let truncated = message.flags.tc || received.truncated;
        if truncated
            && transaction.mode == Mode::Udp
            && !transaction.truncation_retried
            && self.settings.preference != Preference::UdpOnly
        {
            transaction.truncation_retried = true;
            transaction.mode = Mode::Tcp;
            transaction.attempt += 1;
            debug!("transaction {id}: truncated response, retrying over TCP");
            return Some(Step::Transmit(transaction.transmit(id)));
        } else if partial {
            debug!("transaction {id}: dropping undecodable response from {}", received.source);
            return None;
        }

        let transaction = self.remove(id)?;
        debug!(
            "transaction {id}: answered by {} in {:?}",
            received.source,
            transaction.created.elapsed()
        );
        let exchange = Exchange {
            message,
            upstream: received.source,
            mode: received.mode,
        };
        Some(Step::Deliver(Delivery {
            id,
            completion: Completion::Answered(exchange),
            callback: transaction.callback,
        }))
    }

    /// Handles the expiry of the timer armed for transmission `attempt`
    /// of transaction `id`.
    pub fn handle_timeout(&mut self, id: TransactionId, attempt: u32) -> Option<Step> {
        self.handle_failure(id, attempt, None)
    }

    /// Handles a transport failure of transmission `attempt`.
    pub fn handle_transport_error(
        &mut self,
        id: TransactionId,
        attempt: u32,
        error: TransportError,
    ) -> Option<Step> {
        self.handle_failure(id, attempt, Some(error))
    }

    fn handle_failure(
        &mut self,
        id: TransactionId,
        attempt: u32,
        error: Option<TransportError>,
    ) -> Option<Step> {
        let transaction = self.transactions.get_mut(&id)?;
        if transaction.attempt != attempt {
            return None;
        }
        transaction.failures += 1;
        transaction.last_error = error;

        if transaction.failures <= self.settings.retries {
            transaction.attempt += 1;
            transaction.upstream_index =
                (transaction.upstream_index + 1) % transaction.query.upstreams.len();
            match error {
                Some(e) => debug!("transaction {id}: {e}; retrying"),
                None => debug!("transaction {id}: timed out; retrying"),
            }
            return Some(Step::Transmit(transaction.transmit(id)));
        }

        let transaction = self.remove(id)?;
        let completion = match transaction.last_error {
            Some(e) => Completion::Failed(e),
            None => Completion::TimedOut,
        };
        debug!("transaction {id}: giving up after {} attempts", transaction.failures);
        Some(Step::Deliver(Delivery {
            id,
            completion,
            callback: transaction.callback,
        }))
    }

    /// Cancels an outstanding transaction. Responses that arrive for it
    /// later are dropped. If the manager is set to notify on
    /// cancellation, the returned [`Delivery`] must be delivered.
    pub fn cancel(&mut self, id: TransactionId) -> Result<Option<Delivery>, UsageError> {
        let transaction = self.remove(id).ok_or(UsageError::UnknownTransaction)?;
        debug!("transaction {id}: cancelled");
        if self.settings.notify_on_cancel {
            Ok(Some(Delivery {
                id,
                completion: Completion::Cancelled,
                callback: transaction.callback,
            }))
        } else {
            Ok(None)
        }
    }

    fn remove(&mut self, id: TransactionId) -> Option<Transaction> {
        let transaction = self.transactions.remove(&id)?;
        self.wire_ids.remove(&transaction.wire_id);
        Some(transaction)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::class::Class;
    use crate::rr::{Field, Record, Type};

    type Log = Arc<Mutex<Vec<(TransactionId, Completion)>>>;

    fn recorder(log: &Log) -> Callback {
        let log = log.clone();
        Box::new(move |id, completion| log.lock().unwrap().push((id, completion)))
    }

    fn upstream(n: u8) -> SocketAddr {
        SocketAddr::from(([192, 0, 2, n], 53))
    }

    fn question(name: &str) -> Question {
        Question::new(name.parse().unwrap(), Type::A, Class::IN)
    }

    fn query(name: &str) -> Query {
        Query::new(question(name), vec![upstream(1), upstream(2)])
    }

    /// Builds the octets of a response to `transmit`.
    fn respond(transmit: &Transmit, tc: bool) -> Vec<u8> {
        let mut message = Message::decode(&transmit.octets).unwrap();
        message.flags.qr = true;
        message.flags.tc = tc;
        if !tc {
            let question = message.questions[0].clone();
            message.answers.push(Record::new(
                question.qname,
                Type::A,
                Class::IN,
                300,
                vec![Field::Octets(vec![192, 0, 2, 80])],
            ));
        }
        message.encode().unwrap()
    }

    fn received(transmit: &Transmit, octets: Vec<u8>) -> Received {
        Received {
            source: transmit.upstream,
            mode: transmit.mode,
            octets,
            truncated: false,
        }
    }

    fn deliver(step: Option<Step>) {
        match step {
            Some(Step::Deliver(delivery)) => delivery.deliver(),
            other => panic!("expected a delivery, got {other:?}"),
        }
    }

    fn expect_transmit(step: Option<Step>) -> Transmit {
        match step {
            Some(Step::Transmit(transmit)) => transmit,
            other => panic!("expected a transmission, got {other:?}"),
        }
    }

    #[test]
    fn submit_encodes_query() {
        let log = Log::default();
        let mut manager = Manager::new(Settings::default());
        let mut q = query("example.com.");
        q.dnssec_ok = true;
        q.checking_disabled = true;
        let (id, transmit) = manager.submit(q, recorder(&log)).unwrap();
        assert_eq!(transmit.id, id);
        assert_eq!(transmit.mode, Mode::Udp);
        assert_eq!(transmit.upstream, upstream(1));
        let message = Message::decode(&transmit.octets).unwrap();
        assert!(message.flags.rd && message.flags.cd && !message.flags.qr);
        assert_eq!(message.questions, [question("example.com.")]);
        let edns = message.edns.unwrap();
        assert_eq!(edns.udp_payload_size, 1232);
        assert!(edns.dnssec_ok);
        assert_eq!(manager.outstanding(), 1);
    }

    #[test]
    fn transactions_are_isolated() {
        let log = Log::default();
        let mut manager = Manager::new(Settings::default());
        let (id_a, transmit_a) = manager.submit(query("a.example."), recorder(&log)).unwrap();
        let (id_b, transmit_b) = manager.submit(query("b.example."), recorder(&log)).unwrap();
        assert_ne!(id_a, id_b);

        deliver(manager.handle_response(received(&transmit_b, respond(&transmit_b, false))));
        {
            let log = log.lock().unwrap();
            assert_eq!(log.len(), 1);
            assert_eq!(log[0].0, id_b);
            assert!(matches!(log[0].1, Completion::Answered(_)));
        }
        assert!(manager.is_outstanding(id_a));
        assert!(!manager.is_outstanding(id_b));
    }

    #[test]
    fn mismatched_responses_are_dropped() {
        let log = Log::default();
        let mut manager = Manager::new(Settings::default());
        let (id, transmit) = manager.submit(query("a.example."), recorder(&log)).unwrap();

        // Wrong question, same wire ID.
        let mut message = Message::decode(&respond(&transmit, false)).unwrap();
        message.questions[0] = question("b.example.");
        let octets = message.encode().unwrap();
        assert!(manager.handle_response(received(&transmit, octets)).is_none());

        // Right question, wrong source.
        let mut wrong_source = received(&transmit, respond(&transmit, false));
        wrong_source.source = upstream(9);
        assert!(manager.handle_response(wrong_source).is_none());

        // The query itself, reflected back.
        assert!(manager
            .handle_response(received(&transmit, transmit.octets.clone()))
            .is_none());

        // Garbage.
        assert!(manager
            .handle_response(received(&transmit, vec![1, 2, 3]))
            .is_none());

        assert!(manager.is_outstanding(id));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn truncation_triggers_one_tcp_retry() {
        let log = Log::default();
        let mut manager = Manager::new(Settings::default());
        let (id, transmit) = manager.submit(query("big.example."), recorder(&log)).unwrap();

        let truncated = received(&transmit, respond(&transmit, true));
        let retry = expect_transmit(manager.handle_response(truncated));
        assert_eq!(retry.id, id);
        assert_eq!(retry.mode, Mode::Tcp);
        assert_eq!(retry.upstream, transmit.upstream);
        assert_eq!(retry.octets, transmit.octets);
        assert_eq!(retry.attempt, transmit.attempt + 1);

        // A late UDP copy does not count.
        assert!(manager
            .handle_response(received(&transmit, respond(&transmit, false)))
            .is_none());

        // A truncated TCP response is delivered as is.
        deliver(manager.handle_response(received(&retry, respond(&retry, true))));
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, id);
        match &log[0].1 {
            Completion::Answered(exchange) => {
                assert_eq!(exchange.mode, Mode::Tcp);
                assert!(exchange.message.flags.tc);
            }
            other => panic!("unexpected completion {other:?}"),
        }
    }

    #[test]
    fn cut_datagram_triggers_tcp_retry() {
        let log = Log::default();
        let mut manager = Manager::new(Settings::default());
        let (_, transmit) = manager.submit(query("big.example."), recorder(&log)).unwrap();
        let mut octets = respond(&transmit, false);
        octets.truncate(octets.len() - 3);
        let mut datagram = received(&transmit, octets);
        datagram.truncated = true;
        let retry = expect_transmit(manager.handle_response(datagram));
        assert_eq!(retry.mode, Mode::Tcp);
    }

    #[test]
    fn udp_only_delivers_truncated_response() {
        let log = Log::default();
        let mut manager = Manager::new(Settings {
            preference: Preference::UdpOnly,
            ..Default::default()
        });
        let (_, transmit) = manager.submit(query("big.example."), recorder(&log)).unwrap();
        deliver(manager.handle_response(received(&transmit, respond(&transmit, true))));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn undecodable_responses_are_never_delivered() {
        let log = Log::default();
        let mut manager = Manager::new(Settings {
            preference: Preference::TcpOnly,
            retries: 1,
            ..Default::default()
        });
        let (id, transmit) = manager.submit(query("big.example."), recorder(&log)).unwrap();
        let mut octets = respond(&transmit, true);
        octets.extend_from_slice(&[0xde, 0xad]);
        assert!(Message::decode(&octets).is_err());
        assert!(manager.handle_response(received(&transmit, octets)).is_none());
        assert!(manager.is_outstanding(id));
        assert!(log.lock().unwrap().is_empty());

        // The try then times out and moves on to the next upstream.
        let retry = expect_transmit(manager.handle_timeout(id, transmit.attempt));
        assert_eq!(retry.upstream, upstream(2));

        // Likewise after the one truncation retry has been used.
        let mut manager = Manager::new(Settings::default());
        let (id, transmit) = manager.submit(query("big.example."), recorder(&log)).unwrap();
        let tcp = expect_transmit(
            manager.handle_response(received(&transmit, respond(&transmit, true))),
        );
        let mut octets = respond(&tcp, false);
        octets.truncate(octets.len() - 3);
        let mut cut = received(&tcp, octets);
        cut.truncated = true;
        assert!(manager.handle_response(cut).is_none());
        assert!(manager.is_outstanding(id));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn tcp_only_starts_with_tcp() {
        let log = Log::default();
        let mut manager = Manager::new(Settings {
            preference: Preference::TcpOnly,
            ..Default::default()
        });
        let (_, transmit) = manager.submit(query("example."), recorder(&log)).unwrap();
        assert_eq!(transmit.mode, Mode::Tcp);
    }

    #[test]
    fn timeouts_retry_then_give_up() {
        let log = Log::default();
        let mut manager = Manager::new(Settings {
            retries: 2,
            ..Default::default()
        });
        let (id, first) = manager.submit(query("slow.example."), recorder(&log)).unwrap();

        let second = expect_transmit(manager.handle_timeout(id, first.attempt));
        assert_eq!(second.upstream, upstream(2));
        // A stale timer for the first attempt is ignored.
        assert!(manager.handle_timeout(id, first.attempt).is_none());
        let third = expect_transmit(manager.handle_timeout(id, second.attempt));
        assert_eq!(third.upstream, upstream(1));

        deliver(manager.handle_timeout(id, third.attempt));
        assert_eq!(*log.lock().unwrap(), [(id, Completion::TimedOut)]);
        assert!(!manager.is_outstanding(id));
        assert!(manager.handle_timeout(id, third.attempt).is_none());
    }

    #[test]
    fn transport_errors_are_reported_after_retries() {
        let log = Log::default();
        let mut manager = Manager::new(Settings {
            retries: 1,
            ..Default::default()
        });
        let (id, first) = manager.submit(query("down.example."), recorder(&log)).unwrap();
        let second = expect_transmit(manager.handle_transport_error(
            id,
            first.attempt,
            TransportError::Refused,
        ));
        deliver(manager.handle_transport_error(id, second.attempt, TransportError::Unreachable));
        assert_eq!(
            *log.lock().unwrap(),
            [(id, Completion::Failed(TransportError::Unreachable))]
        );
    }

    #[test]
    fn cancel_semantics() {
        let log = Log::default();
        let mut manager = Manager::new(Settings::default());
        let (id, transmit) = manager.submit(query("example."), recorder(&log)).unwrap();

        assert!(manager.cancel(id).unwrap().is_none());
        assert_eq!(manager.cancel(id).unwrap_err(), UsageError::UnknownTransaction);
        assert!(manager
            .handle_response(received(&transmit, respond(&transmit, false)))
            .is_none());
        assert!(log.lock().unwrap().is_empty());

        let unknown = TransactionId(9999);
        assert_eq!(manager.cancel(unknown).unwrap_err(), UsageError::UnknownTransaction);
    }

    #[test]
    fn cancel_can_notify() {
        let log = Log::default();
        let mut manager = Manager::new(Settings {
            notify_on_cancel: true,
            ..Default::default()
        });
        let (id, _) = manager.submit(query("example."), recorder(&log)).unwrap();
        manager.cancel(id).unwrap().unwrap().deliver();
        assert_eq!(*log.lock().unwrap(), [(id, Completion::Cancelled)]);
    }

    #[test]
    fn limit_fails_fast() {
        let log = Log::default();
        let mut manager = Manager::new(Settings {
            limit: 1,
            ..Default::default()
        });
        manager.submit(query("a.example."), recorder(&log)).unwrap();
        assert!(matches!(
            manager.submit(query("b.example."), recorder(&log)),
            Err(Error::Usage(UsageError::TooManyTransactions))
        ));
        assert!(matches!(
            Manager::new(Settings::default())
                .submit(Query::new(question("c.example."), Vec::new()), recorder(&log)),
            Err(Error::Usage(UsageError::NoUpstreams))
        ));
    }
}
