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

//! The resolution API.
//!
//! A [`Context`] drives a [transaction manager](crate::transaction)
//! with the [transports](crate::io) on a Tokio runtime. Each lookup
//! comes in three flavors:
//!
//! * async (`general`, `address`, ...), resolving to a [`Response`];
//! * callback (`general_callback`, ...), returning a [`TransactionId`]
//!   that can be passed to [`Context::cancel`]; the callback receives
//!   an [`Outcome`] exactly once, unless the lookup is cancelled;
//! * blocking (`general_sync`, ...), which must not be called from
//!   within the runtime's worker threads.
//!
//! The manager sits behind a mutex that is never held across an
//! `.await` or while a callback runs.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

use crate::class::Class;
use crate::dnssec::{Status, TrustAnchors, Validator};
use crate::error::{Error, Result};
use crate::io::{tcp, Datagram, UdpTransport};
use crate::message::{Message, Question};
use crate::name::Name;
use crate::rr::{Field, Record, Type};
use crate::transaction::{
    self, Completion, Exchange, Manager, Mode, Query, Received, Step, TransactionId, Transmit,
};

pub mod config;
mod recursion;
pub mod response;

pub use crate::error::UsageError;
pub use config::{Config, ResolutionMode};
pub use response::{
    callback_type, response_status, Callback, Extensions, Outcome, Reply, Response,
    EXTENSION_FALSE, EXTENSION_TRUE,
};

/// The most support queries made to validate one reply.
const MAX_SUPPORT_QUERIES: usize = 24;

////////////////////////////////////////////////////////////////////////
// REQUESTS                                                           //
////////////////////////////////////////////////////////////////////////

/// What a lookup asks for.
#[derive(Clone, Debug)]
enum Request {
    General(Name, Type),
    Address(Name),
    Hostname(IpAddr),
    Service(Name),
}

impl Request {
    fn questions(&self) -> Vec<Question> {
        let question = |name: &Name, rr_type| Question::new(name.clone(), rr_type, Class::IN);
        match self {
            Self::General(name, rr_type) => vec![question(name, *rr_type)],
            Self::Address(name) => vec![question(name, Type::A), question(name, Type::AAAA)],
            Self::Hostname(address) => vec![question(&reverse_name(*address), Type::PTR)],
            Self::Service(name) => vec![question(name, Type::SRV)],
        }
    }
}

/// Returns the name under `in-addr.arpa.` or `ip6.arpa.` used to look
/// up the hostname of `address`.
pub fn reverse_name(address: IpAddr) -> Name {
    let mut labels: Vec<Vec<u8>> = match address {
        IpAddr::V4(v4) => v4
            .octets()
            .iter()
            .rev()
            .map(|octet| octet.to_string().into_bytes())
            .collect(),
        IpAddr::V6(v6) => v6
            .octets()
            .iter()
            .rev()
            .flat_map(|octet| [octet & 0xf, octet >> 4])
            .map(|nibble| format!("{nibble:x}").into_bytes())
            .collect(),
    };
    let suffix: &[&[u8]] = match address {
        IpAddr::V4(_) => &[b"in-addr", b"arpa"],
        IpAddr::V6(_) => &[b"ip6", b"arpa"],
    };
    labels.extend(suffix.iter().map(|label| label.to_vec()));
    // At most 34 short labels, so this always fits.
    Name::from_labels(labels.iter().map(Vec::as_slice)).unwrap_or_else(|_| Name::root())
}

fn parse_name(name: &str) -> Result<Name> {
    name.parse().map_err(|e| UsageError::BadDomainName(e).into())
}

/// Returns the current time for signature validity checks.
fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as u32)
}

////////////////////////////////////////////////////////////////////////
// CONTEXT                                                            //
////////////////////////////////////////////////////////////////////////

/// A resolution context. Cloning a `Context` is cheap; clones share
/// their sockets and outstanding lookups.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    manager: Mutex<Manager>,
    udp: UdpTransport,
    handle: Handle,
    anchors: Mutex<Arc<TrustAnchors>>,
    lookups: Mutex<HashMap<TransactionId, Lookup>>,
}

/// A lookup started through a callback API.
struct Lookup {
    callback: Callback,
    task: Option<JoinHandle<()>>,
}

impl Context {
    /// Creates a context on the current Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Self::with_runtime(config, handle)
    }

    /// Creates a context on the runtime of `handle`.
    pub fn with_runtime(config: Config, handle: Handle) -> Result<Self> {
        config.check()?;

        // Datagrams are passed through a channel so that the sockets
        // can exist before the context they feed.
        let (sender, receiver) = mpsc::unbounded_channel();
        let udp = UdpTransport::start(&handle, config.udp_payload_size, move |datagram| {
            let _ = sender.send(datagram);
        })?;
        debug!("UDP sockets bound to {:?}", udp.local_addrs());

        let inner = Arc::new(Inner {
            manager: Mutex::new(Manager::new(config.settings())),
            anchors: Mutex::new(Arc::new(config.trust_anchors.clone())),
            lookups: Mutex::new(HashMap::new()),
            udp,
            handle: handle.clone(),
            config,
        });
        handle.spawn(dispatch_datagrams(Arc::downgrade(&inner), receiver));
        Ok(Self { inner })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the trust anchors currently in use.
    pub fn trust_anchors(&self) -> Arc<TrustAnchors> {
        self.inner.trust_anchors()
    }

    /// Replaces the trust anchors. Validations already running keep
    /// the anchors they started with.
    pub fn set_trust_anchors(&self, anchors: TrustAnchors) {
        *lock(&self.inner.anchors) = Arc::new(anchors);
    }

    /// Returns the number of outstanding callback lookups.
    pub fn outstanding(&self) -> usize {
        lock(&self.inner.lookups).len()
    }

    // Async API.

    /// Looks up records of any type.
    pub async fn general(
        &self,
        name: &str,
        rr_type: Type,
        extensions: &Extensions,
    ) -> Result<Response> {
        let request = Request::General(parse_name(name)?, rr_type);
        self.inner.check(extensions)?;
        self.inner.resolve(request, *extensions).await
    }

    /// Looks up the IPv4 and IPv6 addresses of a name.
    pub async fn address(&self, name: &str, extensions: &Extensions) -> Result<Response> {
        let request = Request::Address(parse_name(name)?);
        self.inner.check(extensions)?;
        self.inner.resolve(request, *extensions).await
    }

    /// Looks up the hostname of an address.
    pub async fn hostname(&self, address: IpAddr, extensions: &Extensions) -> Result<Response> {
        self.inner.check(extensions)?;
        self.inner
            .resolve(Request::Hostname(address), *extensions)
            .await
    }

    /// Looks up the SRV records of a service name.
    pub async fn service(&self, name: &str, extensions: &Extensions) -> Result<Response> {
        let request = Request::Service(parse_name(name)?);
        self.inner.check(extensions)?;
        self.inner.resolve(request, *extensions).await
    }

    // Callback API.

    pub fn general_callback<F>(
        &self,
        name: &str,
        rr_type: Type,
        extensions: &Extensions,
        callback: F,
    ) -> Result<TransactionId>
    where
        F: FnOnce(TransactionId, Outcome) + Send + 'static,
    {
        let request = Request::General(parse_name(name)?, rr_type);
        self.submit(request, extensions, Box::new(callback))
    }

    pub fn address_callback<F>(
        &self,
        name: &str,
        extensions: &Extensions,
        callback: F,
    ) -> Result<TransactionId>
    where
        F: FnOnce(TransactionId, Outcome) + Send + 'static,
    {
        let request = Request::Address(parse_name(name)?);
        self.submit(request, extensions, Box::new(callback))
    }

    pub fn hostname_callback<F>(
        &self,
        address: IpAddr,
        extensions: &Extensions,
        callback: F,
    ) -> Result<TransactionId>
    where
        F: FnOnce(TransactionId, Outcome) + Send + 'static,
    {
        self.submit(Request::Hostname(address), extensions, Box::new(callback))
    }

    pub fn service_callback<F>(
        &self,
        name: &str,
        extensions: &Extensions,
        callback: F,
    ) -> Result<TransactionId>
    where
        F: FnOnce(TransactionId, Outcome) + Send + 'static,
    {
        let request = Request::Service(parse_name(name)?);
        self.submit(request, extensions, Box::new(callback))
    }

    /// Cancels a callback lookup. Its queries are abandoned; responses
    /// that arrive for them later are dropped. The callback is invoked
    /// with [`Outcome::Cancelled`] if the context is configured to
    /// notify on cancellation, and otherwise not at all.
    pub fn cancel(&self, id: TransactionId) -> Result<()> {
        let lookup = lock(&self.inner.lookups)
            .remove(&id)
            .ok_or(UsageError::UnknownTransaction)?;
        if let Some(ref task) = lookup.task {
            task.abort();
        }
        debug!("lookup {id}: cancelled");
        if self.inner.config.notify_on_cancel {
            (lookup.callback)(id, Outcome::Cancelled);
        }
        Ok(())
    }

    // Blocking API.

    pub fn general_sync(
        &self,
        name: &str,
        rr_type: Type,
        extensions: &Extensions,
    ) -> Result<Response> {
        self.wait(Request::General(parse_name(name)?, rr_type), extensions)
    }

    pub fn address_sync(&self, name: &str, extensions: &Extensions) -> Result<Response> {
        self.wait(Request::Address(parse_name(name)?), extensions)
    }

    pub fn hostname_sync(&self, address: IpAddr, extensions: &Extensions) -> Result<Response> {
        self.wait(Request::Hostname(address), extensions)
    }

    pub fn service_sync(&self, name: &str, extensions: &Extensions) -> Result<Response> {
        self.wait(Request::Service(parse_name(name)?), extensions)
    }

    /// Starts a lookup whose outcome goes to `callback`.
    fn submit(
        &self,
        request: Request,
        extensions: &Extensions,
        callback: Callback,
    ) -> Result<TransactionId> {
        self.inner.check(extensions)?;
        let id = lock(&self.inner.manager).allocate_id();
        {
            let mut lookups = lock(&self.inner.lookups);
            if lookups.len() >= self.inner.config.limit {
                return Err(UsageError::TooManyTransactions.into());
            }
            lookups.insert(
                id,
                Lookup {
                    callback,
                    task: None,
                },
            );
        }

        let inner = self.inner.clone();
        let extensions = *extensions;
        let task = self.inner.handle.spawn(async move {
            let outcome = Outcome::from(inner.resolve(request, extensions).await);
            inner.finish(id, outcome);
        });
        match lock(&self.inner.lookups).get_mut(&id) {
            Some(lookup) => lookup.task = Some(task),
            // Already finished or cancelled.
            None => task.abort(),
        }
        Ok(id)
    }

    /// Runs a lookup and blocks until it ends.
    fn wait(&self, request: Request, extensions: &Extensions) -> Result<Response> {
        let (sender, receiver) = oneshot::channel();
        self.submit(
            request,
            extensions,
            Box::new(move |_, outcome| {
                let _ = sender.send(outcome);
            }),
        )?;
        receiver
            .blocking_recv()
            .map_err(|_| Error::Cancelled)?
            .into_result()
    }
}

/// Feeds received datagrams to the manager for as long as the context
/// exists.
async fn dispatch_datagrams(
    inner: Weak<Inner>,
    mut receiver: mpsc::UnboundedReceiver<Datagram>,
) {
    while let Some(datagram) = receiver.recv().await {
        let inner = match inner.upgrade() {
            Some(inner) => inner,
            None => break,
        };
        let step = lock(&inner.manager).handle_response(Received {
            source: datagram.source,
            mode: Mode::Udp,
            octets: datagram.octets,
            truncated: datagram.truncated,
        });
        if let Some(step) = step {
            inner.apply(step);
        }
    }
}

/// Locks a mutex, ignoring poisoning: every critical section leaves
/// the protected data consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

////////////////////////////////////////////////////////////////////////
// DRIVER                                                             //
////////////////////////////////////////////////////////////////////////

impl Inner {
    fn trust_anchors(&self) -> Arc<TrustAnchors> {
        lock(&self.anchors).clone()
    }

    fn check(&self, extensions: &Extensions) -> Result<()> {
        if extensions.wants_dnssec() && self.trust_anchors().is_empty() {
            Err(UsageError::DnssecWithoutAnchors.into())
        } else {
            Ok(())
        }
    }

    /// Delivers the outcome of a callback lookup, unless it was
    /// cancelled.
    fn finish(&self, id: TransactionId, outcome: Outcome) {
        let lookup = lock(&self.lookups).remove(&id);
        if let Some(lookup) = lookup {
            debug!("lookup {id}: finished ({})", outcome.callback_type());
            (lookup.callback)(id, outcome);
        }
    }

    async fn resolve(
        self: &Arc<Self>,
        request: Request,
        extensions: Extensions,
    ) -> Result<Response> {
        let mut questions = request.questions().into_iter();
        let results = match (questions.next(), questions.next()) {
            (Some(first), Some(second)) => {
                let (first, second) = tokio::join!(
                    self.lookup(first, extensions),
                    self.lookup(second, extensions)
                );
                vec![first, second]
            }
            (Some(first), None) => vec![self.lookup(first, extensions).await],
            _ => Vec::new(),
        };

        let mut replies = Vec::new();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    debug!("query failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        if replies.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let mut response = Response::new(replies);
        if extensions.dnssec_return_only_secure {
            response.retain_secure();
        }
        Ok(response)
    }

    /// Asks one question and validates the reply if requested.
    async fn lookup(
        self: &Arc<Self>,
        question: Question,
        extensions: Extensions,
    ) -> Result<Reply> {
        let dnssec = extensions.wants_dnssec();
        let exchange = self.exchange(question.clone(), dnssec).await?;
        let mut reply = Reply {
            message: exchange.message,
            upstream: exchange.upstream,
            mode: exchange.mode,
            dnssec_status: None,
            validation_chain: Vec::new(),
        };

        if dnssec {
            let anchors = self.trust_anchors();
            let records = records_to_validate(&reply.message);
            let support = self.gather_support(&records, &anchors).await;
            let status = Validator::new(&anchors, unix_now())
                .with_skew(self.config.dnssec_allowed_skew)
                .validate(&records, &support);
            if status == Status::Bogus {
                warn!("{question}: DNSSEC validation failed");
            }
            reply.dnssec_status = Some(status);
            if extensions.dnssec_return_validation_chain {
                reply.validation_chain = support;
            }
        }
        Ok(reply)
    }

    /// Gets a response to `question` through the configured resolution
    /// mode. With `dnssec` set, the DO and CD bits are set so that
    /// signatures come back and validation is left to us.
    async fn exchange(self: &Arc<Self>, question: Question, dnssec: bool) -> Result<Exchange> {
        match self.config.resolution_mode {
            ResolutionMode::Stub => {
                let mut query = Query::new(question, self.config.upstreams.clone());
                query.dnssec_ok = dnssec;
                query.checking_disabled = dnssec;
                self.query(query).await
            }
            ResolutionMode::Recursing => recursion::resolve(self, question, dnssec, 0).await,
        }
    }

    /// Queries the DNSKEY and DS RRsets (and NSEC/NSEC3 proofs) needed
    /// to build chains of trust for `records`.
    async fn gather_support(
        self: &Arc<Self>,
        records: &[Record],
        anchors: &TrustAnchors,
    ) -> Vec<Record> {
        let mut support = Vec::new();
        let mut asked = HashSet::new();
        let mut pending: Vec<(Name, Type)> = signers(records)
            .into_iter()
            .map(|zone| (zone, Type::DNSKEY))
            .collect();

        // Unsigned data needs proof that a delegation above it is
        // unsigned.
        for record in records.iter().filter(|r| r.rr_type != Type::RRSIG) {
            let signed = records
                .iter()
                .any(|r| r.type_covered() == Some(record.rr_type) && r.owner == record.owner);
            if signed {
                continue;
            }
            if let Some(anchor) = anchors.closest_zone(&record.owner) {
                let mut cut = record.owner.clone();
                while cut != *anchor && cut.eq_or_subdomain_of(anchor) {
                    pending.push((cut.clone(), Type::DS));
                    cut = match cut.superdomain(1) {
                        Some(parent) => parent,
                        None => break,
                    };
                }
            }
        }

        while let Some((name, rr_type)) = pending.pop() {
            if asked.contains(&(name.clone(), rr_type)) {
                continue;
            } else if asked.len() >= MAX_SUPPORT_QUERIES {
                debug!("giving up on support records after {} queries", asked.len());
                break;
            }
            asked.insert((name.clone(), rr_type));

            let question = Question::new(name.clone(), rr_type, Class::IN);
            let message = match self.exchange(question, true).await {
                Ok(exchange) => exchange.message,
                Err(e) => {
                    debug!("support query for {name} {rr_type} failed: {e}");
                    continue;
                }
            };
            let found: Vec<Record> = message
                .answers
                .into_iter()
                .chain(message.authorities)
                .filter(|rr| {
                    matches!(
                        rr.rr_type,
                        Type::DNSKEY | Type::DS | Type::NSEC | Type::NSEC3 | Type::RRSIG
                    )
                })
                .collect();
            for zone in signers(&found) {
                pending.push((zone, Type::DNSKEY));
            }
            if rr_type == Type::DNSKEY && anchors.for_zone(&name).next().is_none() {
                pending.push((name, Type::DS));
            }
            support.extend(found);
        }
        support
    }

    /// Submits a query to the manager and waits for it to end. If the
    /// returned future is dropped, the transaction is cancelled.
    async fn query(self: &Arc<Self>, query: Query) -> Result<Exchange> {
        let (sender, receiver) = oneshot::channel();
        let callback: transaction::Callback = Box::new(move |_, completion| {
            let _ = sender.send(completion);
        });
        let (id, transmit) = lock(&self.manager).submit(query, callback)?;
        let _guard = CancelOnDrop { inner: self, id };
        self.transmit(transmit);
        match receiver.await {
            Ok(Completion::Answered(exchange)) => Ok(exchange),
            Ok(Completion::TimedOut) => Err(Error::Timeout),
            Ok(Completion::Failed(e)) => Err(e.into()),
            Ok(Completion::Cancelled) | Err(_) => Err(Error::Cancelled),
        }
    }

    /// Carries out a step requested by the manager.
    fn apply(self: &Arc<Self>, step: Step) {
        match step {
            Step::Transmit(transmit) => self.transmit(transmit),
            Step::Deliver(delivery) => delivery.deliver(),
        }
    }

    /// Sends a query in the background and reports the result (or the
    /// lack of one) back to the manager.
    fn transmit(self: &Arc<Self>, transmit: Transmit) {
        let inner = self.clone();
        self.handle.spawn(async move {
            let Transmit {
                id,
                attempt,
                upstream,
                mode,
                octets,
            } = transmit;
            let timeout = inner.config.timeout;

            let step = match mode {
                Mode::Udp => {
                    let sent = inner.udp.send(&octets, upstream).await;
                    if let Err(e) = sent {
                        warn!("transaction {id}: failed to send to {upstream}: {e}");
                        lock(&inner.manager).handle_transport_error(id, attempt, e)
                    } else {
                        // Don't keep the context alive while waiting.
                        let weak = Arc::downgrade(&inner);
                        drop(inner);
                        time::sleep(timeout).await;
                        let inner = match weak.upgrade() {
                            Some(inner) => inner,
                            None => return,
                        };
                        let step = lock(&inner.manager).handle_timeout(id, attempt);
                        if let Some(step) = step {
                            inner.apply(step);
                        }
                        return;
                    }
                }
                Mode::Tcp => match time::timeout(timeout, tcp::exchange(upstream, &octets)).await {
                    Ok(Ok(response)) => {
                        let mut manager = lock(&inner.manager);
                        let received = Received {
                            source: upstream,
                            mode: Mode::Tcp,
                            octets: response,
                            truncated: false,
                        };
                        // Nothing else will arrive on this connection, so
                        // an unusable response counts as a timeout.
                        manager
                            .handle_response(received)
                            .or_else(|| manager.handle_timeout(id, attempt))
                    }
                    Ok(Err(e)) => {
                        warn!("transaction {id}: TCP exchange with {upstream} failed: {e}");
                        lock(&inner.manager).handle_transport_error(id, attempt, e)
                    }
                    Err(_) => lock(&inner.manager).handle_timeout(id, attempt),
                },
            };
            if let Some(step) = step {
                inner.apply(step);
            }
        });
    }
}

/// Cancels a transaction when dropped. Cancelling a transaction that
/// already ended does nothing.
struct CancelOnDrop<'a> {
    inner: &'a Inner,
    id: TransactionId,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        let cancelled = lock(&self.inner.manager).cancel(self.id);
        if let Ok(Some(delivery)) = cancelled {
            delivery.deliver();
        }
    }
}

/// Returns the records of a reply that validation applies to: the
/// answers, or the authority section of a negative reply.
fn records_to_validate(message: &Message) -> Vec<Record> {
    if message.answers.is_empty() {
        message.authorities.clone()
    } else {
        message.answers.clone()
    }
}

/// Returns the distinct signer names of the RRSIG records in `records`.
fn signers(records: &[Record]) -> Vec<Name> {
    let mut signers: Vec<Name> = Vec::new();
    for record in records.iter().filter(|r| r.rr_type == Type::RRSIG) {
        if let Some(signer) = record.rdata.get(7).and_then(Field::as_name) {
            if !signers.contains(signer) {
                signers.push(signer.clone());
            }
        }
    }
    signers
}
