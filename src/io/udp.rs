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

//! Implementation of the [`UdpTransport`].

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::TransportError;

/// A datagram received from the network.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Datagram {
    pub source: SocketAddr,
    pub octets: Vec<u8>,
    /// Whether the datagram was larger than the receive buffer (and was
    /// therefore cut short).
    pub truncated: bool,
}

type Sink = Arc<dyn Fn(Datagram) + Send + Sync>;

/// Shared UDP sockets for sending queries and receiving responses.
///
/// One socket is bound per address family, on an ephemeral port. A
/// receiver task per socket hands every datagram that arrives to the
/// sink given to [`UdpTransport::start`]; it is up to the sink to decide
/// whether the datagram answers anything. The receiver tasks are aborted
/// when the `UdpTransport` is dropped.
pub struct UdpTransport {
    v4: Option<Arc<UdpSocket>>,
    v6: Option<Arc<UdpSocket>>,
    receivers: Vec<JoinHandle<()>>,
}

/// How long a receiver waits after an I/O error before receiving
/// again. This keeps a persistently failing socket from using up
/// significant CPU time.
const RECEIVE_ERROR_DELAY: Duration = Duration::from_millis(100);

impl UdpTransport {
    /// Binds the sockets and starts the receivers on `handle`.
    ///
    /// The receive buffer holds `payload_size + 1` octets, so that a
    /// datagram exceeding the advertised EDNS payload size is detected
    /// and flagged as truncated. It is an error only if neither address
    /// family can be bound.
    pub fn start<F>(handle: &Handle, payload_size: u16, sink: F) -> io::Result<Self>
    where
        F: Fn(Datagram) + Send + Sync + 'static,
    {
        let _guard = handle.enter();
        let (v4, v6) = match (
            bind((Ipv4Addr::UNSPECIFIED, 0).into()),
            bind((Ipv6Addr::UNSPECIFIED, 0).into()),
        ) {
            (Err(e), Err(_)) => return Err(e),
            (v4, v6) => {
                if let Err(ref e) = v6 {
                    debug!("IPv6 UDP socket unavailable: {e}");
                }
                if let Err(ref e) = v4 {
                    debug!("IPv4 UDP socket unavailable: {e}");
                }
                (v4.ok().map(Arc::new), v6.ok().map(Arc::new))
            }
        };

        let sink: Sink = Arc::new(sink);
        let receivers = v4
            .iter()
            .chain(v6.iter())
            .map(|socket| {
                handle.spawn(run_udp_receiver(
                    socket.clone(),
                    payload_size as usize,
                    sink.clone(),
                ))
            })
            .collect();

        Ok(Self { v4, v6, receivers })
    }

    /// Sends `octets` to `upstream` from the socket of the matching
    /// address family.
    pub async fn send(&self, octets: &[u8], upstream: SocketAddr) -> Result<(), TransportError> {
        let socket = match upstream {
            SocketAddr::V4(_) => self.v4.as_ref(),
            SocketAddr::V6(_) => self.v6.as_ref(),
        };
        let socket = socket.ok_or(TransportError::Unreachable)?;
        socket.send_to(octets, upstream).await?;
        Ok(())
    }

    /// Returns the local addresses of the bound sockets.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.v4
            .iter()
            .chain(self.v6.iter())
            .filter_map(|socket| socket.local_addr().ok())
            .collect()
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        for receiver in &self.receivers {
            receiver.abort();
        }
    }
}

fn bind(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = std::net::UdpSocket::bind(addr)?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket)
}

/// The UDP receiver loop.
async fn run_udp_receiver(socket: Arc<UdpSocket>, payload_size: usize, sink: Sink) {
    let mut buf = vec![0; payload_size + 1];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, source)) => sink(Datagram {
                source,
                octets: buf[..len.min(payload_size)].to_vec(),
                truncated: len > payload_size,
            }),
            Err(e) => {
                error!("I/O error: {e}");
                tokio::time::sleep(RECEIVE_ERROR_DELAY).await;
            }
        }
    }
}
