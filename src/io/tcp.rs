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

//! DNS over TCP ([RFC 1035 § 4.2.2], [RFC 7766]).
//!
//! [RFC 1035 § 4.2.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.2.2
//! [RFC 7766]: https://datatracker.ietf.org/doc/html/rfc7766

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::TransportError;

/// Opens a connection to `upstream`, sends `query`, and returns the
/// first message the upstream sends back.
///
/// No timeout is applied here; callers wrap the future in
/// [`tokio::time::timeout`].
pub async fn exchange(upstream: SocketAddr, query: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut socket = TcpStream::connect(upstream).await?;
    socket.set_nodelay(true)?;
    exchange_over(&mut socket, query).await
}

/// Writes `query` with its length prefix to an established stream and
/// reads one message back.
async fn exchange_over<S>(socket: &mut S, query: &[u8]) -> Result<Vec<u8>, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let len = u16::try_from(query.len())
        .or(Err(TransportError::Other(io::ErrorKind::InvalidInput)))?;
    let mut framed = Vec::with_capacity(2 + query.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(query);
    socket.write_all(&framed).await?;

    let mut buf = vec![0; 2 + u16::MAX as usize];
    let mut n_read = 0;
    match read_message_over_tcp(socket, &mut buf, &mut n_read).await? {
        Some(len) => Ok(buf[2..2 + len].to_vec()),
        None => Err(TransportError::Closed),
    }
}

/// Reads a single DNS message (including the initial two-octet length
/// field) from a stream.
///
/// This function assumes that `*n_read` octets have already been read
/// into the buffer, and updates `*n_read` as it reads more. It may read
/// past the end of the message. The returned `usize` (if any) is the
/// size of the message itself, without the length field.
///
/// `Ok(None)` means that the peer closed the connection before a whole
/// message arrived.
async fn read_message_over_tcp<S>(
    socket: &mut S,
    buf: &mut [u8],
    n_read: &mut usize,
) -> io::Result<Option<usize>>
where
    S: AsyncRead + Unpin,
{
    let mut message_len = None;
    loop {
        if let Some(len) = message_len {
            if *n_read >= len + 2 {
                return Ok(Some(len));
            }
        } else if *n_read >= 2 {
            let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
            if *n_read >= len + 2 {
                return Ok(Some(len));
            }
            message_len = Some(len);
        }

        let n_read_this_time = socket.read(&mut buf[*n_read..]).await?;
        if n_read_this_time == 0 {
            return Ok(None);
        }
        *n_read += n_read_this_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_message_split_across_writes() {
        let (mut client, mut server) = duplex(64);
        tokio::spawn(async move {
            server.write_all(&[0, 5, b'h', b'e']).await.unwrap();
            tokio::task::yield_now().await;
            server.write_all(b"llo").await.unwrap();
        });
        let mut buf = vec![0; 64];
        let mut n_read = 0;
        let len = read_message_over_tcp(&mut client, &mut buf, &mut n_read)
            .await
            .unwrap();
        assert_eq!(len, Some(5));
        assert_eq!(&buf[2..7], b"hello");
    }

    #[tokio::test]
    async fn early_close_is_reported() {
        let (mut client, mut server) = duplex(64);
        server.write_all(&[0, 10, 1, 2]).await.unwrap();
        drop(server);
        let mut buf = vec![0; 64];
        let mut n_read = 0;
        let result = read_message_over_tcp(&mut client, &mut buf, &mut n_read).await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn exchange_frames_query_and_reply() {
        let (mut client, mut server) = duplex(1024);
        let responder = tokio::spawn(async move {
            let mut buf = vec![0; 1024];
            let mut n_read = 0;
            let len = read_message_over_tcp(&mut server, &mut buf, &mut n_read)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&buf[2..2 + len], b"query");
            server.write_all(&[0, 5]).await.unwrap();
            server.write_all(b"reply").await.unwrap();
        });
        let reply = exchange_over(&mut client, b"query").await.unwrap();
        assert_eq!(reply, b"reply");
        responder.await.unwrap();
    }
}
