// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UDP transport to one (host, port) endpoint.
//!
//! Knows only "send one datagram, receive one datagram, match reply to
//! request" — fragmentation is the accessors' job. Calls inside one process
//! are serialized on a mutex (single-flight); each attempt gets its own
//! receive-timeout window, with a bounded number of retries on timeout or a
//! malformed reply.

use std::net::UdpSocket;
use std::thread;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{TransportError, TransportErrorKind};
use crate::transport::packet::{Reply, Request};

/// Capability every register/wave-RAM accessor builds on: send one request,
/// get back the matching reply. Implemented by [`UdpTransport`] for real
/// hardware and by in-memory fakes in tests.
pub trait Transport: Send + Sync {
    fn write_request(&self, request: &Request) -> Result<Reply, TransportError>;

    /// (host, port) this transport targets, used for error messages.
    fn endpoint(&self) -> (String, u16);
}

/// One instance per (host, port). Owns a connected UDP socket; every call
/// serializes on `send_lock` so concurrent callers never interleave a
/// request with another caller's reply.
pub struct UdpTransport {
    socket: UdpSocket,
    host: String,
    port: u16,
    config: Config,
    send_lock: Mutex<()>,
}

impl UdpTransport {
    pub fn connect(host: &str, port: u16, config: Config) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect((host, port))?;
        socket.set_read_timeout(Some(config.timeout))?;
        Ok(Self {
            socket,
            host: host.to_string(),
            port,
            config,
            send_lock: Mutex::new(()),
        })
    }

    fn attempt(&self, request: &Request) -> Result<Reply, TransportErrorKind> {
        let encoded = request.encode();
        self.socket
            .send(&encoded)
            .map_err(|_| TransportErrorKind::Refused)?;

        let mut buf = vec![0u8; 12 + self.config.mtu];
        let n = match self.socket.recv(&mut buf) {
            Ok(n) => n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Err(TransportErrorKind::Timeout)
            }
            Err(_) => return Err(TransportErrorKind::Refused),
        };

        let reply =
            Reply::decode(&buf[..n], request.width).map_err(|_| TransportErrorKind::Malformed)?;
        if !reply.matches(request) {
            return Err(TransportErrorKind::Malformed);
        }
        Ok(reply)
    }
}

impl Transport for UdpTransport {
    fn write_request(&self, request: &Request) -> Result<Reply, TransportError> {
        let _guard = self.send_lock.lock();

        let mut attempts = 0u32;
        let max_attempts = self.config.retries + 1;
        loop {
            attempts += 1;
            match self.attempt(request) {
                Ok(reply) => return Ok(reply),
                Err(kind) => {
                    log::debug!(
                        "[udp] attempt {attempts}/{max_attempts} to {}:{} failed: {kind:?}",
                        self.host,
                        self.port
                    );
                    if attempts >= max_attempts {
                        return Err(TransportError {
                            kind,
                            endpoint: (self.host.clone(), self.port),
                            attempts,
                            source: None,
                        });
                    }
                    thread::sleep(self.config.backoff);
                }
            }
        }
    }

    fn endpoint(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::packet::{AddressWidth, Command};
    use std::net::UdpSocket as StdUdpSocket;
    use std::time::Duration;

    /// A minimal echo server that answers every request with a reply
    /// echoing the same header and payload, used to exercise the real
    /// retry/timeout path end to end (not just the in-memory fake).
    fn spawn_echo_server() -> (u16, std::sync::mpsc::Sender<()>) {
        let server = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        server
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let port = server.local_addr().unwrap().port();
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0u8; 1500];
            loop {
                if rx.try_recv().is_ok() {
                    return;
                }
                if let Ok((n, from)) = server.recv_from(&mut buf) {
                    if let Ok(req) = Reply::decode(&buf[..n], AddressWidth::Narrow) {
                        let reply = Request {
                            command: req.command,
                            address: req.address,
                            width: AddressWidth::Narrow,
                            length_units: req.length_units,
                            payload: req.payload,
                        };
                        let _ = server.send_to(&reply.encode(), from);
                    }
                }
            }
        });
        (port, tx)
    }

    #[test]
    fn single_round_trip_over_real_socket() {
        let (port, stop) = spawn_echo_server();
        let config = Config {
            timeout: Duration::from_millis(200),
            ..Config::default()
        };
        let transport = UdpTransport::connect("127.0.0.1", port, config).unwrap();
        let req = Request::write(AddressWidth::Narrow, 0x10, vec![9, 9], 1);
        let reply = transport.write_request(&req).unwrap();
        assert_eq!(reply.command, Command::Write);
        assert_eq!(reply.payload, vec![9, 9]);
        let _ = stop.send(());
    }

    #[test]
    fn exhausted_retries_surface_timeout() {
        // Nobody is listening on this port, so every attempt times out.
        let unused = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        let port = unused.local_addr().unwrap().port();
        drop(unused);
        let config = Config {
            timeout: Duration::from_millis(20),
            retries: 1,
            backoff: Duration::from_millis(1),
            ..Config::default()
        };
        let transport = UdpTransport::connect("127.0.0.1", port, config).unwrap();
        let req = Request::read(AddressWidth::Narrow, 0x0, 1);
        let err = transport.write_request(&req).unwrap_err();
        assert_eq!(err.attempts, 2);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory register model standing in for the UDP wire; test doubles
    //! implement the same capability over an in-memory register model.
    use super::*;
    use crate::transport::packet::Command;
    use std::collections::BTreeMap;

    pub struct FakeTransport {
        pub memory: Mutex<BTreeMap<u64, u8>>,
        pub fail_next: Mutex<u32>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self {
                memory: Mutex::new(BTreeMap::new()),
                fail_next: Mutex::new(0),
            }
        }

        pub fn read_bytes(&self, address: u64, len: usize) -> Vec<u8> {
            let mem = self.memory.lock();
            (0..len)
                .map(|i| *mem.get(&(address + i as u64)).unwrap_or(&0))
                .collect()
        }
    }

    impl Transport for FakeTransport {
        fn write_request(&self, request: &Request) -> Result<Reply, TransportError> {
            {
                let mut fail_next = self.fail_next.lock();
                if *fail_next > 0 {
                    *fail_next -= 1;
                    return Err(TransportError {
                        kind: TransportErrorKind::Timeout,
                        endpoint: self.endpoint(),
                        attempts: 1,
                        source: None,
                    });
                }
            }
            let mut mem = self.memory.lock();
            match request.command {
                Command::Write => {
                    for (i, byte) in request.payload.iter().enumerate() {
                        mem.insert(request.address + i as u64, *byte);
                    }
                    Ok(Reply {
                        command: Command::Write,
                        address: request.address,
                        length_units: request.length_units,
                        payload: Vec::new(),
                    })
                }
                Command::Read => {
                    let len = request.length_units as usize;
                    let payload = (0..len)
                        .map(|i| *mem.get(&(request.address + i as u64)).unwrap_or(&0))
                        .collect();
                    Ok(Reply {
                        command: Command::Read,
                        address: request.address,
                        length_units: request.length_units,
                        payload,
                    })
                }
            }
        }

        fn endpoint(&self) -> (String, u16) {
            ("fake".to_string(), 0)
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        use crate::transport::packet::AddressWidth;
        let t = FakeTransport::new();
        let w = Request::write(AddressWidth::Narrow, 0x100, vec![1, 2, 3, 4], 1);
        t.write_request(&w).unwrap();
        let r = Request::read(AddressWidth::Narrow, 0x100, 4);
        let reply = t.write_request(&r).unwrap();
        assert_eq!(reply.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn retries_are_exhausted_as_timeout() {
        use crate::transport::packet::AddressWidth;
        let t = FakeTransport::new();
        *t.fail_next.lock() = 1;
        let r = Request::read(AddressWidth::Narrow, 0x0, 4);
        // single failed attempt surfaces directly from the fake (no retry loop here —
        // retry/backoff is UdpTransport's responsibility, exercised above against a
        // real loopback socket).
        assert!(t.write_request(&r).is_err());
    }
}
