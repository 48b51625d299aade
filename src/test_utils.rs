use std::{
    io::{self, Cursor, ErrorKind, Read},
    iter::{self, Chain, Repeat},
    net::SocketAddr,
    thread,
};

use crate::{
    controller::{Controller, Endpoint},
    request::{Request, RequestReader},
    router::{matcher::Route, pattern::Pattern},
    server::{Handler, Server},
};

pub fn read_request(raw: &str) -> Request {
    RequestReader::new(Cursor::new(raw.to_owned()), 1024 * 1024)
        .read()
        .unwrap()
}

/// A controller that keeps every default.
#[derive(Default)]
pub struct Noop;

impl Controller for Noop {}

pub fn route(pattern: &str, mappings: &[&str]) -> Route {
    Route {
        pattern: Pattern::compile(pattern).unwrap(),
        endpoint: Endpoint::new::<Noop>(mappings).unwrap(),
    }
}

/// Serves `handler` on an ephemeral port from a background thread.
pub fn spawn_server(handler: impl Handler + Send + Sync + 'static) -> SocketAddr {
    let server = Server::bind("localhost:0").unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.run(handler));
    addr
}

/// Blocking client that neither follows redirects nor asks for compression.
pub fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
// ErrReader
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

/// Yields `prefix` one byte at a time, then fails.
pub struct ErrReader<I> {
    it: I,
}

impl<I> ErrReader<I> {
    pub fn new(prefix: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            it: prefix.into_iter(),
        }
    }
}

impl<'a, I: Iterator<Item = &'a u8>> Read for ErrReader<I> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(byte) = self.it.next() {
            buf[0] = *byte;
            return Ok(1);
        }
        Err(io::Error::new(ErrorKind::ConnectionReset, "connection reset"))
    }
}

// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
// InfReader
// - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

/// Yields `prefix`, then `repeat` forever.
pub struct InfReader {
    it: Chain<std::vec::IntoIter<u8>, Repeat<u8>>,
}

impl InfReader {
    pub fn new<'a, I: Iterator<Item = &'a u8>>(
        prefix: impl IntoIterator<IntoIter = I>,
        repeat: u8,
    ) -> Self {
        let prefix: Vec<u8> = prefix.into_iter().copied().collect();
        Self {
            it: prefix.into_iter().chain(iter::repeat(repeat)),
        }
    }
}

impl Read for InfReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data: Vec<_> = self.it.by_ref().take(buf.len()).collect();
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}
