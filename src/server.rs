use std::{
    io::{self, Write},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    thread,
    time::Duration,
};

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{error, info, span, Level, Span};

use crate::{
    request::{BodyTooLarge, EndOfFile, Request, RequestReader},
    response_writer::ResponseWriter,
    status_code_registry::ReasonPhrase,
};

/// Methods the dispatcher accepts. Requests with any other method are
/// answered with 405.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Conventional action name, e.g. `Get` for `get`.
    pub fn title(&self) -> &'static str {
        match self {
            HttpMethod::Get => "Get",
            HttpMethod::Post => "Post",
            HttpMethod::Put => "Put",
            HttpMethod::Delete => "Delete",
            HttpMethod::Patch => "Patch",
            HttpMethod::Options => "Options",
            HttpMethod::Head => "Head",
        }
    }
}

const DEFAULT_MAX_BODY: u64 = 64 * 1024 * 1024;

#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    read_timeout: Option<Duration>,
    max_body: u64,
}

impl Server {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr)?,
            read_timeout: Some(Duration::from_secs(10)),
            max_body: DEFAULT_MAX_BODY,
        })
    }

    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_max_body(mut self, max_body: u64) -> Self {
        self.max_body = max_body;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one scoped thread per connection.
    pub fn run(&self, handler: impl Handler + Sync) {
        let handler = &handler;
        thread::scope(|s| {
            for stream in self.listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(err) => {
                        error!(?err);
                        continue;
                    }
                };

                s.spawn(move || {
                    let span = create_conn_span(&stream);
                    let _guard = span.enter();
                    info!("new conn");

                    if let Err(err) =
                        handle_connection(stream, self.read_timeout, self.max_body, handler)
                    {
                        error!(?err);
                    }

                    info!("conn end");
                });
            }
        });
    }
}

#[derive(Debug)]
enum ConnCtrl {
    KeepAlive,
    Close,
}

fn handle_connection(
    stream: TcpStream,
    read_timeout: Option<Duration>,
    max_body: u64,
    handler: &impl Handler,
) -> anyhow::Result<()> {
    let (reader, writer) = (&stream, &stream);
    reader.set_read_timeout(read_timeout)?;
    let peer_addr = stream.peer_addr().ok();
    let mut request_reader = RequestReader::new(reader, max_body);

    loop {
        match handle_request(&mut request_reader, writer, peer_addr, handler)? {
            ConnCtrl::KeepAlive => continue,
            ConnCtrl::Close => return Ok(()),
        }
    }
}

fn handle_request(
    request_reader: &mut RequestReader<&TcpStream>,
    mut writer: &TcpStream,
    peer_addr: Option<SocketAddr>,
    handler: &impl Handler,
) -> anyhow::Result<ConnCtrl> {
    let mut r = match request_reader.read() {
        Ok(r) => r,
        Err(err) => {
            if err.downcast_ref::<EndOfFile>().is_some() {
                return Ok(ConnCtrl::Close);
            }

            error!(?err);
            let mut w = ResponseWriter::new_empty();
            if err.downcast_ref::<BodyTooLarge>().is_some() {
                w.set_reason_phrase(ReasonPhrase::ContentTooLarge);
            } else {
                w.set_reason_phrase(ReasonPhrase::BadRequest);
            }
            w.set_header("Connection", "close");
            writer.write_all(&w.write(false))?;
            return Ok(ConnCtrl::Close);
        }
    };
    if let Some(peer_addr) = peer_addr {
        r.set_remote_addr(peer_addr);
    }

    let span = create_req_span(&r);
    let _guard = span.enter();

    let conn_ctrl = match r
        .get_headers()
        .get_connection()
        .map(|mut it| it.any(|val| val.eq_ignore_ascii_case("close")))
    {
        Some(true) => ConnCtrl::Close,
        _ if r.get_http_version() == "HTTP/1.0" => ConnCtrl::Close,
        _ => ConnCtrl::KeepAlive,
    };

    let head_only = r.get_http_method().eq_ignore_ascii_case("head");
    let mut w = ResponseWriter::new_empty();
    handler.handle(&mut w, &mut r);
    info!(status = w.get_status_code().unwrap_or(200), "handled");
    writer.write_all(&w.write(head_only))?;
    Ok(conn_ctrl)
}

fn create_conn_span(stream: &TcpStream) -> Span {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => &addr.to_string(),
        Err(err) => {
            error!(?err);
            "unknown"
        }
    };

    span!(Level::INFO, "conn", peer_addr)
}

fn create_req_span(r: &Request) -> Span {
    let http_method = r.get_http_method();
    let request_target = r.get_request_target();
    span!(
        Level::INFO,
        "req",
        method = http_method,
        target = request_target
    )
}

/// Anything that can turn a request into a response: the dispatcher itself,
/// error pages, and middleware wrapping either.
pub trait Handler {
    fn handle(&self, w: &mut ResponseWriter, r: &mut Request);
}

impl<T> Handler for T
where
    T: Fn(&mut ResponseWriter, &mut Request),
{
    fn handle(&self, w: &mut ResponseWriter, r: &mut Request) {
        self(w, r)
    }
}

#[cfg(test)]
pub mod tests {
    use std::{
        io::{BufReader, Read, Write},
        net::{TcpListener, TcpStream},
        str::FromStr,
        thread,
        time::Duration,
    };

    use crate::{
        request::Request,
        response_writer::ResponseWriter,
        status_code_registry::ReasonPhrase,
        test_utils::{client, spawn_server},
    };

    use super::{handle_connection, HttpMethod};

    fn ok_handler(w: &mut ResponseWriter, _: &mut Request) {
        w.set_reason_phrase(ReasonPhrase::OK);
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::from_str("GET").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::from_str("options").unwrap(), HttpMethod::Options);
        assert!(HttpMethod::from_str("TRACE").is_err());
        assert_eq!(HttpMethod::Delete.to_string(), "delete");
        assert_eq!(HttpMethod::Delete.title(), "Delete");
    }

    #[test]
    fn test_request_reader_timeout() {
        let timeout = Some(Duration::from_millis(100));

        let listener = TcpListener::bind("localhost:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, timeout, 1024, &ok_handler)
        });

        let _client_handle = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"GET / HTTP/1.1\r\n").unwrap();
            thread::sleep(Duration::from_secs(5));
        });

        server_handle.join().unwrap().unwrap_err();
    }

    #[test]
    fn test_persistent_connection() {
        let timeout = Some(Duration::from_millis(100));
        let addr = spawn_server(ok_handler);

        let stream = TcpStream::connect(addr).unwrap();
        let (r, mut writer) = (&stream, &stream);
        r.set_read_timeout(timeout).unwrap();
        let mut reader = BufReader::new(r);

        writer.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();

        // Read to end tries to read until EOF but cannot do so
        // because the connection is not closed.
        // Instead, the timeout expires and an error is returned.
        let mut buf = vec![];
        let res = reader.read_to_end(&mut buf);
        res.unwrap_err();
        assert!(String::from_utf8_lossy(&buf).starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_bad_request() {
        let addr = spawn_server(ok_handler);

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"GET /\r\n\r\n").unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        assert!(buf.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_head_has_no_body() {
        let addr = spawn_server(|w: &mut ResponseWriter, _: &mut Request| {
            w.set_body_str("hello");
        });

        let resp = client().head(format!("http://{}/", addr)).send().unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers().get("content-length").unwrap(), "5");
        assert_eq!(resp.text().unwrap(), "");
    }
}
