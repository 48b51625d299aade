use std::{collections::HashMap, io::Read, net::SocketAddr};

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::{
    form::{self, UploadedFile},
    headers::Headers,
    multi_map::MultiMap,
    stream_reader::StreamReader,
};

pub use crate::stream_reader::EndOfFile;

#[derive(Debug)]
pub struct Request {
    http_method: String,
    request_target: String,
    http_version: String,
    path: String,
    headers: Headers,
    query: MultiMap<String, String>,
    form: MultiMap<String, String>,
    params: HashMap<String, String>,
    files: Vec<UploadedFile>,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    pub fn new(
        http_method: impl Into<String>,
        request_target: impl Into<String>,
        http_version: impl Into<String>,
        headers: Headers,
        body: Bytes,
    ) -> Self {
        let request_target = request_target.into();
        let (raw_path, raw_query) = request_target
            .split_once('?')
            .unwrap_or((request_target.as_str(), ""));

        let path = match urlencoding::decode(raw_path) {
            Ok(path) => path.into_owned(),
            Err(_) => raw_path.to_owned(),
        };
        let mut query = MultiMap::new_empty();
        form::parse_urlencoded(raw_query, &mut query);

        Self {
            http_method: http_method.into(),
            http_version: http_version.into(),
            path,
            request_target,
            headers,
            query,
            form: MultiMap::new_empty(),
            params: HashMap::new(),
            files: vec![],
            body,
            remote_addr: None,
        }
    }

    pub fn get_http_method(&self) -> &str {
        &self.http_method
    }

    pub fn get_request_target(&self) -> &str {
        &self.request_target
    }

    pub fn get_http_version(&self) -> &str {
        &self.http_version
    }

    /// Percent-decoded path without the query string.
    pub fn get_path(&self) -> &str {
        &self.path
    }

    pub fn get_headers(&self) -> &Headers {
        &self.headers
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get_first(key)
    }

    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.headers.get_cookie(name)
    }

    /// The buffered body; cloning it is cheap, so it can be read any number
    /// of times.
    pub fn get_body(&self) -> &Bytes {
        &self.body
    }

    pub fn get_query(&self) -> &MultiMap<String, String> {
        &self.query
    }

    pub fn get_form(&self) -> &MultiMap<String, String> {
        &self.form
    }

    pub fn get_files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// Looks a field up among the route parameters, then in the parsed body,
    /// then in the query string.
    pub fn input(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .or_else(|| self.form.get_first(key))
            .or_else(|| self.query.get_first(key))
            .map(|s| s.as_str())
    }

    /// Every value of a field, body values before query values. A route
    /// parameter stands alone.
    pub fn inputs(&self, key: &str) -> Vec<&str> {
        if let Some(param) = self.params.get(key) {
            return vec![param.as_str()];
        }
        let form = self.form.get_value_iter(key).into_iter().flatten();
        let query = self.query.get_value_iter(key).into_iter().flatten();
        form.chain(query).map(|s| s.as_str()).collect()
    }

    /// Publishes a route parameter. It shadows any value the client sent
    /// under the same name, in the body or in the query string.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.query.replace(key.clone(), value.clone());
        self.params.insert(key, value);
    }

    pub fn get_remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    /// Client address, preferring the first `X-Forwarded-For` hop.
    pub fn get_client_ip(&self) -> Option<String> {
        let forwarded = self
            .get_header("x-forwarded-for")
            .and_then(|hops| hops.split(',').next())
            .map(|hop| hop.trim().to_owned())
            .filter(|hop| !hop.is_empty());
        forwarded.or_else(|| self.remote_addr.map(|addr| addr.ip().to_string()))
    }

    pub fn is_ajax(&self) -> bool {
        self.get_header("x-requested-with") == Some("XMLHttpRequest")
    }

    /// Parses the buffered body as urlencoded or multipart form data,
    /// depending on `Content-Type`. Other bodies are left untouched.
    pub fn parse_form(&mut self) -> Result<(), form::FormError> {
        let content_type = self.headers.get_content_type().unwrap_or_default().to_owned();
        if content_type.contains("multipart/form-data") {
            let (form, files) = (&mut self.form, &mut self.files);
            return form::parse_multipart(&self.body, &content_type, form, files);
        }
        if content_type.is_empty() || content_type.contains("application/x-www-form-urlencoded") {
            let body = String::from_utf8_lossy(&self.body).into_owned();
            form::parse_urlencoded(&body, &mut self.form);
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
#[error("invalid request")]
pub struct InvalidRequest;

#[derive(Error, Debug)]
#[error("request body of {length} bytes exceeds the limit of {limit}")]
pub struct BodyTooLarge {
    pub length: usize,
    pub limit: u64,
}

const REQUEST_LINE_LIMIT: u64 = 8 * 1024;
const HEADERS_LIMIT: u64 = 16 * 1024;

pub struct RequestReader<R> {
    stream_reader: StreamReader<R>,
    max_body: u64,
}

impl<R: Read> RequestReader<R> {
    pub fn new(r: R, max_body: u64) -> Self {
        Self {
            stream_reader: StreamReader::new(r),
            max_body,
        }
    }

    pub fn read(&mut self) -> anyhow::Result<Request> {
        let mut request_line = String::new();
        self.stream_reader.set_limit(REQUEST_LINE_LIMIT);
        self.stream_reader.read_line(&mut request_line)?;
        let request_line = request_line.strip_suffix("\r\n").ok_or(InvalidRequest)?;

        let mut parts = request_line.split(' ');
        let (Some(http_method), Some(request_target), Some(http_version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(InvalidRequest.into());
        };
        if !request_target.starts_with('/') {
            Err(InvalidRequest)?
        }

        info!(?request_line);

        let mut headers = Headers::new_empty();
        self.stream_reader.set_limit(HEADERS_LIMIT);
        loop {
            let mut line = String::new();
            self.stream_reader.read_line(&mut line).map_err(|err| {
                if err.is::<EndOfFile>() {
                    InvalidRequest.into()
                } else {
                    err
                }
            })?;
            let line = line.strip_suffix("\r\n").ok_or(InvalidRequest)?;

            if line.is_empty() {
                break;
            }
            let (k, v) = line.split_once(':').ok_or(InvalidRequest)?;
            headers.insert(k.trim(), v.trim());
        }

        let length = headers.get_content_length().map_err(|_| InvalidRequest)?;
        let body = match length {
            Some(length) if length as u64 > self.max_body => {
                return Err(BodyTooLarge {
                    length,
                    limit: self.max_body,
                }
                .into())
            }
            Some(length) if length > 0 => self.stream_reader.read_body(length)?,
            _ => Bytes::new(),
        };

        Ok(Request::new(
            http_method,
            request_target,
            http_version,
            headers,
            body,
        ))
    }
}
