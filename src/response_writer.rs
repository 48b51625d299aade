use crate::{
    server::HttpMethod,
    status_code_registry::{self, ReasonPhrase},
};

/// A `Set-Cookie` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: Option<i64>,
    path: Option<String>,
    http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            path: None,
            http_only: false,
        }
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    fn sanitize(s: &str) -> String {
        s.chars()
            .filter(|c| !matches!(c, '\r' | '\n' | ';'))
            .collect()
    }

    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", Self::sanitize(&self.name), Self::sanitize(&self.value));
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        if let Some(path) = &self.path {
            out.push_str(&format!("; Path={}", Self::sanitize(path)));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

/// Buffered response. It counts as started as soon as a status or any body
/// bytes have been written; the dispatcher relies on that flag to skip later
/// stages.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status_code: Option<u16>,
    reason_phrase: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.status_code.is_some() || !self.body.is_empty()
    }

    pub fn get_status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn set_status_code(&mut self, status_code: u16) {
        self.status_code = Some(status_code);
        self.reason_phrase =
            status_code_registry::get_reason_phrase(status_code).map(|r| r.to_string());
    }

    pub fn set_reason_phrase(&mut self, reason_phrase: ReasonPhrase) {
        self.status_code = Some(status_code_registry::get_status_code(reason_phrase));
        self.reason_phrase = Some(reason_phrase.to_string());
    }

    pub fn set_status_line(&mut self, status_code: u16, reason_phrase: String) {
        self.status_code = Some(status_code);
        self.reason_phrase = Some(reason_phrase);
    }

    /// Sets a header, replacing an existing one of the same name.
    pub fn set_header(&mut self, k: &str, v: impl Into<String>) {
        let v = v.into();
        if let Some(entry) = self
            .headers
            .iter_mut()
            .find(|entry| entry.0.eq_ignore_ascii_case(k))
        {
            entry.1 = v;
        } else {
            self.headers.push((k.to_owned(), v));
        }
    }

    /// Adds a header line even if one of the same name exists.
    pub fn append_header(&mut self, k: &str, v: impl Into<String>) {
        self.headers.push((k.to_owned(), v.into()));
    }

    pub fn get_header(&self, k: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|entry| entry.0.eq_ignore_ascii_case(k))
            .map(|(_, v)| v.as_str())
    }

    pub fn add_allow_header(&mut self, http_methods: impl IntoIterator<Item = HttpMethod>) {
        let http_methods = http_methods
            .into_iter()
            .map(|m| m.to_string().to_uppercase())
            .collect::<Vec<_>>()
            .join(", ");
        self.set_header("Allow", http_methods);
    }

    pub fn get_content_type_header(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    pub fn add_content_encoding_header(&mut self, content_encoding: &str) {
        self.set_header("Content-Encoding", content_encoding);
    }

    pub fn set_cookie(&mut self, cookie: &Cookie) {
        self.append_header("Set-Cookie", cookie.header_value());
    }

    pub fn get_body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: Vec<u8>, content_type: &str) {
        self.body = body;
        self.set_header("Content-Type", content_type);
    }

    pub fn set_body_str(&mut self, body: &str) {
        self.set_body(body.bytes().collect(), "text/plain; charset=utf-8");
    }

    pub fn set_html(&mut self, body: impl Into<String>) {
        self.set_body(body.into().into_bytes(), "text/html; charset=utf-8");
    }

    /// Appends to the body, like successive writes to a stream.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.get_content_type_header().is_none() {
            self.set_header("Content-Type", "text/plain; charset=utf-8");
        }
        self.body.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    pub fn redirect(&mut self, location: &str, reason_phrase: ReasonPhrase) {
        self.set_reason_phrase(reason_phrase);
        self.set_header("Location", location);
    }

    /// Forgets status and body so an error page can take over. Headers set
    /// so far, such as cookies, are kept.
    pub fn reset(&mut self) {
        self.status_code = None;
        self.reason_phrase = None;
        self.body.clear();
        self.headers.retain(|(k, _)| {
            !k.eq_ignore_ascii_case("content-type") && !k.eq_ignore_ascii_case("location")
        });
    }

    /// Serializes the response. A response nobody wrote to becomes an empty
    /// 200. `head_only` keeps `Content-Length` but drops the body.
    pub fn write(mut self, head_only: bool) -> Vec<u8> {
        let status_code = *self
            .status_code
            .get_or_insert(status_code_registry::get_status_code(ReasonPhrase::OK));
        let reason_phrase = self.reason_phrase.take().or_else(|| {
            status_code_registry::get_reason_phrase(status_code).map(|r| r.to_string())
        });

        let mut status_line = format!("HTTP/1.1 {}", status_code);
        if let Some(reason_phrase) = &reason_phrase {
            status_line = format!("{} {}", status_line, reason_phrase);
        }
        status_line.push_str("\r\n");

        let bodyless = status_code_registry::is_bodyless(status_code);
        if bodyless {
            self.body.clear();
        } else {
            let content_length = self.body.len().to_string();
            self.set_header("Content-Length", content_length);
        }

        let mut headers = self
            .headers
            .into_iter()
            .map(|(k, v)| format!("{}: {}\r\n", k, v))
            .collect::<Vec<_>>()
            .join("");
        headers.push_str("\r\n");

        let mut resp = vec![];
        resp.extend(status_line.bytes());
        resp.extend(headers.bytes());
        if !head_only {
            resp.extend(self.body);
        }
        resp
    }
}
