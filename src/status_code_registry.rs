use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

// Only the codes the dispatcher, the default error pages and the bundled
// handlers produce. Anything else goes through `set_status_line`.

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter)]
#[repr(u16)]
pub enum ReasonPhrase {
    OK = 200,
    Created = 201,
    NoContent = 204,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    ContentTooLarge = 413,
    InternalServerError = 500,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
}

impl ReasonPhrase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OK => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::MovedPermanently => "Moved Permanently",
            Self::Found => "Found",
            Self::SeeOther => "See Other",
            Self::NotModified => "Not Modified",
            Self::TemporaryRedirect => "Temporary Redirect",
            Self::PermanentRedirect => "Permanent Redirect",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::ContentTooLarge => "Content Too Large",
            Self::InternalServerError => "Internal Server Error",
            Self::BadGateway => "Bad Gateway",
            Self::ServiceUnavailable => "Service Unavailable",
            Self::GatewayTimeout => "Gateway Timeout",
        }
    }
}

impl Display for ReasonPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref STATUS_CODE_REGISTRY: StatusCodeRegistry = StatusCodeRegistry::new();
}

pub fn get_reason_phrase(status_code: u16) -> Option<ReasonPhrase> {
    STATUS_CODE_REGISTRY.reason_phrase_lookup.get(&status_code).copied()
}

pub fn get_status_code(reason_phrase: ReasonPhrase) -> u16 {
    reason_phrase as u16
}

/// Maps an error-handler key such as `"404"` to the status written with it.
/// Keys that are not a client or server error code map to 500.
pub fn error_status(code: &str) -> u16 {
    match code.trim().parse::<u16>() {
        Ok(status) if (400..600).contains(&status) => status,
        _ => get_status_code(ReasonPhrase::InternalServerError),
    }
}

/// Statuses whose responses never carry a body.
pub fn is_bodyless(status_code: u16) -> bool {
    status_code == 204 || status_code == 304 || (100..200).contains(&status_code)
}

struct StatusCodeRegistry {
    reason_phrase_lookup: HashMap<u16, ReasonPhrase>,
}

impl StatusCodeRegistry {
    fn new() -> Self {
        let reason_phrase_lookup = ReasonPhrase::iter()
            .map(|reason_phrase| (reason_phrase as u16, reason_phrase))
            .collect();
        Self {
            reason_phrase_lookup,
        }
    }
}
