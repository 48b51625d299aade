use thiserror::Error;
use tracing::info;

use crate::controller::Endpoint;

pub use matcher::{Lookup, Match};
pub use pattern::{Pattern, PatternError};

use matcher::{Chain, Route};

pub(crate) mod matcher;
pub mod pattern;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("method mapping {0:?} is not of the form verb[,verb...]:Method")]
    MalformedMapping(String),
    #[error("unknown verb {0:?} in method mapping")]
    UnknownVerb(String),
    #[error("controller has no action named {0:?}")]
    UnknownAction(String),
}

/// The route table. Filled while the app is being built, read-only while
/// it serves.
pub struct Router {
    chain: Chain,
    case_sensitive: bool,
    len: usize,
}

impl Router {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            chain: Chain::new(),
            case_sensitive,
            len: 0,
        }
    }

    pub fn add_route(&mut self, pattern: &str, endpoint: Endpoint) -> Result<(), RouteError> {
        let pattern = Pattern::compile_with(pattern, self.case_sensitive)?;
        info!(
            pattern = pattern.as_str(),
            regex = pattern.regex_str(),
            controller = endpoint.controller_name(),
            "route added"
        );
        self.chain.add_route(Route { pattern, endpoint });
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finds the route for `path` given the lower-cased verb the request
    /// resolved to.
    pub fn resolve(&self, path: &str, verb: &str) -> Lookup {
        self.chain.pattern_match(path, verb)
    }
}
