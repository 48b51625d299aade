pub use chain::Chain;
pub use dynamic::Dynamic;
pub use exact::Exact;

use crate::controller::{Action, Endpoint};

use super::pattern::Pattern;

mod chain;
mod dynamic;
mod exact;

pub struct Route {
    pub pattern: Pattern,
    pub endpoint: Endpoint,
}

pub struct Match<'r> {
    pub pattern: &'r str,
    pub endpoint: &'r Endpoint,
    pub action: Action,
    /// Route parameters in capture order; empty for fixed routes.
    pub params: Vec<(String, String)>,
}

impl<'r> Match<'r> {
    fn new(route: &'r Route, action: Action, params: Vec<(String, String)>) -> Self {
        Self {
            pattern: route.pattern.as_str(),
            endpoint: &route.endpoint,
            action,
            params,
        }
    }
}

pub enum Lookup<'r> {
    Found(Match<'r>),
    /// Only the slash-terminated form of the path is registered.
    Redirect(String),
    NotFound,
}
