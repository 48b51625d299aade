use super::{Dynamic, Exact, Lookup, Route};

pub struct Chain {
    exact: Exact,
    dynamic: Dynamic,
}

impl Chain {
    pub fn new() -> Self {
        Self {
            exact: Exact::new(),
            dynamic: Dynamic::new(),
        }
    }

    pub fn add_route(&mut self, route: Route) {
        if route.pattern.is_literal() {
            self.exact.add_route(route);
        } else {
            self.dynamic.add_route(route);
        }
    }

    /// Fixed routes first, then regex routes. A trailing-slash redirect only
    /// applies when neither produced a match.
    pub fn pattern_match(&self, path: &str, verb: &str) -> Lookup {
        let redirect = match self.exact.pattern_match(path, verb) {
            Lookup::Found(m) => return Lookup::Found(m),
            lookup => lookup,
        };
        match self.dynamic.pattern_match(path, verb) {
            Some(m) => Lookup::Found(m),
            None => redirect,
        }
    }
}
