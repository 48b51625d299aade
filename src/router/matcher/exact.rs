use super::{Lookup, Match, Route};

/// Routes without parameters, compared by string equality in the order they
/// were registered.
pub struct Exact(Vec<Route>);

impl Exact {
    pub fn new() -> Self {
        Self(vec![])
    }

    pub fn add_route(&mut self, route: Route) {
        debug_assert!(route.pattern.is_literal());
        self.0.push(route);
    }

    /// `/admin` against a route `/admin/` asks for a redirect, and `/admin/`
    /// against a route `/admin` matches. A route that does not handle `verb`
    /// is skipped.
    pub fn pattern_match(&self, path: &str, verb: &str) -> Lookup {
        let mut redirect = None;
        for route in &self.0 {
            let pattern = &route.pattern;
            if pattern.literal_eq(path) {
                if let Some(action) = route.endpoint.resolve(verb) {
                    return Lookup::Found(Match::new(route, action, vec![]));
                }
            }

            if !path.ends_with('/') {
                let with_slash = format!("{}/", path);
                if pattern.literal_eq(&with_slash) {
                    redirect = Some(with_slash);
                    continue;
                }
            }

            if let Some(trimmed) = path.strip_suffix('/') {
                if pattern.literal_eq(trimmed) {
                    if let Some(action) = route.endpoint.resolve(verb) {
                        return Lookup::Found(Match::new(route, action, vec![]));
                    }
                }
            }
        }

        match redirect {
            Some(location) => Lookup::Redirect(location),
            None => Lookup::NotFound,
        }
    }
}
