use super::{Match, Route};

/// Routes compiled to regexes. The first registered route that matches the
/// whole path and handles the verb wins; there is no specificity ranking.
pub struct Dynamic(Vec<Route>);

impl Dynamic {
    pub fn new() -> Self {
        Self(vec![])
    }

    pub fn add_route(&mut self, route: Route) {
        debug_assert!(!route.pattern.is_literal());
        self.0.push(route);
    }

    pub fn pattern_match(&self, path: &str, verb: &str) -> Option<Match> {
        self.0.iter().find_map(|route| {
            let params = route.pattern.captures(path)?;
            let action = route.endpoint.resolve(verb)?;
            Some(Match::new(route, action, params))
        })
    }
}
