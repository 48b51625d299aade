use crate::multi_map::MultiMap;

/// Request headers keyed by lower-cased name.
#[derive(Debug, Clone)]
pub struct Headers(MultiMap<String, String>);

impl Headers {
    pub fn new(mm: MultiMap<String, String>) -> Self {
        Self(mm)
    }

    pub fn new_empty() -> Self {
        Self(MultiMap::new_empty())
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert_scalar(key.to_lowercase(), value.into());
    }

    pub fn get_scalar(&self, key: &str) -> anyhow::Result<Option<&str>> {
        Ok(self
            .0
            .get_scalar(key.to_lowercase().as_str())?
            .map(|s| s.as_str()))
    }

    /// First value of a header, tolerating repeats.
    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.0
            .get_first(key.to_lowercase().as_str())
            .map(|s| s.as_str())
    }

    pub fn get_iter(&self, key: &str) -> Option<impl Iterator<Item = &str> + '_> {
        self.0
            .get_value_iter(key.to_lowercase().as_str())
            .map(|it| it.map(|e| e.as_str()))
    }

    /// Comma-separated list headers flattened across repeated lines, with
    /// parameters such as `;q=0.8` removed.
    fn get_list(&self, key: &str) -> Option<impl Iterator<Item = &str> + '_> {
        self.get_iter(key).map(|it| {
            it.flat_map(|line| line.split(','))
                .map(|item| item.split(';').next().unwrap_or_default().trim())
                .filter(|item| !item.is_empty())
        })
    }

    pub fn get_connection(&self) -> Option<impl Iterator<Item = &str> + '_> {
        self.get_list("connection")
    }

    pub fn get_accept_encoding(&self) -> Option<impl Iterator<Item = &str> + '_> {
        self.get_list("accept-encoding")
    }

    pub fn get_content_length(&self) -> anyhow::Result<Option<usize>> {
        match self
            .get_scalar("content-length")?
            .map(|length| length.parse::<usize>())
        {
            Some(Ok(length)) => Ok(Some(length)),
            Some(Err(err)) => Err(err)?,
            None => Ok(None),
        }
    }

    pub fn get_content_type(&self) -> Option<&str> {
        self.get_first("content-type")
    }

    pub fn get_user_agent(&self) -> Option<&str> {
        self.get_first("user-agent")
    }

    /// Looks a cookie up across every `Cookie` header line.
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.get_iter("cookie")?
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.trim_matches('"'))
    }
}
