use std::path::PathBuf;

/// Application settings, frozen together with the route table when the app
/// is built and reachable from every request context.
#[derive(Debug, Clone)]
pub struct Config {
    /// Value of the `Server` response header.
    pub server_name: String,
    /// Render the action's template when the handler wrote nothing.
    pub auto_render: bool,
    pub access_log: bool,
    /// List directories under a static prefix instead of answering 403.
    pub directory_index: bool,
    pub enable_static: bool,
    /// `(url prefix, directory)` pairs, consulted in order.
    pub static_paths: Vec<(String, PathBuf)>,
    pub enable_xsrf: bool,
    pub xsrf_key: String,
    /// Lifetime of the `_xsrf` cookie in seconds.
    pub xsrf_expire: i64,
    pub case_sensitive: bool,
    /// Compress responses when the client accepts gzip or deflate.
    pub gzip: bool,
    pub max_body: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: "switchyard".to_owned(),
            auto_render: true,
            access_log: true,
            directory_index: false,
            enable_static: true,
            static_paths: vec![("/static".to_owned(), PathBuf::from("static"))],
            enable_xsrf: false,
            xsrf_key: "switchyardxsrf".to_owned(),
            xsrf_expire: 0,
            case_sensitive: true,
            gzip: false,
            max_body: 64 * 1024 * 1024,
        }
    }
}
