use std::collections::BTreeMap;

/// Per-request values shared between filters, hooks, actions and the
/// template renderer.
pub type Data = BTreeMap<String, String>;

/// Turns a template name plus the request's data into a response body.
/// Template syntax is entirely up to the implementation.
pub trait Renderer {
    fn render(&self, template: &str, data: &Data) -> anyhow::Result<Vec<u8>>;
}

impl<T> Renderer for T
where
    T: Fn(&str, &Data) -> anyhow::Result<Vec<u8>>,
{
    fn render(&self, template: &str, data: &Data) -> anyhow::Result<Vec<u8>> {
        self(template, data)
    }
}
