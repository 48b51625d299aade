use std::num::{ParseFloatError, ParseIntError};

use anyhow::Context as _;
use thiserror::Error;

use crate::{
    config::Config,
    form::UploadedFile,
    render::{Data, Renderer},
    request::Request,
    response_writer::{Cookie, ResponseWriter},
    status_code_registry::ReasonPhrase,
    xsrf::{self, XsrfStore, XSRF_COOKIE, XSRF_FIELD, XSRF_HEADERS},
};

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid bool {0:?}")]
pub struct InvalidBool(pub String);

/// Everything one request carries through the pipeline. Created fresh per
/// dispatch and dropped when the response is handed back to the server.
pub struct Context<'a> {
    request: &'a mut Request,
    response: &'a mut ResponseWriter,
    config: &'a Config,
    renderer: Option<&'a dyn Renderer>,
    data: Data,
    controller_name: String,
    action_name: String,
    template: Option<String>,
    xsrf_token: Option<String>,
}

impl<'a> Context<'a> {
    pub fn new(
        request: &'a mut Request,
        response: &'a mut ResponseWriter,
        config: &'a Config,
    ) -> Self {
        Self {
            request,
            response,
            config,
            renderer: None,
            data: Data::new(),
            controller_name: String::new(),
            action_name: String::new(),
            template: None,
            xsrf_token: None,
        }
    }

    pub fn with_renderer(mut self, renderer: &'a dyn Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn request(&self) -> &Request {
        &*self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut *self.request
    }

    pub fn response(&mut self) -> &mut ResponseWriter {
        &mut *self.response
    }

    pub(crate) fn parts(&mut self) -> (&mut ResponseWriter, &mut Request) {
        (&mut *self.response, &mut *self.request)
    }

    /// True once a status or body bytes have been written.
    pub fn is_started(&self) -> bool {
        self.response.is_started()
    }

    pub fn path(&self) -> &str {
        self.request.get_path()
    }

    pub fn method(&self) -> &str {
        self.request.get_http_method()
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // input
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    /// A route parameter, with or without its leading `:`.
    pub fn get_param(&self, name: &str) -> Option<&str> {
        if name.starts_with(':') {
            self.request.input(name)
        } else {
            self.request.input(&format!(":{}", name))
        }
    }

    pub fn input(&self, key: &str) -> Option<&str> {
        self.request.input(key)
    }

    /// The first value of a field, or an empty string.
    pub fn get_string(&self, key: &str) -> String {
        self.input(key).unwrap_or_default().to_owned()
    }

    pub fn get_strings(&self, key: &str) -> Vec<String> {
        self.request
            .inputs(key)
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ParseIntError> {
        self.input(key).unwrap_or_default().trim().parse()
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, InvalidBool> {
        parse_bool(self.input(key).unwrap_or_default())
    }

    pub fn get_float(&self, key: &str) -> Result<f64, ParseFloatError> {
        self.input(key).unwrap_or_default().trim().parse()
    }

    pub fn get_file(&self, field: &str) -> Option<&UploadedFile> {
        self.request.get_files().iter().find(|file| file.field == field)
    }

    pub fn is_ajax(&self) -> bool {
        self.request.is_ajax()
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // data bag and rendering
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn get_data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|s| s.as_str())
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    pub(crate) fn set_names(&mut self, controller_name: &str, action_name: &str) {
        self.controller_name = controller_name.to_owned();
        self.action_name = action_name.to_owned();
    }

    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = Some(template.into());
    }

    /// The template to render, `controller/action.html` in lower case unless
    /// one was set explicitly.
    pub fn template(&self) -> String {
        match &self.template {
            Some(template) => template.clone(),
            None => format!(
                "{}/{}.html",
                self.controller_name.to_lowercase(),
                self.action_name.to_lowercase()
            ),
        }
    }

    /// Renders the template into the response body. Without a renderer this
    /// does nothing.
    pub fn render(&mut self) -> anyhow::Result<()> {
        let Some(renderer) = self.renderer else {
            return Ok(());
        };
        let template = self.template();
        let body = renderer
            .render(&template, &self.data)
            .with_context(|| format!("rendering {}", template))?;
        self.response.set_body(body, "text/html; charset=utf-8");
        Ok(())
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // output
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    pub fn write_str(&mut self, s: &str) {
        self.response.write_str(s);
    }

    pub fn redirect(&mut self, location: &str, reason_phrase: ReasonPhrase) {
        self.response.redirect(location, reason_phrase);
    }

    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.request.get_cookie(name)
    }

    pub fn set_cookie(&mut self, cookie: &Cookie) {
        self.response.set_cookie(cookie);
    }

    pub fn get_secure_cookie(&self, secret: &str, name: &str) -> Option<String> {
        xsrf::unsign(secret, self.get_cookie(name)?)
    }

    pub fn set_secure_cookie(&mut self, secret: &str, name: &str, value: &str, max_age: i64) {
        let cookie = Cookie::new(name, xsrf::sign(secret, value))
            .path("/")
            .max_age(max_age);
        self.response.set_cookie(&cookie);
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // xsrf
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    fn xsrf_store(&self) -> XsrfStore {
        XsrfStore::new(self.config.xsrf_key.as_str(), self.config.xsrf_expire)
    }

    /// The client's anti-forgery token. Taken from the signed `_xsrf` cookie
    /// when it verifies, otherwise freshly issued and sent as a cookie.
    pub fn xsrf_token(&mut self) -> String {
        if let Some(token) = &self.xsrf_token {
            return token.clone();
        }

        let store = self.xsrf_store();
        let token = match self.request.get_cookie(XSRF_COOKIE).and_then(|c| store.decode(c)) {
            Some(token) => token,
            None => {
                let token = store.issue();
                self.response.set_cookie(&store.cookie(&token));
                token
            }
        };
        self.xsrf_token = Some(token.clone());
        token
    }

    /// Compares the token submitted in the `_xsrf` field or the
    /// `X-Xsrftoken`/`X-Csrftoken` headers with the established one.
    pub fn check_xsrf(&mut self) -> bool {
        let established = self.xsrf_token();
        let submitted = self
            .input(XSRF_FIELD)
            .filter(|token| !token.is_empty())
            .or_else(|| {
                XSRF_HEADERS
                    .iter()
                    .filter_map(|name| self.request.get_header(name))
                    .find(|token| !token.is_empty())
            });
        self.xsrf_store().verify(&established, submitted)
    }

    pub fn xsrf_form_html(&mut self) -> String {
        format!(
            "<input type=\"hidden\" name=\"{}\" value=\"{}\"/>",
            XSRF_FIELD,
            self.xsrf_token()
        )
    }
}

fn parse_bool(s: &str) -> Result<bool, InvalidBool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(InvalidBool(s.to_owned())),
    }
}
