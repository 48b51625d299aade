use std::collections::HashMap;

use tracing::info;

use crate::{
    request::Request,
    response_writer::ResponseWriter,
    server::Handler,
    status_code_registry::{self, ReasonPhrase},
};

type ErrorHandler = Box<dyn Handler + Send + Sync>;

static SIMPLE_SERVER_ERROR: fn(&mut ResponseWriter, &mut Request) = simple_server_error;

/// Error pages keyed by code, usually a status such as `"404"`, though any
/// string an action aborts with can be registered.
pub struct ErrorHandlers {
    handlers: HashMap<String, ErrorHandler>,
}

impl ErrorHandlers {
    /// A registry with the stock pages for 401, 403, 404, 500 and 503.
    pub fn new() -> Self {
        let mut handlers = Self::new_empty();
        let pages = [
            ("401", ReasonPhrase::Unauthorized, "Sorry, but this page is unauthorized!"),
            ("403", ReasonPhrase::Forbidden, "Sorry, but this page is forbidden!"),
            ("404", ReasonPhrase::NotFound, "Sorry, but this page doesn't exist!"),
            ("500", ReasonPhrase::InternalServerError, "Sorry, internal server error!"),
            ("503", ReasonPhrase::ServiceUnavailable, "Sorry, service unavailable!"),
        ];
        for (code, reason_phrase, message) in pages {
            handlers.insert(code, page(reason_phrase, message));
        }
        handlers
    }

    pub fn new_empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        code: impl Into<String>,
        handler: impl Handler + Send + Sync + 'static,
    ) {
        self.handlers.insert(code.into(), Box::new(handler));
    }

    /// The handler for `code`, else the one for `"500"`, else a plain-text
    /// 500.
    pub fn lookup(&self, code: &str) -> &(dyn Handler + Send + Sync) {
        match self.handlers.get(code).or_else(|| self.handlers.get("500")) {
            Some(handler) => handler.as_ref(),
            None => &SIMPLE_SERVER_ERROR,
        }
    }

    /// Replaces whatever was written so far with the error page for `code`.
    pub fn respond(&self, code: &str, w: &mut ResponseWriter, r: &mut Request) {
        info!(code, path = r.get_path(), "error page");
        w.reset();
        w.set_status_code(status_code_registry::error_status(code));
        self.lookup(code).handle(w, r);
    }
}

impl Default for ErrorHandlers {
    fn default() -> Self {
        Self::new()
    }
}

fn simple_server_error(w: &mut ResponseWriter, _: &mut Request) {
    w.set_reason_phrase(ReasonPhrase::InternalServerError);
    w.set_body_str(ReasonPhrase::InternalServerError.as_str());
}

fn page(reason_phrase: ReasonPhrase, content: &'static str) -> impl Handler + Send + Sync {
    let status_code = status_code_registry::get_status_code(reason_phrase);
    move |w: &mut ResponseWriter, _: &mut Request| {
        w.set_html(format!(
            "<!DOCTYPE html>\n\
             <html lang=\"en\">\n\
             <head><meta charset=\"utf-8\"><title>{status_code}</title></head>\n\
             <body>\n\
             <h1>{status_code}</h1>\n\
             <h2>{content}</h2>\n\
             <h3>Would you like to go <a href=\"/\">home</a>?</h3>\n\
             </body>\n\
             </html>\n"
        ));
    }
}
