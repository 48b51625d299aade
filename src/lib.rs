use std::{io, net::ToSocketAddrs};

use tracing::info;

pub use app::{App, AppBuilder};
pub use config::Config;
pub use context::Context;
pub use controller::{Abort, ActionFn, Controller, Outcome};
pub use filter::Stage;
pub use render::{Data, Renderer};
pub use request::Request;
pub use response_writer::{Cookie, ResponseWriter};
pub use router::{Pattern, PatternError, RouteError};
pub use server::{Handler, HttpMethod, Server};
pub use status_code_registry::ReasonPhrase;

pub mod app;
pub mod config;
pub mod context;
pub mod controller;
pub mod error_handlers;
mod file_server;
pub mod filter;
pub mod form;
pub mod headers;
pub mod middleware;
pub mod multi_map;
pub mod render;
pub mod request;
pub mod response_writer;
pub mod router;
pub mod server;
mod slice_ext;
pub mod status_code_registry;
mod stream_reader;
#[cfg(test)]
mod test_utils;
pub mod xsrf;

/// Binds `addr` and serves `app` until the process exits.
pub fn run(addr: impl ToSocketAddrs, app: App) -> io::Result<()> {
    let server = Server::bind(addr)?.with_max_body(app.config().max_body);
    info!(addr = %server.local_addr()?, "listening");

    if app.config().gzip {
        server.run(middleware::compress::new(app));
    } else {
        server.run(app);
    }
    Ok(())
}

#[cfg(test)]
#[ctor::ctor]
fn init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
