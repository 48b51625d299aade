use std::io::Read;

use flate2::{
    bufread::{GzEncoder, ZlibEncoder},
    Compression,
};
use tracing::{debug, error};

use crate::{request::Request, response_writer::ResponseWriter, server::Handler};

/// Wraps `handler` so that bodies are gzip or deflate encoded when the
/// client accepts it. The first supported coding in the client's list wins.
pub fn new(handler: impl Handler) -> impl Handler {
    move |w: &mut ResponseWriter, r: &mut Request| {
        handler.handle(w, r);

        let body = w.get_body();
        if body.is_empty() || w.get_header("content-encoding").is_some() {
            return;
        }

        let Some(content_type) = w.get_content_type_header() else {
            error!("Content-Type is supposed to be present");
            return;
        };
        let content_type = String::from(content_type);

        let Some(encoding) = r
            .get_headers()
            .get_accept_encoding()
            .and_then(|mut it| it.find(|e| *e == "gzip" || *e == "deflate"))
        else {
            return;
        };

        let mut buffer = vec![];
        let encoded = match encoding {
            "gzip" => GzEncoder::new(body, Compression::fast()).read_to_end(&mut buffer),
            _ => ZlibEncoder::new(body, Compression::fast()).read_to_end(&mut buffer),
        };
        if let Err(err) = encoded {
            error!("{}", err);
            return;
        }

        debug!(encoding, from = body.len(), to = buffer.len(), "compressed");
        let encoding = encoding.to_owned();
        w.set_body(buffer, &content_type);
        w.add_content_encoding_header(&encoding);
        w.append_header("Vary", "Accept-Encoding");
    }
}
