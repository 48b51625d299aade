use std::{
    fs, io,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    error_handlers::ErrorHandlers, request::Request, response_writer::ResponseWriter,
    status_code_registry::ReasonPhrase,
};

/// Serves `r` from the configured `(prefix, dir)` pairs. Every pair whose
/// prefix matches gets a go; a missing file answers 404 and a directory 403
/// unless `directory_index` is on. The caller decides what happens next
/// based on whether the response has started.
pub fn serve_static(
    static_paths: &[(String, PathBuf)],
    directory_index: bool,
    errors: &ErrorHandlers,
    w: &mut ResponseWriter,
    r: &mut Request,
) {
    let url_path = r.get_path().to_owned();
    for (prefix, dir) in static_paths {
        if url_path == "/favicon.ico" {
            serve_file(w, &dir.join("favicon.ico"));
        }

        let Some(suffix) = url_path.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let Ok(path) = build_path(dir, suffix.trim_start_matches('/')) else {
            w.set_reason_phrase(ReasonPhrase::BadRequest);
            continue;
        };
        info!("file path: {:?}", path);

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(_) => {
                w.set_reason_phrase(ReasonPhrase::NotFound);
                w.set_body_str("404 page not found");
                continue;
            }
        };

        if metadata.is_dir() {
            if !directory_index {
                info!("directory listing denied: {:?}", path);
                errors.respond("403", w, r);
                continue;
            }
            serve_directory(w, &path, &url_path);
            continue;
        }

        serve_file(w, &path);
    }
}

fn serve_file(w: &mut ResponseWriter, path: &Path) {
    match fs::read(path) {
        Ok(contents) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            w.set_reason_phrase(ReasonPhrase::OK);
            w.set_body(contents, mime.as_ref());
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            w.set_reason_phrase(ReasonPhrase::NotFound);
            w.set_body_str("404 page not found");
        }
        Err(err) => {
            error!("{:?}", err);
            w.set_reason_phrase(ReasonPhrase::InternalServerError);
        }
    }
}

/// Serves `index.html` when the directory has one, a listing otherwise.
/// Directory URLs without a trailing slash are redirected first so that
/// relative links resolve.
fn serve_directory(w: &mut ResponseWriter, dir: &Path, url_path: &str) {
    if !url_path.ends_with('/') {
        w.redirect(&format!("{}/", url_path), ReasonPhrase::MovedPermanently);
        return;
    }

    let index = dir.join("index.html");
    if index.is_file() {
        serve_file(w, &index);
        return;
    }

    match list_directory(dir) {
        Ok(listing) => {
            w.set_reason_phrase(ReasonPhrase::OK);
            w.set_html(listing);
        }
        Err(err) => {
            error!("{:?}", err);
            w.set_reason_phrase(ReasonPhrase::InternalServerError);
        }
    }
}

fn list_directory(dir: &Path) -> io::Result<String> {
    let mut entries = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type()?.is_dir();
        entries.push((name, is_dir));
    }
    entries.sort();

    let mut listing = String::from("<pre>\n");
    for (name, is_dir) in entries {
        let slash = if is_dir { "/" } else { "" };
        listing.push_str(&format!(
            "<a href=\"{}{}\">{}{}</a>\n",
            urlencoding::encode(&name),
            slash,
            escape_html(&name),
            slash
        ));
    }
    listing.push_str("</pre>\n");
    Ok(listing)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Error, Debug)]
#[error("invalid path")]
pub struct InvalidPath;

fn build_path(
    base_path: impl AsRef<Path>,
    suffix: impl AsRef<Path>,
) -> Result<PathBuf, InvalidPath> {
    let path = path_clean::clean(base_path.as_ref().join(&suffix));

    let stripped = if let Ok(stripped) = base_path.as_ref().strip_prefix("./") {
        stripped
    } else {
        base_path.as_ref()
    };

    if !path.starts_with(stripped) {
        warn!("file path: {:?}", path);
        return Err(InvalidPath);
    }
    Ok(path)
}
