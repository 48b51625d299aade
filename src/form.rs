use bytes::Bytes;
use thiserror::Error;

use crate::{
    multi_map::MultiMap,
    slice_ext::{split_once, split_pattern, trim_affixes},
};

/// A file part of a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("multipart content type without boundary")]
    MissingBoundary,
    #[error("multipart part without header terminator")]
    MalformedPart,
    #[error("multipart part without a name")]
    UnnamedPart,
}

/// Parses `a=1&b=2` pairs. `+` decodes to a space; pairs that fail to
/// decode are kept verbatim.
pub fn parse_urlencoded(input: &str, into: &mut MultiMap<String, String>) {
    for pair in input.split('&').filter(|pair| !pair.is_empty()) {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        into.insert_scalar(decode_component(k), decode_component(v));
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

pub fn boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(k, _)| k.eq_ignore_ascii_case("boundary"))
        .map(|(_, v)| v.trim_matches('"'))
        .filter(|v| !v.is_empty())
}

/// Parses a `multipart/form-data` body. Text parts land in `values`, parts
/// carrying a filename land in `files`.
pub fn parse_multipart(
    body: &[u8],
    content_type: &str,
    values: &mut MultiMap<String, String>,
    files: &mut Vec<UploadedFile>,
) -> Result<(), FormError> {
    let boundary = boundary(content_type).ok_or(FormError::MissingBoundary)?;
    let delimiter = format!("--{}", boundary);

    // The first chunk is the preamble.
    for part in split_pattern(body, delimiter.as_bytes()).skip(1) {
        if part.starts_with(b"--") {
            break;
        }
        let part = trim_affixes(part, b"\r\n", b"\r\n");
        let (head, data) = split_once(part, b"\r\n\r\n").ok_or(FormError::MalformedPart)?;
        let head = String::from_utf8_lossy(head);

        let mut disposition = None;
        let mut part_content_type = None;
        for line in head.lines() {
            let Some((k, v)) = line.split_once(':') else {
                continue;
            };
            if k.trim().eq_ignore_ascii_case("content-disposition") {
                disposition = Some(v.trim().to_owned());
            } else if k.trim().eq_ignore_ascii_case("content-type") {
                part_content_type = Some(v.trim().to_owned());
            }
        }

        let disposition = disposition.ok_or(FormError::UnnamedPart)?;
        let name = disposition_param(&disposition, "name").ok_or(FormError::UnnamedPart)?;
        match disposition_param(&disposition, "filename") {
            Some(filename) => files.push(UploadedFile {
                field: name,
                filename,
                content_type: part_content_type,
                data: Bytes::copy_from_slice(data),
            }),
            None => values.insert_scalar(name, String::from_utf8_lossy(data).into_owned()),
        }
    }
    Ok(())
}

fn disposition_param(disposition: &str, key: &str) -> Option<String> {
    disposition
        .split(';')
        .skip(1)
        .filter_map(|param| param.trim().split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim().trim_matches('"').to_owned())
}
