use std::io::{BufRead, BufReader, ErrorKind, Read, Take};

use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("end of file")]
pub struct EndOfFile;

#[derive(Error, Debug)]
#[error("stream ended before {expected} body bytes arrived")]
pub struct TruncatedBody {
    pub expected: usize,
}

/// Buffered reader that bounds how much a single read may consume.
pub struct StreamReader<R> {
    buf_reader: Take<BufReader<R>>,
}

impl<R: Read> StreamReader<R> {
    pub fn new(r: R) -> Self {
        Self {
            buf_reader: BufReader::new(r).take(u64::MAX),
        }
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.buf_reader.set_limit(limit);
    }

    pub fn read_line(&mut self, buf: &mut String) -> anyhow::Result<()> {
        let n = self.buf_reader.read_line(buf)?;
        if n == 0 {
            Err(EndOfFile)?
        }
        Ok(())
    }

    /// Reads exactly `len` bytes, lifting the limit for the duration of the
    /// read.
    pub fn read_body(&mut self, len: usize) -> anyhow::Result<Bytes> {
        self.buf_reader.set_limit(len as u64);
        let mut buf = vec![0; len];
        if let Err(err) = self.buf_reader.read_exact(&mut buf) {
            if err.kind() == ErrorKind::UnexpectedEof {
                Err(TruncatedBody { expected: len })?
            }
            Err(err)?
        }
        Ok(Bytes::from(buf))
    }
}
