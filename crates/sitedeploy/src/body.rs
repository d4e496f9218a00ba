use std::io::{self, Read};

/// Reader that refuses to yield more than `limit` bytes.
///
/// Once the limit is crossed every read fails and [`exceeded`](Self::exceeded)
/// reports it, whichever layer (gzip, tar, file copy) happened to see the
/// error first.
#[derive(Debug)]
pub(crate) struct LimitedBody<R> {
    inner: R,
    limit: u64,
    read: u64,
    exceeded: bool,
}

impl<R: Read> LimitedBody<R> {
    pub(crate) fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            read: 0,
            exceeded: false,
        }
    }

    pub(crate) fn exceeded(&self) -> bool {
        self.exceeded
    }

    fn too_large(&self) -> io::Error {
        io::Error::other(format!("payload exceeds {} bytes", self.limit))
    }
}

impl<R: Read> Read for LimitedBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.exceeded {
            return Err(self.too_large());
        }

        // Ask for one byte past the limit so an oversized body is noticed
        // even when it ends right after the limit.
        let allowed = (self.limit - self.read).saturating_add(1);
        let len = usize::try_from(allowed).map_or(buf.len(), |n| n.min(buf.len()));
        let n = self.inner.read(&mut buf[..len])?;

        self.read += n as u64;
        if self.read > self.limit {
            self.exceeded = true;
            return Err(self.too_large());
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_within_limit_passes_through() {
        let mut body = LimitedBody::new(&b"0123456789"[..], 10);
        let mut out = Vec::new();
        body.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0123456789");
        assert!(!body.exceeded());
    }

    #[test]
    fn test_body_over_limit_fails() {
        let mut body = LimitedBody::new(&b"0123456789X"[..], 10);
        let mut out = Vec::new();
        let err = body.read_to_end(&mut out).unwrap_err();
        assert!(err.to_string().contains("10 bytes"));
        assert!(body.exceeded());
        // Stays failed.
        assert!(body.read(&mut [0u8; 4]).is_err());
    }

    #[test]
    fn test_zero_limit_accepts_empty_body() {
        let mut body = LimitedBody::new(io::empty(), 0);
        let mut out = Vec::new();
        body.read_to_end(&mut out).unwrap();
        assert!(!body.exceeded());
    }
}
