use std::fmt;
use std::io::{self, Chain, Cursor, Read};

use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar(Compression),
}

/// Compression codec wrapped around a tar stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl ArchiveFormat {
    /// Map a request content-type onto an archive format.
    ///
    /// Parameters (`; charset=...`) and letter case are ignored. Anything
    /// outside the tar / gzip-tar family is rejected before any I/O.
    pub fn from_content_type(content_type: &str) -> Result<Self> {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "application/x-tar" | "application/tar" => Ok(Self::Tar(Compression::None)),
            "application/x-tar+gzip"
            | "application/tar+gzip"
            | "application/x-gzip"
            | "application/gzip" => Ok(Self::Tar(Compression::Gzip)),
            _ => Err(Error::UnsupportedContentType(content_type.to_string())),
        }
    }

    pub fn compression(self) -> Compression {
        match self {
            Self::Tar(compression) => compression,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tar(Compression::None) => f.write_str("tar"),
            Self::Tar(Compression::Gzip) => f.write_str("tar+gzip"),
        }
    }
}

impl Compression {
    /// Wrap `reader` in the matching decoder.
    ///
    /// For gzip the two magic bytes are read up front, so a payload that is
    /// not gzip at all fails here instead of midway through tar parsing.
    pub fn decoder<R: Read>(self, mut reader: R) -> Result<Decoder<R>> {
        match self {
            Self::None => Ok(Decoder::Passthrough(reader)),
            Self::Gzip => {
                let mut magic = [0u8; 2];
                match reader.read_exact(&mut magic) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        return Err(Error::NotGzip);
                    }
                    Err(source) => return Err(Error::Read { source }),
                }
                if magic != GZIP_MAGIC {
                    return Err(Error::NotGzip);
                }
                let stream = Cursor::new(magic).chain(reader);
                Ok(Decoder::Gzip(Box::new(flate2::read::GzDecoder::new(stream))))
            }
        }
    }
}

/// Decoder wrapper for tar decompression.
#[derive(Debug)]
pub enum Decoder<R> {
    Passthrough(R),
    Gzip(Box<flate2::read::GzDecoder<Chain<Cursor<[u8; 2]>, R>>>),
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(r) => r.read(buf),
            Self::Gzip(d) => d.read(buf),
        }
    }
}
