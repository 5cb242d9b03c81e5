//! Typed primitive I/O over a seekable byte stream.
//!
//! [`BinaryStream`] wraps any `Read`/`Write`/`Seek` handle and reads or
//! writes fixed-width integers, floats, single bytes, booleans, raw byte runs
//! and length-prefixed strings in a selectable [`Endian`].
//!
//! # Strings
//! A string is a `u16` length followed by that many raw bytes.  No NUL
//! terminator, no encoding marker.  [`BinaryStream::read_string_bytes`]
//! returns the raw run; [`BinaryStream::read_string`] additionally requires
//! valid UTF-8.
//!
//! # End of stream
//! A short read is always [`StreamError::UnexpectedEof`].  It is never
//! reported as a zero integer or an empty string; an empty string is only
//! ever the result of a zero length prefix.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::string::FromUtf8Error;
use thiserror::Error;

/// Largest byte length a length-prefixed string can carry.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum StreamError {
    /// The stream ended before the requested number of bytes was available.
    #[error("Unexpected end of stream: wanted {expected} bytes, got {actual}")]
    UnexpectedEof { expected: usize, actual: usize },
    #[error("String of {0} bytes exceeds the u16 length prefix")]
    StringTooLong(usize),
    #[error("String is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl StreamError {
    /// True when the error is a short read rather than a hard I/O failure.
    pub fn is_eof(&self) -> bool {
        matches!(self, StreamError::UnexpectedEof { .. })
    }
}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            // byteorder reads go through read_exact, which does not say how
            // much it managed to fill.
            StreamError::UnexpectedEof { expected: 0, actual: 0 }
        } else {
            StreamError::Io(e)
        }
    }
}

// ── Endian ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

macro_rules! read_fixed {
    ($(#[$doc:meta] $name:ident => $inner:ident, $ty:ty, $size:expr;)*) => {
        $(
            #[$doc]
            pub fn $name(&mut self) -> Result<$ty, StreamError> {
                let v = match self.endian {
                    Endian::Big    => self.inner.$inner::<BigEndian>(),
                    Endian::Little => self.inner.$inner::<LittleEndian>(),
                };
                v.map_err(|e| eof_of(e, $size))
            }
        )*
    };
}

macro_rules! write_fixed {
    ($($name:ident => $inner:ident, $ty:ty;)*) => {
        $(
            pub fn $name(&mut self, value: $ty) -> Result<(), StreamError> {
                match self.endian {
                    Endian::Big    => self.inner.$inner::<BigEndian>(value)?,
                    Endian::Little => self.inner.$inner::<LittleEndian>(value)?,
                }
                Ok(())
            }
        )*
    };
}

/// Attach the width of a fixed read to a bare `read_exact` EOF.
fn eof_of(e: io::Error, expected: usize) -> StreamError {
    match StreamError::from(e) {
        StreamError::UnexpectedEof { .. } => StreamError::UnexpectedEof { expected, actual: 0 },
        other => other,
    }
}

// ── BinaryStream ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct BinaryStream<S> {
    inner:  S,
    endian: Endian,
}

impl<S> BinaryStream<S> {
    pub fn new(inner: S, endian: Endian) -> Self {
        Self { inner, endian }
    }

    /// Big-endian stream, the byte order of both container formats.
    pub fn big_endian(inner: S) -> Self {
        Self::new(inner, Endian::Big)
    }

    pub fn endian(&self) -> Endian { self.endian }

    pub fn get_ref(&self) -> &S { &self.inner }

    pub fn get_mut(&mut self) -> &mut S { &mut self.inner }

    pub fn into_inner(self) -> S { self.inner }
}

// ── Read ─────────────────────────────────────────────────────────────────────

impl<S: Read> BinaryStream<S> {
    /// Read exactly `len` bytes.  Fewer available bytes is an error that
    /// reports how many were actually present.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, StreamError> {
        let mut buf = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() < len {
            return Err(StreamError::UnexpectedEof { expected: len, actual: buf.len() });
        }
        Ok(buf)
    }

    /// Read every remaining byte.  An exhausted stream yields an empty vec.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>, StreamError> {
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        self.inner.read_u8().map_err(|e| eof_of(e, 1))
    }

    /// Signed single byte ("char").
    pub fn read_i8(&mut self) -> Result<i8, StreamError> {
        self.inner.read_i8().map_err(|e| eof_of(e, 1))
    }

    /// One byte, nonzero = true.
    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        Ok(self.read_u8()? != 0)
    }

    read_fixed! {
        #[doc = "Read a 16-bit signed integer."]
        read_i16 => read_i16, i16, 2;
        #[doc = "Read a 16-bit unsigned integer."]
        read_u16 => read_u16, u16, 2;
        #[doc = "Read a 32-bit signed integer."]
        read_i32 => read_i32, i32, 4;
        #[doc = "Read a 32-bit unsigned integer."]
        read_u32 => read_u32, u32, 4;
        #[doc = "Read a 64-bit signed integer."]
        read_i64 => read_i64, i64, 8;
        #[doc = "Read a 64-bit unsigned integer."]
        read_u64 => read_u64, u64, 8;
        #[doc = "Read a 32-bit IEEE float."]
        read_f32 => read_f32, f32, 4;
        #[doc = "Read a 64-bit IEEE float."]
        read_f64 => read_f64, f64, 8;
    }

    /// Read a `u16`-prefixed raw byte string.
    pub fn read_string_bytes(&mut self) -> Result<Vec<u8>, StreamError> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    /// Read a `u16`-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, StreamError> {
        Ok(String::from_utf8(self.read_string_bytes()?)?)
    }
}

// ── Write ────────────────────────────────────────────────────────────────────

impl<S: Write> BinaryStream<S> {
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), StreamError> {
        self.inner.write_u8(value)?;
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<(), StreamError> {
        self.inner.write_i8(value)?;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), StreamError> {
        self.write_u8(value as u8)
    }

    write_fixed! {
        write_i16 => write_i16, i16;
        write_u16 => write_u16, u16;
        write_i32 => write_i32, i32;
        write_u32 => write_u32, u32;
        write_i64 => write_i64, i64;
        write_u64 => write_u64, u64;
        write_f32 => write_f32, f32;
        write_f64 => write_f64, f64;
    }

    /// Write `bytes` behind a `u16` length prefix.
    pub fn write_string_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        let len = u16::try_from(bytes.len())
            .map_err(|_| StreamError::StringTooLong(bytes.len()))?;
        self.write_u16(len)?;
        self.write_bytes(bytes)
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), StreamError> {
        self.write_string_bytes(value.as_bytes())
    }
}

// ── Seek ─────────────────────────────────────────────────────────────────────

impl<S: Seek> BinaryStream<S> {
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError> {
        Ok(self.inner.seek(pos)?)
    }

    pub fn position(&mut self) -> Result<u64, StreamError> {
        Ok(self.inner.stream_position()?)
    }

    /// Total stream length.  Restores the current position afterwards.
    pub fn stream_len(&mut self) -> Result<u64, StreamError> {
        let pos = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn big_endian_integers() {
        let mut s = BinaryStream::big_endian(Cursor::new(Vec::new()));
        s.write_u32(0x0102_0304).unwrap();
        s.write_i16(-2).unwrap();
        assert_eq!(s.get_ref().get_ref(), &[1, 2, 3, 4, 0xFF, 0xFE]);

        s.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(s.read_u32().unwrap(), 0x0102_0304);
        assert_eq!(s.read_i16().unwrap(), -2);
    }

    #[test]
    fn little_endian_integers() {
        let mut s = BinaryStream::new(Cursor::new(Vec::new()), Endian::Little);
        s.write_u16(0x0102).unwrap();
        s.write_f64(1.5).unwrap();
        assert_eq!(&s.get_ref().get_ref()[..2], &[2, 1]);

        s.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(s.read_u16().unwrap(), 0x0102);
        assert_eq!(s.read_f64().unwrap(), 1.5);
    }

    #[test]
    fn short_integer_read_is_eof() {
        let mut s = BinaryStream::big_endian(Cursor::new(vec![0u8, 1]));
        let err = s.read_u32().unwrap_err();
        assert!(matches!(err, StreamError::UnexpectedEof { expected: 4, .. }));
    }

    #[test]
    fn short_byte_run_reports_actual() {
        let mut s = BinaryStream::big_endian(Cursor::new(vec![9u8; 3]));
        match s.read_bytes(5) {
            Err(StreamError::UnexpectedEof { expected, actual }) => {
                assert_eq!((expected, actual), (5, 3));
            }
            other => panic!("expected eof, got {other:?}"),
        }
    }

    #[test]
    fn empty_string_is_a_value() {
        let mut s = BinaryStream::big_endian(Cursor::new(vec![0u8, 0]));
        assert_eq!(s.read_string().unwrap(), "");
        // Nothing left: the next string is a short read, not another "".
        assert!(s.read_string().unwrap_err().is_eof());
    }

    #[test]
    fn string_prefix_and_payload() {
        let mut s = BinaryStream::big_endian(Cursor::new(Vec::new()));
        s.write_string("hé").unwrap();
        assert_eq!(s.get_ref().get_ref(), &[0, 3, b'h', 0xC3, 0xA9]);

        s.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(s.read_string().unwrap(), "hé");
    }

    #[test]
    fn oversized_string_rejected() {
        let mut s = BinaryStream::big_endian(Cursor::new(Vec::new()));
        let long = vec![b'x'; MAX_STRING_LEN + 1];
        assert!(matches!(
            s.write_string_bytes(&long),
            Err(StreamError::StringTooLong(n)) if n == MAX_STRING_LEN + 1
        ));
        assert!(s.get_ref().get_ref().is_empty());
    }

    #[test]
    fn invalid_utf8_string() {
        let mut s = BinaryStream::big_endian(Cursor::new(vec![0u8, 1, 0xFF]));
        assert!(matches!(s.read_string(), Err(StreamError::InvalidUtf8(_))));
    }

    #[test]
    fn bool_and_tail() {
        let mut s = BinaryStream::big_endian(Cursor::new(vec![0u8, 7, 1, 2, 3]));
        assert!(!s.read_bool().unwrap());
        assert!(s.read_bool().unwrap());
        assert_eq!(s.read_to_end().unwrap(), vec![1, 2, 3]);
        assert!(s.read_to_end().unwrap().is_empty());
    }

    #[test]
    fn stream_len_keeps_position() {
        let mut s = BinaryStream::big_endian(Cursor::new(vec![0u8; 10]));
        s.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(s.stream_len().unwrap(), 10);
        assert_eq!(s.position().unwrap(), 4);
    }
}
