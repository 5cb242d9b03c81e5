//! Single-asset manifest wrapper.
//!
//! ```text
//! [ 'L' ][ version: i8 ][ frame_rate: u32 ][ class_count: i32 ]
//! [ class_count × string ][ payload: rest of stream ]
//! ```
//! Big-endian throughout.  There is no offset table; the payload is
//! everything after the last class name.

use std::io::{Read, Write};

use thiserror::Error;

use crate::stream::{BinaryStream, StreamError};

pub const MANIFEST_MAGIC: u8 = b'L';

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("First byte doesn't match the manifest magic 'L'")]
    MalformedHeader,
    #[error("Manifest header is truncated: {0}")]
    TruncatedHeader(#[source] StreamError),
    #[error("Invalid class count: {0}")]
    InvalidClassCount(i32),
    #[error("Class entry {index} is corrupt: {source}")]
    CorruptClassEntry { index: usize, #[source] source: StreamError },
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    pub version:    i8,
    pub frame_rate: u32,
    pub classes:    Vec<String>,
    payload:        Vec<u8>,
}

impl Manifest {
    pub fn read<R: Read>(reader: R) -> Result<Self, ManifestError> {
        let mut input = BinaryStream::big_endian(reader);

        match input.read_u8() {
            Ok(MANIFEST_MAGIC) => {}
            Ok(_) => return Err(ManifestError::MalformedHeader),
            Err(e) if e.is_eof() => return Err(ManifestError::MalformedHeader),
            Err(e) => return Err(e.into()),
        }

        let version     = input.read_i8().map_err(ManifestError::TruncatedHeader)?;
        let frame_rate  = input.read_u32().map_err(ManifestError::TruncatedHeader)?;
        let class_count = input.read_i32().map_err(ManifestError::TruncatedHeader)?;
        let class_count = usize::try_from(class_count)
            .map_err(|_| ManifestError::InvalidClassCount(class_count))?;

        let mut classes = Vec::new();
        for index in 0..class_count {
            let class = input.read_string()
                .map_err(|source| ManifestError::CorruptClassEntry { index, source })?;
            classes.push(class);
        }

        let payload = input.read_to_end()?;
        tracing::debug!(version, frame_rate, classes = classes.len(), payload = payload.len(), "read manifest");

        Ok(Self { version, frame_rate, classes, payload })
    }

    pub fn payload(&self) -> &[u8] { &self.payload }

    pub fn into_payload(self) -> Vec<u8> { self.payload }
}

/// Writes a manifest using a template's header and class list with its own
/// payload.
#[derive(Debug)]
pub struct ManifestBuilder<'t> {
    template: &'t Manifest,
    payload:  Vec<u8>,
}

impl<'t> ManifestBuilder<'t> {
    /// Starts with a copy of the template's payload.
    pub fn new(template: &'t Manifest) -> Self {
        Self { template, payload: template.payload.clone() }
    }

    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
        self.payload = payload.into();
    }

    pub fn build<W: Write>(&self, writer: W) -> Result<(), ManifestError> {
        let mut out = BinaryStream::big_endian(writer);
        let t = self.template;

        let class_count = i32::try_from(t.classes.len())
            .map_err(|_| ManifestError::InvalidClassCount(i32::MAX))?;

        out.write_u8(MANIFEST_MAGIC)?;
        out.write_i8(t.version)?;
        out.write_u32(t.frame_rate)?;
        out.write_i32(class_count)?;
        for class in &t.classes {
            out.write_string(class)?;
        }
        out.write_bytes(&self.payload)?;
        Ok(())
    }
}
