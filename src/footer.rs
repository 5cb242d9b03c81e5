use std::io::{Read, Write};

use crate::stream::{BinaryStream, StreamError};

/// Size of the trailer: six big-endian `u32` fields.
pub const FOOTER_SIZE: u64 = 24;

/// Layout trailer stored in the final [`FOOTER_SIZE`] bytes of an archive.
/// Every table offset in the file is reached through these fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Footer {
    pub base_offset:       u32,
    pub base_length:       u32,
    pub indexes_offset:    u32,
    pub number_indexes:    u32,
    pub properties_offset: u32,
    pub number_properties: u32,
}

impl Footer {
    pub fn write<W: Write>(&self, out: &mut BinaryStream<W>) -> Result<(), StreamError> {
        out.write_u32(self.base_offset)?;
        out.write_u32(self.base_length)?;
        out.write_u32(self.indexes_offset)?;
        out.write_u32(self.number_indexes)?;
        out.write_u32(self.properties_offset)?;
        out.write_u32(self.number_properties)?;
        Ok(())
    }

    /// Read the six fields from the current position.
    pub fn read<R: Read>(input: &mut BinaryStream<R>) -> Result<Self, StreamError> {
        Ok(Self {
            base_offset:       input.read_u32()?,
            base_length:       input.read_u32()?,
            indexes_offset:    input.read_u32()?,
            number_indexes:    input.read_u32()?,
            properties_offset: input.read_u32()?,
            number_properties: input.read_u32()?,
        })
    }

    /// Exclusive end of the base data region.
    pub fn base_end(&self) -> u64 {
        self.base_offset as u64 + self.base_length as u64
    }
}
