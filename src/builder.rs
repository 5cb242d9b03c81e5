//! Archive writer.
//!
//! [`ArchiveBuilder`] lays a [`FileTable`] out in the canonical order
//! (magic, base region, index table, property table, footer).  The property
//! table is borrowed from a template archive and re-emitted verbatim, so
//! rebuilding a loaded archive with itself as template reproduces the
//! original bytes.

use std::io::{Seek, Write};

use crate::archive::{Archive, ArchiveError, MAGIC};
use crate::footer::Footer;
use crate::index::{FileTable, IndexEntry, Properties};
use crate::stream::BinaryStream;

#[derive(Debug, Default)]
pub struct ArchiveBuilder<'t> {
    template: Option<&'t Properties>,
    files:    FileTable,
    /// Relative layout of `files`, rebuilt on every assignment.
    entries:  Vec<IndexEntry>,
    footer:   Option<Footer>,
}

impl<'t> ArchiveBuilder<'t> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-filled with a loaded archive's files, using the same
    /// archive as template.
    pub fn from_template<S>(template: &'t Archive<S>) -> Result<Self, ArchiveError> {
        if !template.is_loaded() {
            return Err(ArchiveError::NotLoaded);
        }
        let mut builder = Self::new();
        builder.set_template(template);
        builder.set_files(template.files().clone())?;
        Ok(builder)
    }

    /// Borrow `template`'s property table for every subsequent build.
    pub fn set_template<S>(&mut self, template: &'t Archive<S>) {
        self.template = Some(template.properties());
    }

    /// Replace the file table and recompute the whole layout from scratch.
    pub fn set_files(&mut self, files: FileTable) -> Result<(), ArchiveError> {
        let layout = relative_layout(files.iter().map(|(_, data)| data.len()))?;
        let entries = files.names().zip(layout)
            .map(|(name, (offset, length))| IndexEntry { name: name.to_owned(), offset, length })
            .collect();
        self.files   = files;
        self.entries = entries;
        self.footer  = None;
        Ok(())
    }

    pub fn files(&self) -> &FileTable { &self.files }

    /// Index rows the next build will write, offsets relative to the base
    /// region.
    pub fn entries(&self) -> &[IndexEntry] { &self.entries }

    /// Footer written by the last successful [`ArchiveBuilder::build`].
    pub fn footer(&self) -> Option<&Footer> { self.footer.as_ref() }

    /// Write the archive at the writer's current position.  Footer offsets
    /// are absolute positions in `writer`.
    pub fn build<W: Write + Seek>(&mut self, writer: W) -> Result<Footer, ArchiveError> {
        let properties = self.template.ok_or(ArchiveError::MissingTemplate)?;
        let mut out = BinaryStream::big_endian(writer);

        out.write_bytes(&MAGIC)?;

        let base_offset = position_u32(&mut out)?;
        for (_, data) in self.files.iter() {
            out.write_bytes(data)?;
        }
        let indexes_offset = position_u32(&mut out)?;
        let base_length = indexes_offset - base_offset;

        for entry in &self.entries {
            entry.write(&mut out)?;
        }
        let properties_offset = position_u32(&mut out)?;

        for property in properties {
            property.write(&mut out)?;
        }

        let footer = Footer {
            base_offset,
            base_length,
            indexes_offset,
            number_indexes:    count_u32(self.entries.len())?,
            properties_offset,
            number_properties: count_u32(properties.len())?,
        };
        footer.write(&mut out)?;

        tracing::debug!(
            base_offset,
            base_length,
            entries = footer.number_indexes,
            properties = footer.number_properties,
            "built archive"
        );
        self.footer = Some(footer);
        Ok(footer)
    }
}

/// `(offset, length)` of each file placed back to back from offset 0.  Only
/// stored offsets and lengths must fit `i32`; the region as a whole may run
/// up to `u32::MAX` bytes.
fn relative_layout<I>(lengths: I) -> Result<Vec<(i32, i32)>, ArchiveError>
where
    I: IntoIterator<Item = usize>,
{
    let mut layout = Vec::new();
    let mut total: u64 = 0;
    for len in lengths {
        let offset = i32::try_from(total)
            .map_err(|_| ArchiveError::LayoutOverflow("file offset exceeds i32"))?;
        let length = i32::try_from(len)
            .map_err(|_| ArchiveError::LayoutOverflow("file length exceeds i32"))?;
        layout.push((offset, length));
        total += length as u64;
    }
    if total > u32::MAX as u64 {
        return Err(ArchiveError::LayoutOverflow("base region exceeds u32"));
    }
    Ok(layout)
}

fn position_u32<W: Seek>(out: &mut BinaryStream<W>) -> Result<u32, ArchiveError> {
    u32::try_from(out.position()?)
        .map_err(|_| ArchiveError::LayoutOverflow("stream position exceeds u32"))
}

fn count_u32(n: usize) -> Result<u32, ArchiveError> {
    u32::try_from(n).map_err(|_| ArchiveError::LayoutOverflow("table count exceeds u32"))
}
