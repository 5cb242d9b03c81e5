//! Indexed multi-file archive reader.
//!
//! ```no_run
//! use pakfile::archive::Archive;
//!
//! let ar = Archive::open(std::fs::File::open("assets.pak")?)?;
//! for (name, data) in ar.files().iter() {
//!     println!("{name}: {} bytes", data.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Layout
//! ```text
//! [ 02 01 ][ base region ][ index table ][ property table ][ footer (24 B) ]
//! ```
//! All integers are big-endian.  The footer is the only trusted source of
//! layout; both tables are located by seeking to the footer's offsets.
//!
//! # Lifecycle
//! An archive is `Unopened`, `Opened` (footer and tables parsed) or
//! `Loaded` (every file read into memory).  `load` is one-shot.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};

use thiserror::Error;

use crate::footer::{Footer, FOOTER_SIZE};
use crate::index::{FileTable, IndexEntry, Properties, Property};
use crate::stream::{BinaryStream, StreamError};

/// Leading two bytes of every archive.
pub const MAGIC: [u8; 2] = [0x02, 0x01];

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("First bytes don't match the archive magic 02 01")]
    MalformedHeader,
    #[error("File too short or corrupt footer: {0}")]
    TruncatedFooter(#[source] StreamError),
    #[error("Index entry {index} is corrupt: {source}")]
    CorruptIndexEntry { index: u32, #[source] source: StreamError },
    #[error("Property entry {index} is corrupt: {source}")]
    CorruptPropertyEntry { index: u32, #[source] source: StreamError },
    #[error("Archive is already loaded")]
    AlreadyLoaded,
    #[error("Archive is not opened")]
    NotInitialized,
    #[error("Archive files are not loaded")]
    NotLoaded,
    #[error("A template must be set to build an archive")]
    MissingTemplate,
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Entry {name:?} ({offset}+{length}) lies outside the stream")]
    EntryOutOfRange { name: String, offset: i64, length: i32 },
    #[error("Archive layout does not fit the on-disk field widths: {0}")]
    LayoutOverflow(&'static str),
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        ArchiveError::Stream(e.into())
    }
}

// ── OpenOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`Archive::open_with`].
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    /// Read every file into memory as part of opening.
    pub autoload: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self { autoload: true }
    }
}

// ── ArchiveState ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveState {
    #[default]
    Unopened,
    Opened,
    Loaded,
}

// ── Archive ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Archive<S> {
    stream:     Option<BinaryStream<S>>,
    state:      ArchiveState,
    footer:     Footer,
    entries:    Vec<IndexEntry>,
    /// Index row of each name; the first row wins when a name repeats.
    positions:  HashMap<String, usize>,
    properties: Properties,
    files:      FileTable,
}

impl<S> Default for Archive<S> {
    fn default() -> Self {
        Self {
            stream:     None,
            state:      ArchiveState::Unopened,
            footer:     Footer::default(),
            entries:    Vec::new(),
            positions:  HashMap::new(),
            properties: Properties::new(),
            files:      FileTable::new(),
        }
    }
}

impl<S: Read + Seek> Archive<S> {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// An archive with no stream.  Only useful as a placeholder: every
    /// stream operation on it fails with [`ArchiveError::NotInitialized`].
    pub fn unopened() -> Self {
        Self::default()
    }

    /// Open and load every file.
    pub fn open(stream: S) -> Result<Self, ArchiveError> {
        Self::open_with(stream, OpenOptions::default())
    }

    /// Parse the footer, index table and property table.  Files are read
    /// only when `opts.autoload` is set.
    pub fn open_with(stream: S, opts: OpenOptions) -> Result<Self, ArchiveError> {
        let mut input = BinaryStream::big_endian(stream);

        match input.read_bytes(MAGIC.len()) {
            Ok(magic) if magic == MAGIC => {}
            Ok(_) => return Err(ArchiveError::MalformedHeader),
            Err(e) if e.is_eof() => return Err(ArchiveError::MalformedHeader),
            Err(e) => return Err(e.into()),
        }

        let footer = read_footer(&mut input)?;
        tracing::debug!(
            base_offset = footer.base_offset,
            base_length = footer.base_length,
            indexes_offset = format_args!("{:#x}", footer.indexes_offset),
            properties_offset = format_args!("{:#x}", footer.properties_offset),
            "read archive footer"
        );

        input.seek(SeekFrom::Start(footer.indexes_offset as u64))?;
        let mut entries = Vec::new();
        let mut positions = HashMap::new();
        for index in 0..footer.number_indexes {
            let entry = IndexEntry::read(&mut input)
                .map_err(|source| ArchiveError::CorruptIndexEntry { index, source })?;
            if !entry.in_bounds(&footer) {
                tracing::trace!(name = %entry.name, offset = entry.offset, length = entry.length,
                    "index entry outside base region");
            }
            positions.entry(entry.name.clone()).or_insert(entries.len());
            entries.push(entry);
        }

        input.seek(SeekFrom::Start(footer.properties_offset as u64))?;
        let mut properties = Properties::new();
        for index in 0..footer.number_properties {
            let Property { key, value } = Property::read(&mut input)
                .map_err(|source| ArchiveError::CorruptPropertyEntry { index, source })?;
            properties.push(key, value);
        }

        tracing::debug!(
            entries = entries.len(),
            properties = properties.len(),
            "opened archive"
        );

        let mut archive = Self {
            stream: Some(input),
            state: ArchiveState::Opened,
            footer,
            entries,
            positions,
            properties,
            files: FileTable::new(),
        };
        if opts.autoload {
            archive.load()?;
        }
        Ok(archive)
    }

    // ── Loading ──────────────────────────────────────────────────────────────

    /// Read every indexed file into memory, in index order.  Must be called
    /// exactly once on an opened archive.
    pub fn load(&mut self) -> Result<(), ArchiveError> {
        match self.state {
            ArchiveState::Unopened => return Err(ArchiveError::NotInitialized),
            ArchiveState::Loaded   => return Err(ArchiveError::AlreadyLoaded),
            ArchiveState::Opened   => {}
        }

        let mut files = FileTable::with_capacity(self.entries.len());
        for i in 0..self.entries.len() {
            let data = self.read_entry(i)?;
            let name = self.entries[i].name.clone();
            files.insert(name, data);
        }

        tracing::debug!(files = files.len(), bytes = files.total_size(), "loaded archive");
        self.files = files;
        self.state = ArchiveState::Loaded;
        Ok(())
    }

    /// Contents of one file.  Served from memory once loaded, otherwise read
    /// from the stream without changing the archive's state.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        match self.state {
            ArchiveState::Unopened => Err(ArchiveError::NotInitialized),
            ArchiveState::Loaded   => self.files.get(name)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| ArchiveError::FileNotFound(name.to_owned())),
            ArchiveState::Opened   => {
                let i = *self.positions.get(name)
                    .ok_or_else(|| ArchiveError::FileNotFound(name.to_owned()))?;
                self.read_entry(i)
            }
        }
    }

    fn read_entry(&mut self, i: usize) -> Result<Vec<u8>, ArchiveError> {
        let base_offset = self.footer.base_offset;
        let entry  = &self.entries[i];
        let input  = self.stream.as_mut().ok_or(ArchiveError::NotInitialized)?;
        let offset = entry.absolute_offset(base_offset);

        let out_of_range = || ArchiveError::EntryOutOfRange {
            name:   entry.name.clone(),
            offset,
            length: entry.length,
        };
        let (Ok(start), Ok(len)) = (u64::try_from(offset), usize::try_from(entry.length)) else {
            return Err(out_of_range());
        };

        input.seek(SeekFrom::Start(start))?;
        match input.read_bytes(len) {
            Ok(data) => Ok(data),
            Err(e) if e.is_eof() => Err(out_of_range()),
            Err(e) => Err(e.into()),
        }
    }
}

impl<S> Archive<S> {
    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn state(&self) -> ArchiveState { self.state }

    pub fn is_loaded(&self) -> bool { self.state == ArchiveState::Loaded }

    pub fn footer(&self) -> &Footer { &self.footer }

    /// Index table in on-disk order.
    pub fn entries(&self) -> &[IndexEntry] { &self.entries }

    pub fn entry(&self, name: &str) -> Option<&IndexEntry> {
        self.positions.get(name).map(|&i| &self.entries[i])
    }

    pub fn properties(&self) -> &Properties { &self.properties }

    /// Replace this archive's property table, e.g. before using it as a
    /// build template.
    pub fn set_properties(&mut self, properties: Properties) {
        self.properties = properties;
    }

    /// Loaded file contents.  Empty until [`Archive::load`] has run.
    pub fn files(&self) -> &FileTable { &self.files }

    pub fn file(&self, name: &str) -> Option<&[u8]> { self.files.get(name) }

    /// Give back the underlying stream, if the archive was ever opened.
    pub fn into_inner(self) -> Option<S> {
        self.stream.map(BinaryStream::into_inner)
    }
}

fn read_footer<R: Read + Seek>(input: &mut BinaryStream<R>) -> Result<Footer, ArchiveError> {
    let len = input.stream_len()?;
    if len < FOOTER_SIZE {
        return Err(ArchiveError::TruncatedFooter(StreamError::UnexpectedEof {
            expected: FOOTER_SIZE as usize,
            actual:   len as usize,
        }));
    }
    input.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
    Footer::read(input).map_err(ArchiveError::TruncatedFooter)
}
