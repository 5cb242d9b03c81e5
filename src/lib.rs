pub mod stream;
pub mod footer;
pub mod index;
pub mod archive;
pub mod builder;
pub mod manifest;

pub use stream::{BinaryStream, Endian, StreamError};
pub use footer::Footer;
pub use index::{FileTable, IndexEntry, Properties, Property};
pub use archive::{Archive, ArchiveError, ArchiveState, OpenOptions};
pub use builder::ArchiveBuilder;
pub use manifest::{Manifest, ManifestBuilder, ManifestError};
