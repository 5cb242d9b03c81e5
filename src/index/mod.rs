//! Archive tables: index entries, the property table and the in-memory
//! file table.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::footer::Footer;
use crate::stream::{BinaryStream, StreamError};

// ── IndexEntry ───────────────────────────────────────────────────────────────

/// One row of the index table.
///
/// `offset` is stored exactly as on disk: relative to the footer's
/// `base_offset`.  Use [`IndexEntry::absolute_offset`] for a stream position.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexEntry {
    pub name:   String,
    pub offset: i32,
    pub length: i32,
}

impl IndexEntry {
    pub fn write<W: Write>(&self, out: &mut BinaryStream<W>) -> Result<(), StreamError> {
        out.write_string(&self.name)?;
        out.write_i32(self.offset)?;
        out.write_i32(self.length)?;
        Ok(())
    }

    pub fn read<R: Read>(input: &mut BinaryStream<R>) -> Result<Self, StreamError> {
        Ok(Self {
            name:   input.read_string()?,
            offset: input.read_i32()?,
            length: input.read_i32()?,
        })
    }

    /// Stream position of the entry's first byte.  Widened so a hostile
    /// offset can never overflow; the result may be negative.
    pub fn absolute_offset(&self, base_offset: u32) -> i64 {
        base_offset as i64 + self.offset as i64
    }

    /// True when the whole range lies inside the footer's base region.
    pub fn in_bounds(&self, footer: &Footer) -> bool {
        let end = self.absolute_offset(footer.base_offset) + self.length as i64;
        self.offset >= 0 && self.length >= 0 && end <= footer.base_end() as i64
    }
}

// ── Properties ───────────────────────────────────────────────────────────────

/// A single key/value row of the property table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Property {
    pub key:   String,
    pub value: String,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    pub fn write<W: Write>(&self, out: &mut BinaryStream<W>) -> Result<(), StreamError> {
        out.write_string(&self.key)?;
        out.write_string(&self.value)
    }

    pub fn read<R: Read>(input: &mut BinaryStream<R>) -> Result<Self, StreamError> {
        Ok(Self {
            key:   input.read_string()?,
            value: input.read_string()?,
        })
    }
}

/// Ordered property table.  Duplicate keys are kept so the table re-emits
/// exactly as it was read; lookups see the last occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Properties(Vec<Property>);

impl Properties {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(Property::new(key, value));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().rev().find(|p| p.key == key).map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> { self.0.iter() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<Property> for Properties {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| Property::new(k, v)).collect())
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item     = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

// ── FileTable ────────────────────────────────────────────────────────────────

/// Ordered `name → bytes` map.  Iteration order is insertion order, which is
/// the order files are laid out in the base region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileTable {
    files:     Vec<(String, Vec<u8>)>,
    /// Position of each name in `files`.
    positions: HashMap<String, usize>,
}

impl FileTable {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            files:     Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Add a file, or replace the bytes of an existing name without moving it.
    /// Returns the previous bytes when the name was already present.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        let name = name.into();
        let data = data.into();
        match self.positions.get(&name) {
            Some(&pos) => Some(std::mem::replace(&mut self.files[pos].1, data)),
            None => {
                self.positions.insert(name.clone(), self.files.len());
                self.files.push((name, data));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.positions.get(name).map(|&pos| self.files[pos].1.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool { self.positions.contains_key(name) }

    /// Remove a file.  Later files move up one position.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let pos = self.positions.remove(name)?;
        let (_, data) = self.files.remove(pos);
        for (n, _) in &self.files[pos..] {
            if let Some(p) = self.positions.get_mut(n) {
                *p -= 1;
            }
        }
        Some(data)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(n, d)| (n.as_str(), d.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize { self.files.len() }

    pub fn is_empty(&self) -> bool { self.files.is_empty() }

    /// Sum of all file lengths.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|(_, d)| d.len() as u64).sum()
    }
}

impl<N: Into<String>, D: Into<Vec<u8>>> FromIterator<(N, D)> for FileTable {
    fn from_iter<I: IntoIterator<Item = (N, D)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut table = FileTable::with_capacity(iter.size_hint().0);
        for (name, data) in iter {
            table.insert(name, data);
        }
        table
    }
}

impl IntoIterator for FileTable {
    type Item     = (String, Vec<u8>);
    type IntoIter = std::vec::IntoIter<(String, Vec<u8>)>;
    fn into_iter(self) -> Self::IntoIter { self.files.into_iter() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn index_entry_wire_layout() {
        let entry = IndexEntry { name: "a.txt".into(), offset: 2, length: 3 };
        let mut s = BinaryStream::big_endian(Cursor::new(Vec::new()));
        entry.write(&mut s).unwrap();
        assert_eq!(
            s.into_inner().into_inner(),
            vec![0, 5, b'a', b'.', b't', b'x', b't', 0, 0, 0, 2, 0, 0, 0, 3]
        );
    }

    #[test]
    fn absolute_offset_does_not_overflow() {
        let entry = IndexEntry { name: "x".into(), offset: i32::MAX, length: i32::MAX };
        assert_eq!(entry.absolute_offset(u32::MAX), u32::MAX as i64 + i32::MAX as i64);
        assert!(!entry.in_bounds(&base(u32::MAX, 0)));

        let negative = IndexEntry { name: "y".into(), offset: -10, length: 1 };
        assert_eq!(negative.absolute_offset(2), -8);
        assert!(!negative.in_bounds(&base(2, 100)));
    }

    fn base(base_offset: u32, base_length: u32) -> Footer {
        Footer { base_offset, base_length, ..Footer::default() }
    }

    #[test]
    fn in_bounds_edges() {
        let entry = IndexEntry { name: "z".into(), offset: 2, length: 3 };
        assert!(entry.in_bounds(&base(2, 5)));
        assert!(!entry.in_bounds(&base(2, 4)));

        let last = IndexEntry { name: "end".into(), offset: 0, length: 5 };
        assert!(last.in_bounds(&base(u32::MAX - 5, 5)));
    }

    #[test]
    fn properties_keep_duplicates() {
        let mut props = Properties::new();
        props.push("link", "a");
        props.push("link", "b");
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("link"), Some("b"));
        assert_eq!(props.get("missing"), None);
    }

    #[test]
    fn file_table_replace_keeps_order() {
        let mut files = FileTable::new();
        files.insert("a", b"1".to_vec());
        files.insert("b", b"2".to_vec());
        assert_eq!(files.insert("a", b"3".to_vec()), Some(b"1".to_vec()));
        let names: Vec<&str> = files.names().collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(files.get("a"), Some(&b"3"[..]));
        assert_eq!(files.total_size(), 2);
    }

    #[test]
    fn file_table_remove() {
        let mut files: FileTable = [("a", b"1".to_vec()), ("b", b"22".to_vec())].into_iter().collect();
        assert_eq!(files.remove("a"), Some(b"1".to_vec()));
        assert!(!files.contains("a"));
        assert_eq!(files.len(), 1);
        assert_eq!(files.remove("a"), None);
    }

    #[test]
    fn file_table_lookups_follow_removals() {
        let mut files: FileTable = (0..5).map(|i| (format!("f{i}"), vec![i as u8])).collect();
        files.remove("f1");
        files.remove("f3");
        assert_eq!(files.names().collect::<Vec<_>>(), ["f0", "f2", "f4"]);
        assert_eq!(files.get("f4"), Some(&[4u8][..]));
        assert_eq!(files.insert("f2", vec![22]), Some(vec![2]));
        files.insert("f1", vec![11]);
        assert_eq!(files.names().collect::<Vec<_>>(), ["f0", "f2", "f4", "f1"]);
        assert_eq!(files.get("f1"), Some(&[11u8][..]));
        assert_eq!(files.get("f2"), Some(&[22u8][..]));
    }

    #[test]
    fn large_file_table() {
        let n = 50_000;
        let mut files: FileTable = (0..n).map(|i| (format!("maps/{i}.dlm"), vec![(i % 251) as u8; 4]))
            .collect();
        assert_eq!(files.len(), n);
        assert_eq!(files.get("maps/49999.dlm"), Some(&[(49_999 % 251) as u8; 4][..]));
        assert_eq!(files.insert("maps/0.dlm", vec![1]), Some(vec![0; 4]));
        assert_eq!(files.len(), n);
        assert_eq!(files.names().next(), Some("maps/0.dlm"));
    }
}
