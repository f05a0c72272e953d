use smol_str::SmolStr;

pub use text_size::{TextRange, TextSize};

/// Opaque handle to a source buffer.
///
/// Buffers are owned by the external source manager; the semantic layer
/// only ever compares and orders these ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A span within a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: FileId,
    pub range: TextRange,
}

impl Span {
    pub fn new(file: FileId, range: TextRange) -> Self {
        Self { file, range }
    }

    /// Zero-length span at offset 0 of a file. Used for synthetic
    /// entities that have no source text (builtins, the root symbol).
    pub fn detached(file: FileId) -> Self {
        Self {
            file,
            range: TextRange::default(),
        }
    }

    /// Ordering key for diagnostic emission: file first, then offset.
    pub fn sort_key(&self) -> (u32, u32, u32) {
        (
            self.file.0,
            u32::from(self.range.start()),
            u32::from(self.range.end()),
        )
    }
}

/// The source library a syntax tree belongs to.
///
/// Library mapping happens in the driver; the semantic layer only uses
/// the tag to order same-name definitions from different libraries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryName(pub SmolStr);

impl LibraryName {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_sort_key_orders_by_file_then_offset() {
        let a = Span::new(FileId(0), TextRange::new(5.into(), 9.into()));
        let b = Span::new(FileId(0), TextRange::new(7.into(), 8.into()));
        let c = Span::new(FileId(1), TextRange::new(0.into(), 1.into()));
        assert!(a.sort_key() < b.sort_key());
        assert!(b.sort_key() < c.sort_key());
    }

    #[test]
    fn detached_span_is_empty() {
        let s = Span::detached(FileId(3));
        assert_eq!(s.range.len(), 0.into());
    }

    #[test]
    fn library_name_compares_by_text() {
        assert_eq!(LibraryName::new("lib1"), LibraryName::new("lib1"));
        assert_ne!(LibraryName::new("lib1"), LibraryName::new("lib2"));
    }
}
