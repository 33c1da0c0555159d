//! Snapshot: the opaque, precompiled program handed to an engine.

use std::fmt;
use std::path::Path;

use bytes::Bytes;

/// Immutable snapshot bytes.
///
/// No validation is done here; what counts as a well-formed snapshot is
/// decided by the engine that runs it. Cloning shares the buffer.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Snapshot(Bytes);

impl Snapshot {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }

    /// Read a snapshot file verbatim.
    pub fn read_from(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self(Bytes::from(data)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Snapshot {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<Bytes> for Snapshot {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

// 中身は巨大になりうるので長さだけ出す
impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(vec![])]
    #[case::three_bytes(vec![0x01, 0x02, 0x03])]
    #[case::non_utf8(vec![0xff, 0x00, 0xfe])]
    fn keeps_bytes_verbatim(#[case] raw: Vec<u8>) {
        let snapshot = Snapshot::from(raw.clone());
        assert_eq!(snapshot.as_bytes(), raw.as_slice());
        assert_eq!(snapshot.len(), raw.len());
        assert_eq!(snapshot.is_empty(), raw.is_empty());
    }

    #[test]
    fn debug_does_not_print_content() {
        let snapshot = Snapshot::from_static(b"secret");
        assert_eq!(format!("{snapshot:?}"), "Snapshot(6 bytes)");
    }

    #[test]
    fn read_from_loads_file_contents() {
        let path = std::env::temp_dir().join(format!("snaprun-{}.snap", ulid::Ulid::new()));
        std::fs::write(&path, [0x01, 0x02, 0x03]).unwrap();

        let snapshot = Snapshot::read_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(snapshot.as_bytes(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn read_from_missing_file_is_io_error() {
        let path = std::env::temp_dir().join(format!("snaprun-missing-{}", ulid::Ulid::new()));
        let err = Snapshot::read_from(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
