use std::fmt;

use uuid::Uuid;

use super::HandleError;

/// Opaque 16-byte NFS file handle
///
/// Random, never interpreted by clients, and serialized byte-exact.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(Uuid);

impl FileHandle {
    /// Wire length of a handle
    pub const LEN: usize = 16;

    /// Mint a fresh random handle
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse a handle received from a client
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HandleError> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| HandleError::Malformed(bytes.len()))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        self.0.as_bytes()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl TryFrom<&[u8]> for FileHandle {
    type Error = HandleError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl AsRef<[u8]> for FileHandle {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHandle({})", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_are_exact() {
        let handle = FileHandle::generate();
        let bytes = handle.to_vec();

        assert_eq!(bytes.len(), FileHandle::LEN);
        assert_eq!(FileHandle::from_slice(&bytes).unwrap(), handle);
        assert_eq!(FileHandle::from_bytes(*handle.as_bytes()), handle);
    }

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(FileHandle::generate(), FileHandle::generate());
    }

    #[test]
    fn test_malformed_length() {
        let err = FileHandle::try_from(&[1u8, 2, 3][..]).unwrap_err();
        assert!(matches!(err, HandleError::Malformed(3)));
    }

    #[test]
    fn test_display_is_hex() {
        let handle = FileHandle::from_bytes([0xab; 16]);
        assert_eq!(handle.to_string(), "ab".repeat(16));
        let raw: &[u8] = handle.as_ref();
        assert_eq!(raw, &[0xab; 16][..]);
    }
}
