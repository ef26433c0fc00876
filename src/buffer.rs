use bytes::Bytes;
use std::fmt;

/// An opaque byte payload flowing through the input gate.
///
/// Backed by `bytes::Bytes` so clones are cheap (reference counted) and
/// static payloads are zero-copy. The runtime never interprets the contents;
/// decoding happens in the default action.
#[derive(Clone, Default)]
pub struct NetworkBuffer {
  data: Bytes,
}

impl NetworkBuffer {
  /// Creates a buffer from a `Vec<u8>`, taking ownership.
  pub fn from_vec(data: Vec<u8>) -> Self {
    Self { data: Bytes::from(data) }
  }

  /// Creates a buffer from `bytes::Bytes`.
  pub fn from_bytes(data: Bytes) -> Self {
    Self { data }
  }

  /// Creates a buffer from a static byte slice (zero-copy).
  pub fn from_static(data: &'static [u8]) -> Self {
    Self {
      data: Bytes::from_static(data),
    }
  }

  /// Returns the payload bytes.
  pub fn data(&self) -> &[u8] {
    &self.data
  }

  /// Returns the payload size in bytes.
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// Returns the internal `Bytes` object. Cloning `Bytes` is cheap as it is
  /// reference-counted.
  pub fn into_bytes(self) -> Bytes {
    self.data
  }

  /// Decodes the payload as UTF-8 text, replacing invalid sequences.
  pub fn to_utf8_lossy(&self) -> String {
    String::from_utf8_lossy(&self.data).into_owned()
  }
}

impl From<&str> for NetworkBuffer {
  fn from(s: &str) -> Self {
    Self::from_vec(s.as_bytes().to_vec())
  }
}

impl fmt::Debug for NetworkBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Avoid printing payload contents
    f.debug_struct("NetworkBuffer").field("size", &self.len()).finish()
  }
}
