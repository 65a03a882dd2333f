//! Fixed-width key encoding and ordering.
//!
//! Every key stored in a node occupies exactly [`KeyType::width`] bytes,
//! which is what lets node sizes be computed from the order alone.

use std::cmp::Ordering;
use std::fmt;

use crate::common::{Error, Result};

/// Key variant configured for a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// 32-bit signed integer, little-endian.
    Int,
    /// 32-bit float, little-endian IEEE 754.
    Float,
    /// UTF-8 text, null-padded or truncated to the given byte width.
    Text(usize),
}

impl KeyType {
    /// Encoded size of one key in bytes.
    pub fn width(&self) -> usize {
        match self {
            KeyType::Int | KeyType::Float => 4,
            KeyType::Text(width) => *width,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            KeyType::Int => "int",
            KeyType::Float => "float",
            KeyType::Text(_) => "text",
        }
    }
}

/// A key value.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Int(i32),
    Float(f32),
    Text(String),
}

impl Key {
    fn type_name(&self) -> &'static str {
        match self {
            Key::Int(_) => "int",
            Key::Float(_) => "float",
            Key::Text(_) => "text",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Int(_) => 0,
            Key::Float(_) => 1,
            Key::Text(_) => 2,
        }
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value)
    }
}

impl From<f32> for Key {
    fn from(value: f32) -> Self {
        Key::Float(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Float(v) => write!(f, "{}", v),
            Key::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// Encodes, decodes and orders keys of one [`KeyType`].
///
/// # Example
/// ```
/// use bptree_index::{Key, KeyCodec, KeyType};
///
/// let codec = KeyCodec::new(KeyType::Text(4)).unwrap();
/// let bytes = codec.serialize(&Key::from("ab")).unwrap();
/// assert_eq!(bytes, b"ab\0\0");
/// assert_eq!(codec.deserialize(&bytes).unwrap(), Key::from("ab"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCodec {
    key_type: KeyType,
}

impl KeyCodec {
    /// # Errors
    /// Returns `Error::InvalidConfig` for a zero-width text key.
    pub fn new(key_type: KeyType) -> Result<Self> {
        if key_type.width() == 0 {
            return Err(Error::InvalidConfig("text keys need a non-zero width".into()));
        }
        Ok(Self { key_type })
    }

    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.key_type.width()
    }

    /// Check the variant and return the key exactly as it will decode.
    ///
    /// Text is truncated to the configured width (on a character boundary)
    /// and loses trailing NULs, so the in-memory key always equals its
    /// decoded form.
    ///
    /// # Errors
    /// Returns `Error::Format` if the key variant does not match.
    pub fn normalize(&self, key: &Key) -> Result<Key> {
        match (self.key_type, key) {
            (KeyType::Int, Key::Int(_)) | (KeyType::Float, Key::Float(_)) => Ok(key.clone()),
            (KeyType::Text(width), Key::Text(text)) => {
                let mut end = text.len().min(width);
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                Ok(Key::Text(text[..end].trim_end_matches('\0').to_string()))
            }
            _ => Err(self.mismatch(key)),
        }
    }

    /// Encode a key into exactly [`width`](Self::width) bytes of `out`.
    ///
    /// # Errors
    /// Returns `Error::Format` on a variant mismatch or a wrong-sized buffer.
    pub fn serialize_into(&self, key: &Key, out: &mut [u8]) -> Result<()> {
        if out.len() != self.width() {
            return Err(Error::Format(format!(
                "key buffer is {} bytes, expected {}",
                out.len(),
                self.width()
            )));
        }
        match (self.key_type, key) {
            (KeyType::Int, Key::Int(v)) => out.copy_from_slice(&v.to_le_bytes()),
            (KeyType::Float, Key::Float(v)) => out.copy_from_slice(&v.to_le_bytes()),
            (KeyType::Text(_), Key::Text(_)) => {
                let Key::Text(text) = self.normalize(key)? else {
                    return Err(self.mismatch(key));
                };
                out.fill(0);
                out[..text.len()].copy_from_slice(text.as_bytes());
            }
            _ => return Err(self.mismatch(key)),
        }
        Ok(())
    }

    pub fn serialize(&self, key: &Key) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.width()];
        self.serialize_into(key, &mut out)?;
        Ok(out)
    }

    /// Decode a key from exactly [`width`](Self::width) bytes.
    ///
    /// # Errors
    /// Returns `Error::Format` on a wrong length or text that is not UTF-8.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Key> {
        if bytes.len() != self.width() {
            return Err(Error::Format(format!(
                "key is {} bytes, expected {}",
                bytes.len(),
                self.width()
            )));
        }
        let mut word = [0u8; 4];
        match self.key_type {
            KeyType::Int => {
                word.copy_from_slice(bytes);
                Ok(Key::Int(i32::from_le_bytes(word)))
            }
            KeyType::Float => {
                word.copy_from_slice(bytes);
                Ok(Key::Float(f32::from_le_bytes(word)))
            }
            KeyType::Text(_) => {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                let text = std::str::from_utf8(&bytes[..end])
                    .map_err(|e| Error::Format(format!("text key is not UTF-8: {}", e)))?;
                Ok(Key::Text(text.to_string()))
            }
        }
    }

    /// Total order over keys.
    ///
    /// Floats use IEEE total ordering so NaN has a fixed place. Keys of
    /// different variants never meet inside one tree; they order by variant.
    pub fn compare(&self, a: &Key, b: &Key) -> Ordering {
        match (a, b) {
            (Key::Int(x), Key::Int(y)) => x.cmp(y),
            (Key::Float(x), Key::Float(y)) => x.total_cmp(y),
            (Key::Text(x), Key::Text(y)) => x.as_bytes().cmp(y.as_bytes()),
            _ => a.rank().cmp(&b.rank()),
        }
    }

    fn mismatch(&self, key: &Key) -> Error {
        Error::Format(format!(
            "expected {} key, got {} key {}",
            self.key_type.name(),
            key.type_name(),
            key
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(key_type: KeyType) -> KeyCodec {
        KeyCodec::new(key_type).unwrap()
    }

    #[test]
    fn test_int_layout() {
        let c = codec(KeyType::Int);
        assert_eq!(c.width(), 4);
        assert_eq!(c.serialize(&Key::Int(0x04030201)).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(c.deserialize(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap(), Key::Int(-1));
    }

    #[test]
    fn test_float_roundtrip() {
        let c = codec(KeyType::Float);
        let bytes = c.serialize(&Key::Float(2.5)).unwrap();
        assert_eq!(c.deserialize(&bytes).unwrap(), Key::Float(2.5));
    }

    #[test]
    fn test_text_padding_and_truncation() {
        let c = codec(KeyType::Text(5));
        assert_eq!(c.serialize(&Key::from("ab")).unwrap(), b"ab\0\0\0");
        assert_eq!(c.serialize(&Key::from("abcdefg")).unwrap(), b"abcde");
        assert_eq!(c.deserialize(b"abcde").unwrap(), Key::from("abcde"));
        assert_eq!(c.deserialize(b"ab\0\0\0").unwrap(), Key::from("ab"));
    }

    #[test]
    fn test_text_truncates_on_char_boundary() {
        let c = codec(KeyType::Text(3));
        // 'é' is two bytes; cutting at 3 would split it
        let normalized = c.normalize(&Key::from("aéb")).unwrap();
        assert_eq!(normalized, Key::from("aé"));
        let bytes = c.serialize(&Key::from("aéb")).unwrap();
        assert_eq!(c.deserialize(&bytes).unwrap(), normalized);
    }

    #[test]
    fn test_variant_mismatch_is_format_error() {
        let c = codec(KeyType::Int);
        assert!(matches!(c.serialize(&Key::from("x")), Err(Error::Format(_))));
        assert!(matches!(c.normalize(&Key::Float(1.0)), Err(Error::Format(_))));
    }

    #[test]
    fn test_wrong_length_is_format_error() {
        let c = codec(KeyType::Int);
        assert!(matches!(c.deserialize(&[1, 2, 3]), Err(Error::Format(_))));
        let mut out = [0u8; 8];
        assert!(matches!(c.serialize_into(&Key::Int(1), &mut out), Err(Error::Format(_))));
    }

    #[test]
    fn test_invalid_utf8_is_format_error() {
        let c = codec(KeyType::Text(2));
        assert!(matches!(c.deserialize(&[0xC3, 0x28]), Err(Error::Format(_))));
    }

    #[test]
    fn test_compare() {
        let ints = codec(KeyType::Int);
        assert_eq!(ints.compare(&Key::Int(-5), &Key::Int(3)), Ordering::Less);
        assert_eq!(ints.compare(&Key::Int(3), &Key::Int(3)), Ordering::Equal);

        let floats = codec(KeyType::Float);
        assert_eq!(floats.compare(&Key::Float(1.5), &Key::Float(-2.0)), Ordering::Greater);
        assert_eq!(floats.compare(&Key::Float(f32::NAN), &Key::Float(f32::NAN)), Ordering::Equal);

        let text = codec(KeyType::Text(8));
        assert_eq!(text.compare(&Key::from("apple"), &Key::from("banana")), Ordering::Less);
        assert_eq!(text.compare(&Key::from("ab"), &Key::from("a")), Ordering::Greater);
    }

    #[test]
    fn test_zero_width_text_rejected() {
        assert!(matches!(KeyCodec::new(KeyType::Text(0)), Err(Error::InvalidConfig(_))));
    }
}
