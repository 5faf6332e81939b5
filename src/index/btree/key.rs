//! Key codec - typed index keys and their byte encodings.
//!
//! An index is declared over exactly one [`KeyType`]. Keys are stored in
//! nodes as raw bytes with no type tag, so the declared type is what
//! selects the decoder:
//!
//! | Type        | Encoding                         |
//! |-------------|----------------------------------|
//! | `Text`      | raw UTF-8 bytes (variable)       |
//! | `Boolean`   | 1 byte, 0 or 1                   |
//! | `Int8..64`  | 1/2/4/8 bytes, big-endian        |
//! | `Float32/64`| 4/8 bytes, big-endian IEEE 754   |
//! | `Timestamp` | 8 bytes, big-endian epoch millis |

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};

/// The declared type of an index's keys.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Text = 0,
    Boolean = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    Float32 = 6,
    Float64 = 7,
    Timestamp = 8,
}

impl KeyType {
    /// Every supported key type.
    pub const ALL: [KeyType; 9] = [
        KeyType::Text,
        KeyType::Boolean,
        KeyType::Int8,
        KeyType::Int16,
        KeyType::Int32,
        KeyType::Int64,
        KeyType::Float32,
        KeyType::Float64,
        KeyType::Timestamp,
    ];

    /// Map a table-schema column tag to a key type.
    ///
    /// Tags follow the schema block's column enum:
    /// `0 = VARCHAR, 1 = INTEGER, 2 = BOOLEAN, 3 = FLOAT, 4 = DOUBLE`.
    ///
    /// # Errors
    /// Returns `Error::UnsupportedKeyType` for any other tag.
    pub fn from_column_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(KeyType::Text),
            1 => Ok(KeyType::Int32),
            2 => Ok(KeyType::Boolean),
            3 => Ok(KeyType::Float32),
            4 => Ok(KeyType::Float64),
            other => Err(Error::UnsupportedKeyType(format!("column tag {}", other))),
        }
    }

    /// Encoded width for fixed-width types, `None` for text.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            KeyType::Text => None,
            KeyType::Boolean | KeyType::Int8 => Some(1),
            KeyType::Int16 => Some(2),
            KeyType::Int32 | KeyType::Float32 => Some(4),
            KeyType::Int64 | KeyType::Float64 | KeyType::Timestamp => Some(8),
        }
    }

    /// Lowercase name, as shown in errors.
    pub fn name(&self) -> &'static str {
        match self {
            KeyType::Text => "text",
            KeyType::Boolean => "boolean",
            KeyType::Int8 => "int8",
            KeyType::Int16 => "int16",
            KeyType::Int32 => "int32",
            KeyType::Int64 => "int64",
            KeyType::Float32 => "float32",
            KeyType::Float64 => "float64",
            KeyType::Timestamp => "timestamp",
        }
    }

    /// Encode a key of this type.
    ///
    /// # Errors
    /// Returns `Error::KeyTypeMismatch` if `key` is of a different type.
    pub fn encode(&self, key: &Key) -> Result<Vec<u8>> {
        if key.key_type() != *self {
            return Err(Error::KeyTypeMismatch {
                expected: *self,
                actual: key.key_type(),
            });
        }
        Ok(key.to_bytes())
    }

    /// Decode bytes produced by [`encode`](Self::encode) for this type.
    ///
    /// # Errors
    /// Returns `Error::MalformedKey` if the length is wrong for a
    /// fixed-width type or text is not valid UTF-8.
    pub fn decode(&self, bytes: &[u8]) -> Result<Key> {
        let malformed = || Error::MalformedKey {
            key_type: *self,
            len: bytes.len(),
        };

        if let Some(width) = self.fixed_width() {
            if bytes.len() != width {
                return Err(malformed());
            }
        }

        let key = match self {
            KeyType::Text => {
                let s = std::str::from_utf8(bytes).map_err(|_| malformed())?;
                Key::Text(s.to_owned())
            }
            KeyType::Boolean => Key::Boolean(bytes[0] != 0),
            KeyType::Int8 => Key::Int8(i8::from_be_bytes([bytes[0]])),
            KeyType::Int16 => Key::Int16(i16::from_be_bytes(fixed(bytes))),
            KeyType::Int32 => Key::Int32(i32::from_be_bytes(fixed(bytes))),
            KeyType::Int64 => Key::Int64(i64::from_be_bytes(fixed(bytes))),
            KeyType::Float32 => Key::Float32(f32::from_be_bytes(fixed(bytes))),
            KeyType::Float64 => Key::Float64(f64::from_be_bytes(fixed(bytes))),
            KeyType::Timestamp => Key::Timestamp(i64::from_be_bytes(fixed(bytes))),
        };
        Ok(key)
    }
}

/// Copy an already length-checked slice into an array.
#[inline]
fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyType {
    type Err = Error;

    /// Parse a column type name (case-insensitive), accepting both the
    /// names above and common SQL spellings.
    fn from_str(s: &str) -> Result<Self> {
        let key_type = match s.to_ascii_lowercase().as_str() {
            "text" | "varchar" | "string" => KeyType::Text,
            "boolean" | "bool" => KeyType::Boolean,
            "int8" | "tinyint" | "byte" => KeyType::Int8,
            "int16" | "smallint" | "short" => KeyType::Int16,
            "int32" | "int" | "integer" => KeyType::Int32,
            "int64" | "bigint" | "long" => KeyType::Int64,
            "float32" | "float" | "real" => KeyType::Float32,
            "float64" | "double" => KeyType::Float64,
            "timestamp" | "date" => KeyType::Timestamp,
            _ => return Err(Error::UnsupportedKeyType(s.to_owned())),
        };
        Ok(key_type)
    }
}

/// A typed key value.
///
/// # Ordering
/// Keys of the same type compare by natural value: numbers, booleans and
/// timestamps by value, floats by IEEE 754 total order (so `-0.0 < 0.0`
/// and NaN sorts last), text byte-lexicographically. An index only ever
/// compares keys of its declared type; keys of different types order by
/// type tag so that `Ord` stays total.
///
/// # Example
/// ```
/// use blockidx::index::btree::{Key, KeyType};
///
/// let key = Key::from(7i32);
/// let bytes = KeyType::Int32.encode(&key).unwrap();
/// assert_eq!(bytes, vec![0, 0, 0, 7]);
/// assert_eq!(KeyType::Int32.decode(&bytes).unwrap(), key);
/// assert!(Key::from("apple") < Key::from("banana"));
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    Text(String),
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
}

impl Key {
    /// The type of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            Key::Text(_) => KeyType::Text,
            Key::Boolean(_) => KeyType::Boolean,
            Key::Int8(_) => KeyType::Int8,
            Key::Int16(_) => KeyType::Int16,
            Key::Int32(_) => KeyType::Int32,
            Key::Int64(_) => KeyType::Int64,
            Key::Float32(_) => KeyType::Float32,
            Key::Float64(_) => KeyType::Float64,
            Key::Timestamp(_) => KeyType::Timestamp,
        }
    }

    /// Canonical byte encoding (see the module table).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Key::Text(s) => s.as_bytes().to_vec(),
            Key::Boolean(b) => vec![u8::from(*b)],
            Key::Int8(v) => v.to_be_bytes().to_vec(),
            Key::Int16(v) => v.to_be_bytes().to_vec(),
            Key::Int32(v) => v.to_be_bytes().to_vec(),
            Key::Int64(v) | Key::Timestamp(v) => v.to_be_bytes().to_vec(),
            Key::Float32(v) => v.to_be_bytes().to_vec(),
            Key::Float64(v) => v.to_be_bytes().to_vec(),
        }
    }

    /// Length of the canonical encoding.
    pub fn encoded_len(&self) -> usize {
        match self {
            Key::Text(s) => s.len(),
            other => other.key_type().fixed_width().unwrap_or(0),
        }
    }

    /// A timestamp key from a point in time (millisecond precision).
    pub fn timestamp(time: std::time::SystemTime) -> Self {
        let millis = match time.duration_since(std::time::UNIX_EPOCH) {
            Ok(after) => after.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Key::Timestamp(millis)
    }

    /// Total order over keys. See the type-level docs.
    pub fn compare(&self, other: &Key) -> Ordering {
        match (self, other) {
            (Key::Text(a), Key::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Key::Boolean(a), Key::Boolean(b)) => a.cmp(b),
            (Key::Int8(a), Key::Int8(b)) => a.cmp(b),
            (Key::Int16(a), Key::Int16(b)) => a.cmp(b),
            (Key::Int32(a), Key::Int32(b)) => a.cmp(b),
            (Key::Int64(a), Key::Int64(b)) => a.cmp(b),
            (Key::Float32(a), Key::Float32(b)) => a.total_cmp(b),
            (Key::Float64(a), Key::Float64(b)) => a.total_cmp(b),
            (Key::Timestamp(a), Key::Timestamp(b)) => a.cmp(b),
            (a, b) => (a.key_type() as u8).cmp(&(b.key_type() as u8)),
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Text(s) => write!(f, "{}", s),
            Key::Boolean(b) => write!(f, "{}", b),
            Key::Int8(v) => write!(f, "{}", v),
            Key::Int16(v) => write!(f, "{}", v),
            Key::Int32(v) => write!(f, "{}", v),
            Key::Int64(v) => write!(f, "{}", v),
            Key::Float32(v) => write!(f, "{}", v),
            Key::Float64(v) => write!(f, "{}", v),
            Key::Timestamp(ms) => write!(f, "@{}", ms),
        }
    }
}

macro_rules! impl_from_for_key {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Key {
                fn from(value: $ty) -> Self {
                    Key::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_key! {
    String => Text,
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_owned())
    }
}

// ============================================================================
// TESTS
// ============================================================================
