//! Element types and byte order.

use serde::{Deserialize, Serialize};

/// Element type of a variable or structure member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Byte,
    UByte,
    Char,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Enum1,
    Enum2,
    Enum4,
    /// Fixed-length string in a file, variable-length on the structure heap.
    String,
    Opaque,
    Structure,
    Sequence,
}

/// Storage kind shared by several element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Opaque,
}

impl DataType {
    /// Encoded size of one element in bytes.
    ///
    /// Returns 0 for types without a fixed encoding (string, opaque,
    /// structure, sequence); their size comes from the layout or member.
    pub fn size(&self) -> usize {
        match self {
            Self::Boolean | Self::Byte | Self::UByte | Self::Char | Self::Enum1 => 1,
            Self::Short | Self::UShort | Self::Enum2 => 2,
            Self::Int | Self::UInt | Self::Enum4 | Self::Float => 4,
            Self::Long | Self::ULong | Self::Double => 8,
            Self::String | Self::Opaque | Self::Structure | Self::Sequence => 0,
        }
    }

    /// The primitive storage used for values of this type, if any.
    pub fn storage_kind(&self) -> Option<StorageKind> {
        match self {
            Self::Boolean | Self::Byte | Self::UByte | Self::Char | Self::Enum1 => {
                Some(StorageKind::Byte)
            }
            Self::Short | Self::UShort | Self::Enum2 => Some(StorageKind::Short),
            Self::Int | Self::UInt | Self::Enum4 => Some(StorageKind::Int),
            Self::Long | Self::ULong => Some(StorageKind::Long),
            Self::Float => Some(StorageKind::Float),
            Self::Double => Some(StorageKind::Double),
            Self::String => Some(StorageKind::String),
            Self::Opaque | Self::Structure => Some(StorageKind::Opaque),
            Self::Sequence => None,
        }
    }

    /// Check if values of this type are numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.storage_kind(),
            Some(
                StorageKind::Byte
                    | StorageKind::Short
                    | StorageKind::Int
                    | StorageKind::Long
                    | StorageKind::Float
                    | StorageKind::Double
            )
        ) && !matches!(self, Self::Char | Self::Boolean)
    }

    /// Check if the type is unsigned.
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Self::UByte | Self::UShort | Self::UInt | Self::ULong | Self::Enum1 | Self::Enum2 | Self::Enum4
        )
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Self::Enum1 | Self::Enum2 | Self::Enum4)
    }

    /// Get the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::UByte => "ubyte",
            Self::Char => "char",
            Self::Short => "short",
            Self::UShort => "ushort",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Long => "long",
            Self::ULong => "ulong",
            Self::Float => "float",
            Self::Double => "double",
            Self::Enum1 => "enum1",
            Self::Enum2 => "enum2",
            Self::Enum4 => "enum4",
            Self::String => "String",
            Self::Opaque => "opaque",
            Self::Structure => "Structure",
            Self::Sequence => "Sequence",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Byte order of encoded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl Default for ByteOrder {
    fn default() -> Self {
        // netCDF-3 and GRIB are big-endian on disk
        Self::BigEndian
    }
}

impl ByteOrder {
    /// Byte order of the running machine.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::LittleEndian
        } else {
            Self::BigEndian
        }
    }

    /// Parse from string (case-insensitive). Unknown values fall back to big-endian.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "little" | "little_endian" | "le" => Self::LittleEndian,
            "native" => Self::native(),
            _ => Self::BigEndian,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigEndian => "big_endian",
            Self::LittleEndian => "little_endian",
        }
    }
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(DataType::Byte.size(), 1);
        assert_eq!(DataType::Char.size(), 1);
        assert_eq!(DataType::UShort.size(), 2);
        assert_eq!(DataType::Enum4.size(), 4);
        assert_eq!(DataType::Double.size(), 8);
        assert_eq!(DataType::String.size(), 0);
    }

    #[test]
    fn test_storage_kinds() {
        assert_eq!(DataType::Enum2.storage_kind(), Some(StorageKind::Short));
        assert_eq!(DataType::ULong.storage_kind(), Some(StorageKind::Long));
        assert_eq!(DataType::Structure.storage_kind(), Some(StorageKind::Opaque));
        assert_eq!(DataType::Sequence.storage_kind(), None);
        assert!(DataType::Float.is_numeric());
        assert!(!DataType::Char.is_numeric());
        assert!(DataType::UInt.is_unsigned());
    }

    #[test]
    fn test_byte_order_parsing() {
        assert_eq!(ByteOrder::from_str("LITTLE"), ByteOrder::LittleEndian);
        assert_eq!(ByteOrder::from_str("big"), ByteOrder::BigEndian);
        assert_eq!(ByteOrder::from_str("garbage"), ByteOrder::BigEndian);
        assert_eq!(ByteOrder::default(), ByteOrder::BigEndian);
    }
}
