//! Element data types understood by the operator library boundary
//!
//! Discriminants match the library's dtype codes so a `DataType` can be
//! passed straight through an FFI call.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Element type of a tensor buffer
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Invalid = 0,
    Byte = 1,
    Bool = 2,
    I8 = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    U8 = 7,
    U16 = 8,
    U32 = 9,
    U64 = 10,
    F8 = 11,
    F16 = 12,
    F32 = 13,
    F64 = 14,
    C8 = 15,
    C16 = 16,
    C32 = 17,
    C64 = 18,
    BF16 = 19,
}

impl DataType {
    /// Size of one element in bytes (0 for `Invalid`)
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::Invalid => 0,
            DataType::Byte | DataType::Bool | DataType::I8 | DataType::U8 | DataType::F8 => 1,
            DataType::I16 | DataType::U16 | DataType::F16 | DataType::BF16 | DataType::C8 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 | DataType::C16 => 4,
            DataType::I64 | DataType::U64 | DataType::F64 | DataType::C32 => 8,
            DataType::C64 => 16,
        }
    }

    /// Real floating point types a score vector may be stored in
    pub fn is_score_type(self) -> bool {
        matches!(
            self,
            DataType::F16 | DataType::BF16 | DataType::F32 | DataType::F64
        )
    }

    /// Integer types an output index may be stored in
    pub fn is_index_type(self) -> bool {
        matches!(self, DataType::U64 | DataType::I64)
    }

    /// Raw library code
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Convert a raw library code back into a `DataType`
    pub fn from_raw(raw: i32) -> Option<Self> {
        let dtype = match raw {
            0 => DataType::Invalid,
            1 => DataType::Byte,
            2 => DataType::Bool,
            3 => DataType::I8,
            4 => DataType::I16,
            5 => DataType::I32,
            6 => DataType::I64,
            7 => DataType::U8,
            8 => DataType::U16,
            9 => DataType::U32,
            10 => DataType::U64,
            11 => DataType::F8,
            12 => DataType::F16,
            13 => DataType::F32,
            14 => DataType::F64,
            15 => DataType::C8,
            16 => DataType::C16,
            17 => DataType::C32,
            18 => DataType::C64,
            19 => DataType::BF16,
            _ => return None,
        };
        Some(dtype)
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Invalid => "invalid",
            DataType::Byte => "byte",
            DataType::Bool => "bool",
            DataType::I8 => "i8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
            DataType::F8 => "f8",
            DataType::F16 => "f16",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::C8 => "c8",
            DataType::C16 => "c16",
            DataType::C32 => "c32",
            DataType::C64 => "c64",
            DataType::BF16 => "bf16",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "f16" | "half" | "float16" => Ok(DataType::F16),
            "bf16" | "bfloat16" => Ok(DataType::BF16),
            "f32" | "float" | "float32" => Ok(DataType::F32),
            "f64" | "double" | "float64" => Ok(DataType::F64),
            "u64" | "uint64" => Ok(DataType::U64),
            "i64" | "int64" => Ok(DataType::I64),
            "i32" | "int32" => Ok(DataType::I32),
            other => Err(format!("unsupported data type: {}", other)),
        }
    }
}
