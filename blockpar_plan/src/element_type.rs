use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PlanError;

/// The element type of an array.
///
/// Only the four types supported by the block codec are representable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// `float32`: IEEE 754 single-precision floating point.
    Float32,
    /// `float64`: IEEE 754 double-precision floating point.
    Float64,
    /// `int32`: signed 32-bit integer.
    Int32,
    /// `int64`: signed 64-bit integer.
    Int64,
}

impl ElementType {
    /// All supported element types.
    pub const ALL: [ElementType; 4] = [
        ElementType::Float32,
        ElementType::Float64,
        ElementType::Int32,
        ElementType::Int64,
    ];

    /// The size of an element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Float32 | Self::Int32 => 4,
            Self::Float64 | Self::Int64 => 8,
        }
    }

    /// The size of an element in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Float32 | Self::Int32 => 32,
            Self::Float64 | Self::Int64 => 64,
        }
    }

    /// Returns true for the floating point element types.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// The name of the element type, e.g. `float32`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
        }
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = PlanError;

    /// Parse an element type from its name.
    ///
    /// The numpy typecodes `f`, `d`, `i` and `q` are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float32" | "f" => Ok(Self::Float32),
            "float64" | "d" => Ok(Self::Float64),
            "int32" | "i" => Ok(Self::Int32),
            "int64" | "q" => Ok(Self::Int64),
            _ => Err(PlanError::UnsupportedElementType(s.to_string())),
        }
    }
}
