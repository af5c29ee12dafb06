use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an entity, computed from it by the store's key accessor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    Int(i64),
    /// Unsigned ids above `i64::MAX`; smaller ones are always `Int`.
    UInt(u64),
    Str(String),
}

impl EntityKey {
    /// The key as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) | Self::UInt(_) => None,
        }
    }

    /// The key as a signed integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::UInt(_) | Self::Str(_) => None,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for EntityKey {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for EntityKey {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for EntityKey {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Int)
    }
}

impl From<usize> for EntityKey {
    fn from(value: usize) -> Self {
        // usize is at most 64 bits wide on every supported target
        Self::from(value as u64)
    }
}
