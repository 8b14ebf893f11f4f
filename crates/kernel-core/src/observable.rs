//! State inspection for kernels and the hardware they drive.
//!
//! Queries never affect state. They exist for tests, logging and the demo
//! binary's reports.

use std::fmt;

/// A dynamically-typed value returned by a state query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// 8-bit register or coordinate.
    U8(u8),
    /// 16-bit counter.
    U16(u16),
    /// 32-bit counter.
    U32(u32),
    /// Signed fine-motion style value.
    I8(i8),
    /// Free-form text (state names).
    String(String),
    /// Ordered list, e.g. the Y-order index.
    Array(Vec<Value>),
    /// Absent optional value, e.g. an unbound channel.
    None,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:#04X}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v:+}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::None => write!(f, "-"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::I8(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

/// A component whose state can be inspected.
pub trait Observable {
    /// Query a property by dotted path, e.g. `channel0.sprite`.
    ///
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// All paths accepted by `query()`. Parameterised segments are written
    /// as `<name>`.
    fn query_paths(&self) -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(Value::U8(0x1B).to_string(), "0x1B");
        assert_eq!(Value::I8(-3).to_string(), "-3");
        assert_eq!(Value::I8(7).to_string(), "+7");
        let list = Value::Array(vec![Value::U8(1), Value::None]);
        assert_eq!(list.to_string(), "[0x01, -]");
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(Some(4u8)), Value::U8(4));
        assert_eq!(Value::from(None::<u8>), Value::None);
    }
}
