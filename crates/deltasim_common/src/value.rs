//! Tagged signal payloads whose width is fixed when the signal is declared.
//!
//! Every signal carries a [`ValueType`] chosen at construction time and holds
//! [`Value`]s accepted by that type. Widths are limited to 64 bits so a value
//! always fits in one machine word; the kernel never infers widths at run time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest supported vector, in bits.
pub const MAX_WIDTH: u32 = 64;

/// Errors raised when constructing or converting signal values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// A vector width outside `1..=64` was requested.
    #[error("width {width} is outside the supported range 1..=64")]
    WidthOutOfRange {
        /// The rejected width.
        width: u32,
    },

    /// A numeric value does not fit the target type.
    #[error("value {value} does not fit in {ty}")]
    Overflow {
        /// The value that was being converted.
        value: i128,
        /// Display form of the target type.
        ty: String,
    },

    /// An enumeration was declared without variants.
    #[error("enumeration '{name}' has no variants")]
    EmptyEnum {
        /// The enumeration name.
        name: String,
    },

    /// A variant name was looked up on an enumeration that lacks it.
    #[error("enumeration '{name}' has no variant '{variant}'")]
    UnknownVariant {
        /// The enumeration name.
        name: String,
        /// The missing variant.
        variant: String,
    },
}

/// The declared type of a signal: its kind and bit width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// A single-bit boolean wire.
    Bool,
    /// An unsigned vector of `width` bits.
    Unsigned {
        /// Bit width, `1..=64`.
        width: u32,
    },
    /// A two's complement signed vector of `width` bits.
    Signed {
        /// Bit width, `1..=64`.
        width: u32,
    },
    /// An enumerated state type, encoded as a binary index.
    Enum {
        /// Type name, used in diagnostics.
        name: String,
        /// Variant names in encoding order.
        variants: Vec<String>,
    },
}

impl ValueType {
    /// An unsigned vector type of the given width.
    pub fn unsigned(width: u32) -> Result<Self, ValueError> {
        check_width(width)?;
        Ok(ValueType::Unsigned { width })
    }

    /// A signed vector type of the given width.
    pub fn signed(width: u32) -> Result<Self, ValueError> {
        check_width(width)?;
        Ok(ValueType::Signed { width })
    }

    /// An enumerated type with the given variants, encoded in declaration order.
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Result<Self, ValueError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        if variants.is_empty() {
            return Err(ValueError::EmptyEnum { name });
        }
        Ok(ValueType::Enum { name, variants })
    }

    /// Number of bits needed to encode a value of this type.
    pub fn width(&self) -> u32 {
        match self {
            ValueType::Bool => 1,
            ValueType::Unsigned { width } | ValueType::Signed { width } => *width,
            ValueType::Enum { variants, .. } => index_bits(variants.len()),
        }
    }

    /// The all-zero value of this type (`false`, `0`, or the first variant).
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Unsigned { width } => Value::Unsigned {
                value: 0,
                width: *width,
            },
            ValueType::Signed { width } => Value::Signed {
                value: 0,
                width: *width,
            },
            ValueType::Enum { .. } => Value::Enum { index: 0 },
        }
    }

    /// Returns `true` if `value` is a legal value of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Bool, Value::Bool(_)) => true,
            (ValueType::Unsigned { width }, Value::Unsigned { value, width: w }) => {
                w == width && value & !mask(*width) == 0
            }
            (ValueType::Signed { width }, Value::Signed { value, width: w }) => {
                w == width && fits_signed(*value, *width)
            }
            (ValueType::Enum { variants, .. }, Value::Enum { index }) => {
                (*index as usize) < variants.len()
            }
            _ => false,
        }
    }

    /// Builds a value of this type from an unsigned integer, rejecting values
    /// that do not fit.
    pub fn value_from_u64(&self, raw: u64) -> Result<Value, ValueError> {
        let value = match self {
            ValueType::Bool => Value::Bool(raw != 0),
            ValueType::Unsigned { width } => Value::Unsigned {
                value: raw,
                width: *width,
            },
            ValueType::Signed { width } => Value::Signed {
                value: i64::try_from(raw).map_err(|_| self.overflow(raw as i128))?,
                width: *width,
            },
            ValueType::Enum { .. } => Value::Enum {
                index: u32::try_from(raw).map_err(|_| self.overflow(raw as i128))?,
            },
        };
        if raw > 1 && *self == ValueType::Bool {
            return Err(self.overflow(raw as i128));
        }
        if self.accepts(&value) {
            Ok(value)
        } else {
            Err(self.overflow(raw as i128))
        }
    }

    /// Builds a value of this type from a signed integer, rejecting values
    /// that do not fit.
    pub fn value_from_i64(&self, raw: i64) -> Result<Value, ValueError> {
        match self {
            ValueType::Signed { width } => {
                let value = Value::Signed {
                    value: raw,
                    width: *width,
                };
                if self.accepts(&value) {
                    Ok(value)
                } else {
                    Err(self.overflow(raw as i128))
                }
            }
            _ => {
                let unsigned = u64::try_from(raw).map_err(|_| self.overflow(raw as i128))?;
                self.value_from_u64(unsigned)
            }
        }
    }

    /// Builds a value by keeping only the low `width` bits of `raw`, the way a
    /// hardware register wraps on overflow.
    pub fn wrap_u64(&self, raw: u64) -> Value {
        match self {
            ValueType::Bool => Value::Bool(raw & 1 == 1),
            ValueType::Unsigned { width } => Value::Unsigned {
                value: raw & mask(*width),
                width: *width,
            },
            ValueType::Signed { width } => Value::Signed {
                value: sign_extend(raw & mask(*width), *width),
                width: *width,
            },
            ValueType::Enum { variants, .. } => Value::Enum {
                index: (raw % variants.len() as u64) as u32,
            },
        }
    }

    /// Looks up an enumeration variant by name.
    pub fn variant(&self, variant: &str) -> Result<Value, ValueError> {
        match self {
            ValueType::Enum { name, variants } => variants
                .iter()
                .position(|v| v == variant)
                .map(|index| Value::Enum {
                    index: index as u32,
                })
                .ok_or_else(|| ValueError::UnknownVariant {
                    name: name.clone(),
                    variant: variant.to_string(),
                }),
            _ => Err(ValueError::UnknownVariant {
                name: self.to_string(),
                variant: variant.to_string(),
            }),
        }
    }

    /// Returns the variant name of an enumeration value.
    pub fn variant_name(&self, value: &Value) -> Option<&str> {
        match (self, value) {
            (ValueType::Enum { variants, .. }, Value::Enum { index }) => {
                variants.get(*index as usize).map(String::as_str)
            }
            _ => None,
        }
    }

    fn overflow(&self, value: i128) -> ValueError {
        ValueError::Overflow {
            value,
            ty: self.to_string(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Unsigned { width } => write!(f, "unsigned[{width}]"),
            ValueType::Signed { width } => write!(f, "signed[{width}]"),
            ValueType::Enum { name, .. } => write!(f, "enum {name}"),
        }
    }
}

/// A signal payload.
///
/// Vector variants carry their width so that two values of different widths
/// never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// An unsigned vector.
    Unsigned {
        /// The numeric value; bits above `width` are always zero.
        value: u64,
        /// Bit width.
        width: u32,
    },
    /// A signed vector.
    Signed {
        /// The numeric value, within the range of `width` bits.
        value: i64,
        /// Bit width.
        width: u32,
    },
    /// An enumeration variant index.
    Enum {
        /// Variant position in the declaring [`ValueType::Enum`].
        index: u32,
    },
}

impl Value {
    /// An unsigned value, rejecting values that do not fit in `width` bits.
    pub fn unsigned(value: u64, width: u32) -> Result<Self, ValueError> {
        ValueType::unsigned(width)?.value_from_u64(value)
    }

    /// A signed value, rejecting values that do not fit in `width` bits.
    pub fn signed(value: i64, width: u32) -> Result<Self, ValueError> {
        ValueType::signed(width)?.value_from_i64(value)
    }

    /// The raw bit pattern, two's complement masked to width for signed values.
    pub fn to_bits(&self) -> u64 {
        match *self {
            Value::Bool(b) => b as u64,
            Value::Unsigned { value, .. } => value,
            Value::Signed { value, width } => (value as u64) & mask(width),
            Value::Enum { index } => index as u64,
        }
    }

    /// Returns bit `index` of the raw bit pattern.
    pub fn bit(&self, index: u32) -> bool {
        index < MAX_WIDTH && (self.to_bits() >> index) & 1 == 1
    }

    /// Returns `true` if any bit is set.
    pub fn is_truthy(&self) -> bool {
        self.to_bits() != 0
    }

    /// The value as an unsigned integer; `None` for negative signed values.
    pub fn to_u64(&self) -> Option<u64> {
        match *self {
            Value::Signed { value, .. } => u64::try_from(value).ok(),
            _ => Some(self.to_bits()),
        }
    }

    /// The value as a signed integer; `None` if it exceeds `i64::MAX`.
    pub fn to_i64(&self) -> Option<i64> {
        match *self {
            Value::Signed { value, .. } => Some(value),
            _ => i64::try_from(self.to_bits()).ok(),
        }
    }

    /// Bitwise OR of two contributions to the same wired-OR signal.
    ///
    /// Values of different kinds do not combine; `other` is returned.
    pub fn wired_or(self, other: Value) -> Value {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(a || b),
            (Value::Unsigned { value: a, width }, Value::Unsigned { value: b, width: w })
                if width == w =>
            {
                Value::Unsigned {
                    value: a | b,
                    width,
                }
            }
            (Value::Signed { value: a, width }, Value::Signed { value: b, width: w })
                if width == w =>
            {
                Value::Signed {
                    value: a | b,
                    width,
                }
            }
            (_, other) => other,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", *b as u8),
            Value::Unsigned { value, .. } => write!(f, "{value}"),
            Value::Signed { value, .. } => write!(f, "{value}"),
            Value::Enum { index } => write!(f, "#{index}"),
        }
    }
}

/// Bit mask covering the low `width` bits.
fn mask(width: u32) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn check_width(width: u32) -> Result<(), ValueError> {
    if (1..=MAX_WIDTH).contains(&width) {
        Ok(())
    } else {
        Err(ValueError::WidthOutOfRange { width })
    }
}

fn fits_signed(value: i64, width: u32) -> bool {
    if width >= MAX_WIDTH {
        return true;
    }
    let half = 1i64 << (width - 1);
    (-half..half).contains(&value)
}

fn sign_extend(bits: u64, width: u32) -> i64 {
    if width >= MAX_WIDTH {
        return bits as i64;
    }
    let shift = MAX_WIDTH - width;
    ((bits << shift) as i64) >> shift
}

/// Bits needed to encode `count` enumeration indices.
fn index_bits(count: usize) -> u32 {
    if count <= 2 {
        1
    } else {
        usize::BITS - (count - 1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_range_checked() {
        assert_eq!(Value::unsigned(15, 4).unwrap().to_u64(), Some(15));
        let err = Value::unsigned(16, 4).unwrap_err();
        assert_eq!(err.to_string(), "value 16 does not fit in unsigned[4]");
    }

    #[test]
    fn signed_range_checked() {
        assert!(Value::signed(-8, 4).is_ok());
        assert!(Value::signed(7, 4).is_ok());
        assert!(Value::signed(8, 4).is_err());
        assert!(Value::signed(-9, 4).is_err());
    }

    #[test]
    fn width_limits() {
        assert_eq!(
            ValueType::unsigned(0).unwrap_err(),
            ValueError::WidthOutOfRange { width: 0 }
        );
        assert!(ValueType::unsigned(65).is_err());
        assert!(ValueType::unsigned(64).is_ok());
    }

    #[test]
    fn wrap_truncates_like_a_register() {
        let ty = ValueType::unsigned(3).unwrap();
        assert_eq!(ty.wrap_u64(8).to_u64(), Some(0));
        assert_eq!(ty.wrap_u64(9).to_u64(), Some(1));

        let sty = ValueType::signed(4).unwrap();
        assert_eq!(sty.wrap_u64(0b1111).to_i64(), Some(-1));
        assert_eq!(sty.wrap_u64(0b0111).to_i64(), Some(7));
    }

    #[test]
    fn signed_bits_are_twos_complement() {
        let v = Value::signed(-2, 4).unwrap();
        assert_eq!(v.to_bits(), 0b1110);
        assert!(!v.bit(0));
        assert!(v.bit(3));
        assert_eq!(v.to_u64(), None);
    }

    #[test]
    fn bool_from_u64() {
        assert_eq!(ValueType::Bool.value_from_u64(1).unwrap(), Value::Bool(true));
        assert!(ValueType::Bool.value_from_u64(2).is_err());
    }

    #[test]
    fn enum_widths_and_lookup() {
        let ty = ValueType::enumeration("state", ["idle", "busy", "done"]).unwrap();
        assert_eq!(ty.width(), 2);
        let busy = ty.variant("busy").unwrap();
        assert_eq!(busy, Value::Enum { index: 1 });
        assert_eq!(ty.variant_name(&busy), Some("busy"));
        assert!(ty.variant("halt").is_err());
        assert!(!ty.accepts(&Value::Enum { index: 3 }));

        let two = ValueType::enumeration("onoff", ["off", "on"]).unwrap();
        assert_eq!(two.width(), 1);
        let five = ValueType::enumeration("e", ["a", "b", "c", "d", "e"]).unwrap();
        assert_eq!(five.width(), 3);
    }

    #[test]
    fn empty_enum_rejected() {
        let err = ValueType::enumeration("none", Vec::<String>::new()).unwrap_err();
        assert_eq!(err.to_string(), "enumeration 'none' has no variants");
    }

    #[test]
    fn accepts_checks_kind_and_width() {
        let u8t = ValueType::unsigned(8).unwrap();
        assert!(u8t.accepts(&Value::unsigned(200, 8).unwrap()));
        assert!(!u8t.accepts(&Value::unsigned(1, 4).unwrap()));
        assert!(!u8t.accepts(&Value::Bool(true)));
        assert!(ValueType::Bool.accepts(&Value::Bool(false)));
    }

    #[test]
    fn wired_or_combines_bits() {
        let a = Value::unsigned(0b0101, 4).unwrap();
        let b = Value::unsigned(0b0011, 4).unwrap();
        assert_eq!(a.wired_or(b).to_u64(), Some(0b0111));
        assert_eq!(
            Value::Bool(false).wired_or(Value::Bool(true)),
            Value::Bool(true)
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Bool(true).to_string(), "1");
        assert_eq!(Value::signed(-3, 8).unwrap().to_string(), "-3");
        assert_eq!(Value::Enum { index: 2 }.to_string(), "#2");
        assert_eq!(ValueType::signed(12).unwrap().to_string(), "signed[12]");
    }

    #[test]
    fn serde_roundtrip() {
        let v = Value::signed(-5, 16).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
