/// Element kind of a scalar or vector type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
}

/// The type of an expression: element kind × bit width × lane count.
///
/// `lanes == 1` is a scalar. `lanes == 0` only appears in pattern
/// templates, where it means "any vector lane count"; lane-count wildcards
/// unify across a whole template during matching. Well-formed program IR
/// never contains a zero-lane type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    pub code: TypeCode,
    pub bits: u32,
    pub lanes: u32,
}

impl Type {
    pub const fn new(code: TypeCode, bits: u32, lanes: u32) -> Type {
        Type { code, bits, lanes }
    }

    pub const fn int(bits: u32) -> Type {
        Type::new(TypeCode::Int, bits, 1)
    }

    pub const fn uint(bits: u32) -> Type {
        Type::new(TypeCode::UInt, bits, 1)
    }

    pub const fn float(bits: u32) -> Type {
        Type::new(TypeCode::Float, bits, 1)
    }

    /// The boolean type: a 1-bit unsigned integer.
    pub const fn bool_type() -> Type {
        Type::uint(1)
    }

    pub const fn with_bits(self, bits: u32) -> Type {
        Type { bits, ..self }
    }

    pub const fn with_lanes(self, lanes: u32) -> Type {
        Type { lanes, ..self }
    }

    pub const fn with_code(self, code: TypeCode) -> Type {
        Type { code, ..self }
    }

    /// The scalar type of one lane.
    pub const fn element_of(self) -> Type {
        self.with_lanes(1)
    }

    pub const fn is_scalar(self) -> bool {
        self.lanes == 1
    }

    pub const fn is_vector(self) -> bool {
        self.lanes != 1
    }

    pub const fn is_int(self) -> bool {
        matches!(self.code, TypeCode::Int)
    }

    pub const fn is_uint(self) -> bool {
        matches!(self.code, TypeCode::UInt)
    }

    pub const fn is_float(self) -> bool {
        matches!(self.code, TypeCode::Float)
    }

    /// Smallest value representable by one lane. `None` for floats.
    pub fn min_value(self) -> Option<i64> {
        match self.code {
            TypeCode::UInt => Some(0),
            TypeCode::Int => {
                if self.bits >= 64 {
                    Some(i64::MIN)
                } else {
                    Some(-(1i64 << (self.bits - 1)))
                }
            }
            TypeCode::Float => None,
        }
    }

    /// Largest value representable by one lane. `None` for floats.
    pub fn max_value(self) -> Option<i64> {
        match self.code {
            TypeCode::UInt => {
                if self.bits >= 64 {
                    Some(i64::MAX)
                } else {
                    Some((1i64 << self.bits) - 1)
                }
            }
            TypeCode::Int => {
                if self.bits >= 64 {
                    Some(i64::MAX)
                } else {
                    Some((1i64 << (self.bits - 1)) - 1)
                }
            }
            TypeCode::Float => None,
        }
    }

    /// True if `value` is exactly representable in one lane of this type.
    pub fn can_hold(self, value: i64) -> bool {
        match (self.min_value(), self.max_value()) {
            (Some(lo), Some(hi)) => lo <= value && value <= hi,
            _ => false,
        }
    }

    /// True if every value of `other`'s element type is exactly
    /// representable in this element type. Lane counts are ignored.
    pub fn can_represent(self, other: Type) -> bool {
        match (self.code, other.code) {
            (TypeCode::Int, TypeCode::Int) => self.bits >= other.bits,
            (TypeCode::Int, TypeCode::UInt) => self.bits > other.bits,
            (TypeCode::UInt, TypeCode::UInt) => self.bits >= other.bits,
            _ => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self.code {
            TypeCode::Int => "i",
            TypeCode::UInt => "u",
            TypeCode::Float => "f",
        };
        if self.lanes == 1 {
            write!(f, "{}{}", code, self.bits)
        } else {
            write!(f, "{}{}x{}", code, self.bits, self.lanes)
        }
    }
}
