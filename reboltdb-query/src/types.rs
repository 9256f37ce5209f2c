//! Static result-type lattice.
//!
//! Every expression is labeled with a type drawn from a fixed set of tags.
//! Each tag is a bitset: one fresh bit of its own OR'd with the bits of its
//! ancestors, so `t.is_subtype_of(u)` is superset containment of `u`'s bits
//! in `t`'s.

use std::fmt;
use std::ops::BitOr;

/// A static type tag, or a union of possible tags for operators with more
/// than one result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeFlag(u32);

impl TypeFlag {
    pub const DATUM: TypeFlag = TypeFlag(1 << 0);
    pub const SEQUENCE: TypeFlag = TypeFlag(1 << 1);
    pub const DATABASE: TypeFlag = TypeFlag(1 << 2);
    pub const FUNCTION: TypeFlag = TypeFlag(1 << 3);
    pub const ORDERING: TypeFlag = TypeFlag(1 << 4);
    pub const NULL: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 5);
    pub const MINVAL: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 6);
    pub const MAXVAL: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 7);
    pub const BOOL: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 8);
    pub const NUMBER: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 9);
    pub const STRING: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 10);
    pub const OBJECT: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 11);
    pub const TIME: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 12);
    pub const BINARY: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 13);
    pub const GEOMETRY: TypeFlag = TypeFlag(Self::DATUM.0 | 1 << 14);
    pub const SELECTION: TypeFlag = TypeFlag(Self::OBJECT.0 | 1 << 15);
    pub const ARRAY: TypeFlag = TypeFlag(Self::DATUM.0 | Self::SEQUENCE.0 | 1 << 16);
    pub const SELECTION_ARRAY: TypeFlag = TypeFlag(Self::ARRAY.0 | 1 << 17);
    pub const STREAM: TypeFlag = TypeFlag(Self::SEQUENCE.0 | 1 << 18);
    pub const SELECTION_STREAM: TypeFlag = TypeFlag(Self::STREAM.0 | 1 << 19);
    pub const TABLE_SLICE: TypeFlag = TypeFlag(Self::SELECTION_STREAM.0 | 1 << 20);
    pub const TABLE: TypeFlag = TypeFlag(Self::SELECTION_STREAM.0 | 1 << 21);

    /// Every canonical tag, in declaration order.
    pub const ALL: [TypeFlag; 22] = [
        Self::DATUM,
        Self::SEQUENCE,
        Self::DATABASE,
        Self::FUNCTION,
        Self::ORDERING,
        Self::NULL,
        Self::MINVAL,
        Self::MAXVAL,
        Self::BOOL,
        Self::NUMBER,
        Self::STRING,
        Self::OBJECT,
        Self::TIME,
        Self::BINARY,
        Self::GEOMETRY,
        Self::SELECTION,
        Self::ARRAY,
        Self::SELECTION_ARRAY,
        Self::STREAM,
        Self::SELECTION_STREAM,
        Self::TABLE_SLICE,
        Self::TABLE,
    ];

    /// Returns whether `self` is a subtype of `other`.
    ///
    /// Reflexive and transitive; the only strict relations are the ones the
    /// ancestor bits encode.
    pub fn is_subtype_of(self, other: TypeFlag) -> bool {
        self.0 & other.0 == other.0
    }

    /// The canonical name of this tag, if it is one of the 22 canonical
    /// tags rather than a union.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::DATUM => Some("DATUM"),
            Self::SEQUENCE => Some("SEQUENCE"),
            Self::DATABASE => Some("DATABASE"),
            Self::FUNCTION => Some("FUNCTION"),
            Self::ORDERING => Some("ORDERING"),
            Self::NULL => Some("NULL"),
            Self::MINVAL => Some("MINVAL"),
            Self::MAXVAL => Some("MAXVAL"),
            Self::BOOL => Some("BOOL"),
            Self::NUMBER => Some("NUMBER"),
            Self::STRING => Some("STRING"),
            Self::OBJECT => Some("OBJECT"),
            Self::TIME => Some("PTYPE<TIME>"),
            Self::BINARY => Some("PTYPE<BINARY>"),
            Self::GEOMETRY => Some("PTYPE<GEOMETRY>"),
            Self::SELECTION => Some("SELECTION<OBJECT>"),
            Self::ARRAY => Some("ARRAY"),
            Self::SELECTION_ARRAY => Some("SELECTION<ARRAY>"),
            Self::STREAM => Some("STREAM"),
            Self::SELECTION_STREAM => Some("SELECTION<STREAM>"),
            Self::TABLE_SLICE => Some("TABLE_SLICE"),
            Self::TABLE => Some("TABLE"),
            _ => None,
        }
    }

    /// Raw bit representation.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for TypeFlag {
    type Output = TypeFlag;

    fn bitor(self, rhs: TypeFlag) -> TypeFlag {
        TypeFlag(self.0 | rhs.0)
    }
}

impl fmt::Display for TypeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "TYPE({:#x})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The full positive relation. Every pair of canonical tags not listed
    // here must answer false; writing the sparse positive set and iterating
    // the cross product keeps the table honest.
    const POSITIVE_PAIRS: &[(TypeFlag, TypeFlag)] = &[
        (TypeFlag::DATUM, TypeFlag::DATUM),
        (TypeFlag::SEQUENCE, TypeFlag::SEQUENCE),
        (TypeFlag::DATABASE, TypeFlag::DATABASE),
        (TypeFlag::FUNCTION, TypeFlag::FUNCTION),
        (TypeFlag::ORDERING, TypeFlag::ORDERING),
        (TypeFlag::NULL, TypeFlag::DATUM),
        (TypeFlag::NULL, TypeFlag::NULL),
        (TypeFlag::MINVAL, TypeFlag::DATUM),
        (TypeFlag::MINVAL, TypeFlag::MINVAL),
        (TypeFlag::MAXVAL, TypeFlag::DATUM),
        (TypeFlag::MAXVAL, TypeFlag::MAXVAL),
        (TypeFlag::BOOL, TypeFlag::DATUM),
        (TypeFlag::BOOL, TypeFlag::BOOL),
        (TypeFlag::NUMBER, TypeFlag::DATUM),
        (TypeFlag::NUMBER, TypeFlag::NUMBER),
        (TypeFlag::STRING, TypeFlag::DATUM),
        (TypeFlag::STRING, TypeFlag::STRING),
        (TypeFlag::OBJECT, TypeFlag::DATUM),
        (TypeFlag::OBJECT, TypeFlag::OBJECT),
        (TypeFlag::TIME, TypeFlag::DATUM),
        (TypeFlag::TIME, TypeFlag::TIME),
        (TypeFlag::BINARY, TypeFlag::DATUM),
        (TypeFlag::BINARY, TypeFlag::BINARY),
        (TypeFlag::GEOMETRY, TypeFlag::DATUM),
        (TypeFlag::GEOMETRY, TypeFlag::GEOMETRY),
        (TypeFlag::SELECTION, TypeFlag::DATUM),
        (TypeFlag::SELECTION, TypeFlag::OBJECT),
        (TypeFlag::SELECTION, TypeFlag::SELECTION),
        (TypeFlag::ARRAY, TypeFlag::DATUM),
        (TypeFlag::ARRAY, TypeFlag::SEQUENCE),
        (TypeFlag::ARRAY, TypeFlag::ARRAY),
        (TypeFlag::SELECTION_ARRAY, TypeFlag::DATUM),
        (TypeFlag::SELECTION_ARRAY, TypeFlag::SEQUENCE),
        (TypeFlag::SELECTION_ARRAY, TypeFlag::ARRAY),
        (TypeFlag::SELECTION_ARRAY, TypeFlag::SELECTION_ARRAY),
        (TypeFlag::STREAM, TypeFlag::SEQUENCE),
        (TypeFlag::STREAM, TypeFlag::STREAM),
        (TypeFlag::SELECTION_STREAM, TypeFlag::SEQUENCE),
        (TypeFlag::SELECTION_STREAM, TypeFlag::STREAM),
        (TypeFlag::SELECTION_STREAM, TypeFlag::SELECTION_STREAM),
        (TypeFlag::TABLE_SLICE, TypeFlag::SEQUENCE),
        (TypeFlag::TABLE_SLICE, TypeFlag::STREAM),
        (TypeFlag::TABLE_SLICE, TypeFlag::SELECTION_STREAM),
        (TypeFlag::TABLE_SLICE, TypeFlag::TABLE_SLICE),
        (TypeFlag::TABLE, TypeFlag::SEQUENCE),
        (TypeFlag::TABLE, TypeFlag::STREAM),
        (TypeFlag::TABLE, TypeFlag::SELECTION_STREAM),
        (TypeFlag::TABLE, TypeFlag::TABLE),
    ];

    #[test]
    fn test_subtype_relation_exact() {
        assert_eq!(POSITIVE_PAIRS.len(), 48);
        for first in TypeFlag::ALL {
            for second in TypeFlag::ALL {
                let expected = POSITIVE_PAIRS.contains(&(first, second));
                assert_eq!(
                    first.is_subtype_of(second),
                    expected,
                    "expected {first}.is_subtype_of({second}) to be {expected}"
                );
            }
        }
    }

    #[test]
    fn test_subtype_reflexive() {
        for tag in TypeFlag::ALL {
            assert!(tag.is_subtype_of(tag));
        }
    }

    #[test]
    fn test_subtype_transitive() {
        for a in TypeFlag::ALL {
            for b in TypeFlag::ALL {
                for c in TypeFlag::ALL {
                    if a.is_subtype_of(b) && b.is_subtype_of(c) {
                        assert!(a.is_subtype_of(c), "{a} <= {b} <= {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_canonical_names() {
        for tag in TypeFlag::ALL {
            assert!(tag.name().is_some());
        }
        assert_eq!(TypeFlag::TIME.to_string(), "PTYPE<TIME>");
        assert_eq!(TypeFlag::SELECTION.to_string(), "SELECTION<OBJECT>");
        assert_eq!(TypeFlag::TABLE_SLICE.to_string(), "TABLE_SLICE");
    }

    #[test]
    fn test_union_is_not_canonical() {
        let union = TypeFlag::NUMBER | TypeFlag::STRING | TypeFlag::TIME;
        assert!(union.name().is_none());
    }
}
