//! The column type lattice.
//!
//! [`ColumnType::merge`] is the join of the public lattice. Inference accumulates
//! [`TypeEvidence`] instead, which adds one element below both `BOOL` and `INT64` for the
//! tokens `0` and `1` that satisfy both patterns.

use crate::types::ColumnType;

impl ColumnType {
    /// Join two column types.
    ///
    /// Equal types are kept, `STRING` absorbs everything, `INT64` widens to `FLOAT64`,
    /// `DATE` widens to `TIMESTAMP`, and every other mismatch collapses to `STRING`.
    #[must_use]
    pub fn merge(self, other: ColumnType) -> ColumnType {
        use ColumnType::{Date, Float64, Int64, String, Timestamp};

        match (self, other) {
            (a, b) if a == b => a,
            (String, _) | (_, String) => String,
            (Int64, Float64) | (Float64, Int64) => Float64,
            (Date, Timestamp) | (Timestamp, Date) => Timestamp,
            _ => String,
        }
    }
}

/// What the non-null cells of a column have shown so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeEvidence {
    /// Only `0`/`1` tokens: readable as either a boolean or an integer.
    Binary,
    /// A settled column type.
    Typed(ColumnType),
}

impl TypeEvidence {
    /// Join two pieces of evidence. Commutative and associative.
    #[must_use]
    pub fn join(self, other: TypeEvidence) -> TypeEvidence {
        match (self, other) {
            (Self::Binary, Self::Binary) => Self::Binary,
            (Self::Binary, Self::Typed(t)) | (Self::Typed(t), Self::Binary) => match t {
                ColumnType::Bool | ColumnType::Int64 | ColumnType::Float64 => Self::Typed(t),
                _ => Self::Typed(ColumnType::String),
            },
            (Self::Typed(a), Self::Typed(b)) => Self::Typed(a.merge(b)),
        }
    }

    /// The column type this evidence settles on. A column of only `0`/`1` is boolean.
    #[must_use]
    pub fn resolve(self) -> ColumnType {
        match self {
            Self::Binary => ColumnType::Bool,
            Self::Typed(t) => t,
        }
    }
}

/// Fold optional evidence into a column accumulator. `None` (a null-like cell) is ignored.
pub(crate) fn accumulate(
    current: Option<TypeEvidence>,
    next: Option<TypeEvidence>,
) -> Option<TypeEvidence> {
    match (current, next) {
        (Some(a), Some(b)) => Some(a.join(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ColumnType::{Bool, Date, Float64, Int64, String, Timestamp};

    fn all_evidence() -> Vec<TypeEvidence> {
        std::iter::once(TypeEvidence::Binary)
            .chain(ColumnType::ALL.into_iter().map(TypeEvidence::Typed))
            .collect()
    }

    #[test]
    fn test_merge_table() {
        assert_eq!(Int64.merge(Int64), Int64);
        assert_eq!(Int64.merge(Float64), Float64);
        assert_eq!(Float64.merge(Int64), Float64);
        assert_eq!(Date.merge(Timestamp), Timestamp);
        assert_eq!(Timestamp.merge(Date), Timestamp);
        assert_eq!(Bool.merge(Int64), String);
        assert_eq!(Date.merge(Float64), String);
        for t in ColumnType::ALL {
            assert_eq!(String.merge(t), String);
            assert_eq!(t.merge(String), String);
            assert_eq!(t.merge(t), t);
        }
    }

    #[test]
    fn test_merge_is_commutative_and_associative() {
        for a in ColumnType::ALL {
            for b in ColumnType::ALL {
                assert_eq!(a.merge(b), b.merge(a), "{a} {b}");
                for c in ColumnType::ALL {
                    assert_eq!(
                        a.merge(b).merge(c),
                        a.merge(b.merge(c)),
                        "{a} {b} {c}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_evidence_join_is_commutative_and_associative() {
        let all = all_evidence();
        for &a in &all {
            for &b in &all {
                assert_eq!(a.join(b), b.join(a), "{a:?} {b:?}");
                for &c in &all {
                    assert_eq!(a.join(b).join(c), a.join(b.join(c)), "{a:?} {b:?} {c:?}");
                }
            }
        }
    }

    #[test]
    fn test_binary_evidence() {
        let binary = TypeEvidence::Binary;
        assert_eq!(binary.resolve(), Bool);
        assert_eq!(binary.join(TypeEvidence::Typed(Int64)).resolve(), Int64);
        assert_eq!(binary.join(TypeEvidence::Typed(Bool)).resolve(), Bool);
        assert_eq!(binary.join(TypeEvidence::Typed(Float64)).resolve(), Float64);
        assert_eq!(binary.join(TypeEvidence::Typed(Date)).resolve(), String);
    }

    #[test]
    fn test_accumulate_skips_missing_evidence() {
        let int = Some(TypeEvidence::Typed(Int64));
        assert_eq!(accumulate(None, None), None);
        assert_eq!(accumulate(int, None), int);
        assert_eq!(accumulate(None, int), int);
        assert_eq!(
            accumulate(int, Some(TypeEvidence::Typed(Float64))),
            Some(TypeEvidence::Typed(Float64))
        );
    }
}
