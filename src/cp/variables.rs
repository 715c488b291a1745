//! CP variable types.

/// Handle to an integer variable inside a [`CpModel`](super::CpModel).
///
/// Handles are only meaningful for the model that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVarId(pub(crate) usize);

impl IntVarId {
    /// Position of the variable in the model's variable table.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a boolean variable inside a [`CpModel`](super::CpModel).
///
/// Booleans are stored as 0/1 integer variables, so a `BoolVarId` can be
/// used wherever an integer term is expected via [`BoolVarId::as_int`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoolVarId(pub(crate) usize);

impl BoolVarId {
    /// Position of the variable in the model's variable table.
    pub fn index(self) -> usize {
        self.0
    }

    /// Views this literal as a 0/1 integer variable.
    pub fn as_int(self) -> IntVarId {
        IntVarId(self.0)
    }
}

/// An integer variable with a finite domain.
///
/// The domain is the interval `[min, max]`, optionally restricted to an
/// explicit sorted set of values (`values`). Boolean variables are integer
/// variables with domain `{0, 1}` and `is_bool` set.
#[derive(Debug, Clone)]
pub struct IntVar {
    /// Variable name (for diagnostics; not required to be unique).
    pub name: String,
    /// Minimum value.
    pub min: i64,
    /// Maximum value.
    pub max: i64,
    /// Explicit domain values, sorted and deduplicated. `None` means every
    /// integer in `[min, max]`.
    pub values: Option<Vec<i64>>,
    /// Whether this variable was declared as a boolean literal.
    pub is_bool: bool,
}

impl IntVar {
    /// Creates a new integer variable with the given bounds.
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            values: None,
            is_bool: false,
        }
    }

    /// Creates an integer variable whose domain is exactly `values`.
    ///
    /// An empty `values` produces an empty domain, which
    /// [`CpModel::validate`](super::CpModel::validate) rejects.
    pub fn from_values(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        let mut values: Vec<i64> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        let (min, max) = match (values.first(), values.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => (1, 0),
        };
        Self {
            name: name.into(),
            min,
            max,
            values: Some(values),
            is_bool: false,
        }
    }

    /// Creates a boolean variable (domain `{0, 1}`).
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            is_bool: true,
            ..Self::new(name, 0, 1)
        }
    }

    /// Whether this variable is fixed to a single value.
    pub fn is_fixed(&self) -> bool {
        self.domain_size() == 1
    }

    /// Whether the domain contains no value at all.
    pub fn is_empty(&self) -> bool {
        self.domain_size() == 0
    }

    /// Number of values in the domain.
    pub fn domain_size(&self) -> i64 {
        match &self.values {
            Some(values) => values.len() as i64,
            None => (self.max - self.min + 1).max(0),
        }
    }

    /// Whether `value` belongs to the domain.
    pub fn contains(&self, value: i64) -> bool {
        match &self.values {
            Some(values) => values.binary_search(&value).is_ok(),
            None => self.min <= value && value <= self.max,
        }
    }

    /// Smallest domain value `>= value`, if any.
    pub(crate) fn snap_up(&self, value: i64) -> Option<i64> {
        match &self.values {
            Some(values) => {
                let idx = values.partition_point(|&v| v < value);
                values.get(idx).copied()
            }
            None => (value <= self.max).then_some(value.max(self.min)),
        }
    }

    /// Largest domain value `<= value`, if any.
    pub(crate) fn snap_down(&self, value: i64) -> Option<i64> {
        match &self.values {
            Some(values) => {
                let idx = values.partition_point(|&v| v <= value);
                idx.checked_sub(1).map(|i| values[i])
            }
            None => (value >= self.min).then_some(value.min(self.max)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_var() {
        let v = IntVar::new("x", 0, 10);
        assert_eq!(v.domain_size(), 11);
        assert!(!v.is_fixed());
        assert!(v.contains(10));
        assert!(!v.contains(11));

        let f = IntVar::new("y", 5, 5);
        assert!(f.is_fixed());
        assert_eq!(f.domain_size(), 1);
    }

    #[test]
    fn test_bool_var() {
        let b = IntVar::boolean("flag");
        assert!(b.is_bool);
        assert_eq!((b.min, b.max), (0, 1));
    }

    #[test]
    fn test_sparse_domain() {
        let v = IntVar::from_values("room", [3, 0, 3, 7]);
        assert_eq!(v.values.as_deref(), Some(&[0, 3, 7][..]));
        assert_eq!((v.min, v.max), (0, 7));
        assert_eq!(v.domain_size(), 3);
        assert!(v.contains(3));
        assert!(!v.contains(4));
    }

    #[test]
    fn test_empty_domain() {
        let v = IntVar::from_values("room", Vec::new());
        assert!(v.is_empty());

        let w = IntVar::new("w", 5, 4);
        assert!(w.is_empty());
    }

    #[test]
    fn test_snap() {
        let v = IntVar::from_values("r", [1, 4, 6]);
        assert_eq!(v.snap_up(2), Some(4));
        assert_eq!(v.snap_up(7), None);
        assert_eq!(v.snap_down(5), Some(4));
        assert_eq!(v.snap_down(0), None);

        let w = IntVar::new("w", 0, 9);
        assert_eq!(w.snap_up(-3), Some(0));
        assert_eq!(w.snap_down(12), Some(9));
        assert_eq!(w.snap_up(10), None);
    }
}
