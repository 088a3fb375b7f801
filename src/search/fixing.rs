//! Per-variable fixing/setting status.

/// Fixing and setting status of a variable within a node.
///
/// *Setting* pins a variable for the subtree rooted at the node (from a
/// branch rule or a logical implication); *fixing* pins it permanently
/// for the rest of the run (reduced-cost fixing at the effective root,
/// or a global logical implication). A pinned variable has its LP
/// bounds collapsed to the pinned value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsVarStat {
    /// Not pinned.
    Free,

    /// Pinned to a value within the current subtree.
    Set(f64),

    /// Pinned to a value for the rest of the run.
    Fixed(f64),
}

impl FsVarStat {
    /// The pinned value, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            FsVarStat::Free => None,
            FsVarStat::Set(v) | FsVarStat::Fixed(v) => Some(*v),
        }
    }

    /// Whether the variable is pinned (set or fixed).
    pub fn is_pinned(&self) -> bool {
        !matches!(self, FsVarStat::Free)
    }

    /// Whether the variable is permanently fixed.
    pub fn is_fixed(&self) -> bool {
        matches!(self, FsVarStat::Fixed(_))
    }

    /// Check whether pinning this variable to `value` contradicts the
    /// current status. A contradiction is always fatal to the node.
    pub fn contradicts(&self, value: f64, eps: f64) -> bool {
        match self.value() {
            Some(v) => (v - value).abs() > eps,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_and_pinned() {
        assert_eq!(FsVarStat::Free.value(), None);
        assert_eq!(FsVarStat::Set(1.0).value(), Some(1.0));
        assert_eq!(FsVarStat::Fixed(0.0).value(), Some(0.0));

        assert!(!FsVarStat::Free.is_pinned());
        assert!(FsVarStat::Set(1.0).is_pinned());
        assert!(FsVarStat::Fixed(1.0).is_fixed());
        assert!(!FsVarStat::Set(1.0).is_fixed());
    }

    #[test]
    fn test_contradiction() {
        let fixed0 = FsVarStat::Fixed(0.0);
        assert!(fixed0.contradicts(1.0, 1e-6));
        assert!(!fixed0.contradicts(0.0, 1e-6));
        assert!(!FsVarStat::Free.contradicts(1.0, 1e-6));
    }
}
