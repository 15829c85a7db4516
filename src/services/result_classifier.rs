//! Maps raw polynomial coefficients onto the fixed Zernike catalog.

use tracing::debug;

use crate::domain::models::{ToleranceFlag, ZernikeCatalog};

/// Classifies fit coefficients against a phase tolerance
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultClassifier;

impl ResultClassifier {
    /// Fresh catalog with every value zero and every flag unclassified
    pub fn initialize_catalog() -> ZernikeCatalog {
        ZernikeCatalog::initialize()
    }

    /// Pair `raw` with the catalog positionally and flag each paired entry.
    ///
    /// Pairing stops at the shorter of the two sequences. Surplus
    /// coefficients are ignored and unpaired entries keep their current
    /// value and flag.
    pub fn classify(raw: &[f64], catalog: &ZernikeCatalog, tolerance: f64) -> ZernikeCatalog {
        let mut classified = catalog.clone();
        Self::classify_in_place(raw, &mut classified, tolerance);
        classified
    }

    pub fn classify_in_place(raw: &[f64], catalog: &mut ZernikeCatalog, tolerance: f64) {
        let paired = raw.len().min(catalog.len());
        if raw.len() != catalog.len() {
            debug!(
                coefficients = raw.len(),
                catalog = catalog.len(),
                paired,
                "Coefficient count differs from catalog length"
            );
        }

        for (entry, &value) in catalog.entries_mut().iter_mut().zip(raw) {
            entry.value = value;
            entry.tolerance_flag = Self::flag(value, tolerance);
        }
    }

    /// `Within` when strictly below the tolerance in magnitude
    pub fn flag(value: f64, tolerance: f64) -> ToleranceFlag {
        if value.abs() < tolerance {
            ToleranceFlag::Within
        } else {
            ToleranceFlag::Outside
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_flags_by_magnitude() {
        let catalog = ResultClassifier::initialize_catalog();
        let classified = ResultClassifier::classify(&[0.3, -0.6], &catalog, 0.5);

        let entries = classified.entries();
        assert_eq!(entries[0].value, 0.3);
        assert_eq!(entries[0].tolerance_flag, ToleranceFlag::Within);
        assert_eq!(entries[1].value, -0.6);
        assert_eq!(entries[1].tolerance_flag, ToleranceFlag::Outside);
    }

    #[test]
    fn test_short_input_leaves_tail_unclassified() {
        let catalog = ResultClassifier::initialize_catalog();
        let classified = ResultClassifier::classify(&[0.1, 0.2, 0.3], &catalog, 0.5);

        assert_eq!(classified.len(), 15);
        for entry in &classified.entries()[3..] {
            assert_eq!(entry.value, 0.0);
            assert_eq!(entry.tolerance_flag, ToleranceFlag::Unclassified);
        }
    }

    #[test]
    fn test_long_input_is_truncated() {
        let catalog = ResultClassifier::initialize_catalog();
        let raw: Vec<f64> = (0..120).map(|i| f64::from(i) * 0.01).collect();
        let classified = ResultClassifier::classify(&raw, &catalog, 0.1);

        assert_eq!(classified.len(), 15);
        assert_eq!(classified.values(), raw[..15].to_vec());
        assert_eq!(classified.entries()[14].tolerance_flag, ToleranceFlag::Outside);
    }

    #[test]
    fn test_boundary_is_outside() {
        assert_eq!(ResultClassifier::flag(0.5, 0.5), ToleranceFlag::Outside);
        assert_eq!(ResultClassifier::flag(-0.5, 0.5), ToleranceFlag::Outside);
        assert_eq!(ResultClassifier::flag(0.49, 0.5), ToleranceFlag::Within);
    }

    #[test]
    fn test_input_catalog_untouched() {
        let catalog = ResultClassifier::initialize_catalog();
        let _ = ResultClassifier::classify(&[1.0], &catalog, 0.5);
        assert_eq!(catalog, ResultClassifier::initialize_catalog());
    }
}
