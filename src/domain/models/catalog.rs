//! Fixed Zernike polynomial catalog in Noll ordering.

use serde::{Deserialize, Serialize};

/// Noll order and name of every catalogued polynomial
pub const NOLL_NAMES: [(u32, &str); 15] = [
    (1, "Piston"),
    (2, "Tip (X-tilt)"),
    (3, "Tilt (Y-tilt)"),
    (4, "Defocus"),
    (5, "Oblique astigmatism"),
    (6, "Vertical astigmatism"),
    (7, "Vertical coma"),
    (8, "Horizontal coma"),
    (9, "Vertical trefoil"),
    (10, "Oblique trefoil"),
    (11, "Primary spherical"),
    (12, "Vertical secondary astigmatism"),
    (13, "Oblique secondary astigmatism"),
    (14, "Vertical quadrafoil"),
    (15, "Oblique quadrafoil"),
];

/// Orders emphasised in reports
pub const SALIENT_ORDERS: [u32; 5] = [5, 6, 7, 8, 11];

/// Classification of a coefficient against the phase tolerance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceFlag {
    #[default]
    Unclassified,
    Within,
    Outside,
}

/// One polynomial of the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub order: u32,
    pub name: &'static str,
    pub value: f64,
    pub tolerance_flag: ToleranceFlag,
}

impl CatalogEntry {
    pub fn is_salient(&self) -> bool {
        SALIENT_ORDERS.contains(&self.order)
    }
}

/// Ordered, fixed-length list of catalog entries.
///
/// Length and order never change; only values and flags do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZernikeCatalog {
    entries: Vec<CatalogEntry>,
}

impl Default for ZernikeCatalog {
    fn default() -> Self {
        Self::initialize()
    }
}

impl ZernikeCatalog {
    /// Fresh catalog: every value zero, every flag unclassified
    pub fn initialize() -> Self {
        Self {
            entries: NOLL_NAMES
                .iter()
                .map(|&(order, name)| CatalogEntry {
                    order,
                    name,
                    value: 0.0,
                    tolerance_flag: ToleranceFlag::Unclassified,
                })
                .collect(),
        }
    }

    /// Reset in place to the freshly initialized state
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.value = 0.0;
            entry.tolerance_flag = ToleranceFlag::Unclassified;
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [CatalogEntry] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    pub fn get(&self, order: u32) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.order == order)
    }
}
