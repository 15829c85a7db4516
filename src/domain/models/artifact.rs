use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Named raster slots used by the display and the reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    PsfXy,
    PsfXz,
    FitResult,
    Convergence,
    Decomposition,
}

impl ArtifactKind {
    /// Artifacts produced by a run (the previews belong to the loaded PSF)
    pub const RUN_OUTPUTS: [Self; 3] = [Self::FitResult, Self::Convergence, Self::Decomposition];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PsfXy => "psf_xy",
            Self::PsfXz => "psf_xz",
            Self::FitResult => "fit_result",
            Self::Convergence => "convergence",
            Self::Decomposition => "decomposition",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded raster buffers, replaced in place.
///
/// Readers receive a shared handle to the buffer that was current when they
/// asked; a later replacement never alters what they already hold.
#[derive(Debug, Default)]
pub struct ImageArtifactStore {
    buffers: RwLock<HashMap<ArtifactKind, Arc<[u8]>>>,
}

impl ImageArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer for `kind`, discarding its previous contents
    pub fn replace(&self, kind: ArtifactKind, bytes: Vec<u8>) {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        buffers.insert(kind, Arc::from(bytes));
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<Arc<[u8]>> {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        buffers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.get(kind).is_some_and(|b| !b.is_empty())
    }

    pub fn clear(&self, kind: ArtifactKind) {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        buffers.remove(&kind);
    }
}
