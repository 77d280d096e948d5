//! Pre-loaded voice-activity-detection resource
//!
//! The VAD model is loaded exactly once at process start and shared
//! read-only across concurrent call sessions. Inference belongs to the
//! external voice pipeline; this handle only owns the model bytes and the
//! frame configuration handed to the pipeline at channel setup.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// VAD frame configuration
#[derive(Debug, Clone)]
pub struct VadConfig {
    pub sample_rate: u32,
    pub frame_ms: u32,
    pub speech_threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_ms: 10,
            speech_threshold: 0.5,
        }
    }
}

/// Immutable handle over the once-loaded VAD model.
///
/// Cheap to clone; all clones share the same loaded bytes.
#[derive(Clone)]
pub struct VadHandle {
    inner: Arc<VadModel>,
}

struct VadModel {
    config: VadConfig,
    weights: Arc<[u8]>,
    source: String,
}

impl VadHandle {
    /// Load the model file. Call once at process start, then clone the
    /// handle into each session.
    pub fn load(path: impl AsRef<Path>, config: VadConfig) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "loaded VAD model");

        Ok(Self {
            inner: Arc::new(VadModel {
                config,
                weights: bytes.into(),
                source: path.display().to_string(),
            }),
        })
    }

    /// An empty handle for setups where the external pipeline owns VAD
    /// entirely.
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(VadModel {
                config: VadConfig::default(),
                weights: Vec::new().into(),
                source: "disabled".to_string(),
            }),
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.inner.config
    }

    pub fn weights(&self) -> &[u8] {
        &self.inner.weights
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn is_loaded(&self) -> bool {
        !self.inner.weights.is_empty()
    }
}

impl fmt::Debug for VadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VadHandle")
            .field("source", &self.inner.source)
            .field("bytes", &self.inner.weights.len())
            .finish()
    }
}
