//! Error types for pickpass.

use thiserror::Error;

/// The main error type for pickpass operations.
#[derive(Error, Debug)]
pub enum PickError {
    /// No registry is installed in the picking context.
    #[error("no active pickable registry - install one on the picking context first")]
    NoRegistry,

    /// A registry is already installed in the picking context.
    #[error("a pickable registry is already active")]
    DuplicateRegistry,

    /// No material variant cache is installed in the picking context.
    #[error("no active material variant cache")]
    NoVariantCache,

    /// A material variant cache is already installed in the picking context.
    #[error("a material variant cache is already active")]
    DuplicateVariantCache,

    /// The handle reported the reserved background id.
    #[error("instance id 0 is reserved for the background")]
    ReservedId,

    /// The instance id is registered to another live object.
    #[error("instance id {0} is already registered to another object")]
    IdInUse(u32),

    /// A picking surface selects a different pass than the variant cache tags.
    #[error("picking surface selects pass {surface}, but pickable materials are tagged {context}")]
    PassTagMismatch { surface: String, context: String },

    /// The downscale divisor is outside `1..=8`.
    #[error("invalid downscale divisor {0}: expected a value in 1..=8")]
    InvalidDownscale(u32),

    /// The id pass would not carry ids through the render path unchanged.
    #[error("unsafe id pass configuration: {0}")]
    UnsafeIdPass(String),

    /// Error reported by the rendering backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for pickpass operations.
pub type Result<T> = std::result::Result<T, PickError>;
