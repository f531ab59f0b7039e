//! Id <-> color encoding for the picking pass.
//!
//! Every pickable object is drawn with a solid color that spells out its id.
//! The color is read back from the pick target and decoded to recover the id.
//! The encoding is only exact when the render path leaves the bytes alone:
//! no blending, no filtering, no multisampling and no sRGB conversion. See
//! [`crate::backend::IdPassSettings`] for where that is enforced.

/// Identity of a pickable object. Zero means "no object".
pub type PickId = u32;

/// The id that the background (clear color) decodes to.
pub const NO_PICK_ID: PickId = 0;

/// Four 8-bit channels carrying a [`PickId`] through the renderer.
///
/// Channel 0 holds the most significant byte, channel 3 the least.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IdColor(pub [u8; 4]);

impl IdColor {
    /// The color of the background. Decodes to [`NO_PICK_ID`].
    pub const NONE: Self = Self([0; 4]);

    /// Encodes an id. Same as [`encode`].
    #[must_use]
    pub fn from_id(id: PickId) -> Self {
        encode(id)
    }

    /// Decodes back to an id. Same as [`decode`].
    #[must_use]
    pub fn id(self) -> PickId {
        decode(self)
    }

    /// Returns the channel values normalized to `0.0..=1.0`.
    ///
    /// This is what a fragment shader has to output into an 8-bit unorm
    /// target for the stored bytes to equal `self`. Each channel is `k / 255`,
    /// which the unorm conversion maps back to `k` exactly.
    #[must_use]
    pub fn to_unorm(self) -> [f32; 4] {
        self.0.map(|c| f32::from(c) / 255.0)
    }

    /// Reads the texel at `offset` from a tightly packed RGBA8 buffer.
    ///
    /// Returns `None` if the buffer is too short.
    #[must_use]
    pub fn from_rgba8_slice(data: &[u8], offset: usize) -> Option<Self> {
        let texel = data.get(offset..offset.checked_add(4)?)?;
        Some(Self([texel[0], texel[1], texel[2], texel[3]]))
    }
}

impl From<PickId> for IdColor {
    fn from(id: PickId) -> Self {
        encode(id)
    }
}

impl From<IdColor> for PickId {
    fn from(color: IdColor) -> Self {
        decode(color)
    }
}

/// Encodes an id as a pick color.
///
/// Returns [R, G, B, A] where:
/// - R contains bits 24-31
/// - G contains bits 16-23
/// - B contains bits 8-15
/// - A contains bits 0-7
#[must_use]
pub fn encode(id: PickId) -> IdColor {
    IdColor(id.to_be_bytes())
}

/// Decodes a pick color back to an id.
#[must_use]
pub fn decode(color: IdColor) -> PickId {
    PickId::from_be_bytes(color.0)
}
