//! Chunk callbacks, one module per state category.

pub(super) mod clips;
pub(super) mod geometry;
pub(super) mod lights;
pub(super) mod material;
pub(super) mod modes;
pub(super) mod outline;
pub(super) mod program;
pub(super) mod transform;
pub(super) mod viewport;
