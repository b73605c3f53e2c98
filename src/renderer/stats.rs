/// Cumulative pipeline counters, reset with
/// [`Renderer::reset_stats`](super::Renderer::reset_stats).
///
/// Each stage counter increments only when that stage actually ran, which
/// makes the dirty-flag cascade observable from the outside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Stage 1: flat object array rebuilt from the registry.
    pub object_list_builds: u32,
    /// Stage 2: sort keys recomputed.
    pub state_order_updates: u32,
    /// Stage 3: object array sorted, shadow/target lists rebuilt.
    pub sorts: u32,
    /// Stage 4: main image drawn.
    pub image_renders: u32,
    /// Shadow maps drawn, one per light per image.
    pub shadow_renders: u32,
    pub pick_passes: u32,
    pub chunks_invoked: u64,
    /// Chunk invocations skipped because the slot already held that chunk.
    pub chunks_suppressed: u64,
    /// `pass` of the last [`RenderParams`](super::RenderParams) drawn.
    pub last_pass: u32,
}
