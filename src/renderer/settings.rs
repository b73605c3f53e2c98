//! Renderer Settings
//!
//! Static configuration handed to [`Renderer::new`](super::Renderer::new).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_retained::RendererSettings;
//!
//! // Opaque canvas cleared with the ambient light colour, 2k shadow maps
//! let settings = RendererSettings::default()
//!     .with_ambient_clear(true)
//!     .with_shadow_map_size(2048);
//!
//! // Compositing over a page: keep the canvas transparent
//! let settings = RendererSettings {
//!     transparent_canvas: true,
//!     ..Default::default()
//! };
//! ```

/// Renderer-wide configuration.
///
/// | Field                | Default            | Effect                                        |
/// |----------------------|--------------------|-----------------------------------------------|
/// | `transparent_canvas` | `false`            | Clear to `[0, 0, 0, 0]`                        |
/// | `background_color`   | opaque black       | Clear colour of an opaque canvas               |
/// | `ambient_clear`      | `true`             | Clear with the attached ambient light colour   |
/// | `shadow_map_size`    | `1024`             | Default shadow-map edge length                 |
/// | `max_lights`         | `8`                | Lights a shader may declare                    |
/// | `max_clips`          | `6`                | Clip planes a shader may declare               |
/// | `pick_ray_fov`       | `0.1` rad          | Field of view of ray-pick projections          |
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    pub transparent_canvas: bool,
    pub background_color: [f32; 4],
    pub ambient_clear: bool,
    pub shadow_map_size: u32,
    /// Programs whose state declares more lights fail to build.
    pub max_lights: usize,
    /// Programs whose state declares more clip planes fail to build.
    pub max_clips: usize,
    pub pick_ray_fov: f32,
}

impl Default for RendererSettings {
    #[inline]
    fn default() -> Self {
        Self {
            transparent_canvas: false,
            background_color: [0.0, 0.0, 0.0, 1.0],
            ambient_clear: true,
            shadow_map_size: 1024,
            max_lights: 8,
            max_clips: 6,
            pick_ray_fov: 0.1,
        }
    }
}

impl RendererSettings {
    #[must_use]
    pub fn with_transparent_canvas(mut self, transparent: bool) -> Self {
        self.transparent_canvas = transparent;
        self
    }

    #[must_use]
    pub fn with_background_color(mut self, color: [f32; 4]) -> Self {
        self.background_color = color;
        self
    }

    #[must_use]
    pub fn with_ambient_clear(mut self, enabled: bool) -> Self {
        self.ambient_clear = enabled;
        self
    }

    #[must_use]
    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_max_lights(mut self, max: usize) -> Self {
        self.max_lights = max;
        self
    }

    #[must_use]
    pub fn with_max_clips(mut self, max: usize) -> Self {
        self.max_clips = max;
        self
    }

    #[must_use]
    pub fn with_pick_ray_fov(mut self, fov: f32) -> Self {
        self.pick_ray_fov = fov;
        self
    }

    /// Colour used by the main pass clear, given the attached ambient colour.
    #[must_use]
    pub fn clear_color(&self, ambient: Option<[f32; 3]>) -> [f32; 4] {
        if self.transparent_canvas {
            return [0.0; 4];
        }
        match ambient {
            Some([r, g, b]) if self.ambient_clear => [r, g, b, 1.0],
            _ => self.background_color,
        }
    }
}
