//! Shader Synthesis
//!
//! Turns a state configuration into GLSL for every program variant. The
//! default [`TemplateSynthesizer`] renders the embedded templates under
//! `shaders/` with minijinja, using `{$ $}` block delimiters and `$$` line
//! statements so the templates stay readable next to GLSL braces.

use std::borrow::Cow;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, ErrorKind};
use rust_embed::RustEmbed;
use serde::Serialize;

use super::{ProgramSources, ProgramStage, StageSources};
use crate::errors::Result;
use crate::renderer::settings::RendererSettings;
use crate::state::{Billboard, LightKind, LightSpace, MapKind, StateSlots};

/// Produces program sources for a composed state hash.
///
/// Must be a pure function of the shader-relevant slots: two snapshots with
/// the same hash must produce the same sources.
pub trait ShaderSynthesizer {
    fn synthesize(&self, hash: &str, slots: &StateSlots) -> Result<ProgramSources>;
}

#[derive(RustEmbed)]
#[folder = "src/renderer/program/shaders"]
struct ShaderAssets;

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name).extension().is_some() {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.glsl"))
    };

    #[cfg(debug_assertions)]
    {
        let path = std::path::Path::new("src/renderer/program/shaders").join(filename.as_ref());
        if path.exists() {
            return match std::fs::read_to_string(&path) {
                Ok(source) => Ok(Some(source)),
                Err(e) => Err(Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("Failed to read file: {e}"),
                )),
            };
        }
    }

    if let Some(file) = ShaderAssets::get(&filename)
        && let Ok(source) = std::str::from_utf8(file.data.as_ref())
    {
        return Ok(Some(source.to_string()));
    }

    Ok(None)
}

fn build_env() -> Environment<'static> {
    let mut env = Environment::new();

    match SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .line_statement_prefix("$$")
        .build()
    {
        Ok(syntax) => env.set_syntax(syntax),
        Err(e) => log::error!("Failed to configure shader template syntax: {e}"),
    }

    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);
    env.set_loader(shader_loader);
    env.set_path_join_callback(|name, _parent| format!("chunks/{name}").into());
    env
}

// ─── Template context ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct LightContext {
    kind: &'static str,
    view_space: bool,
    shadow: bool,
}

#[derive(Debug, Serialize)]
struct ShaderContext<'a> {
    hash: &'a str,
    primitive: &'static str,
    has_normals: bool,
    has_uvs: bool,
    has_colors: bool,
    model: &'static str,
    maps: Vec<&'static str>,
    lights: Vec<LightContext>,
    has_ambient: bool,
    num_clips: usize,
    clippable: bool,
    transparent: bool,
    receive_shadow: bool,
    billboard: &'static str,
    stationary: bool,
    max_lights: usize,
    max_clips: usize,
}

impl<'a> ShaderContext<'a> {
    fn new(hash: &'a str, slots: &StateSlots, max_lights: usize, max_clips: usize) -> Self {
        let geometry = slots.geometry.as_deref();
        let modes = slots.modes.desc();

        let mut maps: Vec<MapKind> = slots.material.desc().maps.iter().map(|m| m.kind).collect();
        maps.sort_unstable();
        maps.dedup();

        let lights = slots
            .lights
            .lights()
            .iter()
            .filter(|l| !l.is_ambient())
            .map(|l| {
                let (kind, space) = match l.kind {
                    LightKind::Ambient => ("ambient", LightSpace::World),
                    LightKind::Directional { space, .. } => ("directional", space),
                    LightKind::Point { space, .. } => ("point", space),
                    LightKind::Spot { space, .. } => ("spot", space),
                };
                LightContext {
                    kind,
                    view_space: space == LightSpace::View,
                    shadow: l.casts_shadow(),
                }
            })
            .collect();

        Self {
            hash,
            primitive: geometry.map_or("triangles", |g| g.primitive().as_str()),
            has_normals: geometry.is_some_and(|g| g.has_normals()),
            has_uvs: geometry.is_some_and(|g| g.uv_buffer().is_some()),
            has_colors: geometry.is_some_and(|g| g.color_buffer().is_some()),
            model: slots.material.desc().model.as_str(),
            maps: maps.into_iter().map(MapKind::uniform).collect(),
            lights,
            has_ambient: slots.lights.ambient().is_some(),
            num_clips: slots.clips.len(),
            clippable: modes.clippable,
            transparent: modes.transparent,
            receive_shadow: modes.receive_shadow,
            billboard: match slots.billboard.mode() {
                Billboard::None => "none",
                Billboard::Spherical => "spherical",
                Billboard::Cylindrical => "cylindrical",
            },
            stationary: slots.stationary.active(),
            max_lights,
            max_clips,
        }
    }
}

// ─── TemplateSynthesizer ─────────────────────────────────────────────────────

/// minijinja-backed [`ShaderSynthesizer`] over the embedded GLSL templates.
pub struct TemplateSynthesizer {
    env: Environment<'static>,
    max_lights: usize,
    max_clips: usize,
}

impl Default for TemplateSynthesizer {
    fn default() -> Self {
        Self::from_settings(&RendererSettings::default())
    }
}

impl TemplateSynthesizer {
    #[must_use]
    pub fn from_settings(settings: &RendererSettings) -> Self {
        Self {
            env: build_env(),
            max_lights: settings.max_lights,
            max_clips: settings.max_clips,
        }
    }

    fn render(&self, template: &str, ctx: &ShaderContext<'_>) -> Result<String> {
        let source = self.env.get_template(template)?.render(ctx)?;
        Ok(format!("// === Auto-generated {template} ===\n{source}"))
    }
}

impl ShaderSynthesizer for TemplateSynthesizer {
    fn synthesize(&self, hash: &str, slots: &StateSlots) -> Result<ProgramSources> {
        let ctx = ShaderContext::new(hash, slots, self.max_lights, self.max_clips);
        let mut sources = ProgramSources::default();
        for stage in ProgramStage::ALL {
            let name = stage.template();
            sources.stages[stage.index()] = StageSources {
                vertex: self.render(&format!("{name}.vert"), &ctx)?,
                fragment: self.render(&format!("{name}.frag"), &ctx)?,
            };
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Clip, ClipsState, LightState, LightsState, MaterialDesc, MaterialState};
    use glam::Vec3;

    #[test]
    fn renders_every_variant() {
        let synthesizer = TemplateSynthesizer::default();
        let slots = StateSlots::default();
        let sources = synthesizer.synthesize("test", &slots).unwrap();
        for stage in ProgramStage::ALL {
            let s = sources.stage(stage);
            assert!(s.vertex.contains("void main()"), "{stage} vertex");
            assert!(s.fragment.contains("void main()"), "{stage} fragment");
            assert!(!s.fragment.contains("#error"));
        }
    }

    #[test]
    fn light_and_clip_uniforms_are_declared() {
        let synthesizer = TemplateSynthesizer::default();
        let mut slots = StateSlots::default();
        slots.lights = LightsState::new([
            LightState::new(LightKind::Ambient, Vec3::splat(0.2), 1.0),
            LightState::new(
                LightKind::Directional {
                    direction: Vec3::NEG_Z,
                    space: LightSpace::View,
                },
                Vec3::ONE,
                1.0,
            ),
        ]);
        slots.clips = ClipsState::new([Clip::default(), Clip::default()]);
        slots.material = MaterialState::new(MaterialDesc::default());

        let sources = synthesizer.synthesize("test", &slots).unwrap();
        let draw = &sources.stage(ProgramStage::Draw).fragment;
        assert!(draw.contains("uniform vec3 lightDir0;"));
        assert!(!draw.contains("lightDir1"));
        assert!(draw.contains("uniform vec3 clipPos1;"));
        assert!(draw.contains("uniform vec3 ambientColor;"));
        assert!(draw.contains("viewToWorldDir(lightDir0)"));
    }

    #[test]
    fn too_many_clips_emit_error_directive() {
        let synthesizer = TemplateSynthesizer::from_settings(&RendererSettings {
            max_clips: 1,
            ..Default::default()
        });
        let mut slots = StateSlots::default();
        slots.clips = ClipsState::new([Clip::default(), Clip::default()]);
        let sources = synthesizer.synthesize("test", &slots).unwrap();
        assert!(sources.stage(ProgramStage::Draw).fragment.contains("#error"));
    }
}
