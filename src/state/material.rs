use std::rc::Rc;

use glam::Vec3;
use smallvec::SmallVec;

use super::{StateId, StateKind, impl_state_object};
use crate::gpu::GpuTexture;

/// Shading model, selects the fragment template branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialModel {
    /// Unlit, emissive colour only.
    Emissive,
    Lambert,
    #[default]
    Phong,
    Metallic,
    Specular,
}

impl MaterialModel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emissive => "emissive",
            Self::Lambert => "lambert",
            Self::Phong => "phong",
            Self::Metallic => "metallic",
            Self::Specular => "specular",
        }
    }
}

/// Texture slot a map is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKind {
    BaseColor,
    Normal,
    Emissive,
    Specular,
    MetallicRoughness,
    Occlusion,
    Alpha,
}

impl MapKind {
    /// Sampler uniform name, also the template define.
    #[must_use]
    pub fn uniform(self) -> &'static str {
        match self {
            Self::BaseColor => "baseColorMap",
            Self::Normal => "normalMap",
            Self::Emissive => "emissiveMap",
            Self::Specular => "specularMap",
            Self::MetallicRoughness => "metallicRoughnessMap",
            Self::Occlusion => "occlusionMap",
            Self::Alpha => "alphaMap",
        }
    }

    fn code(self) -> char {
        match self {
            Self::BaseColor => 'b',
            Self::Normal => 'n',
            Self::Emissive => 'e',
            Self::Specular => 's',
            Self::MetallicRoughness => 'm',
            Self::Occlusion => 'o',
            Self::Alpha => 'a',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialMap {
    pub kind: MapKind,
    pub texture: GpuTexture,
}

/// Material parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub model: MaterialModel,
    pub color: Vec3,
    pub alpha: f32,
    pub emissive: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub metallic: f32,
    pub roughness: f32,
    pub point_size: f32,
    pub line_width: f32,
    pub maps: SmallVec<[MaterialMap; 4]>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            model: MaterialModel::Phong,
            color: Vec3::ONE,
            alpha: 1.0,
            emissive: Vec3::ZERO,
            specular: Vec3::ONE,
            shininess: 80.0,
            metallic: 1.0,
            roughness: 1.0,
            point_size: 1.0,
            line_width: 1.0,
            maps: SmallVec::new(),
        }
    }
}

#[derive(Debug)]
pub struct MaterialState {
    id: StateId,
    hash: String,
    desc: MaterialDesc,
}

impl_state_object!(MaterialState, StateKind::Material);

impl MaterialState {
    #[must_use]
    pub fn new(desc: MaterialDesc) -> Rc<Self> {
        let mut codes: SmallVec<[char; 8]> = desc.maps.iter().map(|m| m.kind.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        let mut hash = format!("m:{}", desc.model.as_str());
        if !codes.is_empty() {
            hash.push(',');
            hash.extend(codes);
        }
        Rc::new(Self {
            id: StateId::next(),
            hash,
            desc,
        })
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    #[must_use]
    pub fn desc(&self) -> &MaterialDesc {
        &self.desc
    }

    #[must_use]
    pub fn has_map(&self, kind: MapKind) -> bool {
        self.desc.maps.iter().any(|m| m.kind == kind)
    }
}
