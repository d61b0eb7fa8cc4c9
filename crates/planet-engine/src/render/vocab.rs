//! Fixed attribute/uniform vocabulary shared by every shader program.
//!
//! A program may declare any subset of these names. Names are matched against
//! WGSL vertex-input argument names (attributes) and against the members of the
//! uniform struct bound at `@group(0) @binding(0)` (uniforms).

/// Declared type of a uniform member.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    Mat4,
    Vec4,
    Vec3,
    IVec2,
    Int,
    Float,
}

impl UniformKind {
    /// Size in bytes of one value of this kind inside a uniform block.
    pub const fn size(self) -> u32 {
        match self {
            UniformKind::Mat4 => 64,
            UniformKind::Vec4 => 16,
            UniformKind::Vec3 => 12,
            UniformKind::IVec2 => 8,
            UniformKind::Int | UniformKind::Float => 4,
        }
    }

    /// WGSL spelling, used in link diagnostics.
    pub const fn wgsl(self) -> &'static str {
        match self {
            UniformKind::Mat4 => "mat4x4<f32>",
            UniformKind::Vec4 => "vec4<f32>",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::IVec2 => "vec2<i32>",
            UniformKind::Int => "i32",
            UniformKind::Float => "f32",
        }
    }
}

/// Vertex attributes. All are four tightly packed `f32` components.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttributeName {
    Position,
    Normal,
    Color,
}

impl AttributeName {
    pub const ALL: [AttributeName; 3] =
        [AttributeName::Position, AttributeName::Normal, AttributeName::Color];

    pub const fn ident(self) -> &'static str {
        match self {
            AttributeName::Position => "vs_pos",
            AttributeName::Normal => "vs_nor",
            AttributeName::Color => "vs_col",
        }
    }

    pub fn from_ident(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.ident() == ident)
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Uniform names understood by [`ShaderProgram`](super::ShaderProgram).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformName {
    Model,
    ModelInvTr,
    ViewProj,
    InvViewProj,
    Color,
    Eye,
    Time,
    Texture0,
    Texture1,
    Texture2,
    Texture3,
    Dimensions,
    WaterOpacity,
    WaterLevel,
    WaterColor,
    BedrockColor1,
    BedrockColor2,
    SandColor,
    ShoreLevel,
    Elevation,
    NoiseScale,
}

impl UniformName {
    pub const COUNT: usize = 21;

    pub const ALL: [UniformName; Self::COUNT] = [
        UniformName::Model,
        UniformName::ModelInvTr,
        UniformName::ViewProj,
        UniformName::InvViewProj,
        UniformName::Color,
        UniformName::Eye,
        UniformName::Time,
        UniformName::Texture0,
        UniformName::Texture1,
        UniformName::Texture2,
        UniformName::Texture3,
        UniformName::Dimensions,
        UniformName::WaterOpacity,
        UniformName::WaterLevel,
        UniformName::WaterColor,
        UniformName::BedrockColor1,
        UniformName::BedrockColor2,
        UniformName::SandColor,
        UniformName::ShoreLevel,
        UniformName::Elevation,
        UniformName::NoiseScale,
    ];

    /// Uniforms carrying one texture unit index each, in unit order.
    pub const TEXTURE_UNITS: [UniformName; 4] = [
        UniformName::Texture0,
        UniformName::Texture1,
        UniformName::Texture2,
        UniformName::Texture3,
    ];

    pub const fn ident(self) -> &'static str {
        match self {
            UniformName::Model => "model",
            UniformName::ModelInvTr => "model_inv_tr",
            UniformName::ViewProj => "view_proj",
            UniformName::InvViewProj => "inv_view_proj",
            UniformName::Color => "color",
            UniformName::Eye => "eye",
            UniformName::Time => "time",
            UniformName::Texture0 => "texture0",
            UniformName::Texture1 => "texture1",
            UniformName::Texture2 => "texture2",
            UniformName::Texture3 => "texture3",
            UniformName::Dimensions => "dimensions",
            UniformName::WaterOpacity => "water_opacity",
            UniformName::WaterLevel => "water_level",
            UniformName::WaterColor => "water_color",
            UniformName::BedrockColor1 => "bedrock_color1",
            UniformName::BedrockColor2 => "bedrock_color2",
            UniformName::SandColor => "sand_color",
            UniformName::ShoreLevel => "shore_level",
            UniformName::Elevation => "elevation",
            UniformName::NoiseScale => "noise_scale",
        }
    }

    pub const fn kind(self) -> UniformKind {
        match self {
            UniformName::Model
            | UniformName::ModelInvTr
            | UniformName::ViewProj
            | UniformName::InvViewProj => UniformKind::Mat4,
            UniformName::Color | UniformName::Eye => UniformKind::Vec4,
            UniformName::WaterColor
            | UniformName::BedrockColor1
            | UniformName::BedrockColor2
            | UniformName::SandColor => UniformKind::Vec3,
            UniformName::Dimensions => UniformKind::IVec2,
            UniformName::Time
            | UniformName::Texture0
            | UniformName::Texture1
            | UniformName::Texture2
            | UniformName::Texture3 => UniformKind::Int,
            UniformName::WaterOpacity
            | UniformName::WaterLevel
            | UniformName::ShoreLevel
            | UniformName::Elevation
            | UniformName::NoiseScale => UniformKind::Float,
        }
    }

    pub fn from_ident(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.ident() == ident)
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}
