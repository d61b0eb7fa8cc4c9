use planet_engine::render::{Backend, RenderContext, ShaderError, ShaderProgram};

use crate::scene::ProgramKey;

const PLANET_WGSL: &str = include_str!("shaders/planet.wgsl");
const WATER_WGSL: &str = include_str!("shaders/water.wgsl");
const SKY_WGSL: &str = include_str!("shaders/sky.wgsl");
const TEST_WGSL: &str = include_str!("shaders/test.wgsl");

/// Every program the studio draws with, linked once at startup.
#[derive(Debug)]
pub struct Programs {
    pub planet: ShaderProgram,
    pub water: ShaderProgram,
    pub sky: ShaderProgram,
    pub test: ShaderProgram,
}

impl Programs {
    pub fn compile<B: Backend>(ctx: &mut RenderContext<B>) -> Result<Self, ShaderError> {
        Ok(Self {
            planet: build(ctx, "planet", PLANET_WGSL)?,
            water: build(ctx, "water", WATER_WGSL)?,
            sky: build(ctx, "sky", SKY_WGSL)?,
            test: build(ctx, "test", TEST_WGSL)?,
        })
    }

    /// Program for the terrain pass of a scene.
    pub fn terrain(&self, key: ProgramKey) -> &ShaderProgram {
        match key {
            ProgramKey::Planet => &self.planet,
            ProgramKey::Test => &self.test,
        }
    }
}

// Each source carries both entry points.
fn build<B: Backend>(ctx: &mut RenderContext<B>, label: &str, source: &str) -> Result<ShaderProgram, ShaderError> {
    ShaderProgram::from_sources(ctx, label, source, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planet_engine::render::{AttributeName, RecordingBackend, UniformName};

    const CONTROL_UNIFORMS: [UniformName; 9] = [
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

    fn compiled() -> Programs {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        Programs::compile(&mut ctx).unwrap()
    }

    #[test]
    fn all_programs_link() {
        let programs = compiled();
        let ids = [
            programs.planet.id(),
            programs.water.id(),
            programs.sky.id(),
            programs.test.id(),
        ];
        for (i, a) in ids.iter().enumerate() {
            assert!(ids[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn planet_reads_terrain_controls() {
        let planet = compiled().planet;
        for name in [
            UniformName::BedrockColor1,
            UniformName::BedrockColor2,
            UniformName::SandColor,
            UniformName::ShoreLevel,
            UniformName::Elevation,
            UniformName::NoiseScale,
            UniformName::WaterLevel,
            UniformName::Texture0,
            UniformName::Texture1,
            UniformName::ModelInvTr,
            UniformName::Eye,
            UniformName::Time,
        ] {
            assert!(planet.declares(name), "{name:?}");
        }
        assert!(!planet.declares(UniformName::WaterColor));
        assert!(planet.attribute_slot(AttributeName::Normal).is_some());
    }

    #[test]
    fn water_reads_water_controls() {
        let water = compiled().water;
        for name in [UniformName::WaterOpacity, UniformName::WaterLevel, UniformName::WaterColor] {
            assert!(water.declares(name), "{name:?}");
        }
        assert!(!water.declares(UniformName::SandColor));
    }

    #[test]
    fn sky_uses_the_inverse_view_projection() {
        let sky = compiled().sky;
        assert!(sky.declares(UniformName::InvViewProj));
        assert!(sky.declares(UniformName::Dimensions));
        assert!(!sky.declares(UniformName::Model));
        assert!(sky.attribute_slot(AttributeName::Normal).is_none());
    }

    #[test]
    fn test_program_ignores_controls() {
        let test = compiled().test;
        assert!(test.declares(UniformName::Color));
        assert!(CONTROL_UNIFORMS.iter().all(|n| !test.declares(*n)));
    }

    #[test]
    fn terrain_follows_the_program_key() {
        let programs = compiled();
        assert_eq!(programs.terrain(ProgramKey::Planet).id(), programs.planet.id());
        assert_eq!(programs.terrain(ProgramKey::Test).id(), programs.test.id());
    }
}
