//! Per-frame pass sequencing.
//!
//! A frame is: rotate the planet, refresh the camera, clear, draw the sky
//! without depth test, then the surface passes with depth test and alpha
//! blending, then advance the scene's frame counter.

use anyhow::{Context, Result};
use glam::{Mat4, Vec3, Vec4};
use planet_engine::camera::Camera;
use planet_engine::render::{
    unit_rgb, Backend, ControlBundle, Drawable, Mesh, RenderContext, Renderer, Rgb255, ShaderProgram,
    UniformName,
};

use crate::assets::TextureBank;
use crate::config::StudioConfig;
use crate::geometry;
use crate::programs::Programs;
use crate::scene::{RenderMode, Scene, SceneController};

pub const ROTATION_RATE_DEG_PER_SEC: f32 = 6.0;

/// Initial geometry color; it survives scene transitions.
pub const DEFAULT_GEOMETRY_COLOR: Rgb255 = [255, 0, 0];

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const INITIAL_EYE: Vec3 = Vec3::new(0.0, 0.0, 3.5);

/// Rotation about +Y for `dt` seconds at [`ROTATION_RATE_DEG_PER_SEC`].
pub fn rotation_step(dt: f32) -> Mat4 {
    Mat4::from_rotation_y((ROTATION_RATE_DEG_PER_SEC * dt).to_radians())
}

/// Right-multiplies the drawable's model matrix by one rotation step.
pub fn rotate(drawable: &mut dyn Drawable, dt: f32) {
    drawable.set_model_matrix(drawable.model_matrix() * rotation_step(dt));
}

/// Uploaded meshes.
#[derive(Debug)]
pub struct Scenery {
    /// The planet; scene transitions reset its transform.
    pub sphere: Mesh,
    pub cube: Mesh,
    pub sky: Mesh,
}

impl Scenery {
    pub fn upload<B: Backend>(ctx: &mut RenderContext<B>, subdivisions: u32) -> Self {
        Self {
            sphere: Mesh::upload(ctx, "planet", &geometry::icosphere(subdivisions)),
            cube: Mesh::upload(ctx, "cube", &geometry::cube()),
            sky: Mesh::upload(ctx, "sky", &geometry::sky_quad()),
        }
    }
}

/// Everything a frame draws, independent of the GPU backend.
pub struct Stage {
    pub renderer: Renderer,
    pub camera: Camera,
    pub programs: Programs,
    pub scenery: Scenery,
    pub textures: TextureBank,
    pub scenes: SceneController,
    /// Panel-editable tint pushed as the `color` uniform.
    pub geometry_color: Rgb255,
}

impl Stage {
    /// Links programs, uploads meshes and textures, then enters the default scene.
    pub fn new<B: Backend>(ctx: &mut RenderContext<B>, config: &StudioConfig) -> Result<Self> {
        let programs = Programs::compile(ctx).context("failed to build shader programs")?;
        let scenery = Scenery::upload(ctx, config.subdivisions);
        let textures = TextureBank::load(ctx, config).context("failed to upload textures")?;

        log::info!(
            "planet mesh: {} subdivisions, {} vertices",
            config.subdivisions,
            geometry::vertex_count(config.subdivisions)
        );

        let mut stage = Self {
            renderer: Renderer::new(CLEAR_COLOR),
            camera: Camera::new(INITIAL_EYE, Vec3::ZERO),
            programs,
            scenery,
            textures,
            scenes: SceneController::new(),
            geometry_color: DEFAULT_GEOMETRY_COLOR,
        };
        stage.enter(Scene::DefaultPlanet);
        Ok(stage)
    }

    pub fn enter(&mut self, scene: Scene) {
        self.scenes.enter(scene, &mut self.scenery.sphere);
    }

    /// Keeps viewport, aspect ratio and projection consistent with the surface.
    pub fn resize<B: Backend>(&mut self, ctx: &mut RenderContext<B>, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.renderer.set_viewport(ctx, width, height);
        self.camera.set_aspect_ratio(width as f32 / height as f32);
        self.camera.update_projection_matrix();
    }

    /// Records one frame `dt` seconds after the previous one.
    pub fn step<B: Backend>(&mut self, ctx: &mut RenderContext<B>, dt: f32) {
        rotate(&mut self.scenery.sphere, dt);
        self.camera.update();
        self.renderer.clear(ctx);

        let frame = self.scenes.frame_count();
        let eye = self.camera.position().extend(1.0);

        ctx.set_depth_test(false);
        ctx.set_blend(false);
        let sky = &self.programs.sky;
        let (width, height) = self.renderer.viewport();
        sky.set_screen_dimensions(ctx, width, height);
        sky.set_time(ctx, frame);
        sky.set_eye_position(ctx, eye);
        self.renderer.render(ctx, &self.camera, sky, &[&self.scenery.sky]);

        ctx.set_depth_test(true);
        ctx.set_blend(true);
        let controls = *self.scenes.controls();
        match self.scenes.render_mode() {
            RenderMode::Planet => {
                let terrain = self.programs.terrain(self.scenes.program());
                self.prepare_surface(ctx, terrain, &controls, eye);
                self.renderer.render(ctx, &self.camera, terrain, &[&self.scenery.sphere]);

                let water = &self.programs.water;
                self.prepare_surface(ctx, water, &controls, eye);
                self.renderer.render(ctx, &self.camera, water, &[&self.scenery.sphere]);
            }
            RenderMode::Fallback => {
                let model = self.scenery.sphere.model_matrix();
                self.scenery.cube.set_model_matrix(model);

                let terrain = self.programs.terrain(self.scenes.program());
                self.prepare_surface(ctx, terrain, &controls, eye);
                self.renderer.render(ctx, &self.camera, terrain, &[&self.scenery.cube]);
            }
        }

        self.scenes.advance_frame();
    }

    fn prepare_surface<B: Backend>(
        &self,
        ctx: &mut RenderContext<B>,
        program: &ShaderProgram,
        controls: &ControlBundle,
        eye: Vec4,
    ) {
        program.set_time(ctx, self.scenes.frame_count());
        program.set_eye_position(ctx, eye);
        program.set_geometry_color(ctx, unit_rgb(self.geometry_color).extend(1.0));
        program.push_controls(ctx, controls);

        let bound = self.scenes.textures();
        for (unit, name) in UniformName::TEXTURE_UNITS.into_iter().enumerate() {
            match bound.get(unit) {
                Some(&key) => {
                    self.textures.get(key).bind(ctx, unit as u32);
                    program.set_texture(ctx, unit as u32);
                }
                None => program.set_int(ctx, name, -1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planet_engine::render::{Call, ProgramId, RecordingBackend, Topology};

    fn stage() -> (RenderContext<RecordingBackend>, Stage) {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let config = StudioConfig {
            subdivisions: 1,
            ..StudioConfig::default()
        };
        let mut stage = Stage::new(&mut ctx, &config).unwrap();
        stage.resize(&mut ctx, 800, 600);
        ctx.backend_mut().clear_calls();
        (ctx, stage)
    }

    fn draw_programs(ctx: &RenderContext<RecordingBackend>) -> Vec<ProgramId> {
        ctx.backend().draws().into_iter().map(|(p, _, _)| p).collect()
    }

    fn uniform_i32(ctx: &RenderContext<RecordingBackend>, program: &ShaderProgram, name: UniformName) -> i32 {
        let slot = program.uniform_slot(name).unwrap();
        ctx.backend().uniform_i32(program.id(), slot.offset).unwrap()
    }

    #[test]
    fn planet_frame_draws_sky_terrain_then_water() {
        let (mut ctx, mut stage) = stage();
        stage.step(&mut ctx, 0.016);

        let p = &stage.programs;
        assert_eq!(draw_programs(&ctx), vec![p.sky.id(), p.planet.id(), p.water.id()]);

        let draws = ctx.backend().draws();
        let sphere_indices = stage.scenery.sphere.element_count();
        assert_eq!(draws[0], (p.sky.id(), Topology::Triangles, 6));
        assert_eq!(draws[1].2, sphere_indices);
        assert_eq!(draws[2].2, sphere_indices);
    }

    #[test]
    fn sky_is_drawn_without_depth_test() {
        let (mut ctx, mut stage) = stage();
        stage.step(&mut ctx, 0.016);

        let calls = ctx.backend().calls();
        let first_draw = calls
            .iter()
            .position(|c| matches!(c, Call::DrawElements { .. }))
            .unwrap();
        let clear = calls.iter().position(|c| *c == Call::Clear).unwrap();
        assert!(clear < first_draw);
        assert!(calls[..first_draw].contains(&Call::SetDepthTest(false)));

        let depth: Vec<&Call> = calls
            .iter()
            .filter(|c| matches!(c, Call::SetDepthTest(_) | Call::SetBlend(_)))
            .collect();
        assert_eq!(
            depth,
            vec![
                &Call::SetDepthTest(false),
                &Call::SetBlend(false),
                &Call::SetDepthTest(true),
                &Call::SetBlend(true),
            ]
        );
    }

    #[test]
    fn fallback_mode_draws_the_cube_with_the_terrain_program() {
        let (mut ctx, mut stage) = stage();
        stage.scenes.set_render_mode(RenderMode::Fallback);
        stage.step(&mut ctx, 0.5);

        let draws = ctx.backend().draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[1], (stage.programs.planet.id(), Topology::Triangles, 36));
        assert_eq!(stage.scenery.cube.model_matrix(), stage.scenery.sphere.model_matrix());
    }

    #[test]
    fn test_scene_switches_the_terrain_program() {
        let (mut ctx, mut stage) = stage();
        stage.enter(Scene::Test);
        stage.step(&mut ctx, 0.016);

        let p = &stage.programs;
        assert_eq!(draw_programs(&ctx), vec![p.sky.id(), p.test.id(), p.water.id()]);
    }

    #[test]
    fn frame_counter_feeds_the_time_uniform() {
        let (mut ctx, mut stage) = stage();
        for _ in 0..3 {
            stage.step(&mut ctx, 0.016);
        }
        assert_eq!(stage.scenes.frame_count(), 3);
        assert_eq!(uniform_i32(&ctx, &stage.programs.planet, UniformName::Time), 2);

        stage.enter(Scene::AlternatePlanet);
        assert_eq!(stage.scenes.frame_count(), 0);
        stage.step(&mut ctx, 0.016);
        assert_eq!(uniform_i32(&ctx, &stage.programs.planet, UniformName::Time), 0);
    }

    #[test]
    fn texture_units_track_the_scene() {
        let (mut ctx, mut stage) = stage();
        stage.step(&mut ctx, 0.016);
        let planet = &stage.programs.planet;
        assert_eq!(uniform_i32(&ctx, planet, UniformName::Texture0), 0);
        assert_eq!(uniform_i32(&ctx, planet, UniformName::Texture1), -1);

        stage.enter(Scene::AlternatePlanet);
        stage.step(&mut ctx, 0.016);
        let planet = &stage.programs.planet;
        assert_eq!(uniform_i32(&ctx, planet, UniformName::Texture1), 1);

        let detail = stage.textures.get(crate::scene::TextureKey::Detail).id();
        assert!(ctx.backend().calls().contains(&Call::BindTexture { unit: 1, texture: detail }));
    }

    #[test]
    fn rotation_steps_compose() {
        let (mut ctx, mut stage) = stage();
        let dt = 0.25;
        let k = 8;
        for _ in 0..k {
            stage.step(&mut ctx, dt);
        }

        let expected = Mat4::from_rotation_y((ROTATION_RATE_DEG_PER_SEC * dt * k as f32).to_radians());
        assert!(stage.scenery.sphere.model_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn entering_a_scene_resets_the_rotation() {
        let (mut ctx, mut stage) = stage();
        stage.step(&mut ctx, 1.0);
        assert_ne!(stage.scenery.sphere.model_matrix(), Mat4::IDENTITY);

        stage.enter(Scene::DefaultPlanet);
        assert_eq!(stage.scenery.sphere.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn resize_updates_viewport_and_aspect() {
        let (mut ctx, mut stage) = stage();
        stage.resize(&mut ctx, 1920, 1080);

        assert_eq!(stage.renderer.viewport(), (1920, 1080));
        assert!(ctx.backend().calls().contains(&Call::SetViewport(1920, 1080)));
        let p = stage.camera.projection();
        assert!((p.y_axis.y / p.x_axis.x - 1920.0 / 1080.0).abs() < 1e-4);

        stage.resize(&mut ctx, 0, 1080);
        assert_eq!(stage.renderer.viewport(), (1920, 1080));
    }

    #[test]
    fn geometry_color_reaches_the_color_uniform() {
        let (mut ctx, mut stage) = stage();
        stage.enter(Scene::Test);
        stage.geometry_color = [0, 51, 255];
        stage.step(&mut ctx, 0.016);

        let test = &stage.programs.test;
        let slot = test.uniform_slot(UniformName::Color).unwrap();
        let read = |i: u32| ctx.backend().uniform_f32(test.id(), slot.offset + 4 * i).unwrap();
        assert_eq!([read(0), read(1), read(2), read(3)], [0.0, 0.2, 1.0, 1.0]);

        stage.enter(Scene::DefaultPlanet);
        assert_eq!(stage.geometry_color, [0, 51, 255]);
    }

    #[test]
    fn controls_reach_the_water_program() {
        let (mut ctx, mut stage) = stage();
        stage.scenes.controls_mut().water.opacity = 0.25;
        stage.step(&mut ctx, 0.016);

        let water = &stage.programs.water;
        let slot = water.uniform_slot(UniformName::WaterOpacity).unwrap();
        assert_eq!(ctx.backend().uniform_f32(water.id(), slot.offset), Some(0.25));
    }
}
