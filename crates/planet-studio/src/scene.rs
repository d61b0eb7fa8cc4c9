//! Named visual configurations and the controller that switches between them.
//!
//! Every transition fully specifies the program, the texture set, the render
//! mode and the control bundle, so the outcome never depends on the scene that
//! was active before.

use glam::Mat4;
use planet_engine::render::{ControlBundle, Drawable, WaterControls};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Scene {
    DefaultPlanet,
    AlternatePlanet,
    Test,
}

/// Program used for the terrain pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgramKey {
    Planet,
    Test,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureKey {
    Surface,
    Detail,
}

/// What the frame draws after the sky.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderMode {
    /// Sphere with the terrain program, then again with the water program.
    Planet,
    /// Cube with the terrain program.
    Fallback,
}

impl RenderMode {
    pub fn toggled(self) -> Self {
        match self {
            RenderMode::Planet => RenderMode::Fallback,
            RenderMode::Fallback => RenderMode::Planet,
        }
    }
}

/// How entering a scene rewrites the control bundle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BundlePreset {
    Defaults,
    Alternate,
}

impl BundlePreset {
    /// Resets to defaults, then applies this preset's overrides.
    pub fn build(self) -> ControlBundle {
        let base = ControlBundle::default();
        match self {
            BundlePreset::Defaults => base,
            BundlePreset::Alternate => ControlBundle {
                water: WaterControls {
                    opacity: 0.95,
                    level: 0.42,
                    color: [193, 0, 1],
                },
                bedrock_color1: [52, 30, 60],
                bedrock_color2: [110, 84, 140],
                sand_color: [230, 205, 150],
                elevation: 1.23,
                shore_level: 0.37,
                noise_scale: 0.81,
            },
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SceneSpec {
    pub program: ProgramKey,
    /// Bound to units 0.. in order.
    pub textures: &'static [TextureKey],
    pub mode: RenderMode,
    pub bundle: BundlePreset,
}

impl Scene {
    pub const ALL: [Scene; 3] = [Scene::DefaultPlanet, Scene::AlternatePlanet, Scene::Test];

    pub const fn spec(self) -> SceneSpec {
        match self {
            Scene::DefaultPlanet => SceneSpec {
                program: ProgramKey::Planet,
                textures: &[TextureKey::Surface],
                mode: RenderMode::Planet,
                bundle: BundlePreset::Defaults,
            },
            Scene::AlternatePlanet => SceneSpec {
                program: ProgramKey::Planet,
                textures: &[TextureKey::Surface, TextureKey::Detail],
                mode: RenderMode::Planet,
                bundle: BundlePreset::Alternate,
            },
            Scene::Test => SceneSpec {
                program: ProgramKey::Test,
                textures: &[],
                mode: RenderMode::Planet,
                bundle: BundlePreset::Defaults,
            },
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Scene::DefaultPlanet => "default planet",
            Scene::AlternatePlanet => "alternate planet",
            Scene::Test => "test",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SceneState {
    Uninitialized,
    Active(Scene),
}

/// Owns the active scene's program key, texture set, render mode, control
/// bundle and frame counter.
#[derive(Debug, Clone)]
pub struct SceneController {
    state: SceneState,
    program: ProgramKey,
    textures: Vec<TextureKey>,
    mode: RenderMode,
    controls: ControlBundle,
    frame: i32,
}

impl Default for SceneController {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneController {
    pub fn new() -> Self {
        Self {
            state: SceneState::Uninitialized,
            program: ProgramKey::Planet,
            textures: Vec::new(),
            mode: RenderMode::Planet,
            controls: ControlBundle::default(),
            frame: 0,
        }
    }

    /// Switches to `scene` and resets `primary` to the identity transform.
    ///
    /// Order: frame counter, program, bundle, model matrix, textures.
    pub fn enter(&mut self, scene: Scene, primary: &mut dyn Drawable) {
        let spec = scene.spec();

        self.frame = 0;
        self.program = spec.program;
        self.controls = spec.bundle.build();
        primary.set_model_matrix(Mat4::IDENTITY);
        self.textures.clear();
        self.textures.extend_from_slice(spec.textures);
        self.mode = spec.mode;
        self.state = SceneState::Active(scene);

        log::info!("entered scene `{}`", scene.label());
    }

    /// Restores the active scene's bundle without touching anything else.
    pub fn reset_controls(&mut self) {
        let preset = match self.state {
            SceneState::Active(scene) => scene.spec().bundle,
            SceneState::Uninitialized => BundlePreset::Defaults,
        };
        self.controls = preset.build();
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn program(&self) -> ProgramKey {
        self.program
    }

    pub fn textures(&self) -> &[TextureKey] {
        &self.textures
    }

    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    pub fn controls(&self) -> &ControlBundle {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlBundle {
        &mut self.controls
    }

    /// Frames drawn since the last transition.
    pub fn frame_count(&self) -> i32 {
        self.frame
    }

    pub fn advance_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planet_engine::render::{BufferId, Topology};

    struct Stub {
        model: Mat4,
    }

    impl Drawable for Stub {
        fn positions(&self) -> Option<BufferId> {
            None
        }
        fn normals(&self) -> Option<BufferId> {
            None
        }
        fn indices(&self) -> BufferId {
            BufferId(0)
        }
        fn element_count(&self) -> u32 {
            0
        }
        fn topology(&self) -> Topology {
            Topology::Triangles
        }
        fn model_matrix(&self) -> Mat4 {
            self.model
        }
        fn set_model_matrix(&mut self, model: Mat4) {
            self.model = model;
        }
    }

    fn stub() -> Stub {
        Stub {
            model: Mat4::from_rotation_y(0.7),
        }
    }

    #[test]
    fn starts_uninitialized() {
        let scenes = SceneController::new();
        assert_eq!(scenes.state(), SceneState::Uninitialized);
        assert_eq!(scenes.frame_count(), 0);
    }

    #[test]
    fn enter_applies_the_full_configuration() {
        let mut scenes = SceneController::new();
        let mut primary = stub();

        scenes.enter(Scene::AlternatePlanet, &mut primary);

        assert_eq!(scenes.state(), SceneState::Active(Scene::AlternatePlanet));
        assert_eq!(scenes.program(), ProgramKey::Planet);
        assert_eq!(scenes.textures(), &[TextureKey::Surface, TextureKey::Detail]);
        assert_eq!(scenes.render_mode(), RenderMode::Planet);
        assert_eq!(primary.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn transitions_are_idempotent() {
        let mut primary = stub();
        let mut once = SceneController::new();
        once.enter(Scene::Test, &mut primary);

        let mut twice = SceneController::new();
        twice.enter(Scene::Test, &mut primary);
        twice.advance_frame();
        twice.enter(Scene::Test, &mut primary);

        assert_eq!(once.state(), twice.state());
        assert_eq!(once.program(), twice.program());
        assert_eq!(once.textures(), twice.textures());
        assert_eq!(once.controls(), twice.controls());
        assert_eq!(twice.frame_count(), 0);
    }

    #[test]
    fn alternate_overrides_then_default_restores() {
        let mut scenes = SceneController::new();
        let mut primary = stub();

        scenes.enter(Scene::DefaultPlanet, &mut primary);
        assert_eq!(*scenes.controls(), ControlBundle::default());

        scenes.enter(Scene::AlternatePlanet, &mut primary);
        let c = scenes.controls();
        assert_eq!(c.water.opacity, 0.95);
        assert_eq!(c.water.level, 0.42);
        assert_eq!(c.water.color, [193, 0, 1]);
        assert_eq!(c.bedrock_color1, [52, 30, 60]);
        assert_eq!(c.bedrock_color2, [110, 84, 140]);
        assert_eq!(c.sand_color, [230, 205, 150]);
        assert_eq!(c.elevation, 1.23);
        assert_eq!(c.shore_level, 0.37);
        assert_eq!(c.noise_scale, 0.81);

        scenes.enter(Scene::DefaultPlanet, &mut primary);
        assert_eq!(*scenes.controls(), ControlBundle::default());
        assert_eq!(scenes.textures(), &[TextureKey::Surface]);
    }

    #[test]
    fn panel_edits_survive_until_the_next_transition() {
        let mut scenes = SceneController::new();
        let mut primary = stub();
        scenes.enter(Scene::DefaultPlanet, &mut primary);

        scenes.controls_mut().elevation = 1.7;
        scenes.set_render_mode(RenderMode::Fallback);
        assert_eq!(scenes.controls().elevation, 1.7);

        scenes.enter(Scene::DefaultPlanet, &mut primary);
        assert_eq!(scenes.controls().elevation, 1.0);
        assert_eq!(scenes.render_mode(), RenderMode::Planet);
    }

    #[test]
    fn reset_controls_uses_the_active_preset() {
        let mut scenes = SceneController::new();
        let mut primary = stub();
        scenes.enter(Scene::AlternatePlanet, &mut primary);
        scenes.controls_mut().noise_scale = 2.0;
        scenes.advance_frame();

        scenes.reset_controls();
        assert_eq!(scenes.controls().noise_scale, 0.81);
        assert_eq!(scenes.frame_count(), 1);
    }

    #[test]
    fn frame_counter_counts_frames_and_resets_on_transition() {
        let mut scenes = SceneController::new();
        let mut primary = stub();
        scenes.enter(Scene::DefaultPlanet, &mut primary);

        for expected in 1..=5 {
            scenes.advance_frame();
            assert_eq!(scenes.frame_count(), expected);
        }

        scenes.enter(Scene::AlternatePlanet, &mut primary);
        assert_eq!(scenes.frame_count(), 0);
    }

    #[test]
    fn every_scene_has_at_most_four_textures() {
        for scene in Scene::ALL {
            assert!(scene.spec().textures.len() <= 4);
        }
    }
}
