//! Keyboard and mouse parameter panel.
//!
//! | input | effect |
//! |---|---|
//! | `1` `2` `3` | default planet, alternate planet, test scene |
//! | `Tab` | select the next field (scalars, then color channels) |
//! | `↑` `↓` | nudge the selected field by one step |
//! | `R` | restore the active scene's controls |
//! | `M` | toggle sphere / fallback cube |
//! | `C` | capture the next frame |
//! | `Esc` | quit |
//! | left drag / wheel | orbit / zoom |

use planet_engine::input::{InputEvent, InputFrame, InputState, Key, KeyState, MouseButton};
use std::fmt;

use planet_engine::render::{channel_value, set_channel, Channel, ControlField};

use crate::frame::Stage;
use crate::scene::Scene;

pub const ORBIT_RADIANS_PER_PIXEL: f32 = 0.005;
/// Distance factor per wheel line toward the target.
pub const ZOOM_PER_LINE: f32 = 0.9;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PanelCommand {
    Enter(Scene),
    NextField,
    Nudge(i32),
    ResetControls,
    ToggleMode,
    Capture,
    Quit,
}

impl PanelCommand {
    pub fn for_key(key: Key) -> Option<Self> {
        Some(match key {
            Key::Digit1 => PanelCommand::Enter(Scene::DefaultPlanet),
            Key::Digit2 => PanelCommand::Enter(Scene::AlternatePlanet),
            Key::Digit3 => PanelCommand::Enter(Scene::Test),
            Key::Tab => PanelCommand::NextField,
            Key::ArrowUp => PanelCommand::Nudge(1),
            Key::ArrowDown => PanelCommand::Nudge(-1),
            Key::R => PanelCommand::ResetControls,
            Key::M => PanelCommand::ToggleMode,
            Key::C => PanelCommand::Capture,
            Key::Escape => PanelCommand::Quit,
            _ => return None,
        })
    }

    /// Whether holding the key should repeat the command.
    fn repeats(self) -> bool {
        matches!(self, PanelCommand::Nudge(_))
    }
}

/// Requests the frame loop acts on after the panel ran.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct PanelOutcome {
    pub capture: bool,
    pub quit: bool,
}

/// What `↑`/`↓` edit: a bundle field or a channel of the geometry color.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PanelField {
    Control(ControlField),
    GeometryColor(Channel),
}

/// Geometry color channels move by this much per nudge.
const GEOMETRY_COLOR_STEP: f32 = 5.0;

impl PanelField {
    /// Bundle fields in their own order, then the geometry color, wrapping.
    pub fn next(self) -> Self {
        let first = PanelField::Control(ControlField::ALL[0]);
        match self {
            PanelField::Control(field) => match field.next() {
                wrapped if wrapped == ControlField::ALL[0] => PanelField::GeometryColor(Channel::Red),
                next => PanelField::Control(next),
            },
            PanelField::GeometryColor(Channel::Blue) => first,
            PanelField::GeometryColor(channel) => PanelField::GeometryColor(channel.next()),
        }
    }

    pub fn get(self, stage: &Stage) -> f32 {
        match self {
            PanelField::Control(field) => stage.scenes.controls().get(field),
            PanelField::GeometryColor(channel) => channel_value(&stage.geometry_color, channel),
        }
    }

    /// Moves the field by `steps` increments and returns the stored value.
    pub fn nudge(self, stage: &mut Stage, steps: i32) -> f32 {
        match self {
            PanelField::Control(field) => stage.scenes.controls_mut().nudge(field, steps),
            PanelField::GeometryColor(channel) => {
                let value = channel_value(&stage.geometry_color, channel) + GEOMETRY_COLOR_STEP * steps as f32;
                set_channel(&mut stage.geometry_color, channel, value)
            }
        }
    }
}

impl fmt::Display for PanelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelField::Control(field) => fmt::Display::fmt(field, f),
            PanelField::GeometryColor(channel) => write!(f, "geometry color ({})", channel.label()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Panel {
    selected: PanelField,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            selected: PanelField::Control(ControlField::WaterOpacity),
        }
    }
}

impl Panel {
    pub fn selected(&self) -> PanelField {
        self.selected
    }

    /// Applies this frame's input to `stage`.
    pub fn handle(&mut self, input: &InputState, frame: &InputFrame, stage: &mut Stage) -> PanelOutcome {
        let mut outcome = PanelOutcome::default();

        for ev in &frame.events {
            let InputEvent::Key {
                key,
                state: KeyState::Pressed,
                repeat,
                ..
            } = ev
            else {
                continue;
            };
            let Some(cmd) = PanelCommand::for_key(*key) else {
                continue;
            };
            if *repeat && !cmd.repeats() {
                continue;
            }
            self.apply(cmd, stage, &mut outcome);
        }

        let (dx, dy) = frame.pointer_delta;
        if input.button_down(MouseButton::Left) && (dx != 0.0 || dy != 0.0) {
            stage
                .camera
                .orbit(-dx * ORBIT_RADIANS_PER_PIXEL, dy * ORBIT_RADIANS_PER_PIXEL);
        }
        if frame.wheel_lines != 0.0 {
            stage.camera.zoom(ZOOM_PER_LINE.powf(frame.wheel_lines));
        }

        outcome
    }

    pub fn apply(&mut self, cmd: PanelCommand, stage: &mut Stage, outcome: &mut PanelOutcome) {
        match cmd {
            PanelCommand::Enter(scene) => stage.enter(scene),
            PanelCommand::NextField => {
                self.selected = self.selected.next();
                log::info!("selected {} = {:.2}", self.selected, self.selected.get(stage));
            }
            PanelCommand::Nudge(steps) => {
                let value = self.selected.nudge(stage, steps);
                log::info!("{} = {value:.2}", self.selected);
            }
            PanelCommand::ResetControls => {
                stage.scenes.reset_controls();
                log::info!("controls reset");
            }
            PanelCommand::ToggleMode => {
                let mode = stage.scenes.render_mode().toggled();
                stage.scenes.set_render_mode(mode);
                log::info!("render mode {mode:?}");
            }
            PanelCommand::Capture => outcome.capture = true,
            PanelCommand::Quit => outcome.quit = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StudioConfig;
    use crate::scene::{RenderMode, SceneState};
    use planet_engine::input::Modifiers;
    use planet_engine::render::{RecordingBackend, RenderContext};

    fn stage() -> Stage {
        let mut ctx = RenderContext::new(RecordingBackend::default());
        let config = StudioConfig {
            subdivisions: 0,
            ..StudioConfig::default()
        };
        Stage::new(&mut ctx, &config).unwrap()
    }

    fn press(frame: &mut InputFrame, key: Key, repeat: bool) {
        frame.push_event(InputEvent::Key {
            key,
            state: KeyState::Pressed,
            modifiers: Modifiers::default(),
            repeat,
        });
    }

    #[test]
    fn digits_switch_scenes() {
        let mut stage = stage();
        let mut panel = Panel::default();
        let mut frame = InputFrame::default();
        press(&mut frame, Key::Digit2, false);

        panel.handle(&InputState::default(), &frame, &mut stage);
        assert_eq!(stage.scenes.state(), SceneState::Active(Scene::AlternatePlanet));
    }

    #[test]
    fn nudge_edits_the_selected_field() {
        let mut stage = stage();
        let mut panel = Panel::default();
        let mut frame = InputFrame::default();
        press(&mut frame, Key::Tab, false);
        press(&mut frame, Key::ArrowDown, false);
        press(&mut frame, Key::ArrowDown, true);

        panel.handle(&InputState::default(), &frame, &mut stage);
        assert_eq!(panel.selected(), PanelField::Control(ControlField::WaterLevel));
        assert!((stage.scenes.controls().water.level - 0.48).abs() < 1e-6);
    }

    #[test]
    fn repeats_do_not_retrigger_toggles() {
        let mut stage = stage();
        let mut panel = Panel::default();
        let mut frame = InputFrame::default();
        press(&mut frame, Key::M, false);
        press(&mut frame, Key::M, true);
        press(&mut frame, Key::C, true);

        let outcome = panel.handle(&InputState::default(), &frame, &mut stage);
        assert_eq!(stage.scenes.render_mode(), RenderMode::Fallback);
        assert!(!outcome.capture);
    }

    #[test]
    fn tab_reaches_bundle_colors() {
        let mut stage = stage();
        let mut panel = Panel::default();
        let mut frame = InputFrame::default();
        for _ in 0..4 {
            press(&mut frame, Key::Tab, false);
        }
        press(&mut frame, Key::ArrowUp, false);
        press(&mut frame, Key::ArrowUp, true);

        panel.handle(&InputState::default(), &frame, &mut stage);
        assert_eq!(panel.selected(), PanelField::Control(ControlField::WaterColor(Channel::Blue)));
        assert_eq!(stage.scenes.controls().water.color, [32, 96, 170]);
    }

    #[test]
    fn color_nudges_clamp_at_255() {
        let mut stage = stage();
        let mut panel = Panel {
            selected: PanelField::Control(ControlField::SandColor(Channel::Red)),
        };
        let mut outcome = PanelOutcome::default();

        panel.apply(PanelCommand::Nudge(40), &mut stage, &mut outcome);
        assert_eq!(stage.scenes.controls().sand_color[0], 255);
    }

    #[test]
    fn geometry_color_follows_the_bundle_fields() {
        let mut field = PanelField::Control(ControlField::NoiseScale);
        field = field.next();
        assert_eq!(field, PanelField::GeometryColor(Channel::Red));
        field = field.next().next().next();
        assert_eq!(field, PanelField::Control(ControlField::WaterOpacity));
    }

    #[test]
    fn nudging_the_geometry_color_reaches_the_stage() {
        let mut stage = stage();
        let mut panel = Panel {
            selected: PanelField::GeometryColor(Channel::Green),
        };
        let mut outcome = PanelOutcome::default();

        panel.apply(PanelCommand::Nudge(3), &mut stage, &mut outcome);
        assert_eq!(stage.geometry_color, [255, 15, 0]);
        panel.apply(PanelCommand::Nudge(-10), &mut stage, &mut outcome);
        assert_eq!(stage.geometry_color, [255, 0, 0]);
    }

    #[test]
    fn capture_and_quit_are_reported() {
        let mut stage = stage();
        let mut panel = Panel::default();
        let mut frame = InputFrame::default();
        press(&mut frame, Key::C, false);
        press(&mut frame, Key::Escape, false);

        let outcome = panel.handle(&InputState::default(), &frame, &mut stage);
        assert_eq!(outcome, PanelOutcome { capture: true, quit: true });
    }

    #[test]
    fn reset_restores_the_scene_preset() {
        let mut stage = stage();
        let mut panel = Panel::default();
        let mut outcome = PanelOutcome::default();
        stage.scenes.controls_mut().water.opacity = 0.1;

        panel.apply(PanelCommand::ResetControls, &mut stage, &mut outcome);
        assert_eq!(stage.scenes.controls().water.opacity, 0.65);
    }

    #[test]
    fn wheel_zooms_toward_the_target() {
        let mut stage = stage();
        let mut panel = Panel::default();
        let before = stage.camera.position().length();

        let frame = InputFrame {
            wheel_lines: 2.0,
            ..InputFrame::default()
        };
        panel.handle(&InputState::default(), &frame, &mut stage);
        assert!((stage.camera.position().length() - before * 0.81).abs() < 1e-4);
    }

    #[test]
    fn pointer_motion_without_a_button_does_not_orbit() {
        let mut stage = stage();
        let mut panel = Panel::default();
        let before = stage.camera.position();

        let frame = InputFrame {
            pointer_delta: (40.0, 10.0),
            ..InputFrame::default()
        };
        panel.handle(&InputState::default(), &frame, &mut stage);
        assert_eq!(stage.camera.position(), before);
    }
}
