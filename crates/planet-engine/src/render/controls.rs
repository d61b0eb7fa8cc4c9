//! Tunable procedural parameters pushed into terrain and water programs.

use std::fmt;

use glam::Vec3;

/// Color with 0–255 channels, as edited on the parameter panel.
pub type Rgb255 = [u8; 3];

/// Converts a 0–255 color to linear 0–1 channels (`channel / 255`).
#[inline]
pub fn unit_rgb(c: Rgb255) -> Vec3 {
    Vec3::new(c[0] as f32 / 255.0, c[1] as f32 / 255.0, c[2] as f32 / 255.0)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WaterControls {
    /// `[0, 1]`
    pub opacity: f32,
    /// `[0, 1]`
    pub level: f32,
    pub color: Rgb255,
}

/// Live record of water/terrain parameters.
///
/// `Copy` on purpose: a frame takes one snapshot and hands it to every
/// program's `push_controls`, so all passes of a frame see the same values.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControlBundle {
    pub water: WaterControls,
    pub bedrock_color1: Rgb255,
    pub bedrock_color2: Rgb255,
    pub sand_color: Rgb255,
    /// `[0, 1]`
    pub shore_level: f32,
    /// `[0.1, 2.0]`
    pub elevation: f32,
    /// `[0.1, 2.0]`
    pub noise_scale: f32,
}

impl Default for ControlBundle {
    fn default() -> Self {
        Self {
            water: WaterControls {
                opacity: 0.65,
                level: 0.5,
                color: [32, 96, 160],
            },
            bedrock_color1: [84, 70, 58],
            bedrock_color2: [128, 116, 104],
            sand_color: [194, 178, 128],
            shore_level: 0.52,
            elevation: 1.0,
            noise_scale: 1.0,
        }
    }
}

/// One channel of an [`Rgb255`] color.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub const fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }

    /// Next channel, wrapping back to red.
    pub const fn next(self) -> Self {
        match self {
            Channel::Red => Channel::Green,
            Channel::Green => Channel::Blue,
            Channel::Blue => Channel::Red,
        }
    }
}

/// Reads one channel of a 0–255 color as a float.
pub fn channel_value(color: &Rgb255, channel: Channel) -> f32 {
    color[channel.index()] as f32
}

/// Writes one channel, rounded and clamped to 0–255, and returns the stored value.
pub fn set_channel(color: &mut Rgb255, channel: Channel, value: f32) -> f32 {
    let v = if value.is_finite() { value.round().clamp(0.0, 255.0) } else { 0.0 };
    color[channel.index()] = v as u8;
    v
}

/// Fields of a [`ControlBundle`] editable one step at a time.
///
/// Colors are edited one channel at a time.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ControlField {
    WaterOpacity,
    WaterLevel,
    WaterColor(Channel),
    BedrockColor1(Channel),
    BedrockColor2(Channel),
    SandColor(Channel),
    ShoreLevel,
    Elevation,
    NoiseScale,
}

impl ControlField {
    pub const ALL: [ControlField; 17] = [
        ControlField::WaterOpacity,
        ControlField::WaterLevel,
        ControlField::WaterColor(Channel::Red),
        ControlField::WaterColor(Channel::Green),
        ControlField::WaterColor(Channel::Blue),
        ControlField::BedrockColor1(Channel::Red),
        ControlField::BedrockColor1(Channel::Green),
        ControlField::BedrockColor1(Channel::Blue),
        ControlField::BedrockColor2(Channel::Red),
        ControlField::BedrockColor2(Channel::Green),
        ControlField::BedrockColor2(Channel::Blue),
        ControlField::SandColor(Channel::Red),
        ControlField::SandColor(Channel::Green),
        ControlField::SandColor(Channel::Blue),
        ControlField::ShoreLevel,
        ControlField::Elevation,
        ControlField::NoiseScale,
    ];

    /// Inclusive valid range.
    pub const fn range(self) -> (f32, f32) {
        match self {
            ControlField::WaterOpacity | ControlField::WaterLevel | ControlField::ShoreLevel => {
                (0.0, 1.0)
            }
            ControlField::Elevation | ControlField::NoiseScale => (0.1, 2.0),
            ControlField::WaterColor(_)
            | ControlField::BedrockColor1(_)
            | ControlField::BedrockColor2(_)
            | ControlField::SandColor(_) => (0.0, 255.0),
        }
    }

    /// Increment used by the panel.
    pub const fn step(self) -> f32 {
        match self {
            ControlField::WaterOpacity | ControlField::WaterLevel | ControlField::ShoreLevel => 0.01,
            ControlField::Elevation | ControlField::NoiseScale => 0.05,
            ControlField::WaterColor(_)
            | ControlField::BedrockColor1(_)
            | ControlField::BedrockColor2(_)
            | ControlField::SandColor(_) => 5.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ControlField::WaterOpacity => "water opacity",
            ControlField::WaterLevel => "water level",
            ControlField::WaterColor(_) => "water color",
            ControlField::BedrockColor1(_) => "bedrock color 1",
            ControlField::BedrockColor2(_) => "bedrock color 2",
            ControlField::SandColor(_) => "sand color",
            ControlField::ShoreLevel => "shore level",
            ControlField::Elevation => "elevation",
            ControlField::NoiseScale => "noise scale",
        }
    }

    pub const fn channel(self) -> Option<Channel> {
        match self {
            ControlField::WaterColor(c)
            | ControlField::BedrockColor1(c)
            | ControlField::BedrockColor2(c)
            | ControlField::SandColor(c) => Some(c),
            _ => None,
        }
    }

    /// Next field in panel order, wrapping.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ControlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel() {
            Some(c) => write!(f, "{} ({})", self.label(), c.label()),
            None => f.write_str(self.label()),
        }
    }
}

impl ControlBundle {
    fn color(&self, field: ControlField) -> Option<&Rgb255> {
        match field {
            ControlField::WaterColor(_) => Some(&self.water.color),
            ControlField::BedrockColor1(_) => Some(&self.bedrock_color1),
            ControlField::BedrockColor2(_) => Some(&self.bedrock_color2),
            ControlField::SandColor(_) => Some(&self.sand_color),
            _ => None,
        }
    }

    fn color_mut(&mut self, field: ControlField) -> Option<&mut Rgb255> {
        match field {
            ControlField::WaterColor(_) => Some(&mut self.water.color),
            ControlField::BedrockColor1(_) => Some(&mut self.bedrock_color1),
            ControlField::BedrockColor2(_) => Some(&mut self.bedrock_color2),
            ControlField::SandColor(_) => Some(&mut self.sand_color),
            _ => None,
        }
    }

    pub fn get(&self, field: ControlField) -> f32 {
        if let (Some(color), Some(channel)) = (self.color(field), field.channel()) {
            return channel_value(color, channel);
        }
        match field {
            ControlField::WaterOpacity => self.water.opacity,
            ControlField::WaterLevel => self.water.level,
            ControlField::ShoreLevel => self.shore_level,
            ControlField::Elevation => self.elevation,
            ControlField::NoiseScale => self.noise_scale,
            _ => 0.0,
        }
    }

    /// Writes `value` clamped to the field's range and returns the stored value.
    pub fn set(&mut self, field: ControlField, value: f32) -> f32 {
        if let Some(channel) = field.channel() {
            return match self.color_mut(field) {
                Some(color) => set_channel(color, channel, value),
                None => 0.0,
            };
        }

        let (lo, hi) = field.range();
        let v = if value.is_finite() { value.clamp(lo, hi) } else { lo };
        match field {
            ControlField::WaterOpacity => self.water.opacity = v,
            ControlField::WaterLevel => self.water.level = v,
            ControlField::ShoreLevel => self.shore_level = v,
            ControlField::Elevation => self.elevation = v,
            ControlField::NoiseScale => self.noise_scale = v,
            _ => {}
        }
        v
    }

    /// Moves `field` by `steps` increments, clamped.
    pub fn nudge(&mut self, field: ControlField, steps: i32) -> f32 {
        self.set(field, self.get(field) + field.step() * steps as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_rgb_is_linear_over_255() {
        assert_eq!(unit_rgb([255, 0, 51]), Vec3::new(1.0, 0.0, 0.2));
        assert_eq!(unit_rgb([0, 0, 0]), Vec3::ZERO);
    }

    #[test]
    fn set_clamps_to_range() {
        let mut b = ControlBundle::default();
        assert_eq!(b.set(ControlField::Elevation, 5.0), 2.0);
        assert_eq!(b.set(ControlField::NoiseScale, 0.0), 0.1);
        assert_eq!(b.set(ControlField::WaterOpacity, -1.0), 0.0);
        assert_eq!(b.set(ControlField::WaterLevel, f32::NAN), 0.0);
    }

    #[test]
    fn nudge_moves_by_step() {
        let mut b = ControlBundle::default();
        let v = b.nudge(ControlField::Elevation, 2);
        assert!((v - 1.1).abs() < 1e-6);
    }

    #[test]
    fn color_channels_are_editable_and_clamped() {
        let mut b = ControlBundle::default();
        let field = ControlField::WaterColor(Channel::Blue);
        assert_eq!(b.nudge(field, 2), 170.0);
        assert_eq!(b.water.color, [32, 96, 170]);

        assert_eq!(b.set(ControlField::SandColor(Channel::Red), 300.0), 255.0);
        assert_eq!(b.set(ControlField::BedrockColor2(Channel::Green), -4.0), 0.0);
        assert_eq!(b.set(ControlField::BedrockColor1(Channel::Red), 12.4), 12.0);
        assert_eq!(b.sand_color[0], 255);
        assert_eq!(b.bedrock_color2[1], 0);
        assert_eq!(b.bedrock_color1, [12, 70, 58]);
    }

    #[test]
    fn every_field_is_reachable_in_panel_order() {
        let mut field = ControlField::WaterOpacity;
        let mut seen = Vec::new();
        for _ in 0..ControlField::ALL.len() {
            seen.push(field);
            field = field.next();
        }
        assert_eq!(seen, ControlField::ALL.to_vec());
        assert_eq!(field, ControlField::WaterOpacity);
    }

    #[test]
    fn color_fields_display_their_channel() {
        assert_eq!(ControlField::SandColor(Channel::Green).to_string(), "sand color (green)");
        assert_eq!(ControlField::Elevation.to_string(), "elevation");
    }

    #[test]
    fn next_wraps_around() {
        assert_eq!(ControlField::NoiseScale.next(), ControlField::WaterOpacity);
        assert_eq!(ControlField::WaterOpacity.next(), ControlField::WaterLevel);
        assert_eq!(ControlField::WaterLevel.next(), ControlField::WaterColor(Channel::Red));
    }
}
