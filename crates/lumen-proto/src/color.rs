// ── Color and effect primitives ──

use serde::{Deserialize, Serialize};

/// An RGB color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale each channel by a brightness percentage (0-100).
    ///
    /// Values above 100 are clamped.
    pub fn scaled(self, brightness_pct: u8) -> Self {
        let pct = u16::from(brightness_pct.min(100));
        let scale = |c: u8| u8::try_from(u16::from(c) * pct / 100).unwrap_or(u8::MAX);
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }

    /// Pack as `0x00RRGGBB`, the Chroma SDK's integer color encoding.
    pub fn packed_rgb(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A lighting effect a backend may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EffectKind {
    Static,
    Breathing,
    Wave,
    Rainbow,
    SpectrumCycle,
    Reactive,
    Off,
}

impl EffectKind {
    /// Backend mode names this effect matches, in preference order.
    ///
    /// OpenRGB controllers expose free-form mode names; the first mode whose
    /// name contains one of these aliases is selected.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Static => &["static", "direct"],
            Self::Breathing => &["breathing", "breath"],
            Self::Wave => &["wave", "rainbow wave"],
            Self::Rainbow => &["rainbow", "spectrum cycle"],
            Self::SpectrumCycle => &["spectrum cycle", "rainbow"],
            Self::Reactive => &["reactive", "key reactive"],
            Self::Off => &["off", "direct", "static"],
        }
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Static => "static",
            Self::Breathing => "breathing",
            Self::Wave => "wave",
            Self::Rainbow => "rainbow",
            Self::SpectrumCycle => "spectrum_cycle",
            Self::Reactive => "reactive",
            Self::Off => "off",
        };
        f.write_str(name)
    }
}

/// A fully-specified effect request: kind plus optional parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    pub kind: EffectKind,
    /// Base color, for effects that take one (static, breathing, reactive).
    pub color: Option<Color>,
    /// Animation speed 0-100, where the backend supports it.
    pub speed: Option<u8>,
}

impl EffectDescriptor {
    pub fn static_color(color: Color) -> Self {
        Self {
            kind: EffectKind::Static,
            color: Some(color),
            speed: None,
        }
    }

    pub fn off() -> Self {
        Self {
            kind: EffectKind::Off,
            color: Some(Color::BLACK),
            speed: None,
        }
    }
}
