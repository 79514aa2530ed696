//! Report colour themes.

use serde::Serialize;

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const WHITE: Color = Color(255, 255, 255);

    /// Components scaled to 0.0..=1.0.
    pub fn unit(self) -> (f32, f32, f32) {
        (
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        )
    }
}

/// Palette consumed by the layout engine. Every report variant is one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub name: &'static str,
    pub background: Color,
    pub header_fill: Color,
    pub header_text: Color,
    pub header_subtext: Color,
    pub accent: Color,
    pub heading: Color,
    pub text: Color,
    pub muted: Color,
    pub band_even: Color,
    pub band_odd: Color,
    pub badge_fill: Color,
    pub badge_text: Color,
    pub card_fill: Color,
    pub footer_fill: Color,
    pub footer_text: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::executive()
    }
}

impl Theme {
    /// Navy and gold on white.
    pub fn executive() -> Self {
        Self {
            name: "executive",
            background: Color::WHITE,
            header_fill: Color(15, 32, 68),
            header_text: Color::WHITE,
            header_subtext: Color(196, 206, 226),
            accent: Color(201, 162, 39),
            heading: Color(15, 32, 68),
            text: Color(33, 37, 41),
            muted: Color(108, 117, 125),
            band_even: Color(247, 248, 251),
            band_odd: Color::WHITE,
            badge_fill: Color(15, 32, 68),
            badge_text: Color::WHITE,
            card_fill: Color(240, 243, 249),
            footer_fill: Color(15, 32, 68),
            footer_text: Color(196, 206, 226),
        }
    }

    /// Light text on a dark slate page.
    pub fn midnight() -> Self {
        Self {
            name: "midnight",
            background: Color(17, 24, 39),
            header_fill: Color(3, 7, 18),
            header_text: Color(243, 244, 246),
            header_subtext: Color(156, 163, 175),
            accent: Color(56, 189, 248),
            heading: Color(125, 211, 252),
            text: Color(229, 231, 235),
            muted: Color(156, 163, 175),
            band_even: Color(31, 41, 55),
            band_odd: Color(17, 24, 39),
            badge_fill: Color(56, 189, 248),
            badge_text: Color(3, 7, 18),
            card_fill: Color(31, 41, 55),
            footer_fill: Color(3, 7, 18),
            footer_text: Color(156, 163, 175),
        }
    }

    /// Warm paper tones with a burgundy accent.
    pub fn ivory() -> Self {
        Self {
            name: "ivory",
            background: Color(253, 251, 245),
            header_fill: Color(92, 26, 38),
            header_text: Color(253, 251, 245),
            header_subtext: Color(230, 210, 200),
            accent: Color(146, 52, 64),
            heading: Color(92, 26, 38),
            text: Color(45, 38, 33),
            muted: Color(120, 108, 98),
            band_even: Color(246, 241, 229),
            band_odd: Color(253, 251, 245),
            badge_fill: Color(146, 52, 64),
            badge_text: Color(253, 251, 245),
            card_fill: Color(246, 241, 229),
            footer_fill: Color(92, 26, 38),
            footer_text: Color(230, 210, 200),
        }
    }

    /// Names accepted by [`Theme::by_name`].
    pub const NAMES: [&'static str; 3] = ["executive", "midnight", "ivory"];

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "executive" => Some(Self::executive()),
            "midnight" => Some(Self::midnight()),
            "ivory" => Some(Self::ivory()),
            _ => None,
        }
    }

    /// Band tint for the given running row index.
    pub fn band(&self, index: usize) -> Color {
        if index % 2 == 0 {
            self.band_even
        } else {
            self.band_odd
        }
    }
}
