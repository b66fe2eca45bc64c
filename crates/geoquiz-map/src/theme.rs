//! Theme color tables

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 8-bit RGBA color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        };
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

/// Visual theme of the map
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Theme {
    #[default]
    Tactical,
    Kids,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Tactical, Theme::Kids];

    pub fn colors(self) -> &'static ThemeColors {
        match self {
            Theme::Tactical => &TACTICAL,
            Theme::Kids => &KIDS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Tactical => "Tactical",
            Theme::Kids => "Kids",
        }
    }
}

/// Parameterized color table consumed by the layers
#[derive(Clone, Debug, PartialEq)]
pub struct ThemeColors {
    pub background: Color,
    /// Default region fills, picked per region by a hash of its code
    pub palette: [Color; 12],
    pub stroke: Color,
    pub answered_fill: Color,
    pub answered_stroke: Color,
    pub correct_fill: Color,
    pub correct_stroke: Color,
    pub wrong_fill: Color,
    pub wrong_stroke: Color,
    pub hover_stroke: Color,
    pub label: Color,
    pub label_answered: Color,
    pub label_correct: Color,
    pub label_wrong: Color,
    pub label_halo: Color,
}

impl ThemeColors {
    /// Default fill of a region
    pub fn region_fill(&self, code: &str) -> Color {
        self.palette[palette_index(code, self.palette.len())]
    }
}

/// Stable palette slot for a region code
///
/// Codes longer than five characters (sub-district level) hash on their own; shorter codes hash
/// on the four character city prefix so districts of the same city share a color.
pub fn palette_index(code: &str, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let take = if code.chars().count() > 5 { usize::MAX } else { 4 };
    let hash = code.chars().take(take).fold(0i32, |hash, c| {
        (c as u32 as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    });
    (hash.unsigned_abs() as usize) % len
}

const TAILWIND_100: [Color; 12] = [
    Color::rgb(0xfe, 0xe2, 0xe2), // Red
    Color::rgb(0xff, 0xed, 0xd5), // Orange
    Color::rgb(0xfe, 0xf3, 0xc7), // Amber
    Color::rgb(0xec, 0xfc, 0xcb), // Lime
    Color::rgb(0xd1, 0xfa, 0xe5), // Emerald
    Color::rgb(0xcf, 0xfa, 0xfe), // Cyan
    Color::rgb(0xe0, 0xf2, 0xfe), // Sky
    Color::rgb(0xdb, 0xea, 0xfe), // Blue
    Color::rgb(0xe0, 0xe7, 0xff), // Indigo
    Color::rgb(0xfa, 0xe8, 0xff), // Fuchsia
    Color::rgb(0xfc, 0xe7, 0xf3), // Pink
    Color::rgb(0xff, 0xe4, 0xe6), // Rose
];

static KIDS: ThemeColors = ThemeColors {
    background: Color::rgb(0xf8, 0xfa, 0xfc),
    palette: TAILWIND_100,
    stroke: Color::rgb(0x94, 0xa3, 0xb8),
    answered_fill: Color::rgb(0x86, 0xef, 0xac),
    answered_stroke: Color::rgb(0xcb, 0xd5, 0xe1),
    correct_fill: Color::rgb(0x22, 0xc5, 0x5e),
    correct_stroke: Color::rgb(0x15, 0x80, 0x3d),
    wrong_fill: Color::rgb(0xef, 0x44, 0x44),
    wrong_stroke: Color::rgb(0xb9, 0x1c, 0x1c),
    hover_stroke: Color::rgb(0x4f, 0x46, 0xe5),
    label: Color::rgb(0x33, 0x41, 0x55),
    label_answered: Color::rgb(0x1e, 0x29, 0x3b),
    label_correct: Color::rgb(0x15, 0x80, 0x3d),
    label_wrong: Color::rgb(0xb9, 0x1c, 0x1c),
    label_halo: Color::rgba(255, 255, 255, 204),
};

static TACTICAL: ThemeColors = ThemeColors {
    background: Color::rgb(0x0b, 0x12, 0x1c),
    palette: [
        Color::rgb(0x1e, 0x29, 0x3b),
        Color::rgb(0x1f, 0x2d, 0x3d),
        Color::rgb(0x22, 0x31, 0x40),
        Color::rgb(0x1c, 0x2b, 0x36),
        Color::rgb(0x1a, 0x2e, 0x35),
        Color::rgb(0x19, 0x2f, 0x3a),
        Color::rgb(0x1b, 0x2a, 0x3f),
        Color::rgb(0x1d, 0x28, 0x44),
        Color::rgb(0x21, 0x27, 0x42),
        Color::rgb(0x24, 0x26, 0x3e),
        Color::rgb(0x26, 0x28, 0x3a),
        Color::rgb(0x23, 0x2b, 0x38),
    ],
    stroke: Color::rgb(0x33, 0x55, 0x66),
    answered_fill: Color::rgb(0x14, 0x53, 0x2d),
    answered_stroke: Color::rgb(0x16, 0x65, 0x34),
    correct_fill: Color::rgb(0x16, 0xa3, 0x4a),
    correct_stroke: Color::rgb(0x4a, 0xde, 0x80),
    wrong_fill: Color::rgba(0xdc, 0x26, 0x26, 200),
    wrong_stroke: Color::rgb(0xf8, 0x71, 0x71),
    hover_stroke: Color::rgb(0x22, 0xd3, 0xee),
    label: Color::rgb(0xcb, 0xd5, 0xe1),
    label_answered: Color::rgb(0x86, 0xef, 0xac),
    label_correct: Color::rgb(0x4a, 0xde, 0x80),
    label_wrong: Color::rgb(0xf8, 0x71, 0x71),
    label_halo: Color::rgba(0, 0, 0, 180),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#1e293b"), Some(Color::rgb(0x1e, 0x29, 0x3b)));
        assert_eq!(
            Color::from_hex("ffffff80"),
            Some(Color::rgba(255, 255, 255, 0x80))
        );
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#zz0000"), None);
    }

    #[test]
    fn test_palette_index_is_stable_and_in_range() {
        for code in ["11010", "1101053", "41", "", "서울"] {
            let i = palette_index(code, 12);
            assert!(i < 12);
            assert_eq!(i, palette_index(code, 12));
        }
    }

    #[test]
    fn test_districts_of_one_city_share_a_color() {
        // Five-character codes hash only on their four-character city prefix
        assert_eq!(palette_index("11010", 12), palette_index("11015", 12));
        // hash = c + 31 * hash over "1101" is 1508385
        assert_eq!(palette_index("1101", 12), 9);
        assert_eq!(palette_index("1101053", 12), 1);
    }

    #[test]
    fn test_every_theme_has_distinct_feedback_colors() {
        for theme in Theme::ALL {
            let c = theme.colors();
            assert_ne!(c.correct_fill, c.wrong_fill, "{}", theme.name());
            assert_ne!(c.hover_stroke, c.stroke, "{}", theme.name());
        }
    }
}
