//! Crystal palette and RGBA colors

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Linear RGBA color, components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    /// Dull debris from a mismatched spore
    pub const ASH: Color = Color::rgb(0.333, 0.333, 0.333);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#RGB` or `#RRGGBB` (leading `#` optional)
    pub fn from_hex(hex: &str) -> SimResult<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let bad = || SimError::InvalidColor(hex.to_string());
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| bad());

        if !digits.is_ascii() {
            return Err(bad());
        }
        // #RGB shorthand doubles each digit
        let short = |i: usize| channel(&digits[i..i + 1].repeat(2));

        let (r, g, b) = match digits.len() {
            3 => (short(0)?, short(1)?, short(2)?),
            6 => (
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            ),
            _ => return Err(bad()),
        };

        Ok(Self::rgb(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
        ))
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// The five crystal colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrystalColor {
    Ruby,
    Emerald,
    Sapphire,
    Amethyst,
    Amber,
}

impl CrystalColor {
    pub const ALL: [CrystalColor; 5] = [
        CrystalColor::Ruby,
        CrystalColor::Emerald,
        CrystalColor::Sapphire,
        CrystalColor::Amethyst,
        CrystalColor::Amber,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Palette index (stable, used for bit sets)
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> SimResult<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| SimError::InvalidColor(format!("palette index {index}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            CrystalColor::Ruby => "Ruby",
            CrystalColor::Emerald => "Emerald",
            CrystalColor::Sapphire => "Sapphire",
            CrystalColor::Amethyst => "Amethyst",
            CrystalColor::Amber => "Amber",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            CrystalColor::Ruby => "#FF0055",
            CrystalColor::Emerald => "#00FF66",
            CrystalColor::Sapphire => "#00CCFF",
            CrystalColor::Amethyst => "#CC00FF",
            CrystalColor::Amber => "#FFAA00",
        }
    }

    /// Look up a palette entry by its hex code (case-insensitive)
    pub fn from_hex(hex: &str) -> SimResult<Self> {
        let wanted = hex.trim().trim_start_matches('#');
        Self::ALL
            .into_iter()
            .find(|c| c.hex()[1..].eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SimError::InvalidColor(hex.to_string()))
    }

    pub fn color(self) -> Color {
        match self {
            CrystalColor::Ruby => Color::rgb(1.0, 0.0, 0.333),
            CrystalColor::Emerald => Color::rgb(0.0, 1.0, 0.4),
            CrystalColor::Sapphire => Color::rgb(0.0, 0.8, 1.0),
            CrystalColor::Amethyst => Color::rgb(0.8, 0.0, 1.0),
            CrystalColor::Amber => Color::rgb(1.0, 0.667, 0.0),
        }
    }

    /// Uniformly random palette entry
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::COUNT)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_hex_parse() {
        let c = Color::from_hex("#00FF66").unwrap();
        assert_eq!(c.r, 0.0);
        assert_eq!(c.g, 1.0);
        assert!((c.b - 0.4).abs() < 0.001);

        let grey = Color::from_hex("#555").unwrap();
        assert!((grey.r - 0.333).abs() < 0.001);

        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_palette_lookup() {
        assert_eq!(CrystalColor::from_hex("#FF0055").unwrap(), CrystalColor::Ruby);
        assert_eq!(CrystalColor::from_hex("ffaa00").unwrap(), CrystalColor::Amber);
        assert!(CrystalColor::from_hex("#FFFFFF").is_err());
        assert_eq!(CrystalColor::from_index(2).unwrap(), CrystalColor::Sapphire);
        assert!(CrystalColor::from_index(5).is_err());
    }

    #[test]
    fn test_palette_hex_matches_color() {
        for c in CrystalColor::ALL {
            let parsed = Color::from_hex(c.hex()).unwrap();
            let expected = c.color();
            assert!((parsed.r - expected.r).abs() < 0.01, "{}", c.name());
            assert!((parsed.g - expected.g).abs() < 0.01, "{}", c.name());
            assert!((parsed.b - expected.b).abs() < 0.01, "{}", c.name());
        }
    }

    #[test]
    fn test_random_covers_palette() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut seen = [false; CrystalColor::COUNT];
        for _ in 0..200 {
            seen[CrystalColor::random(&mut rng).index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
