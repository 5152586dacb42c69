use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Number of shades in a DMG palette.
pub const SHADES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn parse_token(token: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidToken {
            token: token.to_string(),
        };
        if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&token[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Four display shades, lightest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorScheme(pub [Rgb; SHADES]);

impl ColorScheme {
    pub const GREEN: Self = Self([
        Rgb::new(0xaf, 0xcb, 0x46),
        Rgb::new(0x79, 0xaa, 0x6d),
        Rgb::new(0x22, 0x6f, 0x5f),
        Rgb::new(0x08, 0x29, 0x55),
    ]);

    pub const GREY: Self = Self([
        Rgb::new(0xe8, 0xe8, 0xe8),
        Rgb::new(0xa0, 0xa0, 0xa0),
        Rgb::new(0x58, 0x58, 0x58),
        Rgb::new(0x10, 0x10, 0x10),
    ]);

    /// Schemes seeded into a freshly created config file.
    pub const BUILT_IN: [(&'static str, Self); 2] = [("Green", Self::GREEN), ("Grey", Self::GREY)];

    pub const fn from_rgb(colors: [(u8, u8, u8); SHADES]) -> Self {
        let [a, b, c, d] = colors;
        Self([
            Rgb::new(a.0, a.1, a.2),
            Rgb::new(b.0, b.1, b.2),
            Rgb::new(c.0, c.1, c.2),
            Rgb::new(d.0, d.1, d.2),
        ])
    }

    pub fn colors(&self) -> &[Rgb; SHADES] {
        &self.0
    }

    /// Flattened `r, g, b` channels, 12 values.
    pub fn channels(&self) -> [u8; SHADES * 3] {
        let mut out = [0u8; SHADES * 3];
        for (chunk, color) in out.chunks_exact_mut(3).zip(self.0.iter()) {
            chunk.copy_from_slice(&[color.r, color.g, color.b]);
        }
        out
    }

    /// `"rrggbb rrggbb rrggbb rrggbb"`, lowercase.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn decode(s: &str) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.len() != SHADES {
            return Err(ParseError::TokenCount {
                found: tokens.len(),
            });
        }
        let mut colors = [Rgb::default(); SHADES];
        for (slot, token) in colors.iter_mut().zip(tokens) {
            *slot = Rgb::parse_token(token)?;
        }
        Ok(Self(colors))
    }
}

impl From<[(u8, u8, u8); SHADES]> for ColorScheme {
    fn from(colors: [(u8, u8, u8); SHADES]) -> Self {
        Self::from_rgb(colors)
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = &self.0;
        write!(f, "{a} {b} {c} {d}")
    }
}

impl FromStr for ColorScheme {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_reference_green() {
        let scheme = ColorScheme::from_rgb([
            (0xAF, 0xCB, 0x46),
            (0x79, 0xAA, 0x6D),
            (0x22, 0x6F, 0x5F),
            (0x08, 0x29, 0x55),
        ]);
        assert_eq!(scheme.encode(), "afcb46 79aa6d 226f5f 082955");
        assert_eq!(scheme, ColorScheme::GREEN);
    }

    #[test]
    fn decodes_reference_green() {
        let scheme = ColorScheme::decode("afcb46 79aa6d 226f5f 082955").unwrap();
        assert_eq!(scheme, ColorScheme::GREEN);
    }

    #[test]
    fn channels_are_zero_padded() {
        let scheme = ColorScheme::from_rgb([(0, 0, 1), (0x0a, 0, 0), (0, 0xff, 0), (1, 2, 3)]);
        assert_eq!(scheme.encode(), "000001 0a0000 00ff00 010203");
    }

    #[test]
    fn decoding_accepts_uppercase_hex() {
        let scheme = ColorScheme::decode("E8E8E8 A0A0A0 585858 101010").unwrap();
        assert_eq!(scheme, ColorScheme::GREY);
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert_eq!(
            ColorScheme::decode("afcb46 79aa6d 226f5f"),
            Err(ParseError::TokenCount { found: 3 })
        );
        assert_eq!(
            ColorScheme::decode(""),
            Err(ParseError::TokenCount { found: 0 })
        );
    }

    #[test]
    fn rejects_bad_tokens() {
        assert_eq!(
            ColorScheme::decode("afcb46 79aa6d 226f5f 08295"),
            Err(ParseError::InvalidToken {
                token: "08295".into()
            })
        );
        assert_eq!(
            ColorScheme::decode("afcb46 79aa6d 226f5f +82955"),
            Err(ParseError::InvalidToken {
                token: "+82955".into()
            })
        );
        assert!(ColorScheme::decode("zzzzzz 79aa6d 226f5f 082955").is_err());
    }

    #[test]
    fn channels_flatten_in_order() {
        assert_eq!(
            ColorScheme::GREEN.channels(),
            [0xaf, 0xcb, 0x46, 0x79, 0xaa, 0x6d, 0x22, 0x6f, 0x5f, 0x08, 0x29, 0x55]
        );
    }
}
