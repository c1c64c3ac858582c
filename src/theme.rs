//! Chrome colours (background, borders, text) from a btop-style `theme[key]="value"` file.
//! Sand is drawn in its own colours; the theme never touches it.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Playfield background; sand alpha blends over this.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    /// Controls help and empty tray slots.
    pub inactive_fg: Color,
    /// Loss-row marker and game-over banner.
    pub warn: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

impl Theme {
    /// One Dark.
    pub const fn onedark() -> Self {
        Self {
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            warn: Color::Rgb(0xE0, 0x6C, 0x75),
        }
    }

    /// Load from a theme file, falling back to One Dark when no path is given.
    /// Keys missing from the file keep their One Dark value.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = std::fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_theme_file(&s)))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()))
        };
        let base = Self::onedark();
        Self {
            bg: get(&["meter_bg", "main_bg"]).unwrap_or(base.bg),
            div_line: get(&["div_line"]).unwrap_or(base.div_line),
            main_fg: get(&["main_fg"]).unwrap_or(base.main_fg),
            title: get(&["title"]).unwrap_or(base.title),
            inactive_fg: get(&["inactive_fg"]).unwrap_or(base.inactive_fg),
            warn: get(&["temp_end", "cpu_end"]).unwrap_or(base.warn),
        }
    }

    /// Background as 8-bit rgb for blending; non-rgb colours count as black.
    pub fn bg_rgb(&self) -> (u8, u8, u8) {
        match self.bg {
            Color::Rgb(r, g, b) => (r, g, b),
            _ => (0, 0, 0),
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| invalid());
    match s.len() {
        6 => Ok(Color::Rgb(channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?)),
        3 => Ok(Color::Rgb(
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
        assert!(parse_hex("#ééé").is_err());
    }

    #[test]
    fn test_missing_keys_fall_back() {
        let map = parse_theme_file(
            "# comment\ntheme[meter_bg]=\"#000000\"\ntheme[title]='#FF0000'\ntheme[main_fg]=\"\"",
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.bg, Color::Rgb(0, 0, 0));
        assert_eq!(theme.title, Color::Rgb(255, 0, 0));
        assert_eq!(theme.main_fg, Theme::onedark().main_fg);
        assert_eq!(theme.bg_rgb(), (0, 0, 0));
    }

    #[test]
    fn test_no_path_is_default() {
        assert_eq!(Theme::load(None).unwrap(), Theme::default());
    }
}
