use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{AudioCanvasError, Result};

/// Gradients offered to users out of the box.
pub const GRADIENT_PRESETS: [&str; 6] = [
    "linear-gradient(to right, #d7d2cc 0%, #304352 100%)",
    "linear-gradient(to right, #fddb92 0%, #d1fdff 100%)",
    "linear-gradient(to right, #92fe9d 0%, #00c9ff 100%)",
    "linear-gradient(to right, #69EACB 0%, #d883ff 100%)",
    "linear-gradient(to right, #9CECFB 0%, #0052D4 100%)",
    "linear-gradient(to right, #BA5370 0%, #F4E2D8 100%)",
];

const DEFAULT_GRADIENT_DEGREE: f32 = 180.0;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Component-wise linear interpolation, `t` in `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

        match hex.len() {
            3 => Some(Color::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => Some(Color::rgb(pair(0)?, pair(2)?, pair(4)?)),
            8 => Some(Color::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    fn parse_functional(args: &str, with_alpha: bool) -> Option<Self> {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let expected = if with_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return None;
        }

        let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
        let alpha = if with_alpha {
            let value = parts[3].parse::<f32>().ok()?;
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        } else {
            255
        };

        Some(Color::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ))
    }
}

impl FromStr for Color {
    type Err = AudioCanvasError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parsed = if let Some(hex) = s.strip_prefix('#') {
            Color::parse_hex(hex)
        } else if let Some(args) = s.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
            Color::parse_functional(args, true)
        } else if let Some(args) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            Color::parse_functional(args, false)
        } else {
            None
        };

        parsed.ok_or_else(|| AudioCanvasError::msg(format!("unrecognised color `{s}`")))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = AudioCanvasError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// One color stop, `offset` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub color: Color,
    pub offset: f32,
}

/// Linear gradient described the way CSS `linear-gradient()` does.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub degree: f32,
    pub stops: Vec<ColorStop>,
}

impl Gradient {
    /// Parses `linear-gradient(<angle>deg | to <side>, <color> [<pct>%], ...)`.
    ///
    /// Stops without an explicit offset are spread evenly, as CSS does for
    /// the simple case.
    pub fn parse_css(css: &str) -> Result<Self> {
        let body = css
            .trim()
            .strip_prefix("linear-gradient(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| AudioCanvasError::msg(format!("not a linear gradient: `{css}`")))?;

        let mut parts = split_top_level(body).into_iter().peekable();
        let mut degree = DEFAULT_GRADIENT_DEGREE;
        if let Some(&first) = parts.peek() {
            if let Some(value) = first.strip_suffix("deg") {
                degree = value
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| AudioCanvasError::msg(format!("invalid gradient angle `{first}`")))?;
                parts.next();
            } else if first.starts_with("to ") {
                degree = direction_degree(first).ok_or_else(|| {
                    AudioCanvasError::msg(format!("invalid gradient direction `{first}`"))
                })?;
                parts.next();
            }
        }

        let mut colors = Vec::new();
        for part in parts {
            let (color, offset) = match part.rsplit_once(char::is_whitespace) {
                Some((color, pct)) if pct.ends_with('%') => {
                    let offset = pct
                        .trim_end_matches('%')
                        .parse::<f32>()
                        .map_err(|_| AudioCanvasError::msg(format!("invalid stop `{part}`")))?;
                    (color.trim(), Some(offset / 100.0))
                }
                _ => (part, None),
            };
            colors.push((color.parse::<Color>()?, offset));
        }

        if colors.is_empty() {
            return Err(AudioCanvasError::msg(format!("gradient without colors: `{css}`")));
        }

        let last = (colors.len() - 1).max(1) as f32;
        let mut stops: Vec<ColorStop> = colors
            .into_iter()
            .enumerate()
            .map(|(index, (color, offset))| ColorStop {
                color,
                offset: offset.unwrap_or(index as f32 / last).clamp(0.0, 1.0),
            })
            .collect();
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        Ok(Self { degree, stops })
    }

    /// Color at `position` in `[0, 1]` along the gradient.
    pub fn sample(&self, position: f32) -> Color {
        let position = position.clamp(0.0, 1.0);
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Color::TRANSPARENT;
        };

        if position <= first.offset {
            return first.color;
        }
        if position >= last.offset {
            return last.color;
        }

        for pair in self.stops.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if position <= end.offset {
                let span = end.offset - start.offset;
                if span <= f32::EPSILON {
                    return end.color;
                }
                return start.color.lerp(end.color, (position - start.offset) / span);
            }
        }

        last.color
    }

    /// `count` colors sampled evenly from the first to the last stop.
    pub fn color_map(&self, count: usize) -> Vec<Color> {
        if count <= 1 {
            return vec![self.sample(0.0); count];
        }

        (0..count)
            .map(|i| self.sample(i as f32 / (count - 1) as f32))
            .collect()
    }
}

impl fmt::Display for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "linear-gradient({}deg", self.degree)?;
        for stop in &self.stops {
            write!(f, ", {} {}%", stop.color, stop.offset * 100.0)?;
        }
        write!(f, ")")
    }
}

/// Fill of a builder: one flat color or a gradient spread over the
/// builder's elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColorSpec {
    Solid(Color),
    Gradient(Gradient),
}

impl ColorSpec {
    /// Expands the spec into one color per element.
    pub fn color_map(&self, count: usize) -> Vec<Color> {
        match self {
            ColorSpec::Solid(color) => vec![*color; count],
            ColorSpec::Gradient(gradient) => gradient.color_map(count),
        }
    }

    pub fn is_gradient(&self) -> bool {
        matches!(self, ColorSpec::Gradient(_))
    }
}

impl Default for ColorSpec {
    fn default() -> Self {
        ColorSpec::Solid(Color::WHITE)
    }
}

impl From<Color> for ColorSpec {
    fn from(value: Color) -> Self {
        ColorSpec::Solid(value)
    }
}

impl FromStr for ColorSpec {
    type Err = AudioCanvasError;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains("gradient") {
            Gradient::parse_css(s).map(ColorSpec::Gradient)
        } else {
            s.parse().map(ColorSpec::Solid)
        }
    }
}

impl fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpec::Solid(color) => fmt::Display::fmt(color, f),
            ColorSpec::Gradient(gradient) => fmt::Display::fmt(gradient, f),
        }
    }
}

impl TryFrom<String> for ColorSpec {
    type Error = AudioCanvasError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ColorSpec> for String {
    fn from(value: ColorSpec) -> Self {
        value.to_string()
    }
}

fn direction_degree(direction: &str) -> Option<f32> {
    let words: Vec<&str> = direction.split_whitespace().skip(1).collect();
    let has = |word: &str| words.contains(&word);

    let degree = match words.len() {
        1 if has("top") => 0.0,
        1 if has("right") => 90.0,
        1 if has("bottom") => 180.0,
        1 if has("left") => 270.0,
        2 if has("top") && has("right") => 45.0,
        2 if has("bottom") && has("right") => 135.0,
        2 if has("bottom") && has("left") => 225.0,
        2 if has("top") && has("left") => 315.0,
        _ => return None,
    };
    Some(degree)
}

/// Splits on commas that are not nested inside parentheses.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(body[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(body[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_color_notations() {
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("#63debb".parse::<Color>().unwrap(), Color::rgb(0x63, 0xde, 0xbb));
        assert_eq!(
            "rgba(131, 222, 196, 0.5)".parse::<Color>().unwrap(),
            Color::rgba(131, 222, 196, 128)
        );
        assert_eq!("rgb(73, 106, 220)".parse::<Color>().unwrap(), Color::rgb(73, 106, 220));
        assert!("chartreuse".parse::<Color>().is_err());
    }

    #[test]
    fn parses_gradient_direction_and_stops() {
        let gradient =
            Gradient::parse_css("linear-gradient(to right, #000000 0%, rgb(255, 255, 255) 100%)")
                .unwrap();
        assert_eq!(gradient.degree, 90.0);
        assert_eq!(gradient.stops.len(), 2);
        assert_eq!(gradient.stops[1].color, Color::WHITE);

        let angled = Gradient::parse_css("linear-gradient(45deg, #f00, #00f)").unwrap();
        assert_eq!(angled.degree, 45.0);
        assert_eq!(angled.stops[1].offset, 1.0);
    }

    #[test]
    fn gradient_map_spans_all_stops() {
        let spec: ColorSpec = "linear-gradient(to right, #000000 0%, #ffffff 100%)"
            .parse()
            .unwrap();
        let map = spec.color_map(5);
        assert_eq!(map.len(), 5);
        assert_eq!(map[0], Color::BLACK);
        assert_eq!(map[2], Color::rgb(128, 128, 128));
        assert_eq!(map[4], Color::WHITE);
    }

    #[test]
    fn solid_map_repeats_color() {
        let spec = ColorSpec::Solid(Color::rgb(1, 2, 3));
        assert_eq!(spec.color_map(3), vec![Color::rgb(1, 2, 3); 3]);
    }

    #[test]
    fn presets_parse() {
        for preset in GRADIENT_PRESETS {
            let spec: ColorSpec = preset.parse().unwrap();
            assert!(spec.is_gradient());
            assert_eq!(spec.color_map(16).len(), 16);
        }
    }

    #[test]
    fn color_spec_round_trips_through_json() {
        let spec: ColorSpec = serde_json::from_str("\"#63debb\"").unwrap();
        assert_eq!(spec, ColorSpec::Solid(Color::rgb(0x63, 0xde, 0xbb)));
        assert_eq!(serde_json::to_string(&spec).unwrap(), "\"#63debb\"");
    }
}
