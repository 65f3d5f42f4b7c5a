use std::collections::HashMap;

use eframe::egui::Color32;

pub const DEFAULT_PALETTE: [&str; 9] = [
    "#e05252", "#e08a3c", "#d9c23f", "#5dbb63", "#3fb8af", "#4a90d9", "#7b68ee", "#c45ab3",
    "#8c8c8c",
];

pub const UNGROUPED_COLOR: Color32 = Color32::from_rgb(150, 160, 175);

/// First palette colour not in use, cycling once every colour is taken.
pub fn next_default_color<'a>(used: impl IntoIterator<Item = &'a str>) -> &'static str {
    let used = used
        .into_iter()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>();
    DEFAULT_PALETTE
        .iter()
        .find(|color| !used.iter().any(|taken| taken.as_str() == **color))
        .copied()
        .unwrap_or(DEFAULT_PALETTE[used.len() % DEFAULT_PALETTE.len()])
}

/// Accepts `#rrggbb`, `#rgb` and `rgb(r, g, b)`.
pub fn parse_color(text: &str) -> Option<Color32> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex(hex);
    }

    let inner = text
        .strip_prefix("rgb(")
        .or_else(|| text.strip_prefix("RGB("))?
        .strip_suffix(')')?;
    let channels = inner
        .split(',')
        .map(|part| part.trim().parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;
    match channels.as_slice() {
        [r, g, b] => Some(Color32::from_rgb(*r, *g, *b)),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Color32> {
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
            Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
        }
        3 => {
            let channel = |at: usize| u8::from_str_radix(&hex[at..at + 1], 16).ok().map(|v| v * 17);
            Some(Color32::from_rgb(channel(0)?, channel(1)?, channel(2)?))
        }
        _ => None,
    }
}

pub fn to_hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;
    let mix = |a: u8, b: u8| ((a as f32 * inverse) + (b as f32 * amount)).round() as u8;

    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

/// Memoised blends and parsed group colours. Grows with the number of distinct inputs.
#[derive(Debug, Default)]
pub struct ColorCache {
    parsed: HashMap<String, Color32>,
    blends: HashMap<(Color32, Color32, u8), Color32>,
}

impl ColorCache {
    pub fn color(&mut self, text: &str) -> Color32 {
        if let Some(color) = self.parsed.get(text) {
            return *color;
        }
        let color = parse_color(text).unwrap_or_else(|| {
            tracing::warn!(color = text, "unparseable group colour; using default");
            UNGROUPED_COLOR
        });
        self.parsed.insert(text.to_owned(), color);
        color
    }

    /// `amount` is quantised to 1/255 steps for the cache key.
    pub fn blend(&mut self, base: Color32, overlay: Color32, amount: f32) -> Color32 {
        let step = (amount.clamp(0.0, 1.0) * 255.0).round() as u8;
        *self
            .blends
            .entry((base, overlay, step))
            .or_insert_with(|| blend_color(base, overlay, f32::from(step) / 255.0))
    }
}
