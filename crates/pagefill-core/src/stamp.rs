//! Red circular name seal, rendered as an SVG data URL.

use base64::Engine;
use std::fmt::Write as _;

/// Ink color of the seal and of the auto-fill placeholder.
pub const STAMP_COLOR: &str = "#c41e3a";
/// Pale fill inside the ring.
pub const STAMP_FILL: &str = "rgba(196, 30, 58, 0.08)";
/// Text marking where the seal goes.
pub const SEAL_PLACEHOLDER: &str = "(인)";
/// Default edge length of the seal image in pixels.
pub const DEFAULT_STAMP_SIZE: u32 = 120;

const RING_WIDTH: f64 = 3.0;
const FONT_FAMILY: &str = "'Malgun Gothic', 'Apple SD Gothic Neo', serif";

/// Font size for a name: longer names get smaller type.
pub fn stamp_font_size(name: &str) -> u32 {
    match name.trim().chars().count() {
        0..=3 => 28,
        4..=5 => 22,
        _ => 18,
    }
}

/// The seal as an SVG document, or `None` for a blank name.
pub fn stamp_svg(name: &str, size: u32) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let center = f64::from(size) / 2.0;
    let radius = (center - 6.0).max(0.0);
    let ring = (radius - 2.0).max(0.0);

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\">"
    );
    let _ = write!(svg, "<circle cx=\"{center}\" cy=\"{center}\" r=\"{radius}\" fill=\"{STAMP_FILL}\"/>");
    let _ = write!(
        svg,
        "<circle cx=\"{center}\" cy=\"{center}\" r=\"{ring}\" fill=\"none\" stroke=\"{STAMP_COLOR}\" stroke-width=\"{RING_WIDTH}\"/>"
    );
    let _ = write!(
        svg,
        "<text x=\"{center}\" y=\"{center}\" fill=\"{STAMP_COLOR}\" font-size=\"{}\" font-weight=\"bold\" \
font-family=\"{FONT_FAMILY}\" text-anchor=\"middle\" dominant-baseline=\"central\">{}</text>",
        stamp_font_size(name),
        escape_xml(name)
    );
    svg.push_str("</svg>");
    Some(svg)
}

/// The seal as a `data:image/svg+xml;base64,` URL. Empty for a blank name.
pub fn stamp_data_url(name: &str, size: u32) -> String {
    match stamp_svg(name, size) {
        Some(svg) => format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(svg)
        ),
        None => String::new(),
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
