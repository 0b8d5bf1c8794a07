//! Text annotation: a positioned, styled text field on the page.

use kurbo::{Point, Rect, Size};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier of an annotation.
pub type AnnotationId = Uuid;

/// Minimum annotation width in pixels.
pub const MIN_WIDTH: f64 = 60.0;
/// Maximum annotation width in pixels.
pub const MAX_WIDTH: f64 = 400.0;
/// Minimum annotation height in pixels.
pub const MIN_HEIGHT: f64 = 24.0;
/// Maximum annotation height in pixels.
pub const MAX_HEIGHT: f64 = 600.0;
/// Smallest allowed font size.
pub const MIN_FONT_SIZE: f64 = 10.0;
/// Largest allowed font size.
pub const MAX_FONT_SIZE: f64 = 72.0;
/// Lowest allowed opacity.
pub const MIN_OPACITY: f64 = 0.5;
/// Highest allowed opacity.
pub const MAX_OPACITY: f64 = 1.0;

/// Font family options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[serde(rename = "serif")]
    Serif,
    /// Clean sans-serif (default).
    #[default]
    #[serde(rename = "sans-serif")]
    SansSerif,
}

impl FontFamily {
    /// CSS generic family name.
    pub fn css(&self) -> &'static str {
        match self {
            FontFamily::Serif => "serif",
            FontFamily::SansSerif => "sans-serif",
        }
    }

    /// Get all available font families.
    pub fn all() -> &'static [FontFamily] {
        &[FontFamily::Serif, FontFamily::SansSerif]
    }
}

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn css(&self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }

    /// Flip between normal and bold (toolbar toggle).
    pub fn toggled(self) -> Self {
        match self {
            FontWeight::Normal => FontWeight::Bold,
            FontWeight::Bold => FontWeight::Normal,
        }
    }
}

/// Font style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    pub fn css(&self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            FontStyle::Normal => FontStyle::Italic,
            FontStyle::Italic => FontStyle::Normal,
        }
    }
}

/// Horizontal text alignment inside the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn css(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

/// Partial style update. `None` fields are left untouched.
///
/// Width and height travel here too, since the resize handle and the
/// toolbar both go through the same clamped merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub font_size: Option<f64>,
    pub font_weight: Option<FontWeight>,
    pub font_style: Option<FontStyle>,
    pub text_align: Option<TextAlign>,
    pub font_family: Option<FontFamily>,
    pub color: Option<String>,
    pub letter_spacing: Option<f64>,
    pub line_height: Option<f64>,
    pub opacity: Option<f64>,
}

impl StylePatch {
    /// Whether the patch changes width or height.
    pub fn touches_geometry(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_font_family(mut self, family: FontFamily) -> Self {
        self.font_family = Some(family);
        self
    }

    pub fn with_font_weight(mut self, weight: FontWeight) -> Self {
        self.font_weight = Some(weight);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }
}

/// A single text field overlaid on the background image.
///
/// Field names match the persisted snapshot format. Reading is lenient per
/// field: a missing, `null` or mistyped value takes its default and the
/// rest of the annotation still loads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub(crate) id: AnnotationId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub font_size: f64,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub text_align: TextAlign,
    pub font_family: FontFamily,
    pub color: String,
    pub letter_spacing: f64,
    pub line_height: f64,
    pub opacity: f64,
}

impl<'de> Deserialize<'de> for TextAnnotation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_fields(&fields))
    }
}

impl TextAnnotation {
    /// Build an annotation from loosely typed JSON fields, then restore
    /// every bound.
    ///
    /// Older snapshots used numeric timestamps as ids; anything that is not
    /// a UUID string gets a fresh id.
    pub(crate) fn from_fields(fields: &Map<String, Value>) -> Self {
        fn read<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<T> {
            let value = fields.get(key)?;
            match T::deserialize(value) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    if !value.is_null() {
                        log::debug!("Using default for {}: {}", key, e);
                    }
                    None
                }
            }
        }

        let mut annotation = Self::new(Point::ZERO);
        if let Some(id) = read::<String>(fields, "id").and_then(|s| Uuid::parse_str(&s).ok()) {
            annotation.id = id;
        }
        if let Some(x) = read(fields, "x") {
            annotation.x = x;
        }
        if let Some(y) = read(fields, "y") {
            annotation.y = y;
        }
        if let Some(width) = read(fields, "width") {
            annotation.width = width;
        }
        if let Some(height) = read(fields, "height") {
            annotation.height = height;
        }
        if let Some(text) = read(fields, "text") {
            annotation.text = text;
        }
        if let Some(size) = read(fields, "fontSize") {
            annotation.font_size = size;
        }
        if let Some(weight) = read(fields, "fontWeight") {
            annotation.font_weight = weight;
        }
        if let Some(style) = read(fields, "fontStyle") {
            annotation.font_style = style;
        }
        if let Some(align) = read(fields, "textAlign") {
            annotation.text_align = align;
        }
        if let Some(family) = read(fields, "fontFamily") {
            annotation.font_family = family;
        }
        if let Some(color) = read(fields, "color") {
            annotation.color = color;
        }
        if let Some(spacing) = read(fields, "letterSpacing") {
            annotation.letter_spacing = spacing;
        }
        if let Some(line_height) = read(fields, "lineHeight") {
            annotation.line_height = line_height;
        }
        if let Some(opacity) = read(fields, "opacity") {
            annotation.opacity = opacity;
        }
        annotation.normalize();
        annotation
    }
}

impl TextAnnotation {
    pub const DEFAULT_WIDTH: f64 = 160.0;
    pub const DEFAULT_HEIGHT: f64 = 80.0;
    pub const DEFAULT_FONT_SIZE: f64 = 16.0;
    pub const DEFAULT_COLOR: &'static str = "#000000";
    pub const DEFAULT_LINE_HEIGHT: f64 = 1.4;
    pub const DEFAULT_OPACITY: f64 = 0.9;

    /// Create a new empty annotation with its top-left corner at `position`.
    pub fn new(position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            x: position.x.max(0.0),
            y: position.y.max(0.0),
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            text: String::new(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_weight: FontWeight::default(),
            font_style: FontStyle::default(),
            text_align: TextAlign::default(),
            font_family: FontFamily::default(),
            color: Self::DEFAULT_COLOR.to_string(),
            letter_spacing: 0.0,
            line_height: Self::DEFAULT_LINE_HEIGHT,
            opacity: Self::DEFAULT_OPACITY,
        }
    }

    /// Set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Apply a style patch on construction.
    pub fn with_style(mut self, patch: &StylePatch) -> Self {
        self.apply_style(patch);
        self
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Bounding box in container-local coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position(), self.size())
    }

    /// Horizontal center of the field.
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    /// Merge a style patch, clamping every numeric field to its bound.
    /// Returns true if anything changed.
    pub fn apply_style(&mut self, patch: &StylePatch) -> bool {
        let before = self.clone();

        if let Some(width) = finite(patch.width) {
            self.width = width.clamp(MIN_WIDTH, MAX_WIDTH);
        }
        if let Some(height) = finite(patch.height) {
            self.height = height.clamp(MIN_HEIGHT, MAX_HEIGHT);
        }
        if let Some(size) = finite(patch.font_size) {
            self.font_size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        }
        if let Some(weight) = patch.font_weight {
            self.font_weight = weight;
        }
        if let Some(style) = patch.font_style {
            self.font_style = style;
        }
        if let Some(align) = patch.text_align {
            self.text_align = align;
        }
        if let Some(family) = patch.font_family {
            self.font_family = family;
        }
        if let Some(color) = patch.color.as_deref() {
            match normalize_hex_color(color) {
                Some(color) => self.color = color,
                None => log::debug!("Ignoring invalid color {:?}", color),
            }
        }
        if let Some(spacing) = finite(patch.letter_spacing) {
            self.letter_spacing = spacing;
        }
        if let Some(line_height) = finite(patch.line_height) {
            self.line_height = line_height;
        }
        if let Some(opacity) = finite(patch.opacity) {
            self.opacity = opacity.clamp(MIN_OPACITY, MAX_OPACITY);
        }

        *self != before
    }

    /// Clamp the position so the field stays inside a container of `size`.
    pub fn clamp_into(&mut self, container: Size) {
        self.x = clamp_axis(self.x, container.width - self.width);
        self.y = clamp_axis(self.y, container.height - self.height);
    }

    /// Restore every bound after deserialization.
    pub(crate) fn normalize(&mut self) {
        fn or_default(value: f64, default: f64) -> f64 {
            if value.is_finite() { value } else { default }
        }

        self.x = or_default(self.x, 0.0).max(0.0);
        self.y = or_default(self.y, 0.0).max(0.0);
        self.letter_spacing = or_default(self.letter_spacing, 0.0);
        self.line_height = or_default(self.line_height, Self::DEFAULT_LINE_HEIGHT);
        self.color = normalize_hex_color(&self.color)
            .unwrap_or_else(|| Self::DEFAULT_COLOR.to_string());

        let patch = StylePatch {
            width: Some(or_default(self.width, Self::DEFAULT_WIDTH)),
            height: Some(or_default(self.height, Self::DEFAULT_HEIGHT)),
            font_size: Some(or_default(self.font_size, Self::DEFAULT_FONT_SIZE)),
            opacity: Some(or_default(self.opacity, Self::DEFAULT_OPACITY)),
            ..Default::default()
        };
        self.apply_style(&patch);
    }
}

/// Clamp a coordinate to `[0, upper]`; a negative upper bound pins to 0.
pub(crate) fn clamp_axis(value: f64, upper: f64) -> f64 {
    value.min(upper).max(0.0)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Accept `#rgb` or `#rrggbb`, returning lowercase `#rrggbb`.
pub fn normalize_hex_color(color: &str) -> Option<String> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(format!("#{}", hex.to_ascii_lowercase())),
        3 => {
            let expanded: String = hex
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_lowercase();
            Some(format!("#{}", expanded))
        }
        _ => None,
    }
}
