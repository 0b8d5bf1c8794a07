//! Persisted form of an editor document.

use crate::annotation::TextAnnotation;
use crate::document::EditorDocument;
use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp format used for `savedAt`.
pub const SAVED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Detached copy of a document as stored in the durable slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    /// Background image as a data URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Serialized annotations in layer order.
    #[serde(default, deserialize_with = "lenient_texts")]
    pub texts: Vec<TextAnnotation>,
    /// Human-readable save time (`YYYY-MM-DD HH:MM`).
    #[serde(default)]
    pub saved_at: String,
    /// Annotation count, for previews that don't parse `texts`.
    #[serde(default)]
    pub field_count: usize,
    /// Same as `image`; kept so newer readers can show a preview.
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl StoredSnapshot {
    /// Capture the current state of a document, stamped with `saved_at`.
    pub fn capture(document: &EditorDocument, saved_at: DateTime<Local>) -> Self {
        let image = document.background_image().map(str::to_string);
        Self {
            thumbnail: image.clone(),
            image,
            texts: document.annotations().to_vec(),
            saved_at: saved_at.format(SAVED_AT_FORMAT).to_string(),
            field_count: document.len(),
        }
    }

    /// Capture the document stamped with the current wall-clock time.
    pub fn capture_now(document: &EditorDocument) -> Self {
        Self::capture(document, Local::now())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a snapshot, substituting defaults for missing fields and
    /// re-applying every bound.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Parse each annotation on its own. Bad fields fall back to their
/// defaults; only entries that are not objects are dropped.
fn lenient_texts<'de, D>(deserializer: D) -> Result<Vec<TextAnnotation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut texts = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match value.as_object() {
            Some(fields) => texts.push(TextAnnotation::from_fields(fields)),
            None => log::warn!("Skipping annotation #{}: expected an object, got {}", index, value),
        }
    }
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{FontFamily, FontStyle, FontWeight, StylePatch, TextAlign};
    use chrono::TimeZone;
    use kurbo::{Point, Size};

    fn sample_document() -> EditorDocument {
        let mut doc = EditorDocument::with_container(Size::new(800.0, 600.0));
        doc.set_background_image("data:image/png;base64,AAAA");
        let a = doc.create(Point::new(50.0, 50.0));
        doc.update_text(a, "Hello");
        let b = doc.create(Point::new(300.5, 120.25));
        doc.update_text(b, "세계");
        doc.update_style(
            b,
            &StylePatch {
                width: Some(222.5),
                height: Some(33.0),
                font_size: Some(21.0),
                font_weight: Some(FontWeight::Bold),
                font_style: Some(FontStyle::Italic),
                text_align: Some(TextAlign::Right),
                font_family: Some(FontFamily::Serif),
                color: Some("#1a1a1a".to_string()),
                letter_spacing: Some(0.2),
                line_height: Some(1.45),
                opacity: Some(0.92),
            },
        );
        doc
    }

    #[test]
    fn test_capture_fields() {
        let doc = sample_document();
        let when = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap();
        let snapshot = StoredSnapshot::capture(&doc, when);
        assert_eq!(snapshot.saved_at, "2026-03-07 09:05");
        assert_eq!(snapshot.field_count, 2);
        assert_eq!(snapshot.thumbnail, snapshot.image);
        assert_eq!(snapshot.image.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_json_preserves_every_field() {
        let doc = sample_document();
        let snapshot = StoredSnapshot::capture_now(&doc);
        let json = snapshot.to_json().unwrap();
        let loaded = StoredSnapshot::from_json(&json).unwrap();
        assert_eq!(loaded.texts, doc.annotations());
        assert_eq!(loaded.image, snapshot.image);
    }

    #[test]
    fn test_old_snapshot_gets_defaults() {
        let json = r#"{
            "image": null,
            "texts": [
                {"id": 1, "x": 12, "y": 34, "text": "old", "fontSize": 18,
                 "fontWeight": "normal", "textAlign": "left"}
            ],
            "savedAt": "2025-01-01 10:00"
        }"#;
        let snapshot = StoredSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.texts.len(), 1);
        let ann = &snapshot.texts[0];
        assert_eq!((ann.x, ann.y), (12.0, 34.0));
        assert_eq!(ann.width, 160.0);
        assert_eq!(ann.height, 80.0);
        assert_eq!(ann.color, "#000000");
        assert_eq!(ann.font_family, FontFamily::SansSerif);
        assert_eq!(ann.font_style, FontStyle::Normal);
        assert!((ann.opacity - 0.9).abs() < f64::EPSILON);
        assert_eq!(ann.letter_spacing, 0.0);
        assert!((ann.line_height - 1.4).abs() < f64::EPSILON);
        assert_eq!(snapshot.field_count, 0);
        assert_eq!(snapshot.thumbnail, None);
    }

    #[test]
    fn test_non_object_entry_is_skipped() {
        let json = r#"{"texts": [{"text": "ok"}, "garbage", 42, null]}"#;
        let snapshot = StoredSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.texts.len(), 1);
        assert_eq!(snapshot.texts[0].text, "ok");
    }

    #[test]
    fn test_bad_fields_fall_back_to_defaults() {
        let json = r#"{"texts": [
            {"text": "kept"},
            {"text": "nan position", "x": null, "y": 30},
            {"text": "numeric weight", "fontWeight": "600"},
            {"text": "monospace", "fontFamily": "monospace", "textAlign": "justify"},
            {"text": 7, "fontWeight": 700, "fontSize": "big", "color": 12}
        ]}"#;
        let snapshot = StoredSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.texts.len(), 5);

        let nan = &snapshot.texts[1];
        assert_eq!(nan.text, "nan position");
        assert_eq!((nan.x, nan.y), (0.0, 30.0));
        assert_eq!(snapshot.texts[2].font_weight, FontWeight::Normal);
        assert_eq!(snapshot.texts[3].font_family, FontFamily::SansSerif);
        assert_eq!(snapshot.texts[3].text_align, TextAlign::Left);

        let mistyped = &snapshot.texts[4];
        assert!(mistyped.text.is_empty());
        assert_eq!(mistyped.font_weight, FontWeight::Normal);
        assert_eq!(mistyped.font_size, 16.0);
        assert_eq!(mistyped.color, "#000000");
    }

    #[test]
    fn test_out_of_range_values_are_clamped_on_load() {
        let json = r#"{"texts": [{"fontSize": 200, "opacity": 0.1, "width": 5, "color": "nope"}]}"#;
        let snapshot = StoredSnapshot::from_json(json).unwrap();
        let ann = &snapshot.texts[0];
        assert_eq!(ann.font_size, 72.0);
        assert_eq!(ann.opacity, 0.5);
        assert_eq!(ann.width, 60.0);
        assert_eq!(ann.color, "#000000");
    }

    #[test]
    fn test_not_json_is_an_error() {
        assert!(StoredSnapshot::from_json("{not json").is_err());
    }
}
