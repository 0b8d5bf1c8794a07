//! Page export: compose the document as standalone HTML and describe the
//! page format for an external HTML-to-PDF renderer.

use crate::annotation::TextAnnotation;
use crate::document::EditorDocument;
use crate::stamp::{DEFAULT_STAMP_SIZE, SEAL_PLACEHOLDER, stamp_data_url};
use crate::storage::{BoxFuture, MaybeSendSync};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

/// Paper formats understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    Letter,
    A5,
}

/// Page margin presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Margin {
    None,
    Narrow,
    #[default]
    Normal,
    Wide,
}

impl Margin {
    /// Margin width in CSS pixels.
    pub fn pixels(&self) -> u32 {
        match self {
            Margin::None => 0,
            Margin::Narrow => 10,
            Margin::Normal => 20,
            Margin::Wide => 40,
        }
    }
}

/// Page options chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageOptions {
    pub paper: PaperSize,
    pub landscape: bool,
    pub margin: Margin,
    /// Signer name sealed over every `(인)` placeholder.
    pub stamp: Option<String>,
}

/// Request body for the render service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub html: String,
    pub format: PaperSize,
    pub landscape: bool,
    pub margin: Margin,
}

impl RenderRequest {
    pub fn new(document: &EditorDocument, options: PageOptions) -> Self {
        Self {
            html: compose_page(document, options.stamp.as_deref()),
            format: options.paper,
            landscape: options.landscape,
            margin: options.margin,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Render failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Nothing to export: no background image")]
    NoDocument,
    #[error("Render service unavailable: {0}")]
    Unavailable(String),
    #[error("Rendering failed: {0}")]
    Failed(String),
}

/// External HTML-to-PDF collaborator.
pub trait PdfRenderer: MaybeSendSync {
    /// Render the request, returning the PDF bytes.
    fn render<'a>(&'a self, request: &'a RenderRequest) -> BoxFuture<'a, Result<Vec<u8>, RenderError>>;
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

fn annotation_div(annotation: &TextAnnotation) -> String {
    format!(
        "<div style=\"position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;\
font-size:{}px;font-weight:{};font-style:{};text-align:{};font-family:{};color:{};\
letter-spacing:{}px;line-height:{};opacity:{};white-space:pre-wrap;\">{}</div>",
        annotation.x,
        annotation.y,
        annotation.width,
        annotation.height,
        annotation.font_size,
        annotation.font_weight.css(),
        annotation.font_style.css(),
        annotation.text_align.css(),
        annotation.font_family.css(),
        escape_html(&annotation.color),
        annotation.letter_spacing,
        annotation.line_height,
        annotation.opacity,
        escape_html(&annotation.text),
    )
}

/// Seal image centered on a placeholder field, as large as the field's
/// shorter side.
fn seal_img(annotation: &TextAnnotation, seal: &str) -> String {
    let side = annotation.width.min(annotation.height);
    let bounds = annotation.bounds();
    let center = bounds.center();
    format!(
        "<img src=\"{}\" style=\"position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;\">",
        seal,
        center.x - side / 2.0,
        center.y - side / 2.0,
        side,
        side
    )
}

/// Compose the page as a standalone HTML document: the background image
/// with every annotation absolutely positioned over it, in layer order.
pub fn compose_html(document: &EditorDocument) -> String {
    compose_page(document, None)
}

/// Like [`compose_html`], also sealing each `(인)` placeholder with a
/// stamp of `stamp_name`. A blank name adds nothing.
pub fn compose_page(document: &EditorDocument, stamp_name: Option<&str>) -> String {
    let seal = stamp_name
        .map(|name| stamp_data_url(name, DEFAULT_STAMP_SIZE))
        .filter(|url| !url.is_empty());
    let container = document.container();
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<style>html,body{margin:0;padding:0;}</style>\n</head>\n<body>\n");
    let _ = writeln!(
        html,
        "<div style=\"position:relative;width:{}px;height:{}px;overflow:hidden;\">",
        container.width, container.height
    );
    if let Some(image) = document.background_image() {
        let _ = writeln!(
            html,
            "<img src=\"{}\" style=\"position:absolute;left:0;top:0;width:100%;height:100%;\">",
            escape_html(image)
        );
    }
    for annotation in document.annotations() {
        html.push_str(&annotation_div(annotation));
        html.push('\n');
        if let Some(seal) = &seal {
            if annotation.text.trim() == SEAL_PLACEHOLDER {
                html.push_str(&seal_img(annotation, seal));
                html.push('\n');
            }
        }
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}
