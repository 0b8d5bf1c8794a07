//! Editor document: the background page plus its ordered text annotations.
//!
//! This is the single source of truth for the editor. Every mutation goes
//! through a method here and bumps [`EditorDocument::revision`], which the
//! persistence layer watches to schedule autosaves.

use crate::annotation::{AnnotationId, StylePatch, TextAnnotation};
use crate::snap::{self, SnapResult, SNAP_THRESHOLD};
use crate::storage::StoredSnapshot;
use base64::Engine;
use kurbo::{Point, Size};

/// Default container size (A4 at 96 dpi).
pub const DEFAULT_CONTAINER_SIZE: Size = Size::new(794.0, 1123.0);

/// The whole editable unit.
#[derive(Debug, Clone)]
pub struct EditorDocument {
    /// Background page as a data URL. `None` means no document is loaded.
    background_image: Option<String>,
    /// Annotations in insertion order (back to front).
    annotations: Vec<TextAnnotation>,
    /// The annotation receiving keyboard and style-panel input.
    focused: Option<AnnotationId>,
    /// Size of the page container in pixels.
    container: Size,
    /// Snap distance used by [`EditorDocument::move_annotation`].
    snap_threshold: f64,
    /// Incremented on every mutation.
    revision: u64,
    /// Incremented when the content is replaced wholesale (reset, load).
    epoch: u64,
}

impl Default for EditorDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::with_container(DEFAULT_CONTAINER_SIZE)
    }

    /// Create a new empty document for a container of the given size.
    pub fn with_container(container: Size) -> Self {
        Self {
            background_image: None,
            annotations: Vec::new(),
            focused: None,
            container,
            snap_threshold: SNAP_THRESHOLD,
            revision: 0,
            epoch: 0,
        }
    }

    pub fn set_snap_threshold(&mut self, threshold: f64) {
        self.snap_threshold = threshold.max(0.0);
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn background_image(&self) -> Option<&str> {
        self.background_image.as_deref()
    }

    /// Whether a background page has been loaded.
    pub fn has_background(&self) -> bool {
        self.background_image.is_some()
    }

    /// Annotations in layer order (back to front).
    pub fn annotations(&self) -> &[TextAnnotation] {
        &self.annotations
    }

    pub fn get(&self, id: AnnotationId) -> Option<&TextAnnotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AnnotationId) -> Option<&mut TextAnnotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn focused(&self) -> Option<AnnotationId> {
        self.focused
    }

    pub fn focused_annotation(&self) -> Option<&TextAnnotation> {
        self.focused.and_then(|id| self.get(id))
    }

    /// Topmost annotation under a container-local point.
    pub fn annotation_at(&self, point: Point) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .find(|a| a.hit_test(point, 0.0))
            .map(|a| a.id)
    }

    /// Focus an annotation. Unknown ids are ignored.
    pub fn focus(&mut self, id: AnnotationId) -> bool {
        if self.contains(id) {
            self.focused = Some(id);
            true
        } else {
            false
        }
    }

    /// Focus is transient UI state and does not count as a mutation.
    pub fn clear_focus(&mut self) {
        self.focused = None;
    }

    /// Set the background page.
    pub fn set_background_image(&mut self, data_url: impl Into<String>) {
        self.background_image = Some(data_url.into());
        self.touch();
    }

    /// Set the background page from raw image bytes.
    pub fn set_background_from_bytes(&mut self, mime: &str, bytes: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.set_background_image(format!("data:{};base64,{}", mime, encoded));
    }

    /// Resize the container and pull every annotation back inside it.
    pub fn set_container_size(&mut self, size: Size) {
        if size == self.container {
            return;
        }
        self.container = size;
        for annotation in &mut self.annotations {
            annotation.clamp_into(size);
        }
        self.touch();
    }

    /// Append a new annotation at container-local `position` and focus it.
    pub fn create(&mut self, position: Point) -> AnnotationId {
        let annotation = TextAnnotation::new(position);
        self.insert(annotation, true)
    }

    /// Append an existing annotation, clamping it into the container.
    pub fn insert(&mut self, mut annotation: TextAnnotation, focus: bool) -> AnnotationId {
        annotation.clamp_into(self.container);
        let id = annotation.id;
        log::debug!("Created annotation {} at ({}, {})", id, annotation.x, annotation.y);
        self.annotations.push(annotation);
        if focus {
            self.focused = Some(id);
        }
        self.touch();
        id
    }

    /// Replace the text of an annotation.
    pub fn update_text(&mut self, id: AnnotationId, text: impl Into<String>) -> bool {
        let text = text.into();
        let Some(annotation) = self.get_mut(id) else {
            return false;
        };
        if annotation.text == text {
            return true;
        }
        annotation.text = text;
        self.touch();
        true
    }

    /// Merge a style patch into an annotation. Every field is clamped.
    pub fn update_style(&mut self, id: AnnotationId, patch: &StylePatch) -> bool {
        let container = self.container;
        let Some(annotation) = self.get_mut(id) else {
            return false;
        };
        let mut changed = annotation.apply_style(patch);
        if patch.touches_geometry() {
            let before = annotation.position();
            annotation.clamp_into(container);
            changed |= annotation.position() != before;
        }
        if changed {
            self.touch();
        }
        true
    }

    /// Move an annotation to a proposed top-left position.
    ///
    /// The x coordinate snaps to sibling edges and centers and the container
    /// center; both coordinates are clamped to the container. Returns the
    /// snap result (with guide lines), or `None` for an unknown id.
    pub fn move_annotation(&mut self, id: AnnotationId, x: f64, y: f64) -> Option<SnapResult> {
        let annotation = self.get(id)?;
        let size = annotation.size();
        let before = annotation.position();

        let targets = snap::collect_targets(
            self.annotations.iter().filter(|a| a.id != id),
            self.container,
        );
        let result = snap::resolve_position(
            Point::new(x, y),
            size,
            &targets,
            self.container,
            self.snap_threshold,
        );

        if result.position != before {
            if let Some(annotation) = self.get_mut(id) {
                annotation.x = result.position.x;
                annotation.y = result.position.y;
            }
            self.touch();
        }
        Some(result)
    }

    /// Delete an annotation. Clears focus if it was focused.
    pub fn remove(&mut self, id: AnnotationId) -> Option<TextAnnotation> {
        let index = self.annotations.iter().position(|a| a.id == id)?;
        let removed = self.annotations.remove(index);
        if self.focused == Some(id) {
            self.focused = None;
        }
        log::debug!("Removed annotation {}", id);
        self.touch();
        Some(removed)
    }

    /// Bring an annotation to the front (topmost layer).
    pub fn bring_to_front(&mut self, id: AnnotationId) -> bool {
        let Some(index) = self.annotations.iter().position(|a| a.id == id) else {
            return false;
        };
        if index + 1 < self.annotations.len() {
            let annotation = self.annotations.remove(index);
            self.annotations.push(annotation);
            self.touch();
        }
        true
    }

    /// Send an annotation to the back (bottommost layer).
    pub fn send_to_back(&mut self, id: AnnotationId) -> bool {
        let Some(index) = self.annotations.iter().position(|a| a.id == id) else {
            return false;
        };
        if index > 0 {
            let annotation = self.annotations.remove(index);
            self.annotations.insert(0, annotation);
            self.touch();
        }
        true
    }

    /// Clear all annotations and the background image.
    /// A document that is already empty is left untouched.
    pub fn reset(&mut self) {
        self.focused = None;
        if self.annotations.is_empty() && self.background_image.is_none() {
            return;
        }
        self.annotations.clear();
        self.background_image = None;
        self.epoch = self.epoch.wrapping_add(1);
        self.touch();
    }

    /// Replace the content with a loaded snapshot.
    pub fn apply_snapshot(&mut self, snapshot: StoredSnapshot) {
        self.background_image = snapshot.image;
        self.annotations = snapshot.texts;
        for annotation in &mut self.annotations {
            annotation.clamp_into(self.container);
        }
        self.focused = None;
        self.epoch = self.epoch.wrapping_add(1);
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{FontFamily, MAX_FONT_SIZE, MIN_FONT_SIZE};

    fn doc() -> EditorDocument {
        EditorDocument::with_container(Size::new(800.0, 600.0))
    }

    #[test]
    fn test_document_creation() {
        let doc = EditorDocument::new();
        assert!(doc.is_empty());
        assert!(!doc.has_background());
        assert_eq!(doc.focused(), None);
        assert_eq!(doc.container(), DEFAULT_CONTAINER_SIZE);
    }

    #[test]
    fn test_create_focuses_new_annotation() {
        let mut doc = doc();
        let first = doc.create(Point::new(10.0, 10.0));
        let second = doc.create(Point::new(300.0, 10.0));
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.focused(), Some(second));
        assert_eq!(doc.annotations()[0].id(), first);
        assert_eq!(doc.annotations()[1].id(), second);
    }

    #[test]
    fn test_create_clamps_into_container() {
        let mut doc = doc();
        let id = doc.create(Point::new(790.0, 590.0));
        let ann = doc.get(id).unwrap();
        assert_eq!(ann.position(), Point::new(640.0, 520.0));
    }

    #[test]
    fn test_update_text_accepts_anything() {
        let mut doc = doc();
        let id = doc.create(Point::ZERO);
        assert!(doc.update_text(id, "Hello\n세계"));
        assert_eq!(doc.get(id).unwrap().text, "Hello\n세계");
        assert!(doc.update_text(id, ""));
        assert_eq!(doc.get(id).unwrap().text, "");
        assert!(!doc.update_text(uuid::Uuid::new_v4(), "x"));
    }

    #[test]
    fn test_update_style_clamps() {
        let mut doc = doc();
        let id = doc.create(Point::ZERO);
        doc.update_style(id, &StylePatch::default().with_font_size(4.0));
        assert_eq!(doc.get(id).unwrap().font_size, MIN_FONT_SIZE);
        doc.update_style(id, &StylePatch::default().with_font_size(999.0));
        assert_eq!(doc.get(id).unwrap().font_size, MAX_FONT_SIZE);
        doc.update_style(id, &StylePatch::default().with_font_family(FontFamily::Serif));
        assert_eq!(doc.get(id).unwrap().font_family, FontFamily::Serif);
    }

    #[test]
    fn test_widening_keeps_annotation_inside() {
        let mut doc = doc();
        let id = doc.create(Point::new(600.0, 0.0));
        doc.update_style(id, &StylePatch::default().with_size(400.0, 80.0));
        let ann = doc.get(id).unwrap();
        assert!(ann.x + ann.width <= 800.0);
        assert_eq!(ann.width, 400.0);
    }

    #[test]
    fn test_move_never_leaves_container() {
        let mut doc = doc();
        let id = doc.create(Point::ZERO);
        for (x, y) in [(-50.0, -50.0), (5000.0, 5000.0), (700.0, -1.0), (-1.0, 590.0)] {
            doc.move_annotation(id, x, y).unwrap();
            let ann = doc.get(id).unwrap();
            assert!(ann.x >= 0.0 && ann.y >= 0.0);
            assert!(ann.x + ann.width <= 800.0);
            assert!(ann.y + ann.height <= 600.0);
        }
    }

    #[test]
    fn test_move_snaps_to_sibling() {
        let mut doc = doc();
        let sibling = doc.create(Point::new(100.0, 10.0));
        let id = doc.create(Point::new(300.0, 200.0));
        let result = doc.move_annotation(id, 103.0, 250.0).unwrap();
        assert_eq!(result.guides, vec![100.0]);
        assert_eq!(doc.get(id).unwrap().position(), Point::new(100.0, 250.0));
        assert_eq!(doc.get(sibling).unwrap().position(), Point::new(100.0, 10.0));
    }

    #[test]
    fn test_move_unknown_id() {
        let mut doc = doc();
        assert!(doc.move_annotation(uuid::Uuid::new_v4(), 0.0, 0.0).is_none());
    }

    #[test]
    fn test_remove_clears_focus() {
        let mut doc = doc();
        let a = doc.create(Point::ZERO);
        let b = doc.create(Point::new(200.0, 0.0));
        doc.focus(a);
        doc.remove(b);
        assert_eq!(doc.focused(), Some(a));
        doc.remove(a);
        assert_eq!(doc.focused(), None);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_layer_order() {
        let mut doc = doc();
        let a = doc.create(Point::ZERO);
        let b = doc.create(Point::ZERO);
        let c = doc.create(Point::ZERO);
        doc.bring_to_front(a);
        let order: Vec<_> = doc.annotations().iter().map(|x| x.id()).collect();
        assert_eq!(order, vec![b, c, a]);
        doc.send_to_back(c);
        let order: Vec<_> = doc.annotations().iter().map(|x| x.id()).collect();
        assert_eq!(order, vec![c, b, a]);
        assert_eq!(doc.annotation_at(Point::new(10.0, 10.0)), Some(a));
    }

    #[test]
    fn test_reset() {
        let mut doc = doc();
        doc.set_background_image("data:image/png;base64,AAAA");
        doc.create(Point::ZERO);
        let epoch = doc.epoch();
        doc.reset();
        assert!(doc.is_empty());
        assert!(!doc.has_background());
        assert_eq!(doc.focused(), None);
        assert_eq!(doc.epoch(), epoch + 1);
    }

    #[test]
    fn test_reset_empty_is_noop() {
        let mut doc = doc();
        let revision = doc.revision();
        doc.reset();
        assert_eq!(doc.revision(), revision);
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut doc = doc();
        let r0 = doc.revision();
        let id = doc.create(Point::ZERO);
        let r1 = doc.revision();
        assert!(r1 > r0);
        doc.focus(id);
        assert_eq!(doc.revision(), r1);
        doc.update_text(id, "x");
        assert!(doc.revision() > r1);
    }

    #[test]
    fn test_background_from_bytes() {
        let mut doc = doc();
        doc.set_background_from_bytes("image/png", &[1, 2, 3]);
        assert_eq!(doc.background_image(), Some("data:image/png;base64,AQID"));
    }

    #[test]
    fn test_container_resize_reclamps() {
        let mut doc = doc();
        let id = doc.create(Point::new(600.0, 500.0));
        doc.set_container_size(Size::new(400.0, 300.0));
        let ann = doc.get(id).unwrap();
        assert_eq!(ann.position(), Point::new(240.0, 220.0));
    }
}
