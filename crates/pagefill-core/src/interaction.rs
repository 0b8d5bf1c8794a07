//! Pointer gestures: create, focus, drag and resize annotations.
//!
//! Each pointer runs its own gesture session, independent of any UI
//! toolkit: [`InteractionController::begin`] on pointer-down,
//! [`InteractionController::update`] on every move and
//! [`InteractionController::end`] on release. Positions arrive in client
//! coordinates and are converted to container-local ones through the
//! container's origin. Without a known origin every event is a no-op.

use crate::annotation::{AnnotationId, MAX_HEIGHT, MAX_WIDTH, MIN_HEIGHT, MIN_WIDTH, StylePatch};
use crate::document::EditorDocument;
use kurbo::{Point, Size, Vec2};
use std::collections::HashMap;

/// Identifier of a pointer (mouse, pen or touch contact).
pub type PointerId = u64;

/// Which part of an annotation the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationPart {
    /// The frame around the text; starts a drag.
    Body,
    /// The editable text itself; focuses without dragging.
    TextSurface,
    /// The bottom-right resize grip.
    ResizeHandle,
    /// The delete button.
    DeleteControl,
}

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty page area.
    Canvas,
    Annotation { id: AnnotationId, part: AnnotationPart },
}

/// Result of a pointer-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    Created(AnnotationId),
    Focused(AnnotationId),
    Removed(AnnotationId),
    DragStarted(AnnotationId),
    ResizeStarted(AnnotationId),
    Ignored,
}

/// Current gesture of a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Dragging(AnnotationId),
    Resizing(AnnotationId),
}

#[derive(Debug, Clone)]
struct DragState {
    id: AnnotationId,
    /// Pointer position relative to the annotation's top-left at drag start.
    offset: Vec2,
}

#[derive(Debug, Clone)]
struct ResizeState {
    id: AnnotationId,
    start_pointer: Point,
    start_size: Size,
    /// Bounded by the space left between the annotation and the container edge.
    max_size: Size,
}

#[derive(Debug, Clone)]
enum Gesture {
    Dragging(DragState),
    Resizing(ResizeState),
}

impl Gesture {
    fn annotation(&self) -> AnnotationId {
        match self {
            Gesture::Dragging(drag) => drag.id,
            Gesture::Resizing(resize) => resize.id,
        }
    }
}

/// Binds pointer gestures to document mutations.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    /// Client-space position of the container's top-left corner.
    container_origin: Option<Point>,
    gestures: HashMap<PointerId, Gesture>,
    /// Alignment guide x-coordinates to render.
    guides: Vec<f64>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or forget) where the container sits in client coordinates.
    pub fn set_container_origin(&mut self, origin: Option<Point>) {
        self.container_origin = origin;
    }

    pub fn container_origin(&self) -> Option<Point> {
        self.container_origin
    }

    fn to_local(&self, client: Point) -> Option<Point> {
        let origin = self.container_origin?;
        Some(Point::new(client.x - origin.x, client.y - origin.y))
    }

    /// Guide lines for the active drag (empty when not snapped).
    pub fn guides(&self) -> &[f64] {
        &self.guides
    }

    pub fn gesture(&self, pointer: PointerId) -> GestureState {
        match self.gestures.get(&pointer) {
            None => GestureState::Idle,
            Some(Gesture::Dragging(drag)) => GestureState::Dragging(drag.id),
            Some(Gesture::Resizing(resize)) => GestureState::Resizing(resize.id),
        }
    }

    /// Whether any pointer is dragging or resizing `id`.
    pub fn is_busy(&self, id: AnnotationId) -> bool {
        self.gestures.values().any(|g| g.annotation() == id)
    }

    /// Handle pointer-down.
    pub fn begin(
        &mut self,
        document: &mut EditorDocument,
        pointer: PointerId,
        target: PointerTarget,
        client: Point,
    ) -> PointerOutcome {
        let Some(local) = self.to_local(client) else {
            return PointerOutcome::Ignored;
        };

        let (id, part) = match target {
            PointerTarget::Canvas => {
                let id = document.create(local);
                return PointerOutcome::Created(id);
            }
            PointerTarget::Annotation { id, part } => (id, part),
        };

        let Some(annotation) = document.get(id) else {
            log::debug!("Pointer down on unknown annotation {}", id);
            return PointerOutcome::Ignored;
        };
        let position = annotation.position();
        let size = annotation.size();

        match part {
            AnnotationPart::DeleteControl => {
                self.gestures.retain(|_, g| g.annotation() != id);
                document.remove(id);
                PointerOutcome::Removed(id)
            }
            AnnotationPart::TextSurface => {
                document.focus(id);
                PointerOutcome::Focused(id)
            }
            AnnotationPart::ResizeHandle => {
                let container = document.container();
                let max_size = Size::new(
                    MAX_WIDTH.min(container.width - position.x),
                    MAX_HEIGHT.min(container.height - position.y),
                );
                document.focus(id);
                self.gestures.insert(
                    pointer,
                    Gesture::Resizing(ResizeState {
                        id,
                        start_pointer: local,
                        start_size: size,
                        max_size,
                    }),
                );
                PointerOutcome::ResizeStarted(id)
            }
            AnnotationPart::Body => {
                document.focus(id);
                self.gestures.insert(
                    pointer,
                    Gesture::Dragging(DragState {
                        id,
                        offset: local - position,
                    }),
                );
                PointerOutcome::DragStarted(id)
            }
        }
    }

    /// Handle pointer-move. Returns true if the document was updated.
    pub fn update(&mut self, document: &mut EditorDocument, pointer: PointerId, client: Point) -> bool {
        let Some(local) = self.to_local(client) else {
            return false;
        };
        let Some(gesture) = self.gestures.get(&pointer) else {
            return false;
        };

        match gesture.clone() {
            Gesture::Dragging(drag) => {
                let proposed = local - drag.offset;
                match document.move_annotation(drag.id, proposed.x, proposed.y) {
                    Some(result) => {
                        self.guides = result.guides;
                        true
                    }
                    None => {
                        // Removed underneath us (reset, delete).
                        self.gestures.remove(&pointer);
                        self.guides.clear();
                        false
                    }
                }
            }
            Gesture::Resizing(resize) => {
                let delta = local - resize.start_pointer;
                let width = (resize.start_size.width + delta.x)
                    .min(resize.max_size.width)
                    .max(MIN_WIDTH);
                let height = (resize.start_size.height + delta.y)
                    .min(resize.max_size.height)
                    .max(MIN_HEIGHT);
                let patch = StylePatch::default().with_size(width, height);
                if document.update_style(resize.id, &patch) {
                    true
                } else {
                    self.gestures.remove(&pointer);
                    false
                }
            }
        }
    }

    /// Handle pointer-up. The position is already committed; this only
    /// clears guides. Returns the annotation the gesture was acting on.
    pub fn end(&mut self, pointer: PointerId) -> Option<AnnotationId> {
        let gesture = self.gestures.remove(&pointer)?;
        if matches!(gesture, Gesture::Dragging(_)) {
            self.guides.clear();
        }
        Some(gesture.annotation())
    }

    /// Abandon every gesture (e.g. on reset).
    pub fn cancel_all(&mut self) {
        self.gestures.clear();
        self.guides.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::TextAnnotation;

    const ORIGIN: Point = Point::new(20.0, 100.0);

    fn setup() -> (InteractionController, EditorDocument) {
        let mut controller = InteractionController::new();
        controller.set_container_origin(Some(ORIGIN));
        (controller, EditorDocument::with_container(Size::new(800.0, 600.0)))
    }

    fn client(x: f64, y: f64) -> Point {
        Point::new(ORIGIN.x + x, ORIGIN.y + y)
    }

    fn body(id: AnnotationId) -> PointerTarget {
        PointerTarget::Annotation { id, part: AnnotationPart::Body }
    }

    #[test]
    fn test_canvas_click_creates_and_focuses() {
        let (mut controller, mut doc) = setup();
        let outcome = controller.begin(&mut doc, 1, PointerTarget::Canvas, client(50.0, 60.0));
        let PointerOutcome::Created(id) = outcome else {
            panic!("expected Created, got {:?}", outcome);
        };
        assert_eq!(doc.focused(), Some(id));
        assert_eq!(doc.get(id).unwrap().position(), Point::new(50.0, 60.0));
        assert_eq!(controller.gesture(1), GestureState::Idle);
    }

    #[test]
    fn test_drag_keeps_pointer_offset() {
        let (mut controller, mut doc) = setup();
        let id = doc.create(Point::new(300.0, 200.0));
        doc.clear_focus();

        let outcome = controller.begin(&mut doc, 1, body(id), client(310.0, 215.0));
        assert_eq!(outcome, PointerOutcome::DragStarted(id));
        assert_eq!(doc.focused(), Some(id));
        assert_eq!(controller.gesture(1), GestureState::Dragging(id));

        assert!(controller.update(&mut doc, 1, client(510.0, 265.0)));
        assert_eq!(doc.get(id).unwrap().position(), Point::new(500.0, 250.0));

        assert_eq!(controller.end(1), Some(id));
        assert_eq!(controller.gesture(1), GestureState::Idle);
        assert_eq!(doc.get(id).unwrap().position(), Point::new(500.0, 250.0));
    }

    #[test]
    fn test_drag_shows_and_clears_guides() {
        let (mut controller, mut doc) = setup();
        doc.create(Point::new(100.0, 10.0));
        let id = doc.create(Point::new(500.0, 300.0));

        controller.begin(&mut doc, 1, body(id), client(500.0, 300.0));
        controller.update(&mut doc, 1, client(103.0, 300.0));
        assert_eq!(doc.get(id).unwrap().x, 100.0);
        assert_eq!(controller.guides(), &[100.0]);

        controller.update(&mut doc, 1, client(30.0, 300.0));
        assert!(controller.guides().is_empty());

        controller.update(&mut doc, 1, client(102.0, 300.0));
        assert!(!controller.guides().is_empty());
        controller.end(1);
        assert!(controller.guides().is_empty());
    }

    #[test]
    fn test_drag_clamped_to_container() {
        let (mut controller, mut doc) = setup();
        let id = doc.create(Point::new(10.0, 10.0));
        controller.begin(&mut doc, 1, body(id), client(10.0, 10.0));
        controller.update(&mut doc, 1, client(-500.0, 5000.0));
        let ann = doc.get(id).unwrap();
        assert_eq!(ann.position(), Point::new(0.0, 520.0));
    }

    #[test]
    fn test_text_surface_focuses_without_drag() {
        let (mut controller, mut doc) = setup();
        let a = doc.create(Point::new(10.0, 10.0));
        let b = doc.create(Point::new(300.0, 10.0));
        assert_eq!(doc.focused(), Some(b));

        let target = PointerTarget::Annotation { id: a, part: AnnotationPart::TextSurface };
        assert_eq!(controller.begin(&mut doc, 1, target, client(20.0, 20.0)), PointerOutcome::Focused(a));
        assert_eq!(doc.focused(), Some(a));
        assert!(!controller.update(&mut doc, 1, client(200.0, 200.0)));
        assert_eq!(doc.get(a).unwrap().position(), Point::new(10.0, 10.0));
    }

    #[test]
    fn test_delete_control_removes() {
        let (mut controller, mut doc) = setup();
        let id = doc.create(Point::new(10.0, 10.0));
        let target = PointerTarget::Annotation { id, part: AnnotationPart::DeleteControl };
        assert_eq!(controller.begin(&mut doc, 1, target, client(0.0, 0.0)), PointerOutcome::Removed(id));
        assert!(doc.is_empty());
        assert_eq!(doc.focused(), None);
    }

    #[test]
    fn test_resize_clamped_to_bounds_and_container() {
        let (mut controller, mut doc) = setup();
        let id = doc.create(Point::new(600.0, 100.0));
        let handle = PointerTarget::Annotation { id, part: AnnotationPart::ResizeHandle };

        let start = client(760.0, 180.0);
        assert_eq!(controller.begin(&mut doc, 1, handle, start), PointerOutcome::ResizeStarted(id));

        controller.update(&mut doc, 1, client(800.0, 220.0));
        let ann = doc.get(id).unwrap();
        assert_eq!((ann.width, ann.height), (200.0, 120.0));

        // Remaining space to the right is 200px, so width stops there.
        controller.update(&mut doc, 1, client(1500.0, 2000.0));
        let ann = doc.get(id).unwrap();
        assert_eq!((ann.width, ann.height), (200.0, 500.0));

        controller.update(&mut doc, 1, client(0.0, 0.0));
        let ann = doc.get(id).unwrap();
        assert_eq!((ann.width, ann.height), (MIN_WIDTH, MIN_HEIGHT));
        assert_eq!(ann.position(), Point::new(600.0, 100.0));

        assert_eq!(controller.end(1), Some(id));
    }

    #[test]
    fn test_resize_capped_by_max_size() {
        let (mut controller, mut doc) = setup();
        let id = doc.create(Point::new(0.0, 0.0));
        let handle = PointerTarget::Annotation { id, part: AnnotationPart::ResizeHandle };
        controller.begin(&mut doc, 1, handle, client(160.0, 80.0));
        controller.update(&mut doc, 1, client(790.0, 590.0));
        let ann = doc.get(id).unwrap();
        assert_eq!((ann.width, ann.height), (MAX_WIDTH, 590.0));
    }

    #[test]
    fn test_missing_container_is_noop() {
        let mut controller = InteractionController::new();
        let mut doc = EditorDocument::new();
        let outcome = controller.begin(&mut doc, 1, PointerTarget::Canvas, Point::new(10.0, 10.0));
        assert_eq!(outcome, PointerOutcome::Ignored);
        assert!(doc.is_empty());

        let mut doc = EditorDocument::new();
        let id = doc.create(Point::new(10.0, 10.0));
        controller.set_container_origin(Some(Point::ZERO));
        controller.begin(&mut doc, 1, body(id), Point::new(10.0, 10.0));
        controller.set_container_origin(None);
        assert!(!controller.update(&mut doc, 1, Point::new(300.0, 300.0)));
        assert_eq!(doc.get(id).unwrap().position(), Point::new(10.0, 10.0));
    }

    #[test]
    fn test_unknown_annotation_ignored() {
        let (mut controller, mut doc) = setup();
        let ghost = TextAnnotation::new(Point::ZERO).id();
        assert_eq!(controller.begin(&mut doc, 1, body(ghost), client(0.0, 0.0)), PointerOutcome::Ignored);
        assert_eq!(controller.end(1), None);
    }

    #[test]
    fn test_drag_of_removed_annotation_ends_gesture() {
        let (mut controller, mut doc) = setup();
        let id = doc.create(Point::new(10.0, 10.0));
        controller.begin(&mut doc, 1, body(id), client(10.0, 10.0));
        doc.reset();
        assert!(!controller.update(&mut doc, 1, client(50.0, 50.0)));
        assert_eq!(controller.gesture(1), GestureState::Idle);
    }

    #[test]
    fn test_independent_pointers() {
        let (mut controller, mut doc) = setup();
        let a = doc.create(Point::new(10.0, 10.0));
        let b = doc.create(Point::new(400.0, 300.0));
        controller.begin(&mut doc, 1, body(a), client(10.0, 10.0));
        controller.begin(&mut doc, 2, body(b), client(400.0, 300.0));
        assert!(controller.is_busy(a) && controller.is_busy(b));

        controller.update(&mut doc, 2, client(420.0, 350.0));
        assert_eq!(doc.get(a).unwrap().position(), Point::new(10.0, 10.0));
        assert_eq!(doc.get(b).unwrap().position(), Point::new(420.0, 350.0));
    }
}
