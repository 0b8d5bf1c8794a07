//! Horizontal alignment snapping for dragged annotations.
//!
//! Only the x axis snaps. Each sibling contributes its left edge, right edge
//! and horizontal center as targets, followed by the container's center.
//! The dragged field may align its left edge, right edge or center to any
//! target; the closest hypothesis within the threshold wins.

use crate::annotation::{TextAnnotation, clamp_axis};
use kurbo::{Point, Size};

/// Distance threshold for alignment snapping (in pixels).
pub const SNAP_THRESHOLD: f64 = 5.0;

/// Which feature of a sibling (or the container) a target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapTargetKind {
    /// Left edge of a sibling.
    LeftEdge,
    /// Right edge of a sibling.
    RightEdge,
    /// Horizontal center of a sibling.
    Center,
    /// Horizontal center of the container.
    ContainerCenter,
}

/// A vertical line the dragged field may align to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    /// X coordinate of the line in container space.
    pub x: f64,
    pub kind: SnapTargetKind,
}

/// Which part of the dragged field is aligned to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    LeftEdge,
    RightEdge,
    Center,
}

impl Alignment {
    /// Evaluation order; earlier hypotheses win ties.
    const ORDER: [Alignment; 3] = [Alignment::LeftEdge, Alignment::RightEdge, Alignment::Center];

    /// Offset of the aligned feature from the field's left edge.
    fn offset(self, width: f64) -> f64 {
        match self {
            Alignment::LeftEdge => 0.0,
            Alignment::RightEdge => width,
            Alignment::Center => width / 2.0,
        }
    }
}

/// Result of a snap operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    /// The resolved top-left position, snapped and clamped.
    pub position: Point,
    /// Guide x-coordinates to render (empty if unsnapped).
    pub guides: Vec<f64>,
    /// The matched alignment, if any.
    pub alignment: Option<(Alignment, SnapTarget)>,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(position: Point) -> Self {
        Self {
            position,
            guides: Vec::new(),
            alignment: None,
        }
    }

    /// Check if snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.alignment.is_some()
    }
}

/// Collect snap targets from every sibling, in document order, then the
/// container's center.
pub fn collect_targets<'a>(
    siblings: impl IntoIterator<Item = &'a TextAnnotation>,
    container: Size,
) -> Vec<SnapTarget> {
    let mut targets = Vec::new();
    for sibling in siblings {
        targets.push(SnapTarget { x: sibling.x, kind: SnapTargetKind::LeftEdge });
        targets.push(SnapTarget { x: sibling.x + sibling.width, kind: SnapTargetKind::RightEdge });
        targets.push(SnapTarget { x: sibling.center_x(), kind: SnapTargetKind::Center });
    }
    targets.push(SnapTarget {
        x: container.width / 2.0,
        kind: SnapTargetKind::ContainerCenter,
    });
    targets
}

/// Find the best horizontal alignment for a field of `width` at raw `x`.
///
/// Returns the snapped x and the matched target, or `None` if nothing is
/// within `threshold`.
pub fn snap_x(
    x: f64,
    width: f64,
    targets: &[SnapTarget],
    threshold: f64,
) -> Option<(f64, Alignment, SnapTarget)> {
    let mut best: Option<(f64, Alignment, SnapTarget)> = None;
    let mut best_dist = f64::INFINITY;

    for target in targets {
        for alignment in Alignment::ORDER {
            let offset = alignment.offset(width);
            let dist = (x + offset - target.x).abs();
            // Strictly smaller: the first hypothesis found wins on ties.
            if dist <= threshold && dist < best_dist {
                best_dist = dist;
                best = Some((target.x - offset, alignment, *target));
            }
        }
    }

    best
}

/// Resolve the position of a dragged field.
///
/// `proposed` is the raw top-left position. The x coordinate is snapped
/// against `targets`; both coordinates are then clamped to the container.
pub fn resolve_position(
    proposed: Point,
    size: Size,
    targets: &[SnapTarget],
    container: Size,
    threshold: f64,
) -> SnapResult {
    let clamp = |p: Point| {
        Point::new(
            clamp_axis(p.x, container.width - size.width),
            clamp_axis(p.y, container.height - size.height),
        )
    };

    match snap_x(proposed.x, size.width, targets, threshold) {
        Some((x, alignment, target)) => {
            let position = clamp(Point::new(x, proposed.y));
            // A target the field cannot reach inside the container is no snap.
            if position.x != x {
                return SnapResult::none(clamp(proposed));
            }
            SnapResult {
                position,
                guides: vec![target.x],
                alignment: Some((alignment, target)),
            }
        }
        None => SnapResult::none(clamp(proposed)),
    }
}
