// ABOUTME: Geometry mapping from rendered nodes to slide-relative rectangles
// ABOUTME: Used to place PDF link regions; clipped nodes yield no region at all

use crate::dom::{ElementNode, Rect};
use log::debug;

/// Rectangle of `descendant` relative to the top-left corner of `container`.
///
/// Returns `None` when either node has no layout or when any edge of the
/// descendant lies outside the container. Partially visible regions are
/// dropped, never clamped.
pub fn bounding_box(descendant: &ElementNode, container: &ElementNode) -> Option<Rect> {
    let rect = descendant.layout?;
    let bounds = container.layout?;
    relative_box(&rect, &bounds)
}

/// Same as [`bounding_box`] for bare rectangles in a shared coordinate space
pub fn relative_box(rect: &Rect, container: &Rect) -> Option<Rect> {
    if rect.x < container.x
        || rect.y < container.y
        || rect.right() > container.right()
        || rect.bottom() > container.bottom()
    {
        debug!(
            "Dropping region {:?}: outside container {:?}",
            rect, container
        );
        return None;
    }

    Some(Rect::new(
        rect.x - container.x,
        rect.y - container.y,
        rect.width,
        rect.height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> ElementNode {
        ElementNode::new("div").with_layout(Rect::new(0.0, 600.0, 800.0, 500.0))
    }

    #[test]
    fn inside_rect_is_relative_to_container() {
        let link = ElementNode::new("a").with_layout(Rect::new(100.0, 650.0, 200.0, 40.0));
        let bbox = bounding_box(&link, &container()).unwrap();

        assert_eq!(bbox, Rect::new(100.0, 50.0, 200.0, 40.0));
        assert!(bbox.x >= 0.0 && bbox.y >= 0.0);
        assert!(bbox.right() <= 800.0);
    }

    #[test]
    fn rect_touching_edges_is_kept() {
        let link = ElementNode::new("a").with_layout(Rect::new(0.0, 600.0, 800.0, 500.0));
        assert_eq!(
            bounding_box(&link, &container()),
            Some(Rect::new(0.0, 0.0, 800.0, 500.0))
        );
    }

    #[test]
    fn overlapping_right_edge_is_dropped() {
        let link = ElementNode::new("a").with_layout(Rect::new(750.0, 650.0, 100.0, 40.0));
        assert_eq!(bounding_box(&link, &container()), None);
    }

    #[test]
    fn overlapping_top_edge_is_dropped() {
        let link = ElementNode::new("a").with_layout(Rect::new(10.0, 590.0, 100.0, 40.0));
        assert_eq!(bounding_box(&link, &container()), None);
    }

    #[test]
    fn nodes_without_layout_have_no_box() {
        let link = ElementNode::new("a");
        assert_eq!(bounding_box(&link, &container()), None);
    }
}
