//! Renderable node tree consumed by the capture pipeline.
//!
//! The tree is owned by the caller; the exporter only ever works on an
//! isolated copy produced by [`RenderableNode::clone_for_capture`], so the
//! live, user-visible tree is never mutated by an export.

use crate::assets::EmbeddableImage;

/// Where an image node gets its pixels from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Remote URL; rewritten through the asset proxy before capture when it
    /// is not same-origin (a direct cross-origin load would not rasterize)
    Remote(String),
    /// Inline `data:` URI payload; decoded locally, no network round-trip
    DataUri(String),
    /// Decoded raw pixels, ready to blit
    Embedded(EmbeddableImage),
}

impl ImageSource {
    /// The remote URL, if this source still needs a network fetch.
    pub fn remote_url(&self) -> Option<&str> {
        match self {
            ImageSource::Remote(url) => Some(url),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ImageSource::Embedded(_))
    }
}

/// Stacking direction of a container node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Column,
    Row,
}

/// Screen-only affordances stripped from the capture copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decoration {
    /// Border width in display pixels
    pub border_width: u32,
    /// Drop shadow flag
    pub shadow: bool,
    /// Focus outline flag
    pub outline: bool,
}

impl Decoration {
    pub fn is_plain(&self) -> bool {
        self.border_width == 0 && !self.shadow && !self.outline
    }
}

/// RGBA color, straight alpha
pub type Color = [u8; 4];

pub const BLACK: Color = [0, 0, 0, 255];
pub const WHITE: Color = [255, 255, 255, 255];

/// One visual node of the sticker template.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Container {
        direction: Direction,
        children: Vec<RenderableNode>,
        background: Option<Color>,
    },
    Text {
        content: String,
        /// Integer glyph scale relative to the base 5x7 face
        scale: u32,
        color: Color,
    },
    Image {
        source: ImageSource,
        /// Height hint in display pixels; the width fills the content box
        height: u32,
    },
    /// Call-to-action QR badge; pre-converted to an [`ImageSource::Embedded`]
    /// raster before staging so capture never waits on it
    Qr {
        payload: String,
        /// Edge length in display pixels
        size: u32,
    },
    /// Star rating row, filled proportionally to `rating` out of five
    Stars {
        rating: f32,
    },
    Spacer {
        height: u32,
    },
}

#[derive(Debug, Clone)]
pub struct RenderableNode {
    pub kind: NodeKind,
    pub decoration: Decoration,
    /// Measurement/debug overlays render on screen but never in a capture
    pub debug_overlay: bool,
    /// Inner padding in display pixels
    pub padding: u32,
}

impl RenderableNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            decoration: Decoration::default(),
            debug_overlay: false,
            padding: 0,
        }
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_decoration(mut self, decoration: Decoration) -> Self {
        self.decoration = decoration;
        self
    }

    pub fn overlay(mut self) -> Self {
        self.debug_overlay = true;
        self
    }

    /// Produce the isolated copy used for offscreen staging: decorations are
    /// stripped (they are screen affordances, not printable content) and
    /// debug overlay nodes are dropped from the subtree entirely.
    pub fn clone_for_capture(&self) -> RenderableNode {
        let kind = match &self.kind {
            NodeKind::Container {
                direction,
                children,
                background,
            } => NodeKind::Container {
                direction: *direction,
                children: children
                    .iter()
                    .filter(|c| !c.debug_overlay)
                    .map(|c| c.clone_for_capture())
                    .collect(),
                background: *background,
            },
            other => other.clone(),
        };
        RenderableNode {
            kind,
            decoration: Decoration::default(),
            debug_overlay: false,
            padding: self.padding,
        }
    }

    /// Depth-first traversal over the whole subtree, self included.
    pub fn for_each_node_mut(&mut self, f: &mut dyn FnMut(&mut RenderableNode)) {
        f(self);
        if let NodeKind::Container { children, .. } = &mut self.kind {
            for child in children {
                child.for_each_node_mut(f);
            }
        }
    }

    /// Immutable counterpart of [`Self::for_each_node_mut`].
    pub fn for_each_node(&self, f: &mut dyn FnMut(&RenderableNode)) {
        f(self);
        if let NodeKind::Container { children, .. } = &self.kind {
            for child in children {
                child.for_each_node(f);
            }
        }
    }

    /// Count nodes matching a predicate; handy for tests and logging.
    pub fn count_nodes(&self, pred: &dyn Fn(&RenderableNode) -> bool) -> usize {
        let mut n = 0;
        self.for_each_node(&mut |node| {
            if pred(node) {
                n += 1;
            }
        });
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> RenderableNode {
        RenderableNode::new(NodeKind::Container {
            direction: Direction::Column,
            children: vec![
                RenderableNode::new(NodeKind::Text {
                    content: "Hello".into(),
                    scale: 1,
                    color: BLACK,
                })
                .with_decoration(Decoration {
                    border_width: 2,
                    shadow: true,
                    outline: false,
                }),
                RenderableNode::new(NodeKind::Text {
                    content: "420x840".into(),
                    scale: 1,
                    color: BLACK,
                })
                .overlay(),
            ],
            background: Some(WHITE),
        })
    }

    #[test]
    fn capture_clone_strips_decorations() {
        let copy = sample_tree().clone_for_capture();
        copy.for_each_node(&mut |node| {
            assert!(node.decoration.is_plain());
        });
    }

    #[test]
    fn capture_clone_drops_overlays() {
        let tree = sample_tree();
        assert_eq!(tree.count_nodes(&|n| n.debug_overlay), 1);
        let copy = tree.clone_for_capture();
        assert_eq!(copy.count_nodes(&|n| n.debug_overlay), 0);
        // Only the overlay was dropped
        assert_eq!(copy.count_nodes(&|_| true), tree.count_nodes(&|_| true) - 1);
    }

    #[test]
    fn traversal_visits_every_node() {
        let tree = sample_tree();
        let mut visited = 0;
        tree.for_each_node(&mut |_| visited += 1);
        assert_eq!(visited, 3);
    }
}
