/// Constraint-box layout for the sticker node tree.
///
/// Blocks stack vertically inside the forced capture width; rows split the
/// content width evenly between their children. All coordinates are in
/// display pixels; the rasterizer applies the export scale.
use crate::assets::EmbeddableImage;
use crate::node::{Color, Direction, NodeKind, RenderableNode};

/// Base glyph cell: 5x7 pixels plus one column of tracking.
pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
pub const GLYPH_ADVANCE: u32 = 6;
/// Line height per text scale unit (glyph height plus leading)
pub const LINE_HEIGHT: u32 = 8;
/// Display height of the star rating row
pub const STAR_ROW_HEIGHT: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// What a laid-out box paints as.
#[derive(Debug, Clone)]
pub enum LayoutItem {
    Fill(Color),
    Text {
        /// Pre-wrapped content, lines joined with `\n`
        content: String,
        scale: u32,
        color: Color,
    },
    /// `None` when the image never resolved; painted as a placeholder box
    Image(Option<EmbeddableImage>),
    Stars {
        rating: f32,
    },
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub rect: Rect,
    pub item: LayoutItem,
}

/// Lay the tree out under a fixed width constraint, returning boxes in paint
/// order (parents before children).
pub fn layout_tree(root: &RenderableNode, width: u32) -> Vec<LayoutNode> {
    let mut out = Vec::new();
    layout_into(root, 0, 0, width, &mut out);
    out
}

/// Natural content height of the tree under a fixed width constraint.
pub fn content_height(root: &RenderableNode, width: u32) -> u32 {
    let mut scratch = Vec::new();
    layout_into(root, 0, 0, width, &mut scratch)
}

fn layout_into(
    node: &RenderableNode,
    x: i32,
    y: i32,
    width: u32,
    out: &mut Vec<LayoutNode>,
) -> u32 {
    let padding = node.padding;
    let content_x = x + padding as i32;
    let content_y = y + padding as i32;
    let content_w = width.saturating_sub(padding * 2);

    let content_h = match &node.kind {
        NodeKind::Container {
            direction,
            children,
            background,
        } => {
            // Reserve the background slot now; its height is known only after
            // the children are laid out.
            let background_index = out.len();
            let content_h = match direction {
                Direction::Column => {
                    let mut dy = 0u32;
                    for child in children {
                        dy += layout_into(child, content_x, content_y + dy as i32, content_w, out);
                    }
                    dy
                }
                Direction::Row => {
                    let count = children.len().max(1) as u32;
                    let slot_w = content_w / count;
                    let mut tallest = 0u32;
                    for (i, child) in children.iter().enumerate() {
                        let slot_x = content_x + (i as u32 * slot_w) as i32;
                        let h = layout_into(child, slot_x, content_y, slot_w, out);
                        tallest = tallest.max(h);
                    }
                    tallest
                }
            };
            if let Some(color) = background {
                out.insert(
                    background_index,
                    LayoutNode {
                        rect: Rect {
                            x,
                            y,
                            width,
                            height: content_h + padding * 2,
                        },
                        item: LayoutItem::Fill(*color),
                    },
                );
            }
            content_h
        }
        NodeKind::Text {
            content,
            scale,
            color,
        } => {
            let scale = (*scale).max(1);
            let wrapped = wrap_text(content, content_w, scale);
            let lines = wrapped.lines().count().max(1) as u32;
            let height = lines * LINE_HEIGHT * scale;
            out.push(LayoutNode {
                rect: Rect {
                    x: content_x,
                    y: content_y,
                    width: content_w,
                    height,
                },
                item: LayoutItem::Text {
                    content: wrapped,
                    scale,
                    color: *color,
                },
            });
            height
        }
        NodeKind::Image { source, height } => {
            out.push(LayoutNode {
                rect: Rect {
                    x: content_x,
                    y: content_y,
                    width: content_w,
                    height: *height,
                },
                item: LayoutItem::Image(match source {
                    crate::node::ImageSource::Embedded(image) => Some(image.clone()),
                    _ => None,
                }),
            });
            *height
        }
        NodeKind::Qr { size, .. } => {
            // Unconverted QR nodes occupy their box but paint nothing; the
            // pre-conversion pass normally replaces them before layout.
            *size
        }
        NodeKind::Stars { rating } => {
            out.push(LayoutNode {
                rect: Rect {
                    x: content_x,
                    y: content_y,
                    width: content_w,
                    height: STAR_ROW_HEIGHT,
                },
                item: LayoutItem::Stars { rating: *rating },
            });
            STAR_ROW_HEIGHT
        }
        NodeKind::Spacer { height } => *height,
    };

    content_h + padding * 2
}

/// Greedy word wrap by estimated glyph advance, mirroring how the on-screen
/// template breaks lines. Words longer than a line are emitted unbroken.
fn wrap_text(text: &str, width: u32, scale: u32) -> String {
    let chars_per_line = ((width / (GLYPH_ADVANCE * scale)) as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > chars_per_line {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ImageSource, BLACK, WHITE};

    fn text(content: &str, scale: u32) -> RenderableNode {
        RenderableNode::new(NodeKind::Text {
            content: content.into(),
            scale,
            color: BLACK,
        })
    }

    #[test]
    fn column_stacks_children_vertically() {
        let tree = RenderableNode::new(NodeKind::Container {
            direction: Direction::Column,
            children: vec![text("one", 1), text("two", 1)],
            background: Some(WHITE),
        });
        let nodes = layout_tree(&tree, 200);
        assert_eq!(nodes.len(), 3);
        // Background first, full height
        assert!(matches!(nodes[0].item, LayoutItem::Fill(_)));
        assert_eq!(nodes[0].rect.height, 2 * LINE_HEIGHT);
        // Second text sits below the first
        assert_eq!(nodes[2].rect.y, nodes[1].rect.y + LINE_HEIGHT as i32);
    }

    #[test]
    fn row_splits_width_evenly() {
        let tree = RenderableNode::new(NodeKind::Container {
            direction: Direction::Row,
            children: vec![
                RenderableNode::new(NodeKind::Image {
                    source: ImageSource::Remote("https://a/1.png".into()),
                    height: 40,
                }),
                RenderableNode::new(NodeKind::Image {
                    source: ImageSource::Remote("https://a/2.png".into()),
                    height: 40,
                }),
            ],
            background: None,
        });
        let nodes = layout_tree(&tree, 200);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].rect.width, 100);
        assert_eq!(nodes[1].rect.x, 100);
    }

    #[test]
    fn text_wraps_to_content_width() {
        let node = text("alpha beta gamma delta", 1);
        // 10 glyph cells per line at scale 1
        let nodes = layout_tree(&node, 60);
        match &nodes[0].item {
            LayoutItem::Text { content, .. } => {
                assert!(content.lines().count() > 1);
                for line in content.lines() {
                    assert!(line.len() <= 10, "line too long: {}", line);
                }
            }
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn padding_insets_content() {
        let tree = RenderableNode::new(NodeKind::Container {
            direction: Direction::Column,
            children: vec![text("pad", 1)],
            background: None,
        })
        .with_padding(8);
        let nodes = layout_tree(&tree, 100);
        assert_eq!(nodes[0].rect.x, 8);
        assert_eq!(nodes[0].rect.y, 8);
        assert_eq!(nodes[0].rect.width, 84);
        assert_eq!(content_height(&tree, 100), LINE_HEIGHT + 16);
    }

    #[test]
    fn zero_width_still_terminates() {
        let nodes = layout_tree(&text("x", 1), 0);
        assert_eq!(nodes.len(), 1);
    }
}
