/// Paint command list generated from laid-out boxes.
use crate::assets::EmbeddableImage;
use crate::node::Color;
use crate::rendering::layout::{LayoutItem, LayoutNode, Rect};

/// Unresolved images paint as a neutral placeholder instead of dropping out
/// of the composition entirely.
pub const PLACEHOLDER_FILL: Color = [232, 232, 232, 255];
pub const STAR_FILL: Color = [240, 180, 0, 255];
pub const STAR_EMPTY: Color = [205, 205, 205, 255];

#[derive(Debug, Clone)]
pub enum PaintCommand {
    SolidRect {
        rect: Rect,
        color: Color,
    },
    Blit {
        rect: Rect,
        image: EmbeddableImage,
    },
    Glyphs {
        x: i32,
        y: i32,
        text: String,
        scale: u32,
        color: Color,
    },
    /// Five-star rating row filled proportionally to `rating`
    Stars {
        rect: Rect,
        rating: f32,
    },
}

pub fn build_commands(nodes: &[LayoutNode]) -> Vec<PaintCommand> {
    let mut commands = Vec::with_capacity(nodes.len());
    for node in nodes {
        match &node.item {
            LayoutItem::Fill(color) => commands.push(PaintCommand::SolidRect {
                rect: node.rect,
                color: *color,
            }),
            LayoutItem::Text {
                content,
                scale,
                color,
            } => commands.push(PaintCommand::Glyphs {
                x: node.rect.x,
                y: node.rect.y,
                text: content.clone(),
                scale: *scale,
                color: *color,
            }),
            LayoutItem::Image(Some(image)) => commands.push(PaintCommand::Blit {
                rect: node.rect,
                image: image.clone(),
            }),
            LayoutItem::Image(None) => commands.push(PaintCommand::SolidRect {
                rect: node.rect,
                color: PLACEHOLDER_FILL,
            }),
            LayoutItem::Stars { rating } => commands.push(PaintCommand::Stars {
                rect: node.rect,
                rating: rating.clamp(0.0, 5.0),
            }),
        }
    }
    commands
}
