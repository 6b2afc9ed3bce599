//! Sticker template builder.
//!
//! Translates a business record into the renderable node tree the exporter
//! captures: hero image, name and rating header, photo strip, review cards,
//! call-to-action QR badge, payment row, footer. Purely presentational glue;
//! the layout numbers below are the sticker design, in display pixels at the
//! default 400px capture width.

use crate::node::{
    Color, Decoration, Direction, ImageSource, NodeKind, RenderableNode, BLACK, WHITE,
};
use crate::BusinessRecord;

const HERO_HEIGHT: u32 = 220;
const STRIP_HEIGHT: u32 = 90;
const QR_SIZE: u32 = 120;
const MAX_STRIP_PHOTOS: usize = 3;
const MAX_REVIEWS: usize = 2;
const MAX_REVIEW_CHARS: usize = 140;

const INK_MUTED: Color = [90, 90, 90, 255];

fn column(children: Vec<RenderableNode>, background: Option<Color>) -> RenderableNode {
    RenderableNode::new(NodeKind::Container {
        direction: Direction::Column,
        children,
        background,
    })
}

fn row(children: Vec<RenderableNode>) -> RenderableNode {
    RenderableNode::new(NodeKind::Container {
        direction: Direction::Row,
        children,
        background: None,
    })
}

fn text(content: impl Into<String>, scale: u32, color: Color) -> RenderableNode {
    RenderableNode::new(NodeKind::Text {
        content: content.into(),
        scale,
        color,
    })
}

fn remote_image(url: &str, height: u32) -> RenderableNode {
    RenderableNode::new(NodeKind::Image {
        source: ImageSource::Remote(url.to_string()),
        height,
    })
}

fn spacer(height: u32) -> RenderableNode {
    RenderableNode::new(NodeKind::Spacer { height })
}

/// Build the full sticker tree for one business. `site_url` is the published
/// site the QR badge points at.
pub fn build_sticker_tree(record: &BusinessRecord, site_url: &str) -> RenderableNode {
    let mut sections: Vec<RenderableNode> = Vec::new();

    // Hero
    if let Some(hero) = record.photo_urls.first() {
        sections.push(remote_image(hero, HERO_HEIGHT));
    }
    sections.push(spacer(10));

    // Header: name, stars, review count
    sections.push(text(record.name.clone(), 2, BLACK));
    sections.push(RenderableNode::new(NodeKind::Stars {
        rating: record.rating,
    }));
    if record.review_count > 0 {
        sections.push(text(
            format!("{:.1} - {} reviews", record.rating, record.review_count),
            1,
            INK_MUTED,
        ));
    }
    if !record.address.is_empty() {
        sections.push(text(record.address.clone(), 1, INK_MUTED));
    }
    sections.push(spacer(8));

    // Photo strip
    let strip: Vec<RenderableNode> = record
        .photo_urls
        .iter()
        .skip(1)
        .take(MAX_STRIP_PHOTOS)
        .map(|url| remote_image(url, STRIP_HEIGHT))
        .collect();
    if !strip.is_empty() {
        sections.push(row(strip));
        sections.push(spacer(8));
    }

    // Review cards carry on-screen borders and shadows; the capture pass
    // strips them.
    for review in record.reviews.iter().take(MAX_REVIEWS) {
        let mut body = review.text.clone();
        if body.chars().count() > MAX_REVIEW_CHARS {
            body = body.chars().take(MAX_REVIEW_CHARS).collect();
            body.push_str("...");
        }
        sections.push(
            column(
                vec![
                    text(format!("{} - {:.1}", review.author, review.rating), 1, BLACK),
                    text(body, 1, INK_MUTED),
                ],
                Some([248, 248, 248, 255]),
            )
            .with_padding(6)
            .with_decoration(Decoration {
                border_width: 1,
                shadow: true,
                outline: false,
            }),
        );
        sections.push(spacer(6));
    }

    // Call to action
    sections.push(text("Scan to visit our site", 1, BLACK));
    sections.push(RenderableNode::new(NodeKind::Qr {
        payload: site_url.to_string(),
        size: QR_SIZE,
    }));

    // Payment row + footer
    if !record.payment_methods.is_empty() {
        sections.push(text(
            format!("We accept: {}", record.payment_methods.join(", ")),
            1,
            INK_MUTED,
        ));
    }
    sections.push(spacer(6));
    sections.push(text(site_url.to_string(), 1, INK_MUTED));

    // On-screen size badge; never part of a capture
    sections.push(text("400 x 800", 1, INK_MUTED).overlay());

    column(sections, Some(WHITE)).with_padding(12)
}
