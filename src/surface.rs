//! Live rendering surface with a single offscreen staging slot.
//!
//! Mounted nodes are the user-visible tree(s), owned by the caller. The
//! staging slot holds the transient, exclusively-owned capture copy: it
//! participates in layout exactly like a mounted node but is never shown, and
//! it must never be left occupied after an export completes or fails.

use crate::error::{Error, Result};
use crate::node::RenderableNode;

/// Handle to a node mounted on a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A capture copy parked offscreen, forced to an exact constraint box.
#[derive(Debug, Clone)]
pub struct Staged {
    pub root: RenderableNode,
    /// Forced layout width in display pixels
    pub width: u32,
    /// Forced box height in display pixels; content overflow is clipped
    pub height: u32,
}

#[derive(Default)]
pub struct Surface {
    mounted: Vec<Option<RenderableNode>>,
    staging: Option<Staged>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node tree to the live surface.
    pub fn mount(&mut self, node: RenderableNode) -> NodeId {
        self.mounted.push(Some(node));
        NodeId(self.mounted.len() - 1)
    }

    /// Detach a node tree, returning it to the caller.
    pub fn unmount(&mut self, id: NodeId) -> Option<RenderableNode> {
        self.mounted.get_mut(id.0).and_then(|slot| slot.take())
    }

    pub fn node(&self, id: NodeId) -> Option<&RenderableNode> {
        self.mounted.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of staged capture copies currently attached (0 or 1).
    /// Exports must leave this at 0 on every exit path.
    pub fn staged_count(&self) -> usize {
        usize::from(self.staging.is_some())
    }

    pub(crate) fn stage(&mut self, root: RenderableNode, width: u32, height: u32) -> Result<()> {
        if self.staging.is_some() {
            return Err(Error::Capture("offscreen staging slot is occupied".into()));
        }
        self.staging = Some(Staged {
            root,
            width,
            height,
        });
        Ok(())
    }

    pub(crate) fn staged(&self) -> Option<&Staged> {
        self.staging.as_ref()
    }

    pub(crate) fn staged_mut(&mut self) -> Option<&mut Staged> {
        self.staging.as_mut()
    }

    pub(crate) fn unstage(&mut self) {
        self.staging = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, BLACK};

    fn text(content: &str) -> RenderableNode {
        RenderableNode::new(NodeKind::Text {
            content: content.into(),
            scale: 1,
            color: BLACK,
        })
    }

    #[test]
    fn mount_and_unmount() {
        let mut surface = Surface::new();
        let id = surface.mount(text("hello"));
        assert!(surface.is_attached(id));
        assert!(surface.unmount(id).is_some());
        assert!(!surface.is_attached(id));
        assert!(surface.unmount(id).is_none());
    }

    #[test]
    fn staging_slot_is_exclusive() {
        let mut surface = Surface::new();
        assert_eq!(surface.staged_count(), 0);
        surface.stage(text("a"), 100, 200).unwrap();
        assert_eq!(surface.staged_count(), 1);

        let err = surface.stage(text("b"), 100, 200).unwrap_err();
        assert!(matches!(err, Error::Capture(_)));

        surface.unstage();
        assert_eq!(surface.staged_count(), 0);
        surface.stage(text("c"), 100, 200).unwrap();
        assert_eq!(surface.staged_count(), 1);
    }
}
