//! Compound monsters: an arena of parts rooted at the silhouette body.

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::extrude::ExtrusionHandle;

new_key_type! {
    pub struct PartId;
}

/// Where a decorative part sits on the monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecorationSlot {
    Eyes,
    Mouth,
    Horns,
}

#[derive(Debug, Clone)]
pub enum PartKind {
    /// Geometry extruded from a silhouette; follows depth changes.
    Extruded(ExtrusionHandle),
    /// Asset chosen from the customization picker; never extruded.
    Decoration { slot: DecorationSlot, asset: String },
    /// Pure grouping node.
    Group,
}

#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub kind: PartKind,
    parent: Option<PartId>,
    children: Vec<PartId>,
}

impl Part {
    pub fn new(name: impl Into<String>, kind: PartKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<PartId> {
        self.parent
    }

    pub fn children(&self) -> &[PartId] {
        &self.children
    }

    pub fn handle(&self) -> Option<&ExtrusionHandle> {
        match &self.kind {
            PartKind::Extruded(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Hierarchy of monster parts. The root is created with the tree and can never
/// be detached.
#[derive(Debug, Clone)]
pub struct PartTree {
    parts: SlotMap<PartId, Part>,
    root: PartId,
}

impl PartTree {
    pub fn new(root: Part) -> Self {
        let mut parts = SlotMap::with_key();
        let root = parts.insert(root);
        Self { parts, root }
    }

    /// Tree whose root is the extruded body.
    pub fn with_body(body: ExtrusionHandle) -> Self {
        Self::new(Part::new("body", PartKind::Extruded(body)))
    }

    pub fn root(&self) -> PartId {
        self.root
    }

    pub fn get(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Add `part` under `parent`. Returns None if `parent` is not in the tree.
    pub fn attach(&mut self, parent: PartId, mut part: Part) -> Option<PartId> {
        if !self.parts.contains_key(parent) {
            return None;
        }
        part.parent = Some(parent);
        part.children.clear();
        let id = self.parts.insert(part);
        self.parts[parent].children.push(id);
        Some(id)
    }

    /// Remove `id` and everything below it. Returns the number of parts removed;
    /// zero for the root or an unknown id.
    pub fn detach(&mut self, id: PartId) -> usize {
        if id == self.root {
            return 0;
        }
        let Some(parent) = self.parts.get(id).and_then(|p| p.parent) else {
            return 0;
        };
        if let Some(p) = self.parts.get_mut(parent) {
            p.children.retain(|&c| c != id);
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(part) = self.parts.remove(next) {
                stack.extend(part.children);
                removed += 1;
            }
        }
        removed
    }

    /// Parts in depth-first pre-order, children in attachment order.
    pub fn iter_depth_first(&self) -> Vec<(PartId, &Part)> {
        let mut out = Vec::with_capacity(self.parts.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(part) = self.parts.get(id) else {
                continue;
            };
            out.push((id, part));
            stack.extend(part.children.iter().rev().copied());
        }
        out
    }

    /// Every extrusion handle in the tree, depth-first.
    pub fn handles(&self) -> Vec<ExtrusionHandle> {
        self.iter_depth_first()
            .into_iter()
            .filter_map(|(_, part)| part.handle().cloned())
            .collect()
    }
}
