use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Arena index of a system node. Index 0 is always the root.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Axis-aligned rectangle in world coordinates; `min` inclusive, `max`
/// exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldRect {
    pub min: Point,
    pub max: Point,
}

impl WorldRect {
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }
}

/// A system node of the hydrated runtime tree. Positions are relative
/// to the parent; `size`, `absolute_position` and `ports` are derived
/// by the simulator and synchronised back after `compute`.
#[derive(Debug, Clone)]
pub struct SystemNode {
    pub id: String,
    /// Dot-joined path from the root; empty for the root itself.
    pub canonical_id: String,
    /// Position in the parent's child list.
    pub index: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub title: String,
    pub hide_systems: bool,
    pub position: Point,
    pub size: Size,
    pub absolute_position: Point,
    pub ports: Vec<Point>,
}

impl SystemNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeLink {
    pub index: usize,
    /// Normalised endpoint paths as authored.
    pub a: String,
    pub b: String,
    pub system_a: Option<NodeId>,
    pub system_b: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct RuntimeFlow {
    pub index: usize,
    pub steps: Vec<RuntimeFlowStep>,
}

impl RuntimeFlow {
    /// Number of distinct keyframes after normalisation; frames are the
    /// dense range `0..keyframe_count()`.
    pub fn keyframe_count(&self) -> usize {
        self.steps
            .iter()
            .map(|step| step.keyframe + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn steps_at(&self, keyframe: usize) -> impl Iterator<Item = &RuntimeFlowStep> {
        self.steps
            .iter()
            .filter(move |step| step.keyframe == keyframe)
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeFlowStep {
    /// Rank of the authored keyframe in the flow's sorted distinct set.
    pub keyframe: usize,
    pub from: String,
    pub to: String,
    pub system_from: Option<NodeId>,
    pub system_to: Option<NodeId>,
    /// Links traversed from `from` to `to`, in travel order.
    pub links: Vec<usize>,
}

/// The hydrated runtime tree. Systems live in an arena so that parent
/// back-references and link endpoints are plain indices.
#[derive(Debug, Clone, Default)]
pub struct SystemGraph {
    pub nodes: Vec<SystemNode>,
    pub links: Vec<RuntimeLink>,
    pub flows: Vec<RuntimeFlow>,
    by_path: HashMap<String, NodeId>,
}

pub const ROOT: NodeId = 0;

impl SystemGraph {
    pub fn root(&self) -> &SystemNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, id: NodeId) -> &SystemNode {
        &self.nodes[id]
    }

    /// All non-root systems, in document (depth-first) order.
    pub fn subsystems(&self) -> std::ops::Range<NodeId> {
        1..self.nodes.len()
    }

    /// Collapse a dotted path to its canonical form: split on `.`,
    /// drop empty components, re-join.
    pub fn normalize_path(path: &str) -> String {
        path.split('.')
            .filter(|component| !component.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Resolve a dotted path to a node. The root is not addressable
    /// (an empty path resolves to nothing).
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        let canonical = Self::normalize_path(path);
        if canonical.is_empty() {
            return None;
        }
        self.by_path.get(&canonical).copied()
    }

    /// Strict ancestors of `id`, innermost first, root included.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            out.push(parent);
            current = self.nodes[parent].parent;
        }
        out
    }

    pub(crate) fn register_path(&mut self, canonical: String, id: NodeId) {
        self.by_path.insert(canonical, id);
    }
}
