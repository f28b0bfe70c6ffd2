//! Capacity hierarchy: All Storage → system → tenant → pool
//!
//! The tree is a flat list of [`HierarchyNode`]s linked by parent names.
//! [`HierarchyIndex`] builds lookup maps over that list when a caller needs
//! to walk it.

mod builder;

pub use builder::{
    escape_segment, system_node_name, Hierarchy, HierarchyBuilder, PoolGroup, PoolKey,
};

use std::collections::HashMap;

use crate::models::{HierarchyNode, NodeLevel};

/// Structural problem found in a node list
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HierarchyViolation {
    #[error("hierarchy has no root node")]
    MissingRoot,
    #[error("hierarchy has several roots: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),
    #[error("duplicate node name '{0}'")]
    DuplicateName(String),
    #[error("node '{node}' references missing parent '{parent}'")]
    DanglingParent { node: String, parent: String },
    #[error("node '{node}' has total {actual:.3} GiB but its children sum to {expected:.3} GiB")]
    CapacityNotConserved {
        node: String,
        expected: f64,
        actual: f64,
    },
}

/// Name and parent lookups over a flat node list
pub struct HierarchyIndex<'a> {
    nodes: &'a [HierarchyNode],
    by_name: HashMap<&'a str, &'a HierarchyNode>,
    children: HashMap<&'a str, Vec<&'a HierarchyNode>>,
}

impl<'a> HierarchyIndex<'a> {
    pub fn new(nodes: &'a [HierarchyNode]) -> Self {
        let mut by_name = HashMap::with_capacity(nodes.len());
        let mut children: HashMap<&str, Vec<&HierarchyNode>> = HashMap::new();

        for node in nodes {
            by_name.insert(node.name.as_str(), node);
            if !node.is_root() {
                children
                    .entry(node.parent_name.as_str())
                    .or_default()
                    .push(node);
            }
        }

        Self {
            nodes,
            by_name,
            children,
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a HierarchyNode> {
        self.by_name.get(name).copied()
    }

    pub fn root(&self) -> Option<&'a HierarchyNode> {
        self.nodes.iter().find(|n| n.is_root())
    }

    /// Immediate children in output order
    pub fn children(&self, name: &str) -> &[&'a HierarchyNode] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes in depth-first order with their depth, starting at the root
    pub fn walk(&self) -> Vec<(usize, &'a HierarchyNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, &HierarchyNode)> = match self.root() {
            Some(root) => vec![(0, root)],
            None => return out,
        };

        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            if out.len() > self.nodes.len() {
                break;
            }
            for child in self.children(&node.name).iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }

    /// Check root uniqueness, parent linkage and capacity conservation
    pub fn validate(&self, tolerance_gib: f64) -> Result<(), HierarchyViolation> {
        let roots: Vec<&HierarchyNode> = self.nodes.iter().filter(|n| n.is_root()).collect();
        match roots.len() {
            0 => return Err(HierarchyViolation::MissingRoot),
            1 => {}
            _ => {
                return Err(HierarchyViolation::MultipleRoots(
                    roots.iter().map(|n| n.name.clone()).collect(),
                ))
            }
        }

        if self.by_name.len() != self.nodes.len() {
            let mut seen = std::collections::HashSet::new();
            for node in self.nodes {
                if !seen.insert(node.name.as_str()) {
                    return Err(HierarchyViolation::DuplicateName(node.name.clone()));
                }
            }
        }

        for node in self.nodes {
            if !node.is_root() && self.get(&node.parent_name).is_none() {
                return Err(HierarchyViolation::DanglingParent {
                    node: node.name.clone(),
                    parent: node.parent_name.clone(),
                });
            }
        }

        for node in self.nodes.iter().filter(|n| n.level != NodeLevel::Pool) {
            let expected: f64 = self
                .children(&node.name)
                .iter()
                .map(|c| c.total_capacity)
                .sum();
            if (expected - node.total_capacity).abs() > tolerance_gib {
                return Err(HierarchyViolation::CapacityNotConserved {
                    node: node.name.clone(),
                    expected,
                    actual: node.total_capacity,
                });
            }
        }

        Ok(())
    }
}
