use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use super::model::GenealogyNode;

/// Arena of a family's genealogy nodes.
///
/// Nodes only store their parent id; the parent→children index is rebuilt from the
/// rows whenever a forest is loaded, so there are no live back-references to keep
/// consistent.
#[derive(Debug, Clone, Serialize)]
pub struct Forest {
    nodes: Vec<GenealogyNode>,
    #[serde(skip)]
    index: HashMap<Uuid, usize>,
    #[serde(skip)]
    children: HashMap<Uuid, Vec<usize>>,
    #[serde(skip)]
    roots: Vec<usize>,
}

impl Forest {
    pub fn from_nodes(nodes: Vec<GenealogyNode>) -> Self {
        let index: HashMap<Uuid, usize> =
            nodes.iter().enumerate().map(|(i, node)| (node.id, i)).collect();

        let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            match node.parent_id {
                Some(parent) if index.contains_key(&parent) => {
                    children.entry(parent).or_default().push(i);
                }
                _ => roots.push(i),
            }
        }

        Self {
            nodes,
            index,
            children,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[GenealogyNode] {
        &self.nodes
    }

    pub fn get(&self, id: Uuid) -> Option<&GenealogyNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn roots(&self) -> impl Iterator<Item = &GenealogyNode> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    pub fn children(&self, id: Uuid) -> impl Iterator<Item = &GenealogyNode> {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&i| &self.nodes[i])
    }

    /// True when `ancestor` lies on the parent chain above `id`.
    pub fn is_ancestor(&self, ancestor: Uuid, id: Uuid) -> bool {
        let mut current = self.get(id).and_then(|node| node.parent_id);
        // bounded by the node count in case stored data already contains a loop
        for _ in 0..self.nodes.len() {
            match current {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => current = self.get(parent).and_then(|node| node.parent_id),
                None => return false,
            }
        }
        false
    }

    /// Every node below `id`.
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut out = Vec::new();
        let mut queue: Vec<Uuid> = self.children(id).map(|node| node.id).collect();
        while let Some(next) = queue.pop() {
            out.push(next);
            queue.extend(self.children(next).map(|node| node.id));
        }
        out
    }
}
