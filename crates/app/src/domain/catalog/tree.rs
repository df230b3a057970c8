//! Parent-indexed category tree.
//!
//! Categories are loaded with a single query and assembled here into an
//! arena indexed by parent, then materialised breadth-first down to
//! [`MAX_CATEGORY_DEPTH`] levels. Nodes below the cap, and nodes whose
//! parent row is missing, are not reachable from the result.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::domain::catalog::records::CategoryRecord;

/// Maximum number of levels materialised in a category tree.
pub const MAX_CATEGORY_DEPTH: usize = 3;

type ChildIndexes = SmallVec<[usize; 4]>;

/// One arena slot of a [`CategoryTree`].
#[derive(Debug, Clone)]
pub struct CategoryTreeNode {
    pub record: CategoryRecord,

    /// 1-based level; roots are at depth 1.
    pub depth: usize,

    /// Arena indexes of this node's children.
    pub children: ChildIndexes,
}

/// Depth-limited category hierarchy for one tenant.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: Vec<CategoryTreeNode>,
    roots: ChildIndexes,
}

impl CategoryTree {
    /// Assemble the tree from a flat category listing.
    #[must_use]
    pub fn build(records: Vec<CategoryRecord>) -> Self {
        let mut by_parent: FxHashMap<Option<Uuid>, ChildIndexes> = FxHashMap::default();

        for (index, record) in records.iter().enumerate() {
            by_parent
                .entry(record.parent_uuid.map(Into::into))
                .or_default()
                .push(index);
        }

        let mut tree = Self::default();
        let mut records: Vec<Option<CategoryRecord>> = records.into_iter().map(Some).collect();

        // Breadth-first: (record index, parent arena slot, depth).
        let mut queue: Vec<(usize, Option<usize>, usize)> = by_parent
            .get(&None)
            .into_iter()
            .flatten()
            .map(|&index| (index, None, 1))
            .collect();

        let mut cursor = 0;

        while let Some(&(record_index, parent_slot, depth)) = queue.get(cursor) {
            cursor += 1;

            let Some(record) = records.get_mut(record_index).and_then(Option::take) else {
                continue;
            };

            let uuid = record.uuid.into_uuid();
            let slot = tree.nodes.len();

            tree.nodes.push(CategoryTreeNode {
                record,
                depth,
                children: ChildIndexes::new(),
            });

            match parent_slot {
                Some(parent) => {
                    if let Some(node) = tree.nodes.get_mut(parent) {
                        node.children.push(slot);
                    }
                }
                None => tree.roots.push(slot),
            }

            if depth < MAX_CATEGORY_DEPTH {
                for &child_index in by_parent.get(&Some(uuid)).into_iter().flatten() {
                    queue.push((child_index, Some(slot), depth + 1));
                }
            }
        }

        tree
    }

    /// Arena slots of the top-level categories.
    pub fn roots(&self) -> impl Iterator<Item = &CategoryTreeNode> {
        self.roots.iter().filter_map(|&slot| self.nodes.get(slot))
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&CategoryTreeNode> {
        self.nodes.get(slot)
    }

    /// Number of reachable nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
