//! BK-tree over normalized postcodes, keyed by Levenshtein distance
//!
//! Children are stored under the exact distance from their parent's word;
//! the triangle inequality then lets a radius query prune every bucket
//! outside `[d - max, d + max]`.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::distance::levenshtein;

pub struct BkNode {
    word: String,
    // BTreeMap keeps traversal (and thus candidate) order deterministic
    children: BTreeMap<usize, BkNode>,
}

impl BkNode {
    fn new(word: &str) -> Self {
        Self {
            word: word.to_string(),
            children: BTreeMap::new(),
        }
    }
}

/// Node of the flattened (cache) representation: children are
/// `(distance, index)` pairs pointing at higher indices of the node array.
#[derive(Serialize, Deserialize)]
pub struct FlatBkNode {
    word: String,
    children: Vec<(usize, u32)>,
}

#[derive(Default)]
pub struct BkTree {
    root: Option<BkNode>,
    len: usize,
}

impl BkTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct words in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a word. Inserting a word already present is a no-op.
    pub fn add(&mut self, word: &str) {
        let Some(root) = self.root.as_mut() else {
            self.root = Some(BkNode::new(word));
            self.len = 1;
            return;
        };

        let mut current = root;
        loop {
            let distance = levenshtein(word, &current.word);
            if distance == 0 {
                // Already present
                return;
            }
            match current.children.entry(distance) {
                Entry::Occupied(entry) => current = entry.into_mut(),
                Entry::Vacant(entry) => {
                    entry.insert(BkNode::new(word));
                    self.len += 1;
                    return;
                }
            }
        }
    }

    /// All words within `max_distance` of `word`, with their distances.
    ///
    /// Iterative traversal with an explicit work stack; recursion depth
    /// would be unbounded on skewed trees.
    pub fn search(&self, word: &str, max_distance: usize) -> Vec<(String, usize)> {
        let mut results = Vec::new();
        let Some(root) = self.root.as_ref() else {
            return results;
        };

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let distance = levenshtein(word, &node.word);
            if distance <= max_distance {
                results.push((node.word.clone(), distance));
            }

            let low = distance.saturating_sub(max_distance);
            let high = distance + max_distance;
            for child in node.children.range(low..=high).map(|(_, c)| c) {
                stack.push(child);
            }
        }

        results
    }

    /// Flattens the tree into a node array for persistence. Children always
    /// end up at a higher index than their parent.
    pub(crate) fn flatten(&self) -> Vec<FlatBkNode> {
        let mut nodes: Vec<FlatBkNode> = Vec::with_capacity(self.len);
        let Some(root) = self.root.as_ref() else {
            return nodes;
        };

        let mut stack: Vec<(&BkNode, Option<(usize, usize)>)> = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            nodes.push(FlatBkNode {
                word: node.word.clone(),
                children: Vec::with_capacity(node.children.len()),
            });
            if let Some((parent_index, distance)) = parent {
                nodes[parent_index].children.push((distance, index as u32));
            }
            // Reverse so buckets are appended in increasing distance order
            for (&distance, child) in node.children.iter().rev() {
                stack.push((child, Some((index, distance))));
            }
        }

        nodes
    }

    /// Rebuilds a tree from its flattened form. Children sit at higher
    /// indices, so a single reverse scan has every child ready before its
    /// parent.
    ///
    /// The flat form is untrusted (it comes from the cache artifact), so
    /// every structural violation is rejected rather than panicking or
    /// yielding a malformed tree.
    pub(crate) fn from_flat(flat: Vec<FlatBkNode>) -> Result<Self, &'static str> {
        let len = flat.len();
        let mut slots: Vec<Option<BkNode>> = Vec::with_capacity(len);
        slots.resize_with(len, || None);

        for index in (0..len).rev() {
            let FlatBkNode { word, children } = &flat[index];
            let mut node = BkNode::new(word);
            for &(distance, child_index) in children {
                let child_index = child_index as usize;
                if child_index <= index || child_index >= len {
                    return Err("child index out of range");
                }
                let child = slots[child_index]
                    .take()
                    .ok_or("node claimed by two parents")?;
                if node.children.insert(distance, child).is_some() {
                    return Err("duplicate distance bucket");
                }
            }
            slots[index] = Some(node);
        }

        // Every non-root node must have been claimed by a parent
        if slots.iter().skip(1).any(|slot| slot.is_some()) {
            return Err("unreachable node");
        }

        Ok(Self {
            root: slots.into_iter().next().flatten(),
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::distance::levenshtein;

    use super::{BkTree, FlatBkNode};

    fn sample_tree() -> BkTree {
        let mut tree = BkTree::new();
        for word in ["E149WB", "E149WA", "E149XB", "SW1A1AA", "N16AB"] {
            tree.add(word);
        }
        tree
    }

    #[test]
    fn test_add_idempotent() {
        let mut tree = sample_tree();
        assert_eq!(tree.len(), 5);
        tree.add("E149WB");
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_search_radius() {
        let tree = sample_tree();

        let exact = tree.search("E149WB", 0);
        assert_eq!(exact, vec![("E149WB".to_string(), 0)]);

        let mut near = tree.search("E149WB", 1);
        near.sort();
        assert_eq!(
            near,
            vec![
                ("E149WA".to_string(), 1),
                ("E149WB".to_string(), 0),
                ("E149XB".to_string(), 1)
            ]
        );

        assert!(tree.search("ZZ999ZZ", 2).is_empty());
    }

    /// Compare the pruned traversal against a brute-force scan over a
    /// random word set
    #[test]
    fn test_search_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let alphabet = b"ABC123";
        let words: Vec<String> = (0..500)
            .map(|_| {
                (0..rng.gen_range(3..8))
                    .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
                    .collect()
            })
            .collect();

        let mut tree = BkTree::new();
        for word in words.iter() {
            tree.add(word);
        }

        for query in ["A1B2", "CCC", "123ABC", ""] {
            for max_distance in 0..3 {
                let mut observed = tree.search(query, max_distance);
                observed.sort();
                observed.dedup();

                let mut expected: Vec<(String, usize)> = words
                    .iter()
                    .map(|w| (w.clone(), levenshtein(query, w)))
                    .filter(|(_, d)| *d <= max_distance)
                    .collect();
                expected.sort();
                expected.dedup();

                assert_eq!(
                    observed, expected,
                    "Mismatch for query {} at distance {}",
                    query, max_distance
                );
            }
        }
    }

    #[test]
    fn test_flatten_round_trip() {
        let tree = sample_tree();
        let rebuilt = BkTree::from_flat(tree.flatten()).expect("flat form should round-trip");

        assert_eq!(rebuilt.len(), tree.len());
        for query in ["E149WB", "E149W", "SW1A1AA", "ZZ"] {
            let mut observed = rebuilt.search(query, 2);
            let mut expected = tree.search(query, 2);
            observed.sort();
            expected.sort();
            assert_eq!(observed, expected);
        }
    }

    #[test]
    fn test_empty_tree() {
        let tree = BkTree::new();
        assert!(tree.is_empty());
        assert!(tree.search("E149WB", 2).is_empty());
        assert!(BkTree::from_flat(tree.flatten())
            .expect("empty flat form is valid")
            .is_empty());
    }

    /// Structurally invalid flat forms (a corrupt cache body) must be
    /// rejected, never panic or produce a wrong tree
    #[test]
    fn test_from_flat_rejects_corrupt_forms() {
        // Child index past the end of the node array
        let flat = vec![FlatBkNode {
            word: "E149WB".to_string(),
            children: vec![(1, 99)],
        }];
        assert!(BkTree::from_flat(flat).is_err());

        // Child pointing at or below its parent
        let flat = vec![
            FlatBkNode {
                word: "E149WB".to_string(),
                children: vec![(1, 1)],
            },
            FlatBkNode {
                word: "E149WA".to_string(),
                children: vec![(2, 0)],
            },
        ];
        assert!(BkTree::from_flat(flat).is_err());

        // Node claimed by two parents
        let flat = vec![
            FlatBkNode {
                word: "E149WB".to_string(),
                children: vec![(1, 1), (2, 2)],
            },
            FlatBkNode {
                word: "E149WA".to_string(),
                children: vec![(1, 2)],
            },
            FlatBkNode {
                word: "E149XB".to_string(),
                children: vec![],
            },
        ];
        assert!(BkTree::from_flat(flat).is_err());

        // Node that no parent references
        let flat = vec![
            FlatBkNode {
                word: "E149WB".to_string(),
                children: vec![],
            },
            FlatBkNode {
                word: "E149WA".to_string(),
                children: vec![],
            },
        ];
        assert!(BkTree::from_flat(flat).is_err());

        // Two children under the same distance bucket
        let flat = vec![
            FlatBkNode {
                word: "E149WB".to_string(),
                children: vec![(1, 1), (1, 2)],
            },
            FlatBkNode {
                word: "E149WA".to_string(),
                children: vec![],
            },
            FlatBkNode {
                word: "E149XB".to_string(),
                children: vec![],
            },
        ];
        assert!(BkTree::from_flat(flat).is_err());
    }
}
