//! Prefix trie over normalized postcodes
//!
//! Used as a cheap first-pass filter: everything sharing the query's
//! area/district prefix is surfaced as a candidate before scoring. A
//! prefix miss only silences this strategy, it never rejects the query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Default)]
struct TrieNode {
    // Normalized postcodes are ASCII, so single bytes are enough
    children: BTreeMap<u8, TrieNode>,
    // Terminal list: several originals may normalize identically
    postcodes: Vec<String>,
}

/// Node of the flattened (cache) representation: children are
/// `(byte, index)` pairs pointing at higher indices of the node array.
#[derive(Serialize, Deserialize)]
pub struct FlatTrieNode {
    postcodes: Vec<String>,
    children: Vec<(u8, u32)>,
}

#[derive(Default)]
pub struct Trie {
    root: TrieNode,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an original postcode under its normalized form. Re-inserting
    /// the same pair is a no-op.
    pub fn insert(&mut self, normalized: &str, original: &str) {
        let mut node = &mut self.root;
        for byte in normalized.bytes() {
            node = node.children.entry(byte).or_default();
        }
        if !node.postcodes.iter().any(|p| p == original) {
            node.postcodes.push(original.to_string());
        }
    }

    /// All originals whose normalized form starts with `prefix`, up to
    /// `limit`. Collection walks the subtree with an explicit stack so
    /// dense subtrees cannot exhaust the call stack.
    pub fn search_prefix(&self, prefix: &str, limit: usize) -> Vec<String> {
        let mut node = &self.root;
        for byte in prefix.bytes() {
            match node.children.get(&byte) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let mut results = Vec::new();
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            if results.len() >= limit {
                break;
            }
            for postcode in node.postcodes.iter() {
                if results.len() >= limit {
                    break;
                }
                results.push(postcode.clone());
            }
            // Reverse so smaller bytes are popped (visited) first
            for child in node.children.values().rev() {
                stack.push(child);
            }
        }

        results
    }

    /// Flattens the trie into a node array for persistence. Children always
    /// end up at a higher index than their parent.
    pub(crate) fn flatten(&self) -> Vec<FlatTrieNode> {
        let mut nodes: Vec<FlatTrieNode> = Vec::new();

        let mut stack: Vec<(&TrieNode, Option<(usize, u8)>)> = vec![(&self.root, None)];
        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            nodes.push(FlatTrieNode {
                postcodes: node.postcodes.clone(),
                children: Vec::with_capacity(node.children.len()),
            });
            if let Some((parent_index, byte)) = parent {
                nodes[parent_index].children.push((byte, index as u32));
            }
            for (&byte, child) in node.children.iter().rev() {
                stack.push((child, Some((index, byte))));
            }
        }

        nodes
    }

    /// Rebuilds a trie from its flattened form with a single reverse scan
    /// (children sit at higher indices than their parents).
    ///
    /// The flat form is untrusted (it comes from the cache artifact), so
    /// every structural violation is rejected rather than panicking or
    /// yielding a malformed trie.
    pub(crate) fn from_flat(flat: Vec<FlatTrieNode>) -> Result<Self, &'static str> {
        let len = flat.len();
        if len == 0 {
            return Ok(Self::new());
        }

        let mut slots: Vec<Option<TrieNode>> = Vec::with_capacity(len);
        slots.resize_with(len, || None);

        for index in (0..len).rev() {
            let FlatTrieNode {
                postcodes,
                children,
            } = &flat[index];
            let mut node = TrieNode {
                children: BTreeMap::new(),
                postcodes: postcodes.clone(),
            };
            for &(byte, child_index) in children {
                let child_index = child_index as usize;
                if child_index <= index || child_index >= len {
                    return Err("child index out of range");
                }
                let child = slots[child_index]
                    .take()
                    .ok_or("node claimed by two parents")?;
                if node.children.insert(byte, child).is_some() {
                    return Err("duplicate child byte");
                }
            }
            slots[index] = Some(node);
        }

        // Every non-root node must have been claimed by a parent
        if slots.iter().skip(1).any(|slot| slot.is_some()) {
            return Err("unreachable node");
        }

        Ok(Self {
            root: slots
                .into_iter()
                .next()
                .flatten()
                .unwrap_or_default(),
        })
    }
}
