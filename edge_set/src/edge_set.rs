//! Concurrent set of coverage edges.
//!
//! Storage is a radix trie of 256-slot nodes. The leaves are bitmap chunks of
//! 256 `AtomicU64` words, each covering 16384 consecutive edges. A chunk index
//! is routed by its number of significant bytes (its height) to one of eight
//! roots, so edges below 16384 live in a single chunk hanging off root 0, edges
//! below 2^22 sit one branch deeper, and so on up to the full `u64` range.
//!
//! Nodes are allocated on first touch and published with a compare-and-swap,
//! and are never freed or moved while the set is alive. Membership flips with
//! `fetch_or`, so exactly one inserter per edge observes the transition and
//! bumps the live count.

use crate::node::{self, Node, CHUNK_BITS, FANOUT_BITS};
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

pub type Edge = u64;

const MAX_HEIGHT: usize = (u64::BITS - CHUNK_BITS).div_ceil(FANOUT_BITS) as usize;
const BYTE_MASK: u64 = (1 << FANOUT_BITS) - 1;

pub struct EdgeSet {
    roots: [AtomicPtr<Node>; MAX_HEIGHT + 1],
    len: AtomicU64,
}

/// Position of an edge inside the trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    chunk: u64,
    word: usize,
    mask: u64,
}

impl Location {
    fn of(edge: Edge) -> Self {
        let within = edge & ((1 << CHUNK_BITS) - 1);
        Self {
            chunk: edge >> CHUNK_BITS,
            word: (within >> 6) as usize,
            mask: 1 << (within & 63),
        }
    }

    /// Number of branch levels between the root and the chunk.
    fn height(&self) -> usize {
        (u64::BITS - self.chunk.leading_zeros()).div_ceil(FANOUT_BITS) as usize
    }

    fn slot(&self, level: usize) -> usize {
        ((self.chunk >> (level as u32 * FANOUT_BITS)) & BYTE_MASK) as usize
    }
}

impl EdgeSet {
    pub const fn new() -> Self {
        Self {
            roots: [const { AtomicPtr::new(ptr::null_mut()) }; MAX_HEIGHT + 1],
            len: AtomicU64::new(0),
        }
    }

    /// Returns whether `edge` has been inserted. Never allocates.
    pub fn contains(&self, edge: Edge) -> bool {
        let loc = Location::of(edge);
        let height = loc.height();
        let Some(mut node) = node::load(&self.roots[height]) else {
            return false;
        };
        for level in (0..height).rev() {
            match node::load(&node.slots()[loc.slot(level)]) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.words()[loc.word].load(Ordering::Acquire) & loc.mask != 0
    }

    /// Adds `edge` to the set.
    ///
    /// Returns `true` only for the caller that moved `edge` from absent to
    /// present; all concurrent and later inserts of the same edge get `false`.
    pub fn insert(&self, edge: Edge) -> bool {
        let loc = Location::of(edge);
        let height = loc.height();
        let mut node = node::load_or_publish(&self.roots[height], Node::maker(height));
        for level in (0..height).rev() {
            node = node::load_or_publish(&node.slots()[loc.slot(level)], Node::maker(level));
        }

        let word = &node.words()[loc.word];
        // Skip the read-modify-write on the hot path once the edge is known.
        if word.load(Ordering::Acquire) & loc.mask != 0 {
            return false;
        }
        if word.fetch_or(loc.mask, Ordering::AcqRel) & loc.mask != 0 {
            return false;
        }
        self.len.fetch_add(1, Ordering::Release);
        true
    }

    /// Number of distinct edges inserted so far.
    pub fn len(&self) -> u64 {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ascending snapshot of the members.
    ///
    /// Inserts racing with the walk may or may not show up.
    pub fn edges(&self) -> Vec<Edge> {
        let mut out = Vec::new();
        for (height, root) in self.roots.iter().enumerate() {
            if let Some(node) = node::load(root) {
                collect(node, height, 0, &mut out);
            }
        }
        out
    }
}

fn collect(node: &Node, level: usize, prefix: u64, out: &mut Vec<Edge>) {
    if level == 0 {
        let base = prefix << CHUNK_BITS;
        for (idx, word) in node.words().iter().enumerate() {
            let mut bits = word.load(Ordering::Acquire);
            while bits != 0 {
                let bit = bits.trailing_zeros() as u64;
                out.push(base | ((idx as u64) << 6) | bit);
                bits &= bits - 1;
            }
        }
        return;
    }
    for (idx, slot) in node.slots().iter().enumerate() {
        if let Some(child) = node::load(slot) {
            collect(child, level - 1, (prefix << FANOUT_BITS) | idx as u64, out);
        }
    }
}

impl Default for EdgeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EdgeSet {
    fn drop(&mut self) {
        for root in self.roots.iter_mut() {
            let node = *root.get_mut();
            if !node.is_null() {
                // `&mut self` rules out any outstanding node reference.
                unsafe { drop(Box::from_raw(node)) };
            }
        }
    }
}

impl fmt::Debug for EdgeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeSet").field("len", &self.len()).finish()
    }
}
