use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

pub(crate) const FANOUT_BITS: u32 = 8;
pub(crate) const FANOUT: usize = 1 << FANOUT_BITS;
/// Edges covered by one chunk: `FANOUT` words of 64 bits.
pub(crate) const CHUNK_BITS: u32 = FANOUT_BITS + 6;

/// A trie node. Branches route one byte of the chunk index, chunks hold the bits.
pub(crate) enum Node {
    Branch([AtomicPtr<Node>; FANOUT]),
    Chunk([AtomicU64; FANOUT]),
}

impl Node {
    /// Node constructor for a slot sitting `level` branches above the chunks.
    pub(crate) fn maker(level: usize) -> fn() -> Box<Node> {
        if level == 0 {
            Self::chunk
        } else {
            Self::branch
        }
    }

    fn branch() -> Box<Node> {
        Box::new(Self::Branch(
            [const { AtomicPtr::new(ptr::null_mut()) }; FANOUT],
        ))
    }

    fn chunk() -> Box<Node> {
        Box::new(Self::Chunk([const { AtomicU64::new(0) }; FANOUT]))
    }

    pub(crate) fn slots(&self) -> &[AtomicPtr<Node>; FANOUT] {
        match self {
            Self::Branch(slots) => slots,
            Self::Chunk(_) => unreachable!("chunk used as a branch"),
        }
    }

    pub(crate) fn words(&self) -> &[AtomicU64; FANOUT] {
        match self {
            Self::Chunk(words) => words,
            Self::Branch(_) => unreachable!("branch used as a chunk"),
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Self::Branch(slots) = self {
            for slot in slots.iter_mut() {
                let child = *slot.get_mut();
                if !child.is_null() {
                    // Children were published from `Box::into_raw` and are owned solely by this branch.
                    unsafe { drop(Box::from_raw(child)) };
                }
            }
        }
    }
}

/// Loads the node published in `slot`, if any.
pub(crate) fn load(slot: &AtomicPtr<Node>) -> Option<&Node> {
    // Published nodes are only freed when the owning set is dropped.
    unsafe { slot.load(Ordering::Acquire).as_ref() }
}

/// Returns the node published in `slot`, installing a fresh one if it is empty.
///
/// When several threads race on an empty slot, the first compare-and-swap wins;
/// every loser frees its candidate and continues with the winner's node.
pub(crate) fn load_or_publish(slot: &AtomicPtr<Node>, make: fn() -> Box<Node>) -> &Node {
    if let Some(node) = load(slot) {
        return node;
    }
    let fresh = Box::into_raw(make());
    match slot.compare_exchange(
        ptr::null_mut(),
        fresh,
        Ordering::AcqRel,
        Ordering::Acquire,
    ) {
        // Published now, so it lives until the owning set is dropped.
        Ok(_) => unsafe { &*fresh },
        Err(winner) => {
            // The candidate never became visible to another thread.
            unsafe { drop(Box::from_raw(fresh)) };
            // Published nodes are only freed when the owning set is dropped.
            unsafe { &*winner }
        }
    }
}
