use core::ptr::NonNull;
use kernel_memory_addresses::VirtualAddress;

/// Header stored in the first word of every **free** frame.
///
/// ```text
/// +----------------+-----------------------------------+
/// | Run { next }   |  junk (rest of the 4 KiB frame)   |
/// +----------------+-----------------------------------+
/// ^ frame base
/// ```
///
/// The frame's own storage doubles as the list node. This reinterpretation
/// is only valid while the frame sits on the list; it ends the moment
/// [`FreeList::pop`] hands the frame out.
#[repr(C)]
struct Run {
    next: Option<NonNull<Run>>,
}

/// Intrusive LIFO stack of free frames with an O(1) length.
///
/// # Invariants
/// - `len` equals the number of nodes reachable from `head`.
/// - Every node is the base of a frame exclusively owned by the list.
pub(crate) struct FreeList {
    head: Option<NonNull<Run>>,
    len: usize,
}

// Safety: the nodes are frames owned by the list; the pool only touches them
// under its lock (or during single-core bootstrap).
unsafe impl Send for FreeList {}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Link `frame` in at the head.
    ///
    /// # Safety
    /// - `frame` must point to writable memory of at least one machine word,
    ///   aligned for a pointer, exclusively handed to the list.
    /// - `frame` must not already be on the list.
    pub(crate) unsafe fn push(&mut self, frame: VirtualAddress) {
        let node = frame.as_mut_ptr::<Run>();
        unsafe {
            node.write(Run { next: self.head });
        }
        self.head = NonNull::new(node);
        self.len += 1;
    }

    /// Unlink and return the head frame, if any.
    pub(crate) fn pop(&mut self) -> Option<VirtualAddress> {
        let node = self.head?;
        // SAFETY: every node was written by `push` and is still owned by the list.
        self.head = unsafe { node.as_ptr().read().next };
        self.len -= 1;
        Some(VirtualAddress::from_nonnull(node))
    }

    /// Walk the list from the head. Follows the links as stored, so a
    /// corrupted list can yield more than `len` entries.
    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head,
            _list: self,
        }
    }
}

pub(crate) struct Iter<'a> {
    next: Option<NonNull<Run>>,
    _list: &'a FreeList,
}

impl Iterator for Iter<'_> {
    type Item = VirtualAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        // SAFETY: the borrowed list keeps its nodes alive and unchanged.
        self.next = unsafe { node.as_ptr().read().next };
        Some(VirtualAddress::from_nonnull(node))
    }
}
