//! Stack headroom for the recursive walks
//!
//! Weaving, unweaving and document conversion recurse once per nesting
//! level, and user serializers re-enter the walk. Each level runs through
//! [`guarded`], which moves onto a fresh heap-allocated segment when the
//! current stack runs low, so `max_depth` is the only limit on depth.

/// Remaining stack below which a new segment is allocated
const RED_ZONE: usize = 128 * 1024;

/// Size of each new segment
const SEGMENT: usize = 2 * 1024 * 1024;

/// Generous per-level allowance for serde's recursive JSON writer
const JSON_FRAME: usize = 4 * 1024;

/// Run one level of a recursive walk
pub(crate) fn guarded<R>(walk: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT, walk)
}

/// Run a non-reentrant recursive routine that needs `levels` deep of stack
pub(crate) fn with_json_headroom<R>(levels: usize, walk: impl FnOnce() -> R) -> R {
    let needed = levels.saturating_mul(JSON_FRAME).saturating_add(RED_ZONE);
    stacker::maybe_grow(needed, needed.max(SEGMENT), walk)
}
