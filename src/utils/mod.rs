use foldhash::fast::RandomState;

/// Hasher used by every hot-path map in the crate (duplication prefixes,
/// per-tile tables).
#[inline]
pub(crate) fn get_hasher() -> RandomState {
    RandomState::default()
}
