//! Bidirectional reordering seam.

/// Reorders a run of code points into visual order.
pub trait BidiShaper {
    /// Return `chars` in the order they are painted. `force_rtl` requests a
    /// right-to-left run regardless of the characters' own direction.
    fn shape(&self, chars: &[u32], force_rtl: bool) -> Vec<u32>;
}

/// Shaper that keeps logical order, reversing only forced right-to-left runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityShaper;

impl BidiShaper for IdentityShaper {
    fn shape(&self, chars: &[u32], force_rtl: bool) -> Vec<u32> {
        if force_rtl {
            chars.iter().rev().copied().collect()
        } else {
            chars.to_vec()
        }
    }
}
