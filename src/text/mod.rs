//! Text direction handling.
//!
//! Layout measures and encodes code points after they went through a
//! [`BidiShaper`], so right-to-left runs can be reordered (and reshaped, for
//! scripts that need it) by a pluggable implementation.

mod bidi;

pub use bidi::{BidiShaper, IdentityShaper};
