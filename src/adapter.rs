//! Projection between domain keys and [`BitString`] views.

use crate::bitstring::BitString;

/// Converts a domain key to and from a [`BitString`] view.
///
/// Implementations are stateless; containers call `to_bits`/`from_bits` on demand and never
/// store a `KeyAdapter` value.
///
/// `from_bits` is required by [`crate::RadixTree`], which synthesizes internal-node keys as the
/// common prefix of two existing keys: it must be total on any truncation of a bit string that a
/// valid key can produce. [`crate::PrefixVector`] never calls `from_bits`.
pub trait KeyAdapter: Sized {
	/// Borrowed bit string view of this key.
	fn to_bits(&self) -> BitString<'_>;

	/// Reconstruct a key from a bit string view.
	///
	/// Must accept any `bits` that is a truncation of some valid key's own `to_bits()` output.
	fn from_bits(bits: BitString<'_>) -> Self;
}
