//! Containers keyed by bit strings: a sorted [`PrefixVector`] and a pointer-linked [`RadixTree`],
//! both supporting longest-prefix-match lookup. [`Ipv4Net`] is the built-in key type; any type
//! implementing [`KeyAdapter`] can be used instead.
#![no_std]
#![warn(missing_docs)]
#![doc(html_root_url = "https://docs.rs/prefix-trees/0.1.0")]

extern crate alloc;

mod adapter;
mod bitstring;
mod ipv4;
mod prefix_vector;
mod radix_tree;

pub use crate::{
	adapter::KeyAdapter,
	bitstring::{
		content_mask,
		is_lexicographic_less,
		is_prefix,
		is_tree_less,
		longest_common_prefix,
		BitString,
	},
	ipv4::{
		Ipv4Net,
		ParseIpv4NetError,
	},
	prefix_vector::PrefixVector,
	radix_tree::{
		Iter as RadixTreeIter,
		Position as RadixTreePosition,
		RadixTree,
	},
};
