//! Binary PATRICIA radix tree: pointer-linked container with O(depth) mutation and stable node
//! references.

use alloc::boxed::Box;
use core::{
	fmt,
	marker::PhantomData,
	ptr::NonNull,
};

use crate::{
	bitstring::{
		is_prefix,
		longest_common_prefix,
		BitString,
	},
	KeyAdapter,
};

struct Node<K, V> {
	key: K,
	value: Option<V>,
	left: Option<Box<Node<K, V>>>,
	right: Option<Box<Node<K, V>>>,
	// non-owning; `None` only for the root.
	parent: Option<NonNull<Node<K, V>>>,
}

impl<K, V> Node<K, V> {
	fn is_leaf_shape(&self) -> bool {
		self.left.is_none() && self.right.is_none()
	}
}

/// Binary radix (PATRICIA) tree mapping bit-string keys to values.
///
/// Nodes form an owning tree: each node exclusively owns its children (`Box`), while a
/// non-owning raw-pointer `parent` back-pointer lets lookups and iteration move upward without a
/// call stack. A node with no value is *internal*: it exists only to route between two children
/// and therefore always has both; a node with a value is *populated* and may have zero, one, or
/// two children. Erasing a value runs a merge pass that collapses value-less single-child nodes
/// into their child and propagates the collapse to ancestors that become under-full as a result.
pub struct RadixTree<K, V> {
	root: Option<Box<Node<K, V>>>,
	len: usize,
}

impl<K: KeyAdapter, V> Default for RadixTree<K, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V> fmt::Debug for RadixTree<K, V>
where
	K: KeyAdapter + fmt::Debug,
	V: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

fn clone_subtree<K: Clone, V: Clone>(
	node: &Node<K, V>,
	parent: Option<NonNull<Node<K, V>>>,
) -> Box<Node<K, V>> {
	let mut new_node = Box::new(Node {
		key: node.key.clone(),
		value: node.value.clone(),
		left: None,
		right: None,
		parent,
	});
	let self_ptr = NonNull::from(&*new_node);
	new_node.left = node.left.as_deref().map(|l| clone_subtree(l, Some(self_ptr)));
	new_node.right = node.right.as_deref().map(|r| clone_subtree(r, Some(self_ptr)));
	new_node
}

impl<K: Clone, V: Clone> Clone for RadixTree<K, V> {
	fn clone(&self) -> Self {
		Self {
			root: self.root.as_deref().map(|n| clone_subtree(n, None)),
			len: self.len,
		}
	}
}

// insert descent: returns a raw pointer to the (possibly newly created) node for `key`.
// safety: the pointer is derived from a `Box` that has just been (re-)attached into `slot` or
// one of its descendants, so it is valid for as long as the borrow of `slot`'s root is held.
fn insert_descend<K, V>(
	slot: &mut Option<Box<Node<K, V>>>,
	parent: Option<NonNull<Node<K, V>>>,
	key: K,
) -> *mut Node<K, V>
where
	K: KeyAdapter,
{
	match slot {
		None => {
			let mut node = Box::new(Node {
				key,
				value: None,
				left: None,
				right: None,
				parent,
			});
			let raw: *mut Node<K, V> = &mut *node;
			*slot = Some(node);
			raw
		},
		Some(current) => {
			let current_bits = current.key.to_bits();
			let key_bits = key.to_bits();
			if is_prefix(&current_bits, &key_bits) {
				if current_bits == key_bits {
					return &mut **current;
				}
				let bit = key_bits.bit(current_bits.len());
				let self_ptr = NonNull::from(&**current);
				let child_slot = if bit == 0 { &mut current.left } else { &mut current.right };
				insert_descend(child_slot, Some(self_ptr), key)
			} else {
				let common_len = longest_common_prefix(&current_bits, &key_bits).len();
				let mut old = slot.take().expect("slot was Some");
				if common_len == key_bits.len() {
					// key is a strict prefix of the current node's key: interpose a new
					// populated node and move the current subtree under it.
					let side = old.key.to_bits().bit(common_len);
					let mut new_node = Box::new(Node {
						key,
						value: None,
						left: None,
						right: None,
						parent,
					});
					let new_raw: *mut Node<K, V> = &mut *new_node;
					let new_ptr = NonNull::new(new_raw).expect("box pointer is non-null");
					old.parent = Some(new_ptr);
					if side == 0 {
						new_node.left = Some(old);
					} else {
						new_node.right = Some(old);
					}
					*slot = Some(new_node);
					new_raw
				} else {
					// fork: new internal node at the common prefix, current subtree on one
					// side, a fresh leaf for `key` on the other.
					let common_key = {
						let old_bits = old.key.to_bits();
						K::from_bits(old_bits.truncate(common_len))
					};
					let mut internal = Box::new(Node {
						key: common_key,
						value: None,
						left: None,
						right: None,
						parent,
					});
					let internal_raw: *mut Node<K, V> = &mut *internal;
					let internal_ptr = NonNull::new(internal_raw).expect("box pointer is non-null");
					let old_side = old.key.to_bits().bit(common_len);
					old.parent = Some(internal_ptr);
					let mut leaf = Box::new(Node {
						key,
						value: None,
						left: None,
						right: None,
						parent: Some(internal_ptr),
					});
					let leaf_raw: *mut Node<K, V> = &mut *leaf;
					if old_side == 0 {
						internal.left = Some(old);
						internal.right = Some(leaf);
					} else {
						internal.right = Some(old);
						internal.left = Some(leaf);
					}
					*slot = Some(internal);
					leaf_raw
				}
			}
		},
	}
}

enum Collapse {
	Keep,
	Remove,
	ReplaceWithLeft,
	ReplaceWithRight,
}

fn collapse_if_needed<K, V>(slot: &mut Option<Box<Node<K, V>>>) {
	let action = match slot {
		None => Collapse::Keep,
		Some(node) => {
			if node.value.is_some() {
				Collapse::Keep
			} else {
				match (node.left.is_some(), node.right.is_some()) {
					(true, true) => Collapse::Keep,
					(false, false) => Collapse::Remove,
					(true, false) => Collapse::ReplaceWithLeft,
					(false, true) => Collapse::ReplaceWithRight,
				}
			}
		},
	};
	match action {
		Collapse::Keep => {},
		Collapse::Remove => {
			*slot = None;
		},
		Collapse::ReplaceWithLeft | Collapse::ReplaceWithRight => {
			let mut node = slot.take().expect("slot was Some");
			let mut child = match action {
				Collapse::ReplaceWithLeft => node.left.take().expect("left child present"),
				_ => node.right.take().expect("right child present"),
			};
			// the surviving child moves up to replace `node`; it must inherit `node`'s parent.
			child.parent = node.parent;
			*slot = Some(child);
		},
	}
}

// erase descent; returns whether a value was actually removed. Collapses this node (and, via
// the unwinding recursion, any now under-full value-less ancestor) on the way back up.
fn erase_descend<K, V>(slot: &mut Option<Box<Node<K, V>>>, key_bits: &BitString<'_>) -> bool
where
	K: KeyAdapter,
{
	let removed = match slot {
		None => return false,
		Some(node) => {
			let node_bits = node.key.to_bits();
			if !is_prefix(&node_bits, key_bits) {
				return false;
			}
			if node_bits == *key_bits {
				node.value.take().is_some()
			} else {
				let bit = key_bits.bit(node_bits.len());
				let child_slot = if bit == 0 { &mut node.left } else { &mut node.right };
				erase_descend(child_slot, key_bits)
			}
		},
	};
	collapse_if_needed(slot);
	removed
}

impl<K: KeyAdapter, V> RadixTree<K, V> {
	/// New, empty tree.
	pub const fn new() -> Self {
		Self { root: None, len: 0 }
	}

	/// Number of populated entries.
	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	/// Whether the tree has no populated entries.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Insert `(key, value)`. Returns `true` if this created a new entry, `false` if `key` was
	/// already present (in which case the existing value is left untouched).
	pub fn insert(&mut self, key: K, value: V) -> bool {
		let raw = insert_descend(&mut self.root, None, key);
		// safety: `raw` was just produced by `insert_descend` rooted at `self.root`, which we
		// still exclusively borrow.
		let node = unsafe { &mut *raw };
		if node.value.is_some() {
			false
		} else {
			node.value = Some(value);
			self.len += 1;
			true
		}
	}

	/// Insert `(key, value)`, overwriting the value if `key` is already present. Returns `true`
	/// if this created a new entry, `false` if it overwrote one.
	pub fn insert_or_assign(&mut self, key: K, value: V) -> bool {
		let raw = insert_descend(&mut self.root, None, key);
		let node = unsafe { &mut *raw };
		let inserted = node.value.is_none();
		if inserted {
			self.len += 1;
		}
		node.value = Some(value);
		inserted
	}

	/// Remove the entry with bit-string-equal key `key`. Returns `1` if an entry was removed,
	/// `0` otherwise.
	pub fn erase(&mut self, key: &K) -> usize {
		let removed = erase_descend(&mut self.root, &key.to_bits());
		if removed {
			self.len -= 1;
			1
		} else {
			0
		}
	}

	fn lookup_exact(&self, key: &K) -> Option<&Node<K, V>> {
		let key_bits = key.to_bits();
		let mut current = self.root.as_deref();
		while let Some(node) = current {
			let node_bits = node.key.to_bits();
			if !is_prefix(&node_bits, &key_bits) {
				return None;
			}
			if node_bits == key_bits {
				return Some(node);
			}
			let bit = key_bits.bit(node_bits.len());
			current = if bit == 0 { node.left.as_deref() } else { node.right.as_deref() };
		}
		None
	}

	fn lookup_exact_mut(&mut self, key: &K) -> Option<&mut Node<K, V>> {
		let key_bits = key.to_bits();
		let mut slot = &mut self.root;
		loop {
			let node = slot.as_mut()?;
			let node_bits = node.key.to_bits();
			if !is_prefix(&node_bits, &key_bits) {
				return None;
			}
			if node_bits == key_bits {
				return Some(&mut **node);
			}
			let bit = key_bits.bit(node_bits.len());
			slot = if bit == 0 { &mut node.left } else { &mut node.right };
		}
	}

	fn lookup_lpm(&self, key: &K) -> Option<&Node<K, V>> {
		let key_bits = key.to_bits();
		let mut current = self.root.as_deref();
		let mut last = None;
		while let Some(node) = current {
			let node_bits = node.key.to_bits();
			if !is_prefix(&node_bits, &key_bits) {
				break;
			}
			if node.value.is_some() {
				last = Some(node);
			}
			if node_bits == key_bits {
				break;
			}
			let bit = key_bits.bit(node_bits.len());
			current = if bit == 0 { node.left.as_deref() } else { node.right.as_deref() };
		}
		last
	}

	fn lookup_lpm_mut(&mut self, key: &K) -> Option<&mut Node<K, V>> {
		let key_bits = key.to_bits();
		let mut slot = &mut self.root;
		let mut last: Option<*mut Node<K, V>> = None;
		loop {
			let node = match slot.as_mut() {
				Some(n) => n,
				None => break,
			};
			// safety: re-borrow via raw pointer to release `node`'s borrow before reassigning
			// `slot`/`last`, which the loop-based descent otherwise cannot express under NLL
			// alone.
			let node_ptr: *mut Node<K, V> = &mut **node;
			let node_bits = unsafe { (*node_ptr).key.to_bits() };
			if !is_prefix(&node_bits, &key_bits) {
				break;
			}
			if unsafe { (*node_ptr).value.is_some() } {
				last = Some(node_ptr);
			}
			if node_bits == key_bits {
				break;
			}
			let bit = key_bits.bit(node_bits.len());
			slot = if bit == 0 {
				unsafe { &mut (*node_ptr).left }
			} else {
				unsafe { &mut (*node_ptr).right }
			};
		}
		// safety: `last`, if set, points at a node reachable from `self.root`, which we still
		// exclusively borrow; no alias of it was produced after it was captured.
		last.map(|p| unsafe { &mut *p })
	}

	/// Value of the longest-prefix match of `key`, or `None`.
	pub fn get(&self, key: &K) -> Option<&V> {
		self.lookup_lpm(key).and_then(|n| n.value.as_ref())
	}

	/// Mutable value of the longest-prefix match of `key`, or `None`.
	pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
		self.lookup_lpm_mut(key).and_then(|n| n.value.as_mut())
	}

	/// Value of the entry whose key bit-string-equals `key`, or `None`.
	pub fn get_exact(&self, key: &K) -> Option<&V> {
		self.lookup_exact(key).and_then(|n| n.value.as_ref())
	}

	/// Mutable value of the entry whose key bit-string-equals `key`, or `None`.
	pub fn get_exact_mut(&mut self, key: &K) -> Option<&mut V> {
		self.lookup_exact_mut(key).and_then(|n| n.value.as_mut())
	}

	fn subtree_root(&self, prefix: &K) -> Option<&Node<K, V>> {
		let prefix_bits = prefix.to_bits();
		let mut current = self.root.as_deref();
		while let Some(node) = current {
			let node_bits = node.key.to_bits();
			if is_prefix(&node_bits, &prefix_bits) {
				if node_bits.len() == prefix_bits.len() {
					return Some(node);
				}
				let bit = prefix_bits.bit(node_bits.len());
				current = if bit == 0 { node.left.as_deref() } else { node.right.as_deref() };
			} else if is_prefix(&prefix_bits, &node_bits) {
				return Some(node);
			} else {
				return None;
			}
		}
		None
	}

	/// Iterate over all entries, in pre-order (equivalently, lexicographic bit-string order,
	/// since the left child always sorts before the right child).
	pub fn iter(&self) -> Iter<'_, K, V> {
		let root = self.root.as_deref().map(NonNull::from);
		Iter {
			current: root,
			last: None,
			boundary: root,
			marker: PhantomData,
		}
	}

	/// Iterate over all populated entries whose key has `prefix` as a (not necessarily strict)
	/// prefix.
	pub fn find_all(&self, prefix: &K) -> Iter<'_, K, V> {
		let root = self.subtree_root(prefix).map(NonNull::from);
		Iter {
			current: root,
			last: None,
			boundary: root,
			marker: PhantomData,
		}
	}

	/// Remove the entry at `pos`, returning an iterator over what remains of the walk `pos` was
	/// taken from, positioned at the entry that would have come next. The successor is captured
	/// (via the same pre-order walk [`Iter`] uses) before `key` is actually erased, so it is
	/// unaffected by the merge cascade that may collapse `pos`'s value-less ancestors into their
	/// surviving child: erasing a node never changes which node comes after it in pre-order, only
	/// how many value-less routers sit between them.
	///
	/// `pos` must have been produced by an iterator over this same tree and not yet consumed by a
	/// prior call to this method; using a stale `Position` is a contract violation, not a checked
	/// error, in the same spirit as dereferencing an invalidated iterator elsewhere in this crate.
	pub fn erase_at(&mut self, pos: Position<K, V>) -> Iter<'_, K, V>
	where
		K: Clone,
	{
		// safety: per the contract above, `pos.node` is still part of this tree.
		let key = unsafe { pos.node.as_ref().key.clone() };
		let successor = pos.boundary.and_then(|boundary| unsafe { preorder_next(pos.node, boundary) });
		self.erase(&key);
		Iter {
			current: successor,
			last: None,
			boundary: pos.boundary,
			marker: PhantomData,
		}
	}

	/// Visit every populated entry with a mutable reference to its value.
	///
	/// Traversal order is unspecified (currently pre-order).
	pub fn for_each_mut<F>(&mut self, mut f: F)
	where
		F: FnMut(&K, &mut V),
	{
		fn visit<K, V, F: FnMut(&K, &mut V)>(node: Option<&mut Node<K, V>>, f: &mut F) {
			if let Some(n) = node {
				if let Some(v) = n.value.as_mut() {
					f(&n.key, v);
				}
				visit(n.left.as_deref_mut(), f);
				visit(n.right.as_deref_mut(), f);
			}
		}
		visit(self.root.as_deref_mut(), &mut f);
	}
}

// safety: advances `node` by one step of a pre-order walk bounded by `boundary`, without
// revisiting anything outside the subtree rooted at `boundary`. `node` and `boundary` must be
// live and part of the same tree.
unsafe fn preorder_next<K, V>(
	node: NonNull<Node<K, V>>,
	boundary: NonNull<Node<K, V>>,
) -> Option<NonNull<Node<K, V>>> {
	if let Some(l) = node.as_ref().left.as_deref() {
		return Some(NonNull::from(l));
	}
	if let Some(r) = node.as_ref().right.as_deref() {
		return Some(NonNull::from(r));
	}
	let mut current = node;
	loop {
		if current == boundary {
			return None;
		}
		let parent = current.as_ref().parent?;
		let is_left_child = parent
			.as_ref()
			.left
			.as_deref()
			.map(NonNull::from)
			.map(|l| l == current)
			.unwrap_or(false);
		if is_left_child {
			if let Some(r) = parent.as_ref().right.as_deref() {
				return Some(NonNull::from(r));
			}
		}
		current = parent;
	}
}

/// Iterator over `(key, value)` pairs of a [`RadixTree`] or one of its subtrees.
///
/// Walks pre-order using parent back-pointers instead of an explicit stack, skipping value-less
/// internal nodes. Bounded by a `boundary` node so that [`RadixTree::find_all`] iterators stop
/// at the edge of their subtree.
pub struct Iter<'a, K, V> {
	current: Option<NonNull<Node<K, V>>>,
	last: Option<NonNull<Node<K, V>>>,
	boundary: Option<NonNull<Node<K, V>>>,
	marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
	type Item = (&'a K, &'a V);

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let ptr = self.current?;
			// safety: `ptr` is reachable from a tree borrowed for `'a`; `boundary` is fixed for
			// the lifetime of this iterator and delimits the walk.
			self.current = unsafe { preorder_next(ptr, self.boundary.expect("current implies boundary")) };
			let node = unsafe { ptr.as_ref() };
			if let Some(v) = &node.value {
				self.last = Some(ptr);
				return Some((&node.key, v));
			}
		}
	}
}

impl<'a, K, V> Iter<'a, K, V> {
	/// A handle to the entry most recently returned by [`Iterator::next`], for use with
	/// [`RadixTree::erase_at`]. Returns `None` before the first call to `next`.
	pub fn position(&self) -> Option<Position<K, V>> {
		self.last.map(|node| Position {
			node,
			boundary: self.boundary,
			marker: PhantomData,
		})
	}
}

/// A handle to one entry of a [`RadixTree`], captured from an [`Iter`] for passing to
/// [`RadixTree::erase_at`].
pub struct Position<K, V> {
	node: NonNull<Node<K, V>>,
	boundary: Option<NonNull<Node<K, V>>>,
	marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Clone for Position<K, V> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<K, V> Copy for Position<K, V> {}

impl<K, V> Node<K, V> {
	#[cfg(test)]
	fn invariant_both_children_if_internal(&self) -> bool {
		if self.value.is_some() {
			return true;
		}
		!self.is_leaf_shape() && self.left.is_some() && self.right.is_some()
	}
}
