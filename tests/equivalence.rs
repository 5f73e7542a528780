//! Randomized cross-checks between `PrefixVector` and `RadixTree`: both are independent
//! implementations of the same longest-prefix-match multimap contract, so for any sequence of
//! inserts and erases they must agree on every lookup and on the sorted key sequence.

use std::collections::BTreeMap;

use prefix_trees::{is_lexicographic_less, Ipv4Net, KeyAdapter, PrefixVector, RadixTree};
use proptest::prelude::*;

fn arb_net() -> impl Strategy<Value = Ipv4Net> {
	(any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>(), 0u8..=32)
		.prop_map(|(a, b, c, d, len)| Ipv4Net::new([a, b, c, d], len))
}

#[derive(Clone, Copy, Debug)]
enum Op {
	Insert(Ipv4Net, i32),
	Erase(Ipv4Net),
}

fn arb_op() -> impl Strategy<Value = Op> {
	prop_oneof![
		(arb_net(), any::<i32>()).prop_map(|(n, v)| Op::Insert(n, v)),
		arb_net().prop_map(Op::Erase),
	]
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(256))]

	#[test]
	fn prefix_vector_and_radix_tree_agree_on_lpm(
		ops in prop::collection::vec(arb_op(), 0..40),
		probes in prop::collection::vec(arb_net(), 0..20),
	) {
		let mut pv = PrefixVector::<Ipv4Net, i32>::new();
		let mut rt = RadixTree::<Ipv4Net, i32>::new();
		let mut model: BTreeMap<(u8, [u8; 4]), i32> = BTreeMap::new();

		for op in &ops {
			match *op {
				Op::Insert(net, value) => {
					let (_, inserted_pv) = pv.insert(net, value);
					let inserted_rt = rt.insert(net, value);
					prop_assert_eq!(inserted_pv, inserted_rt);
					model.entry((net.prefix_len(), net.octets())).or_insert(value);
				},
				Op::Erase(net) => {
					let removed_pv = pv.erase_by_key(&net);
					let removed_rt = rt.erase(&net);
					prop_assert_eq!(removed_pv, removed_rt);
					model.remove(&(net.prefix_len(), net.octets()));
				},
			}
		}

		prop_assert_eq!(pv.len(), rt.len());
		prop_assert_eq!(pv.len(), model.len());

		for probe in &probes {
			prop_assert_eq!(pv.value(probe), rt.get(probe));
		}

		let pv_keys: Vec<_> = pv.iter().map(|(k, v)| (k.to_string(), *v)).collect();
		let rt_keys: Vec<_> = rt.iter().map(|(k, v)| (k.to_string(), *v)).collect();
		prop_assert_eq!(pv_keys, rt_keys);
	}

	#[test]
	fn prefix_vector_stays_sorted_and_ancestors_are_proper_prefixes(
		ops in prop::collection::vec((arb_net(), any::<i32>()), 0..40),
	) {
		let mut pv = PrefixVector::<Ipv4Net, i32>::new();
		for (net, value) in ops {
			pv.insert(net, value);
		}

		let keys: Vec<Ipv4Net> = pv.iter().map(|(k, _)| *k).collect();
		for w in keys.windows(2) {
			prop_assert!(is_lexicographic_less(&w[0].to_bits(), &w[1].to_bits()));
		}
		// every stored key is its own longest-prefix match
		for key in &keys {
			prop_assert_eq!(pv.find_exact(key), pv.find(key));
		}
	}

	#[test]
	fn radix_tree_internal_nodes_always_have_two_children(
		ops in prop::collection::vec((arb_net(), any::<i32>()), 0..40),
		erases in prop::collection::vec(arb_net(), 0..20),
	) {
		let mut rt = RadixTree::<Ipv4Net, i32>::new();
		for (net, value) in ops {
			rt.insert(net, value);
		}
		for net in erases {
			rt.erase(&net);
		}
		// indirect check: find_all on the narrowest possible prefix always finds something
		// consistent with iter(), and no lookup ever panics walking the tree.
		let all: Vec<_> = rt.iter().collect();
		for (k, v) in &all {
			prop_assert_eq!(rt.get_exact(k), Some(*v));
			prop_assert_eq!(rt.find_all(k).count() >= 1, true);
		}
	}
}

proptest! {
	#[test]
	fn subkeys_and_find_all_agree_on_containment(
		ops in prop::collection::vec((arb_net(), any::<i32>()), 1..30),
		prefix in arb_net(),
	) {
		let mut pv = PrefixVector::<Ipv4Net, i32>::new();
		let mut rt = RadixTree::<Ipv4Net, i32>::new();
		for (net, value) in &ops {
			pv.insert(*net, *value);
			rt.insert(*net, *value);
		}

		let mut pv_sub: Vec<_> = pv.subkeys(&prefix).map(|(k, v)| (k.to_string(), *v)).collect();
		let mut rt_sub: Vec<_> = rt.find_all(&prefix).map(|(k, v)| (k.to_string(), *v)).collect();
		pv_sub.sort();
		rt_sub.sort();
		prop_assert_eq!(pv_sub, rt_sub);
	}
}
