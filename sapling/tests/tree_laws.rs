//! Algebraic laws of the lazy tree and the shrink orderings primitives
//! guarantee.

use sapling::{LazyTree, Seed, int_in_range, list_of};

fn child_roots<T: Clone + 'static>(tree: &LazyTree<T>, limit: usize) -> Vec<T> {
    tree.children().take(limit).map(|c| c.root).collect()
}

#[test]
fn map_identity_preserves_root_and_children() {
    let tree = int_in_range(0i64..=1000).run_tree(Seed::new(3), 10).unwrap();
    let mapped = tree.clone().map(|n| n);
    assert_eq!(tree.root, mapped.root);
    assert_eq!(child_roots(&tree, 16), child_roots(&mapped, 16));
}

#[test]
fn map_composes() {
    let draw = || int_in_range(0i64..=1000).run_tree(Seed::new(4), 10).unwrap();
    let composed = draw().map(|n| (n * 2) + 1);
    let chained = draw().map(|n| n * 2).map(|n| n + 1);
    assert_eq!(composed.root, chained.root);
    assert_eq!(child_roots(&composed, 16), child_roots(&chained, 16));
}

#[test]
fn map_reaches_children_of_children() {
    let tree = int_in_range(0i64..=1000)
        .run_tree(Seed::new(5), 10)
        .unwrap()
        .map(|n| n + 1);
    for child in tree.children().take(4) {
        for grandchild in child.children().take(4) {
            assert!(grandchild.root >= 1);
        }
    }
}

#[test]
fn flatten_collapses_nested_singletons() {
    let nested = LazyTree::singleton(LazyTree::singleton(42));
    let flat = nested.flatten();
    assert_eq!(flat.root, 42);
    assert!(flat.children().next().is_none());
}

#[test]
fn flatten_after_singleton_mapping_is_root_identity() {
    let tree = int_in_range(0i64..=1000).run_tree(Seed::new(6), 10).unwrap();
    let flat = tree.clone().map(LazyTree::singleton).flatten();
    assert_eq!(flat.root, tree.root);
}

#[test]
fn repeated_forcing_yields_equal_subtrees() {
    let tree = int_in_range(0i64..=100_000).run_tree(Seed::new(7), 10).unwrap();
    assert_eq!(child_roots(&tree, 24), child_roots(&tree, 24));
    let once: Vec<Vec<i64>> = tree
        .children()
        .take(4)
        .map(|c| child_roots(&c, 8))
        .collect();
    let twice: Vec<Vec<i64>> = tree
        .children()
        .take(4)
        .map(|c| child_roots(&c, 8))
        .collect();
    assert_eq!(once, twice);
}

#[test]
fn ranged_integer_first_child_is_zero_when_zero_is_in_range() {
    for seed in 0..50 {
        let tree = int_in_range(0i64..=10_000)
            .run_tree(Seed::new(seed), 10)
            .unwrap();
        if tree.root != 0 {
            assert_eq!(tree.children().next().map(|c| c.root), Some(0));
            return;
        }
    }
    panic!("never drew a nonzero value");
}

#[test]
fn list_children_contain_every_one_deletion_first() {
    for seed in 0..50 {
        let tree = list_of(int_in_range(0i64..=100), ..)
            .run_tree(Seed::new(seed), 8)
            .unwrap();
        let full = tree.root.clone();
        if full.len() < 2 {
            continue;
        }
        let first_n: Vec<Vec<i64>> = tree.children().take(full.len()).map(|c| c.root).collect();
        for position in 0..full.len() {
            let mut expected = full.clone();
            expected.remove(position);
            assert!(first_n.contains(&expected));
        }
        return;
    }
    panic!("never drew a list with at least two elements");
}

#[test]
fn generator_trees_are_deterministic_at_depth() {
    let gen = list_of(int_in_range(0i64..=100), ..);
    let a = gen.run_tree(Seed::new(11), 12).unwrap();
    let b = gen.run_tree(Seed::new(11), 12).unwrap();
    assert_eq!(a.root, b.root);
    let a_children = child_roots(&a, 10);
    let b_children = child_roots(&b, 10);
    assert_eq!(a_children, b_children);
}
