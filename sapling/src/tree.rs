//! Lazy rose trees: the shrink structure carried by every generated value.
//!
//! A tree's root is the value that was drawn; its children are progressively
//! smaller candidates of the same type, computed on demand. All combinators
//! operate on the tree, which is how shrinking survives composition.

use std::rc::Rc;

use num_traits::PrimInt;

/// The lazily-computed child sequence of a [`LazyTree`].
///
/// Children are a stateless thunk: every call to [`Children::iter`]
/// reconstructs the sequence from the parameters captured at construction
/// time, so forcing the sequence twice yields equivalent subtrees. Nothing
/// is memoized.
pub(crate) struct Children<T> {
    make: Rc<dyn Fn() -> Box<dyn Iterator<Item = LazyTree<T>>>>,
}

impl<T> Clone for Children<T> {
    fn clone(&self) -> Self {
        Children {
            make: Rc::clone(&self.make),
        }
    }
}

impl<T: 'static> Children<T> {
    pub(crate) fn new<F, I>(make: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: Iterator<Item = LazyTree<T>> + 'static,
    {
        Children {
            make: Rc::new(move || Box::new(make())),
        }
    }

    pub(crate) fn empty() -> Self {
        Children::new(std::iter::empty)
    }

    pub(crate) fn iter(&self) -> Box<dyn Iterator<Item = LazyTree<T>>> {
        (self.make)()
    }
}

/// A rose tree with an eagerly-realized root and lazy, possibly very wide
/// child sequences.
pub struct LazyTree<T> {
    /// The generated value at this node.
    pub root: T,
    pub(crate) children: Children<T>,
}

impl<T: Clone> Clone for LazyTree<T> {
    fn clone(&self) -> Self {
        LazyTree {
            root: self.root.clone(),
            children: self.children.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LazyTree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyTree").field("root", &self.root).finish()
    }
}

impl<T: PartialEq> PartialEq for LazyTree<T> {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl<T: Clone + 'static> LazyTree<T> {
    /// A tree with no shrinks.
    pub fn singleton(root: T) -> Self {
        LazyTree {
            root,
            children: Children::empty(),
        }
    }

    pub(crate) fn from_parts(root: T, children: Children<T>) -> Self {
        LazyTree { root, children }
    }

    pub(crate) fn children_handle(&self) -> Children<T> {
        self.children.clone()
    }

    /// Iterate this node's children, forcing each subtree on demand.
    pub fn children(&self) -> Box<dyn Iterator<Item = LazyTree<T>>> {
        self.children.iter()
    }

    /// Apply `f` to every value in the tree. The root is mapped eagerly,
    /// children lazily as they are forced.
    pub fn map<U: Clone + 'static>(self, f: impl Fn(T) -> U + 'static) -> LazyTree<U> {
        self.map_rc(Rc::new(f))
    }

    fn map_rc<U: Clone + 'static>(self, f: Rc<dyn Fn(T) -> U>) -> LazyTree<U> {
        let LazyTree { root, children } = self;
        let child_f = Rc::clone(&f);
        LazyTree {
            root: f(root),
            children: Children::new(move || {
                let child_f = Rc::clone(&child_f);
                children.iter().map(move |c| c.map_rc(Rc::clone(&child_f)))
            }),
        }
    }

    /// Prune children whose roots fail `pred`, recursively.
    ///
    /// The root itself is exempt: the caller guarantees it already satisfies
    /// the predicate.
    pub fn filter(self, pred: impl Fn(&T) -> bool + 'static) -> LazyTree<T> {
        self.filter_rc(Rc::new(pred))
    }

    fn filter_rc(self, pred: Rc<dyn Fn(&T) -> bool>) -> LazyTree<T> {
        let LazyTree { root, children } = self;
        LazyTree {
            root,
            children: Children::new(move || {
                let keep = Rc::clone(&pred);
                let recurse = Rc::clone(&pred);
                children
                    .iter()
                    .filter(move |c| keep(&c.root))
                    .map(move |c| c.filter_rc(Rc::clone(&recurse)))
            }),
        }
    }

    /// Map and prune in one pass. Returns `None` when the root itself maps
    /// to `None`; children mapping to `None` are dropped together with
    /// their subtrees.
    pub fn map_filter<U: Clone + 'static>(
        self,
        f: impl Fn(T) -> Option<U> + 'static,
    ) -> Option<LazyTree<U>> {
        self.map_filter_rc(Rc::new(f))
    }

    fn map_filter_rc<U: Clone + 'static>(self, f: Rc<dyn Fn(T) -> Option<U>>) -> Option<LazyTree<U>> {
        let LazyTree { root, children } = self;
        let root = f(root)?;
        let child_f = Rc::clone(&f);
        Some(LazyTree {
            root,
            children: Children::new(move || {
                let child_f = Rc::clone(&child_f);
                children
                    .iter()
                    .filter_map(move |c| c.map_filter_rc(Rc::clone(&child_f)))
            }),
        })
    }

    /// Combine a list of trees into a tree of lists.
    ///
    /// The root is the list of roots. Each child replaces exactly one
    /// position with one of that position's shrinks, which lets every
    /// component shrink independently.
    pub fn zip(trees: Vec<LazyTree<T>>) -> LazyTree<Vec<T>> {
        let root: Vec<T> = trees.iter().map(|t| t.root.clone()).collect();
        let trees = Rc::new(trees);
        LazyTree {
            root,
            children: Children::new(move || {
                let trees = Rc::clone(&trees);
                let len = trees.len();
                (0..len).flat_map(move |position| {
                    let trees = Rc::clone(&trees);
                    let kids = trees[position].children.clone();
                    kids.iter().map(move |replacement| {
                        let mut replaced = trees.as_ref().clone();
                        replaced[position] = replacement;
                        LazyTree::zip(replaced)
                    })
                })
            }),
        }
    }

    /// Build the shrink tree of a list from the trees of its elements.
    ///
    /// Children enumerate every one-deletion first (as long as the list
    /// stays at least `min_len` long), then every single-position element
    /// shrink, each recursively a list tree again.
    pub fn list_tree(trees: Vec<LazyTree<T>>, min_len: usize) -> LazyTree<Vec<T>> {
        let root: Vec<T> = trees.iter().map(|t| t.root.clone()).collect();
        let trees = Rc::new(trees);
        LazyTree {
            root,
            children: Children::new(move || {
                let len = trees.len();
                let deletable = if len > min_len { len } else { 0 };
                let for_deletions = Rc::clone(&trees);
                let deletions = (0..deletable).map(move |position| {
                    let mut remaining = for_deletions.as_ref().clone();
                    remaining.remove(position);
                    LazyTree::list_tree(remaining, min_len)
                });
                let for_replacements = Rc::clone(&trees);
                let replacements = (0..len).flat_map(move |position| {
                    let trees = Rc::clone(&for_replacements);
                    let kids = trees[position].children.clone();
                    kids.iter().map(move |replacement| {
                        let mut replaced = trees.as_ref().clone();
                        replaced[position] = replacement;
                        LazyTree::list_tree(replaced, min_len)
                    })
                });
                deletions.chain(replacements)
            }),
        }
    }
}

impl<T: Clone + 'static> LazyTree<LazyTree<T>> {
    /// Collapse a tree of trees.
    ///
    /// The inner tree's own shrinks come before the outer tree's shrinks,
    /// so a value produced through `bind` first shrinks in place before the
    /// value it was derived from is shrunk.
    pub fn flatten(self) -> LazyTree<T> {
        let LazyTree {
            root: inner,
            children: outer_children,
        } = self;
        let LazyTree {
            root,
            children: inner_children,
        } = inner;
        LazyTree {
            root,
            children: Children::new(move || {
                inner_children
                    .iter()
                    .chain(outer_children.iter().map(|t| t.flatten()))
            }),
        }
    }
}

/// The shrink-candidate sequence for an integer: the origin first, then
/// values whose distance to `value` halves at every step.
///
/// For `value = n` and `origin = 0` this is the sequence
/// `0, n/2, 3n/4, 7n/8, …`. The distance is computed as
/// `value / 2 - origin / 2` so the arithmetic cannot overflow at the
/// extremes of a full-width range.
pub(crate) fn halvings_toward<T: PrimInt>(origin: T, value: T) -> impl Iterator<Item = T> {
    let two = T::one() + T::one();
    let mut diff = value / two - origin / two;
    let mut at_origin = true;
    std::iter::from_fn(move || {
        if at_origin {
            at_origin = false;
            if value == origin {
                return None;
            }
            return Some(origin);
        }
        while diff != T::zero() {
            let candidate = value - diff;
            diff = diff / two;
            if candidate != origin {
                return Some(candidate);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_roots<T: Clone + 'static>(tree: &LazyTree<T>, limit: usize) -> Vec<T> {
        tree.children().take(limit).map(|c| c.root).collect()
    }

    fn int_tree(value: i64) -> LazyTree<i64> {
        LazyTree::from_parts(
            value,
            Children::new(move || halvings_toward(0, value).map(int_tree)),
        )
    }

    #[test]
    fn test_singleton_has_no_children() {
        let tree = LazyTree::singleton(42);
        assert_eq!(tree.root, 42);
        assert!(tree.children().next().is_none());
    }

    #[test]
    fn test_map_applies_to_root_and_children() {
        let tree = int_tree(8).map(|n| n * 10);
        assert_eq!(tree.root, 80);
        assert_eq!(child_roots(&tree, 2), vec![0, 40]);
    }

    #[test]
    fn test_map_identity_law() {
        let tree = int_tree(10);
        let mapped = tree.clone().map(|n| n);
        assert_eq!(tree.root, mapped.root);
        assert_eq!(child_roots(&tree, 8), child_roots(&mapped, 8));
    }

    #[test]
    fn test_map_composition_law() {
        let double = |n: i64| n * 2;
        let inc = |n: i64| n + 1;
        let composed = int_tree(10).map(move |n| inc(double(n)));
        let chained = int_tree(10).map(double).map(inc);
        assert_eq!(composed.root, chained.root);
        assert_eq!(child_roots(&composed, 8), child_roots(&chained, 8));
    }

    #[test]
    fn test_forcing_children_twice_yields_equal_subtrees() {
        let tree = int_tree(100);
        assert_eq!(child_roots(&tree, 10), child_roots(&tree, 10));
    }

    #[test]
    fn test_flatten_of_nested_singletons() {
        let nested = LazyTree::singleton(LazyTree::singleton(7));
        let flat = nested.flatten();
        assert_eq!(flat.root, 7);
        assert!(flat.children().next().is_none());
    }

    #[test]
    fn test_flatten_right_identity_at_root() {
        let tree = int_tree(12);
        let flat = tree.clone().map(LazyTree::singleton).flatten();
        assert_eq!(flat.root, tree.root);
    }

    #[test]
    fn test_flatten_puts_inner_shrinks_first() {
        // outer shrink is a singleton 99; inner shrinks of 2 are 0 and 1
        let outer = LazyTree::from_parts(
            int_tree(2),
            Children::new(|| std::iter::once(LazyTree::singleton(LazyTree::singleton(99)))),
        );
        let flat = outer.flatten();
        assert_eq!(flat.root, 2);
        assert_eq!(child_roots(&flat, 3), vec![0, 1, 99]);
    }

    #[test]
    fn test_filter_keeps_root_and_prunes_children() {
        let tree = int_tree(9).filter(|n| n % 2 == 1);
        assert_eq!(tree.root, 9);
        // halvings of 9 are 0, 5, 7, 8; evens are pruned
        assert_eq!(child_roots(&tree, 4), vec![5, 7]);
    }

    #[test]
    fn test_filter_recurses_into_kept_children() {
        let tree = int_tree(9).filter(|n| n % 2 == 1);
        let first = tree.children().next().map(|c| child_roots(&c, 4));
        // children of 5 are 0, 3, 4; evens pruned again
        assert_eq!(first, Some(vec![3]));
    }

    #[test]
    fn test_map_filter_none_at_root() {
        let tree = int_tree(4);
        assert!(tree.map_filter(|_: i64| Option::<i64>::None).is_none());
    }

    #[test]
    fn test_map_filter_maps_and_prunes() {
        let tree = int_tree(9)
            .map_filter(|n| if n % 2 == 1 { Some(n * 10) } else { None })
            .unwrap();
        assert_eq!(tree.root, 90);
        assert_eq!(child_roots(&tree, 4), vec![50, 70]);
    }

    #[test]
    fn test_zip_roots_and_one_position_replacements() {
        let tree = LazyTree::zip(vec![int_tree(2), int_tree(3)]);
        assert_eq!(tree.root, vec![2, 3]);
        // position 0 shrinks first (2 -> 0, 1), then position 1 (3 -> 0, 2)
        assert_eq!(
            child_roots(&tree, 4),
            vec![vec![0, 3], vec![1, 3], vec![2, 0], vec![2, 2]]
        );
    }

    #[test]
    fn test_list_tree_deletions_come_first() {
        let tree = LazyTree::list_tree(vec![int_tree(1), int_tree(2), int_tree(3)], 0);
        assert_eq!(tree.root, vec![1, 2, 3]);
        let first_three = child_roots(&tree, 3);
        assert_eq!(first_three, vec![vec![2, 3], vec![1, 3], vec![1, 2]]);
    }

    #[test]
    fn test_list_tree_respects_min_len() {
        let tree = LazyTree::list_tree(vec![int_tree(5), int_tree(6)], 2);
        for child in tree.children().take(16) {
            assert_eq!(child.root.len(), 2);
        }
    }

    #[test]
    fn test_list_tree_shrinks_elements_in_place() {
        let tree = LazyTree::list_tree(vec![int_tree(4)], 1);
        assert_eq!(child_roots(&tree, 2), vec![vec![0], vec![2]]);
    }

    #[test]
    fn test_halvings_sequence_toward_zero() {
        let seq: Vec<i64> = halvings_toward(0, 10).collect();
        assert_eq!(seq, vec![0, 5, 8, 9]);
    }

    #[test]
    fn test_halvings_from_negative_value() {
        let seq: Vec<i64> = halvings_toward(0, -10).collect();
        assert_eq!(seq, vec![0, -5, -8, -9]);
    }

    #[test]
    fn test_halvings_toward_nonzero_origin() {
        let seq: Vec<i64> = halvings_toward(3, 10).collect();
        assert_eq!(seq, vec![3, 6, 8, 9]);
    }

    #[test]
    fn test_halvings_at_origin_is_empty() {
        assert_eq!(halvings_toward(0i64, 0).count(), 0);
    }

    #[test]
    fn test_halvings_never_repeat_the_origin() {
        let seq: Vec<i64> = halvings_toward(1, 2).collect();
        assert_eq!(seq, vec![1]);
    }

    #[test]
    fn test_halvings_full_width_range_does_not_overflow() {
        let seq: Vec<i64> = halvings_toward(0, i64::MAX).take(3).collect();
        assert_eq!(seq[0], 0);
        assert!(seq[1] > 0 && seq[1] < i64::MAX);
    }
}
