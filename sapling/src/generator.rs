//! The generator abstraction and its combinators.
//!
//! A [`Gen<T>`] is a pure function from a seed and a size to a lazy shrink
//! tree. Generators are plain values: they compose without executing and a
//! given `(seed, size)` pair always reproduces the same tree, including the
//! children forced during shrinking.

use std::fmt;
use std::rc::Rc;

use crate::error::GenError;
use crate::lift::IntoGen;
use crate::primitives::int_in_range;
use crate::seed::Seed;
use crate::tree::{Children, LazyTree};

/// Default retry budget for [`Gen::filter`] and the filtering side of
/// generator construction.
pub const DEFAULT_FILTER_RETRIES: usize = 25;

/// A generator of values of type `T`, carrying integrated shrinking.
pub struct Gen<T> {
    run: Rc<dyn Fn(Seed, usize) -> Result<LazyTree<T>, GenError>>,
}

impl<T> Clone for Gen<T> {
    fn clone(&self) -> Self {
        Gen {
            run: Rc::clone(&self.run),
        }
    }
}

impl<T: Clone + 'static> Gen<T> {
    /// Wrap a draw function into a generator.
    pub fn from_fn(run: impl Fn(Seed, usize) -> Result<LazyTree<T>, GenError> + 'static) -> Self {
        Gen { run: Rc::new(run) }
    }

    /// Produce the full shrink tree for one draw.
    pub fn run_tree(&self, seed: Seed, size: usize) -> Result<LazyTree<T>, GenError> {
        (self.run)(seed, size)
    }

    /// Transform every generated value (and all of its shrinks) with `f`.
    pub fn map<U: Clone + 'static>(self, f: impl Fn(T) -> U + 'static) -> Gen<U> {
        let f = Rc::new(f);
        Gen::from_fn(move |seed, size| {
            let f = Rc::clone(&f);
            Ok(self.run_tree(seed, size)?.map(move |value| f(value)))
        })
    }

    /// Monadic composition: generate a value, then generate from the
    /// generator `k` returns for it.
    ///
    /// The seed is split so the two stages draw from independent streams.
    /// When the result shrinks, the derived value's own shrinks are tried
    /// first; afterwards the source value shrinks and is re-bound through
    /// `k` with the same inner seed.
    pub fn bind<U: Clone + 'static>(self, k: impl Fn(T) -> Gen<U> + 'static) -> Gen<U> {
        let k = Rc::new(k);
        Gen::from_fn(move |seed, size| {
            let (s1, s2) = seed.split();
            let outer = self.run_tree(s1, size)?;
            let inner = k(outer.root.clone()).run_tree(s2, size)?;
            let k = Rc::clone(&k);
            let rebind: Rc<dyn Fn(T) -> Option<LazyTree<U>>> =
                Rc::new(move |value| k(value).run_tree(s2, size).ok());
            Ok(rebind_children(inner, outer.children_handle(), rebind))
        })
    }

    /// Like [`Gen::bind`], but `f` may reject a drawn value by returning
    /// `None`, in which case the whole draw is retried with a fresh seed.
    ///
    /// After the first draw plus `retries` re-draws have all been rejected
    /// the generator fails with [`GenError::FilterTooNarrow`], carrying the
    /// last rejected value.
    pub fn bind_filter<U: Clone + 'static>(
        self,
        f: impl Fn(T) -> Option<Gen<U>> + 'static,
        retries: usize,
    ) -> Gen<U>
    where
        T: fmt::Debug,
    {
        let f = Rc::new(f);
        Gen::from_fn(move |seed, size| {
            let mut seed = seed;
            let mut last_rejected = String::new();
            for _ in 0..=retries {
                let (s_draw, s_retry) = seed.split();
                let (s1, s2) = s_draw.split();
                let outer = self.run_tree(s1, size)?;
                match f(outer.root.clone()) {
                    None => {
                        last_rejected = format!("{:?}", outer.root);
                        seed = s_retry;
                        continue;
                    }
                    Some(gen) => {
                        let inner = gen.run_tree(s2, size)?;
                        let f = Rc::clone(&f);
                        let rebind: Rc<dyn Fn(T) -> Option<LazyTree<U>>> = Rc::new(move |value| {
                            f(value).and_then(|g| g.run_tree(s2, size).ok())
                        });
                        return Ok(rebind_children(inner, outer.children_handle(), rebind));
                    }
                }
            }
            Err(GenError::filter_too_narrow(retries, last_rejected))
        })
    }

    /// Keep only values satisfying `pred`, re-drawing rejected values.
    ///
    /// Shrink candidates failing `pred` are pruned from the tree together
    /// with their subtrees. Fails with [`GenError::FilterTooNarrow`] after
    /// the first draw plus `retries` re-draws were all rejected, carrying
    /// the last rejected value.
    pub fn filter(self, pred: impl Fn(&T) -> bool + 'static, retries: usize) -> Gen<T>
    where
        T: fmt::Debug,
    {
        let pred = Rc::new(pred);
        Gen::from_fn(move |seed, size| {
            let mut seed = seed;
            let mut last_rejected = String::new();
            for _ in 0..=retries {
                let (s_draw, s_retry) = seed.split();
                let tree = self.run_tree(s_draw, size)?;
                if pred(&tree.root) {
                    let pred = Rc::clone(&pred);
                    return Ok(tree.filter(move |value| pred(value)));
                }
                last_rejected = format!("{:?}", tree.root);
                seed = s_retry;
            }
            Err(GenError::filter_too_narrow(retries, last_rejected))
        })
    }

    /// Ignore the incoming size and always generate at `size`.
    pub fn resize(self, size: usize) -> Gen<T> {
        Gen::from_fn(move |seed, _| self.run_tree(seed, size))
    }

    /// Transform the incoming size with `f` before generating.
    pub fn scale(self, f: impl Fn(usize) -> usize + 'static) -> Gen<T> {
        let f = Rc::new(f);
        sized(move |size| {
            let scaled = f(size);
            self.clone().resize(scaled)
        })
    }

    /// Discard the shrink tree: failing values generated through the
    /// result are reported as-is.
    pub fn no_shrink(self) -> Gen<T> {
        Gen::from_fn(move |seed, size| {
            let tree = self.run_tree(seed, size)?;
            Ok(LazyTree::singleton(tree.root))
        })
    }

    /// Pin the generator to a fixed seed, making every draw identical.
    pub fn seeded(self, seed: u64) -> Gen<T> {
        Gen::from_fn(move |_, size| self.run_tree(Seed::new(seed), size))
    }
}

/// Graft re-bound shrinks of the source value onto the derived tree.
///
/// The derived tree's own children come first; then each shrink of the
/// source is re-bound through `k`. A shrink whose re-bind fails to draw is
/// pruned rather than aborting the traversal.
fn rebind_children<T: Clone + 'static, U: Clone + 'static>(
    inner: LazyTree<U>,
    outer_children: Children<T>,
    k: Rc<dyn Fn(T) -> Option<LazyTree<U>>>,
) -> LazyTree<U> {
    let inner_children = inner.children_handle();
    LazyTree::from_parts(
        inner.root,
        Children::new(move || {
            let k = Rc::clone(&k);
            inner_children.iter().chain(
                outer_children
                    .iter()
                    .filter_map(move |child| bind_subtree(child, Rc::clone(&k))),
            )
        }),
    )
}

fn bind_subtree<T: Clone + 'static, U: Clone + 'static>(
    tree: LazyTree<T>,
    k: Rc<dyn Fn(T) -> Option<LazyTree<U>>>,
) -> Option<LazyTree<U>> {
    let inner = k(tree.root.clone())?;
    Some(rebind_children(inner, tree.children_handle(), k))
}

/// A generator that always produces `value`, with no shrinks.
pub fn constant<T: Clone + 'static>(value: T) -> Gen<T> {
    Gen::from_fn(move |_, _| Ok(LazyTree::singleton(value.clone())))
}

/// Build a size-dependent generator.
pub fn sized<T: Clone + 'static>(f: impl Fn(usize) -> Gen<T> + 'static) -> Gen<T> {
    Gen::from_fn(move |seed, size| f(size).run_tree(seed, size))
}

/// Choose among weighted generators.
///
/// An integer is drawn in `1..=sum(weights)` and the generator whose
/// cumulative-weight range contains it is invoked with an independent
/// seed. Because the drawn integer shrinks toward 1, failures shrink
/// toward the first element of the input list.
pub fn frequency<T: Clone + 'static>(choices: Vec<(u32, Gen<T>)>) -> Gen<T> {
    if choices.is_empty() {
        return Gen::from_fn(|_, _| Err(GenError::EmptyEnum));
    }
    let total: u64 = choices.iter().map(|(weight, _)| u64::from(*weight)).sum();
    if total == 0 {
        return Gen::from_fn(|_, _| {
            Err(GenError::invalid_option(
                "frequency weights must sum to a positive value",
            ))
        });
    }
    let choices = Rc::new(choices);
    int_in_range(1..=total).bind(move |pick| {
        let mut cumulative = 0u64;
        for (weight, gen) in choices.iter().take(choices.len() - 1) {
            cumulative += u64::from(*weight);
            if pick <= cumulative {
                return gen.clone();
            }
        }
        choices[choices.len() - 1].1.clone()
    })
}

/// Choose uniformly among generators. The choice index shrinks toward 0,
/// so failures shrink toward the first generator in the list.
pub fn one_of<T: Clone + 'static>(gens: Vec<Gen<T>>) -> Gen<T> {
    if gens.is_empty() {
        return Gen::from_fn(|_, _| Err(GenError::EmptyEnum));
    }
    let last = gens.len() - 1;
    let gens = Rc::new(gens);
    int_in_range(0..=last).bind(move |index| gens[index].clone())
}

/// Choose uniformly among fixed values, shrinking toward the first.
pub fn member_of<T: Clone + 'static>(items: Vec<T>) -> Gen<T> {
    if items.is_empty() {
        return Gen::from_fn(|_, _| Err(GenError::EmptyEnum));
    }
    let last = items.len() - 1;
    let items = Rc::new(items);
    int_in_range(0..=last).map(move |index| items[index].clone())
}

/// Build a recursive generator, such as for tree-shaped data.
///
/// `leaf` terminates the recursion; `subtree` wraps a generator for the
/// structure one level down. The number of levels grows logarithmically in
/// the current size and recursive levels run at geometrically smaller
/// sizes, which bounds expansion. Values shrink toward leaves.
pub fn tree<T: Clone + 'static>(
    leaf: impl IntoGen<T>,
    subtree: impl Fn(Gen<T>) -> Gen<T> + 'static,
) -> Gen<T> {
    let leaf = leaf.into_gen();
    let subtree = Rc::new(subtree);
    sized(move |size| {
        let levels = usize::BITS - size.max(1).leading_zeros();
        let mut acc = leaf.clone();
        let mut level_size = size;
        for _ in 0..levels {
            let inner = subtree(acc.clone());
            acc = frequency(vec![(1, acc), (2, inner.resize(level_size))]);
            level_size /= 2;
        }
        acc
    })
}
