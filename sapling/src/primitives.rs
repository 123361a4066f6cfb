//! Primitive generators for numbers, collections, strings and maps.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::ops::{RangeFrom, RangeFull, RangeInclusive};
use std::rc::Rc;

use num_traits::PrimInt;
use rand::distributions::uniform::SampleUniform;

use crate::error::GenError;
use crate::generator::{DEFAULT_FILTER_RETRIES, Gen, constant, frequency, member_of, sized};
use crate::lift::IntoGen;
use crate::seed::Seed;
use crate::tree::{Children, LazyTree, halvings_toward};

/// Default retry budget for uniqueness-constrained collections.
pub const DEFAULT_UNIQ_TRIES: usize = 10;

/// Length option for collection generators.
///
/// The upper bound defaults to the current generation size, so collections
/// grow as the run progresses unless an explicit maximum is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeRange {
    min: usize,
    max: Option<usize>,
}

impl SizeRange {
    /// A length range with an explicit minimum and optional maximum.
    ///
    /// The bounds are seed-independent, so a malformed range is rejected
    /// here rather than on the first draw.
    pub fn new(min: usize, max: Option<usize>) -> Self {
        if let Some(max) = max {
            if max < min {
                panic!(
                    "SizeRange cannot be created with max {} smaller than min {}",
                    max, min
                );
            }
        }
        SizeRange { min, max }
    }

    /// The smallest length a collection may shrink to.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Draw a concrete length for the current generation size.
    pub(crate) fn resolve(&self, size: usize, seed: Seed) -> usize {
        let upper = match self.max {
            Some(max) => max,
            None => self.min.max(size),
        };
        seed.uniform_in_range(self.min, upper)
    }
}

impl Default for SizeRange {
    fn default() -> Self {
        SizeRange { min: 0, max: None }
    }
}

impl From<usize> for SizeRange {
    fn from(len: usize) -> Self {
        SizeRange::new(len, Some(len))
    }
}

impl From<RangeInclusive<usize>> for SizeRange {
    fn from(range: RangeInclusive<usize>) -> Self {
        let (min, max) = range.into_inner();
        SizeRange::new(min, Some(max))
    }
}

impl From<RangeFrom<usize>> for SizeRange {
    fn from(range: RangeFrom<usize>) -> Self {
        SizeRange::new(range.start, None)
    }
}

impl From<RangeFull> for SizeRange {
    fn from(_: RangeFull) -> Self {
        SizeRange::default()
    }
}

fn int_tree<T>(value: T, origin: T) -> LazyTree<T>
where
    T: PrimInt + 'static,
{
    LazyTree::from_parts(
        value,
        Children::new(move || halvings_toward(origin, value).map(move |c| int_tree(c, origin))),
    )
}

/// Uniform integer in an inclusive range, shrinking by halving toward 0
/// (clamped into the range, so a range that excludes 0 shrinks toward the
/// bound nearest 0). Reversed ranges are normalized by swapping.
pub fn int_in_range<T>(range: RangeInclusive<T>) -> Gen<T>
where
    T: PrimInt + SampleUniform + 'static,
{
    let (start, end) = range.into_inner();
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    let zero = T::zero();
    let origin = if lo > zero {
        lo
    } else if hi < zero {
        hi
    } else {
        zero
    };
    Gen::from_fn(move |seed, _| Ok(int_tree(seed.uniform_in_range(lo, hi), origin)))
}

/// Size-scaled signed integer in `-size..=size`, shrinking toward 0.
pub fn int() -> Gen<i64> {
    sized(|size| int_in_range(-(size as i64)..=size as i64))
}

/// Size-scaled integer in `1..=size`, shrinking toward 1.
pub fn positive_int() -> Gen<i64> {
    sized(|size| int_in_range(1..=size.max(1) as i64))
}

/// A single byte, shrinking toward 0.
pub fn byte() -> Gen<u8> {
    int_in_range(0..=u8::MAX)
}

/// `false` or `true`, shrinking toward `false`.
pub fn boolean() -> Gen<bool> {
    member_of(vec![false, true])
}

fn float_halvings(origin: f64, value: f64) -> impl Iterator<Item = f64> {
    let mut diff = value / 2.0 - origin / 2.0;
    let mut at_origin = true;
    std::iter::from_fn(move || {
        if at_origin {
            at_origin = false;
            if value == origin || !value.is_finite() {
                return None;
            }
            return Some(origin);
        }
        while diff != 0.0 {
            let candidate = value - diff;
            diff /= 2.0;
            if candidate == value {
                return None;
            }
            if candidate != origin {
                return Some(candidate);
            }
        }
        None
    })
}

fn float_tree(value: f64, origin: f64) -> LazyTree<f64> {
    LazyTree::from_parts(
        value,
        Children::new(move || float_halvings(origin, value).map(move |c| float_tree(c, origin))),
    )
}

/// Uniform float in an inclusive range, shrinking toward 0.0 clamped into
/// the range. Reversed bounds are normalized by swapping.
pub fn float_in_range(range: RangeInclusive<f64>) -> Gen<f64> {
    let (start, end) = range.into_inner();
    Gen::from_fn(move |seed, _| {
        if !start.is_finite() || !end.is_finite() {
            return Err(GenError::invalid_option(
                "float bounds must be finite numbers",
            ));
        }
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let origin = 0.0f64.clamp(lo, hi);
        Ok(float_tree(seed.uniform_in_range(lo, hi), origin))
    })
}

/// Size-scaled float in `-size..=size`, shrinking toward 0.0.
pub fn float() -> Gen<f64> {
    sized(|size| float_in_range(-(size as f64)..=size as f64))
}

/// List of values drawn from `elem`.
///
/// Shrinks by deleting single elements (down to the minimum length) and by
/// shrinking elements in place.
pub fn list_of<T: Clone + 'static>(elem: impl IntoGen<T>, len: impl Into<SizeRange>) -> Gen<Vec<T>> {
    let elem = elem.into_gen();
    let len = len.into();
    Gen::from_fn(move |seed, size| {
        let (s_len, mut seed) = seed.split();
        let count = len.resolve(size, s_len);
        let mut trees = Vec::with_capacity(count);
        for _ in 0..count {
            let (s_elem, rest) = seed.split();
            trees.push(elem.run_tree(s_elem, size)?);
            seed = rest;
        }
        Ok(LazyTree::list_tree(trees, len.min()))
    })
}

/// List whose elements are unique under `key`.
///
/// Colliding draws are retried; after `max_tries` consecutive collisions
/// the draw fails with [`GenError::TooManyDuplicates`]. Shrinking goes
/// through the usual list mechanisms with non-unique candidates pruned.
pub fn uniq_list_of<T, K>(
    elem: impl IntoGen<T>,
    key: impl Fn(&T) -> K + 'static,
    len: impl Into<SizeRange>,
    max_tries: usize,
) -> Gen<Vec<T>>
where
    T: Clone + 'static,
    K: Hash + Eq + 'static,
{
    let elem = elem.into_gen();
    let len = len.into();
    let key = Rc::new(key);
    Gen::from_fn(move |seed, size| {
        let (s_len, mut seed) = seed.split();
        let count = len.resolve(size, s_len);
        let mut trees = Vec::with_capacity(count);
        let mut seen = HashSet::with_capacity(count);
        let mut misses = 0;
        while trees.len() < count {
            let (s_elem, rest) = seed.split();
            seed = rest;
            let tree = elem.run_tree(s_elem, size)?;
            if seen.insert(key(&tree.root)) {
                trees.push(tree);
                misses = 0;
            } else {
                misses += 1;
                if misses > max_tries {
                    return Err(GenError::too_many_duplicates(max_tries));
                }
            }
        }
        let key = Rc::clone(&key);
        Ok(LazyTree::list_tree(trees, len.min()).filter(move |items| {
            let mut seen = HashSet::with_capacity(items.len());
            items.iter().all(|item| seen.insert(key(item)))
        }))
    })
}

fn tuple2_tree<A, B>(a: LazyTree<A>, b: LazyTree<B>) -> LazyTree<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let root = (a.root.clone(), b.root.clone());
    LazyTree::from_parts(
        root,
        Children::new(move || {
            let (a_fixed, b_fixed) = (a.clone(), b.clone());
            let a_subs = a
                .children()
                .map(move |sub| tuple2_tree(sub, b_fixed.clone()));
            let b_subs = b
                .children()
                .map(move |sub| tuple2_tree(a_fixed.clone(), sub));
            a_subs.chain(b_subs)
        }),
    )
}

fn tuple3_tree<A, B, C>(a: LazyTree<A>, b: LazyTree<B>, c: LazyTree<C>) -> LazyTree<(A, B, C)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    let root = (a.root.clone(), b.root.clone(), c.root.clone());
    LazyTree::from_parts(
        root,
        Children::new(move || {
            let (a1, b1, c1) = (a.clone(), b.clone(), c.clone());
            let (a2, b2, c2) = (a.clone(), b.clone(), c.clone());
            let a_subs = a
                .children()
                .map(move |sub| tuple3_tree(sub, b1.clone(), c1.clone()));
            let b_subs = b
                .children()
                .map(move |sub| tuple3_tree(a1.clone(), sub, c2.clone()));
            let c_subs = c
                .children()
                .map(move |sub| tuple3_tree(a2.clone(), b2.clone(), sub));
            a_subs.chain(b_subs).chain(c_subs)
        }),
    )
}

/// Pair of independently-drawn values; each component shrinks on its own.
pub fn tuple2<A, B>(a: impl IntoGen<A>, b: impl IntoGen<B>) -> Gen<(A, B)>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    let (a, b) = (a.into_gen(), b.into_gen());
    Gen::from_fn(move |seed, size| {
        let (sa, sb) = seed.split();
        Ok(tuple2_tree(a.run_tree(sa, size)?, b.run_tree(sb, size)?))
    })
}

/// Triple of independently-drawn values; each component shrinks on its own.
pub fn tuple3<A, B, C>(a: impl IntoGen<A>, b: impl IntoGen<B>, c: impl IntoGen<C>) -> Gen<(A, B, C)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
{
    let (a, b, c) = (a.into_gen(), b.into_gen(), c.into_gen());
    Gen::from_fn(move |seed, size| {
        let (sa, rest) = seed.split();
        let (sb, sc) = rest.split();
        Ok(tuple3_tree(
            a.run_tree(sa, size)?,
            b.run_tree(sb, size)?,
            c.run_tree(sc, size)?,
        ))
    })
}

/// Quadruple of independently-drawn values; each component shrinks on its
/// own.
pub fn tuple4<A, B, C, D>(
    a: impl IntoGen<A>,
    b: impl IntoGen<B>,
    c: impl IntoGen<C>,
    d: impl IntoGen<D>,
) -> Gen<(A, B, C, D)>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
{
    let left = tuple2(a, b);
    let right = tuple2(c, d);
    tuple2(left, right).map(|((a, b), (c, d))| (a, b, c, d))
}

/// Map with exactly the given keys; only the values shrink.
pub fn fixed_map<K, V>(entries: Vec<(K, Gen<V>)>) -> Gen<BTreeMap<K, V>>
where
    K: Ord + Clone + 'static,
    V: Clone + 'static,
{
    let entries = Rc::new(entries);
    Gen::from_fn(move |seed, size| {
        let keys: Vec<K> = entries.iter().map(|(k, _)| k.clone()).collect();
        let mut trees = Vec::with_capacity(entries.len());
        let mut seed = seed;
        for (_, gen) in entries.iter() {
            let (s_value, rest) = seed.split();
            trees.push(gen.run_tree(s_value, size)?);
            seed = rest;
        }
        Ok(LazyTree::zip(trees)
            .map(move |values| keys.iter().cloned().zip(values).collect()))
    })
}

fn optional_map_tree<K, V>(entries: Vec<(K, bool, LazyTree<V>)>) -> LazyTree<BTreeMap<K, V>>
where
    K: Ord + Clone + 'static,
    V: Clone + 'static,
{
    let root: BTreeMap<K, V> = entries
        .iter()
        .map(|(k, _, t)| (k.clone(), t.root.clone()))
        .collect();
    let entries = Rc::new(entries);
    LazyTree::from_parts(
        root,
        Children::new(move || {
            let len = entries.len();
            let drop_src = Rc::clone(&entries);
            let drop_flags = Rc::clone(&entries);
            let drops = (0..len)
                .filter(move |i| !drop_flags[*i].1)
                .map(move |i| {
                    let mut rest = drop_src.as_ref().clone();
                    rest.remove(i);
                    optional_map_tree(rest)
                });
            let repl_src = Rc::clone(&entries);
            let replacements = (0..len).flat_map(move |i| {
                let entries = Rc::clone(&repl_src);
                let kids = entries[i].2.children_handle();
                kids.iter().map(move |sub| {
                    let mut replaced = entries.as_ref().clone();
                    replaced[i].2 = sub;
                    optional_map_tree(replaced)
                })
            });
            drops.chain(replacements)
        }),
    )
}

/// Map with a random subset of the given keys. Required keys are always
/// present; optional keys are dropped before values are shrunk.
pub fn optional_map<K, V>(entries: Vec<(K, Gen<V>)>, required: Vec<K>) -> Gen<BTreeMap<K, V>>
where
    K: Ord + Clone + 'static,
    V: Clone + 'static,
{
    let entries = Rc::new(entries);
    let required = Rc::new(required);
    Gen::from_fn(move |seed, size| {
        let mut included = Vec::with_capacity(entries.len());
        let mut seed = seed;
        for (key, gen) in entries.iter() {
            let (s_flag, rest) = seed.split();
            let (s_value, rest) = rest.split();
            seed = rest;
            let is_required = required.contains(key);
            if is_required || s_flag.uniform_float() < 0.5 {
                included.push((key.clone(), is_required, gen.run_tree(s_value, size)?));
            }
        }
        Ok(optional_map_tree(included))
    })
}

/// Map with random keys and values. Shrinks by removing entries, then by
/// shrinking keys and values (key uniqueness is preserved throughout).
pub fn map_of<K, V>(
    key: impl IntoGen<K>,
    value: impl IntoGen<V>,
    len: impl Into<SizeRange>,
    max_tries: usize,
) -> Gen<BTreeMap<K, V>>
where
    K: Ord + Hash + Clone + 'static,
    V: Clone + 'static,
{
    uniq_list_of(
        tuple2(key, value),
        |(k, _): &(K, V)| k.clone(),
        len,
        max_tries,
    )
    .map(|pairs| pairs.into_iter().collect())
}

/// Keyword list: identifier keys paired with generated values, keys unique.
pub fn keyword_of<V: Clone + 'static>(
    value: impl IntoGen<V>,
    len: impl Into<SizeRange>,
) -> Gen<Vec<(String, V)>> {
    uniq_list_of(
        tuple2(identifier(), value),
        |(k, _): &(String, V)| k.clone(),
        len,
        DEFAULT_UNIQ_TRIES,
    )
}

/// Byte string; shrinks shorter with bytes shrinking toward 0.
pub fn binary(len: impl Into<SizeRange>) -> Gen<Vec<u8>> {
    list_of(byte(), len)
}

/// Bit string; shrinks shorter with bits shrinking toward `false`.
pub fn bitstring(len: impl Into<SizeRange>) -> Gen<Vec<bool>> {
    list_of(boolean(), len)
}

/// Character sets for [`char_of`] and [`string`].
#[derive(Debug, Clone)]
pub enum Charset {
    /// `a-z`, `A-Z`, `0-9`; shrinks toward `a`
    Alphanumeric,
    /// The full 7-bit range; shrinks toward NUL
    Ascii,
    /// Printable ASCII; shrinks toward space
    Printable,
    /// An inclusive range of code points; shrinks toward the low end
    Range(RangeInclusive<char>),
    /// An explicit table; shrinks toward the first entry
    Choices(Vec<char>),
}

fn char_in_range(lo: char, hi: char) -> Gen<char> {
    int_in_range(lo as u32..=hi as u32).bind_filter(
        |code| char::from_u32(code).map(constant),
        DEFAULT_FILTER_RETRIES,
    )
}

/// A character drawn from the given set, shrinking toward the set's first
/// member.
pub fn char_of(charset: Charset) -> Gen<char> {
    match charset {
        Charset::Alphanumeric => {
            let table: Vec<char> = ('a'..='z').chain('A'..='Z').chain('0'..='9').collect();
            member_of(table)
        }
        Charset::Ascii => char_in_range('\0', '\x7f'),
        Charset::Printable => char_in_range(' ', '~'),
        Charset::Range(range) => char_in_range(*range.start(), *range.end()),
        Charset::Choices(table) => member_of(table),
    }
}

/// String of characters drawn from a set; shrinks shorter, with each
/// character shrinking toward the set's first member.
pub fn string(charset: Charset, len: impl Into<SizeRange>) -> Gen<String> {
    list_of(char_of(charset), len).map(|chars| chars.into_iter().collect())
}

/// Lowercase identifier-shaped string; shrinks shorter.
pub fn identifier() -> Gen<String> {
    let head = char_of(Charset::Range('a'..='z'));
    let tail_table: Vec<char> = ('a'..='z')
        .chain('0'..='9')
        .chain(std::iter::once('_'))
        .collect();
    tuple2(head, list_of(char_of(Charset::Choices(tail_table)), ..))
        .map(|(head, tail)| std::iter::once(head).chain(tail).collect())
}

/// A leaf value of any scalar shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Weighted choice over all scalar shapes, shrinking toward the boolean
/// and integer leaves.
pub fn scalar() -> Gen<Scalar> {
    frequency(vec![
        (4, boolean().map(Scalar::Bool)),
        (4, int().map(Scalar::Int)),
        (2, float().map(Scalar::Float)),
        (1, string(Charset::Alphanumeric, ..).map(Scalar::Text)),
    ])
}
