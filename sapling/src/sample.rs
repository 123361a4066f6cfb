//! Exposing generators as lazy sample streams.

use rand::RngCore;

use crate::error::GenError;
use crate::generator::Gen;
use crate::lift::IntoGen;
use crate::seed::Seed;

/// Cap on the generation size a sample stream grows to.
const MAX_SAMPLE_SIZE: usize = 100;

/// Generation size used by [`pick`].
const PICK_SIZE: usize = 10;

/// An endless stream of sampled roots.
///
/// Each step splits a fresh sub-seed off the stream's seed, draws at the
/// current size and emits the tree's root; the size grows by one per draw
/// up to a cap. Dropping the iterator cancels the stream.
pub struct Samples<T> {
    gen: Gen<T>,
    seed: Seed,
    size: usize,
}

impl<T: Clone + 'static> Samples<T> {
    /// Start a sample stream from an explicit seed.
    pub fn new(gen: impl IntoGen<T>, seed: u64) -> Self {
        Samples {
            gen: gen.into_gen(),
            seed: Seed::new(seed),
            size: 1,
        }
    }
}

impl<T: Clone + 'static> Iterator for Samples<T> {
    type Item = Result<T, GenError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (s_draw, s_next) = self.seed.split();
        self.seed = s_next;
        let drawn = self.gen.run_tree(s_draw, self.size).map(|tree| tree.root);
        self.size = (self.size + 1).min(MAX_SAMPLE_SIZE);
        Some(drawn)
    }
}

/// Stream samples from a generator, seeded explicitly for reproducibility.
pub fn samples<T: Clone + 'static>(gen: impl IntoGen<T>, seed: u64) -> Samples<T> {
    Samples::new(gen, seed)
}

/// Draw `n` values from a generator using an entropy seed.
pub fn take<T: Clone + 'static>(gen: impl IntoGen<T>, n: usize) -> Result<Vec<T>, GenError> {
    samples(gen, rand::thread_rng().next_u64()).take(n).collect()
}

/// Draw a single value using an ambient entropy seed, for examples and
/// interactive exploration.
pub fn pick<T: Clone + 'static>(gen: impl IntoGen<T>) -> Result<T, GenError> {
    let gen = gen.into_gen();
    let seed = Seed::new(rand::thread_rng().next_u64());
    Ok(gen.run_tree(seed, PICK_SIZE)?.root)
}
