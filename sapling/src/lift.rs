//! Lifting plain values into generators.
//!
//! Anywhere a generator is expected, a literal scalar stands for
//! `constant(value)` and a tuple of liftable values stands for the
//! corresponding tuple generator, so `(0, boolean())` works where a
//! `Gen<(i64, bool)>` is wanted. Supplying a value with no lifting is a
//! compile error rather than a runtime one.

use crate::generator::{Gen, constant};
use crate::primitives::{tuple2, tuple3, tuple4};

/// Conversion into a generator, either trivially (a generator lifts to
/// itself) or by wrapping a literal.
pub trait IntoGen<T> {
    fn into_gen(self) -> Gen<T>;
}

impl<T: Clone + 'static> IntoGen<T> for Gen<T> {
    fn into_gen(self) -> Gen<T> {
        self
    }
}

macro_rules! lift_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoGen<$ty> for $ty {
                fn into_gen(self) -> Gen<$ty> {
                    constant(self)
                }
            }
        )*
    };
}

lift_scalar!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
);

impl IntoGen<String> for &str {
    fn into_gen(self) -> Gen<String> {
        constant(self.to_string())
    }
}

impl<T1, T2, A, B> IntoGen<(T1, T2)> for (A, B)
where
    T1: Clone + 'static,
    T2: Clone + 'static,
    A: IntoGen<T1>,
    B: IntoGen<T2>,
{
    fn into_gen(self) -> Gen<(T1, T2)> {
        tuple2(self.0, self.1)
    }
}

impl<T1, T2, T3, A, B, C> IntoGen<(T1, T2, T3)> for (A, B, C)
where
    T1: Clone + 'static,
    T2: Clone + 'static,
    T3: Clone + 'static,
    A: IntoGen<T1>,
    B: IntoGen<T2>,
    C: IntoGen<T3>,
{
    fn into_gen(self) -> Gen<(T1, T2, T3)> {
        tuple3(self.0, self.1, self.2)
    }
}

impl<T1, T2, T3, T4, A, B, C, D> IntoGen<(T1, T2, T3, T4)> for (A, B, C, D)
where
    T1: Clone + 'static,
    T2: Clone + 'static,
    T3: Clone + 'static,
    T4: Clone + 'static,
    A: IntoGen<T1>,
    B: IntoGen<T2>,
    C: IntoGen<T3>,
    D: IntoGen<T4>,
{
    fn into_gen(self) -> Gen<(T1, T2, T3, T4)> {
        tuple4(self.0, self.1, self.2, self.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::int_in_range;
    use crate::seed::Seed;

    #[test]
    fn test_scalar_literals_lift_to_constants() {
        let gen = 42i64.into_gen();
        let tree = gen.run_tree(Seed::new(1), 10).unwrap();
        assert_eq!(tree.root, 42);
        assert!(tree.children().next().is_none());
    }

    #[test]
    fn test_str_literal_lifts_to_constant_string() {
        let gen = "ok".into_gen();
        assert_eq!(gen.run_tree(Seed::new(1), 10).unwrap().root, "ok");
    }

    #[test]
    fn test_generator_lifts_to_itself() {
        let gen = int_in_range(0i64..=5).into_gen();
        let value = gen.run_tree(Seed::new(1), 10).unwrap().root;
        assert!((0..=5).contains(&value));
    }

    #[test]
    fn test_mixed_tuple_lifts() {
        let gen = ("tag", int_in_range(0i64..=5)).into_gen();
        let (tag, value) = gen.run_tree(Seed::new(1), 10).unwrap().root;
        assert_eq!(tag, "tag");
        assert!((0..=5).contains(&value));
    }

    #[test]
    fn test_nested_tuple_lifts() {
        let gen = (1i64, (true, "x")).into_gen();
        let (a, (b, c)) = gen.run_tree(Seed::new(1), 10).unwrap().root;
        assert_eq!((a, b, c.as_str()), (1, true, "x"));
    }
}
