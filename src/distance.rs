use std::fmt::Debug;
use std::ops::Add;

use num_traits::{Bounded, Zero};
use ordered_float::OrderedFloat;

/// Numeric weight stored in a distance matrix
///
/// Every implementation reserves `max / 2 - 1` as the "no path" sentinel. Two
/// sentinels summed never overflow, and [`Distance::relax_add`] clamps any sum
/// at the sentinel so that an unreachable intermediate is never an
/// improvement.
pub trait Distance:
    Copy + PartialOrd + Add<Output = Self> + Zero + Bounded + Debug + Send + Sync + 'static
{
    /// The value standing in for "no path"
    fn sentinel() -> Self;

    /// Returns true if this value means "no path"
    #[inline]
    fn is_sentinel(self) -> bool {
        self >= Self::sentinel()
    }

    /// Length of the concatenation of two paths, clamped to the sentinel
    #[inline]
    fn relax_add(self, other: Self) -> Self {
        if self.is_sentinel() || other.is_sentinel() {
            return Self::sentinel();
        }
        let sum = self + other;
        if sum >= Self::sentinel() {
            Self::sentinel()
        } else {
            sum
        }
    }

    /// The smaller of two distances
    #[inline]
    fn min_of(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }
}

macro_rules! impl_integer_distance {
    ($($t:ty),*) => {
        $(
            impl Distance for $t {
                #[inline]
                fn sentinel() -> Self {
                    <$t>::MAX / 2 - 1
                }
            }
        )*
    };
}

macro_rules! impl_float_distance {
    ($($t:ty),*) => {
        $(
            impl Distance for $t {
                #[inline]
                fn sentinel() -> Self {
                    <$t>::MAX / 2.0 - 1.0
                }
            }

            impl Distance for OrderedFloat<$t> {
                #[inline]
                fn sentinel() -> Self {
                    OrderedFloat(<$t>::MAX / 2.0 - 1.0)
                }
            }
        )*
    };
}

impl_integer_distance!(u16, u32, u64, usize, i32, i64);
impl_float_distance!(f32, f64);
