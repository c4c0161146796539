use core::cmp::Ordering;

use super::OMTree;
use crate::error::{Error, Result};

/// Which side of a predicate's sign change [`OMTree::find`] looks on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// The largest rank where the predicate is negative.
    Predecessor,
    /// The smallest rank where the predicate is positive.
    Successor,
}

impl TryFrom<i32> for Direction {
    type Error = Error;

    /// Maps a signed direction: negative to [`Direction::Predecessor`],
    /// positive to [`Direction::Successor`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for `0`.
    fn try_from(direction: i32) -> Result<Self> {
        match direction.cmp(&0) {
            Ordering::Less => Ok(Direction::Predecessor),
            Ordering::Greater => Ok(Direction::Successor),
            Ordering::Equal => Err(Error::InvalidArgument("direction must be non-zero")),
        }
    }
}

impl<V> OMTree<V> {
    /// Finds the first value for which `h` is zero.
    ///
    /// `h` maps a value to its sign: [`Ordering::Less`] for negative,
    /// [`Ordering::Equal`] for zero, [`Ordering::Greater`] for positive. It
    /// must be monotone over the sequence, meaning that as the rank grows its
    /// sign never decreases. A predicate that breaks this contract yields an
    /// unspecified (but memory safe) answer.
    ///
    /// Anything the predicate needs besides the value is captured by the
    /// closure.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if `h` has no zero. Its `rank` is the smallest rank
    /// where `h` is positive, or `len()` if there is none: the rank a value
    /// with a zero would be inserted at.
    ///
    /// # Complexity
    ///
    /// O(log n) time and calls to `h`.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::{Error, OMTree};
    ///
    /// let tree = OMTree::from_sorted_slice(&[10, 20, 30]).unwrap();
    /// assert_eq!(tree.find_zero(|v| v.cmp(&20)), Ok((1, &20)));
    /// assert_eq!(tree.find_zero(|v| v.cmp(&25)), Err(Error::NotFound { rank: 2 }));
    /// assert_eq!(tree.find_zero(|v| v.cmp(&99)), Err(Error::NotFound { rank: 3 }));
    /// ```
    pub fn find_zero<F>(&self, h: F) -> Result<(usize, &V)>
    where
        F: FnMut(&V) -> Ordering,
    {
        match self.raw.search_zero(h) {
            Some((rank, node, Ordering::Equal)) => Ok((rank, self.raw.value(node))),
            Some((rank, _, _)) => Err(Error::NotFound { rank }),
            None => Err(Error::NotFound { rank: self.len() }),
        }
    }

    /// Finds the value just past the zeros of `h` in the given direction.
    ///
    /// With [`Direction::Successor`] this is the smallest rank where `h` is
    /// positive; with [`Direction::Predecessor`] the largest rank where it is
    /// negative. `h` must be monotone, as for [`OMTree::find_zero`].
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no such rank exists. Its `rank` is `len()` for a
    /// successor search and `0` for a predecessor search.
    ///
    /// # Complexity
    ///
    /// O(log n) time and calls to `h`.
    ///
    /// # Examples
    ///
    /// ```
    /// use omtree::{Direction, OMTree};
    ///
    /// let tree = OMTree::from_sorted_slice(&[10, 20, 20, 30]).unwrap();
    /// let h = |v: &i32| v.cmp(&20);
    /// assert_eq!(tree.find(h, Direction::Successor), Ok((3, &30)));
    /// assert_eq!(tree.find(h, Direction::Predecessor), Ok((0, &10)));
    /// ```
    pub fn find<F>(&self, h: F, direction: Direction) -> Result<(usize, &V)>
    where
        F: FnMut(&V) -> Ordering,
    {
        let found = match direction {
            Direction::Successor => self.raw.search_successor(h),
            Direction::Predecessor => self.raw.search_predecessor(h),
        };
        match found {
            Some((rank, node)) => Ok((rank, self.raw.value(node))),
            None if direction == Direction::Successor => Err(Error::NotFound { rank: self.len() }),
            None => Err(Error::NotFound { rank: 0 }),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    #[test]
    fn direction_from_sign() {
        assert_eq!(Direction::try_from(-7), Ok(Direction::Predecessor));
        assert_eq!(Direction::try_from(1), Ok(Direction::Successor));
        assert_eq!(
            Direction::try_from(0),
            Err(Error::InvalidArgument("direction must be non-zero"))
        );
    }

    #[test]
    fn search_empty_tree() {
        let tree: OMTree<u32> = OMTree::new();
        assert_eq!(tree.find_zero(|_| Ordering::Equal), Err(Error::NotFound { rank: 0 }));
        assert_eq!(tree.find(|_| Ordering::Less, Direction::Successor), Err(Error::NotFound { rank: 0 }));
        assert_eq!(tree.find(|_| Ordering::Less, Direction::Predecessor), Err(Error::NotFound { rank: 0 }));
    }

    #[test]
    fn find_zero_returns_first_of_many() {
        let tree = OMTree::from_sorted_slice(&[1, 2, 2, 2, 3]).unwrap();
        assert_eq!(tree.find_zero(|v| v.cmp(&2)), Ok((1, &2)));
    }

    #[test]
    fn find_past_either_end() {
        let tree = OMTree::from_sorted_slice(&[10, 20, 30]).unwrap();
        assert_eq!(tree.find(|v| v.cmp(&30), Direction::Successor), Err(Error::NotFound { rank: 3 }));
        assert_eq!(tree.find(|v| v.cmp(&10), Direction::Predecessor), Err(Error::NotFound { rank: 0 }));
        assert_eq!(tree.find(|v| v.cmp(&35), Direction::Predecessor), Ok((2, &30)));
    }

    #[test]
    fn predicate_called_logarithmically() {
        let values: Vec<u32> = (0..1 << 12).collect();
        let tree = OMTree::from_sorted_slice(&values).unwrap();
        let mut calls = 0;
        let found = tree.find_zero(|v| {
            calls += 1;
            v.cmp(&1234)
        });
        assert_eq!(found, Ok((1234, &1234)));
        assert!(calls <= 13, "{calls} calls");
    }

    proptest! {
        #[test]
        fn searches_agree_with_partition_point(
            mut values in prop::collection::vec(0u16..64, 0..200),
            target in 0u16..64,
        ) {
            values.sort_unstable();
            let tree = OMTree::from_sorted_slice(&values).unwrap();
            let h = |v: &u16| v.cmp(&target);

            let lower = values.partition_point(|v| *v < target);
            let upper = values.partition_point(|v| *v <= target);

            match tree.find_zero(h) {
                Ok((rank, value)) => {
                    prop_assert_eq!(rank, lower);
                    prop_assert_eq!(*value, target);
                }
                Err(error) => {
                    prop_assert_eq!(lower, upper);
                    prop_assert_eq!(error, Error::NotFound { rank: lower });
                }
            }

            match tree.find(h, Direction::Successor) {
                Ok((rank, _)) => prop_assert_eq!(rank, upper),
                Err(error) => {
                    prop_assert_eq!(upper, values.len());
                    prop_assert_eq!(error, Error::NotFound { rank: values.len() });
                }
            }

            match tree.find(h, Direction::Predecessor) {
                Ok((rank, _)) => prop_assert_eq!(rank + 1, lower),
                Err(error) => {
                    prop_assert_eq!(lower, 0);
                    prop_assert_eq!(error, Error::NotFound { rank: 0 });
                }
            }
        }
    }
}
