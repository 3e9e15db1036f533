use std::ops::Range;

use crate::{Error, Result};

/// The intermediate indices a kernel relaxes through
///
/// `Span` is a single contiguous run and takes the fast kernel variants.
/// `List` is an arbitrary set of local indices and takes the general ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KRange<'a> {
    /// Contiguous run of local indices
    Span(Range<usize>),
    /// Arbitrary local indices, in ascending order
    List(&'a [usize]),
}

impl<'a> KRange<'a> {
    /// Every local index of a block with `len` rows
    pub fn full(len: usize) -> Self {
        KRange::Span(0..len)
    }

    /// No intermediate index at all
    pub fn empty() -> Self {
        KRange::Span(0..0)
    }

    /// Converts a bridge list of `cluster` into a span
    ///
    /// Fails with [`Error::NonContiguousBridges`] unless the list is one
    /// run of consecutive indices, which is what arranging a cluster's
    /// vertices guarantees for its dominant bridge direction.
    pub fn contiguous(list: &[usize], cluster: usize) -> Result<KRange<'static>> {
        let Some(&first) = list.first() else {
            return Ok(KRange::empty());
        };
        let consecutive = list
            .iter()
            .enumerate()
            .all(|(pos, &index)| index == first + pos);
        if !consecutive {
            return Err(Error::NonContiguousBridges { cluster });
        }
        Ok(KRange::Span(first..first + list.len()))
    }

    /// Number of intermediate indices
    pub fn len(&self) -> usize {
        match self {
            KRange::Span(span) => span.len(),
            KRange::List(list) => list.len(),
        }
    }

    /// Returns true if there is nothing to relax through
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the fast contiguous kernels apply
    pub fn is_contiguous(&self) -> bool {
        matches!(self, KRange::Span(_))
    }

    /// Iterates over the local indices
    pub fn iter(&self) -> KIter<'_> {
        match self {
            KRange::Span(span) => KIter::Span(span.clone()),
            KRange::List(list) => KIter::List(list.iter()),
        }
    }
}

/// Iterator over the indices of a [`KRange`]
#[derive(Debug, Clone)]
pub enum KIter<'a> {
    Span(Range<usize>),
    List(std::slice::Iter<'a, usize>),
}

impl Iterator for KIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        match self {
            KIter::Span(span) => span.next(),
            KIter::List(list) => list.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            KIter::Span(span) => span.size_hint(),
            KIter::List(list) => list.size_hint(),
        }
    }
}
