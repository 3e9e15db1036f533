//! Blocked Floyd-Warshall kernels
//!
//! One pivot round of the blocked algorithm over pivot block `m` runs, in
//! order:
//!
//! 1. [`relax_diagonal`] on block (m, m);
//! 2. [`relax_vertical`] on every block (i, m) and [`relax_horizontal`] on
//!    every block (m, j), using the closed block (m, m);
//! 3. [`relax_peripheral`] on every other block (i, j), using (i, m) and
//!    (m, j).
//!
//! Every kernel except the diagonal one takes a [`KRange`] of intermediate
//! indices, so that a round can be restricted to the bridge vertices of the
//! pivot cluster. Contiguous ranges use the `_span` variants, arbitrary
//! index lists the `_list` variants. Both share one loop per kernel,
//! monomorphised over the index iterator, so a span walks its indices
//! directly while a list reads each one through the slice.

pub mod range;

pub use range::{KIter, KRange};

use std::ops::Range;

use crate::distance::Distance;
use crate::matrix::Block;
use crate::workspace::Scratch;

/// Relaxes `ij` through every intermediate index in `ks`:
/// `ij[r][c] = min(ij[r][c], ik[r][k] + kj[k][c])`
#[inline]
fn relax_through<B, I>(ij: &mut B, ik: &B, kj: &B, ks: I)
where
    B: Block,
    I: Iterator<Item = usize> + Clone,
{
    debug_assert_eq!(ij.rows(), ik.rows());
    debug_assert_eq!(ij.cols(), kj.cols());
    let cols = ij.cols();
    for r in 0..ij.rows() {
        for k in ks.clone() {
            let via = ik.get(r, k);
            if via.is_sentinel() {
                continue;
            }
            for c in 0..cols {
                ij.relax(r, c, via.relax_add(kj.get(k, c)));
            }
        }
    }
}

/// Relaxes `ij` through a contiguous span of intermediate indices
pub fn relax_block_span<B: Block>(ij: &mut B, ik: &B, kj: &B, span: Range<usize>) {
    relax_through(ij, ik, kj, span);
}

/// Relaxes `ij` through an arbitrary list of intermediate indices
pub fn relax_block_list<B: Block>(ij: &mut B, ik: &B, kj: &B, list: &[usize]) {
    relax_through(ij, ik, kj, list.iter().copied());
}

/// The elementary tile relaxation: `ij = min(ij, ik (min,+) kj)` over `k`
pub fn relax_block<B: Block>(ij: &mut B, ik: &B, kj: &B, k: &KRange<'_>) {
    match k {
        KRange::Span(span) => relax_block_span(ij, ik, kj, span.clone()),
        KRange::List(list) => relax_block_list(ij, ik, kj, list),
    }
}

/// Full Floyd-Warshall closure of a single square block
///
/// For each local pivot the pivot row and column are read from `scratch`
/// rather than from the block. While a pivot is swept, row `k + 1` and
/// column `k + 1` are copied into the `next_*` vectors as soon as they are
/// final, so the following pivot starts with warm caches.
pub fn relax_diagonal<B: Block>(block: &mut B, scratch: &mut Scratch<B::Value>) {
    let n = block.rows();
    debug_assert_eq!(n, block.cols(), "diagonal blocks are square");
    if n == 0 {
        return;
    }

    for x in 0..n {
        scratch.row[x] = block.get(0, x);
        scratch.column[x] = block.get(x, 0);
    }

    for k in 0..n {
        let next = k + 1;
        for r in 0..n {
            let via = scratch.column[r];
            if !via.is_sentinel() {
                for c in 0..n {
                    block.relax(r, c, via.relax_add(scratch.row[c]));
                }
            }
            if next < n {
                scratch.next_column[r] = block.get(r, next);
                if r == next {
                    for c in 0..n {
                        scratch.next_row[c] = block.get(r, c);
                    }
                }
            }
        }
        if next < n {
            scratch.advance();
        }
    }
}

/// Relaxes a pivot column block in place through every index in `ks`:
/// `im[r][c] = min(im[r][c], im[r][k] + mm[k][c])`
#[inline]
fn relax_column_through<B, I>(im: &mut B, mm: &B, ks: I)
where
    B: Block,
    I: Iterator<Item = usize> + Clone,
{
    debug_assert_eq!(im.cols(), mm.rows());
    let cols = im.cols();
    for r in 0..im.rows() {
        for k in ks.clone() {
            let via = im.get(r, k);
            if via.is_sentinel() {
                continue;
            }
            for c in 0..cols {
                im.relax(r, c, via.relax_add(mm.get(k, c)));
            }
        }
    }
}

/// Relaxes a pivot row block in place through every index in `ks`:
/// `mi[r][c] = min(mi[r][c], mm[r][k] + mi[k][c])`
#[inline]
fn relax_row_through<B, I>(mi: &mut B, mm: &B, ks: I)
where
    B: Block,
    I: Iterator<Item = usize> + Clone,
{
    debug_assert_eq!(mi.rows(), mm.cols());
    let cols = mi.cols();
    for r in 0..mm.rows() {
        for k in ks.clone() {
            let via = mm.get(r, k);
            if via.is_sentinel() {
                continue;
            }
            for c in 0..cols {
                let candidate = via.relax_add(mi.get(k, c));
                mi.relax(r, c, candidate);
            }
        }
    }
}

/// Vertical relaxation through a contiguous span
pub fn relax_vertical_span<B: Block>(im: &mut B, mm: &B, span: Range<usize>) {
    relax_column_through(im, mm, span);
}

/// Vertical relaxation through an arbitrary list of intermediate indices
pub fn relax_vertical_list<B: Block>(im: &mut B, mm: &B, list: &[usize]) {
    relax_column_through(im, mm, list.iter().copied());
}

/// Propagates the closed pivot block `mm` into block `im` of the pivot column
pub fn relax_vertical<B: Block>(im: &mut B, mm: &B, k: &KRange<'_>) {
    match k {
        KRange::Span(span) => relax_vertical_span(im, mm, span.clone()),
        KRange::List(list) => relax_vertical_list(im, mm, list),
    }
}

/// Horizontal relaxation through a contiguous span
pub fn relax_horizontal_span<B: Block>(mi: &mut B, mm: &B, span: Range<usize>) {
    relax_row_through(mi, mm, span);
}

/// Horizontal relaxation through an arbitrary list of intermediate indices
pub fn relax_horizontal_list<B: Block>(mi: &mut B, mm: &B, list: &[usize]) {
    relax_row_through(mi, mm, list.iter().copied());
}

/// Propagates the closed pivot block `mm` into block `mi` of the pivot row
pub fn relax_horizontal<B: Block>(mi: &mut B, mm: &B, k: &KRange<'_>) {
    match k {
        KRange::Span(span) => relax_horizontal_span(mi, mm, span.clone()),
        KRange::List(list) => relax_horizontal_list(mi, mm, list),
    }
}

/// Relaxes a block outside the pivot row and column through the pivot
pub fn relax_peripheral<B: Block>(ij: &mut B, ik: &B, kj: &B, k: &KRange<'_>) {
    relax_block(ij, ik, kj, k);
}
