//! SIMD fast path for summing an alignment window.

use wide::u32x8;

/// Sums `overlap` elements of `matrix` starting at `start`, advancing by
/// `stride` each step. `stride` is constant per offset because `matrix` is
/// row-major, so the diagonal window can be gathered into a contiguous
/// buffer and reduced with `wide`.
#[inline]
pub(crate) fn sum_window_simd(matrix: &[u16], start: usize, stride: usize, overlap: usize) -> i64 {
    let mut gathered = [0u32; 8];
    let mut acc = 0i64;
    let mut idx = start;
    let mut i = 0;

    while i + 8 <= overlap {
        for slot in gathered.iter_mut() {
            *slot = matrix[idx] as u32;
            idx += stride;
        }
        acc += u32x8::from(gathered).reduce_add() as i64;
        i += 8;
    }
    while i < overlap {
        acc += matrix[idx] as i64;
        idx += stride;
        i += 1;
    }
    acc
}
