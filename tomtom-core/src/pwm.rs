use crate::error::{TomtomError, TomtomResult};

/// Row order is fixed as A, C, G, T.
pub const ALPHABET_SIZE: usize = 4;

/// A 4xL position-weight matrix over the DNA alphabet, stored row-major
/// (`data[row * cols + col]`). No normalization is assumed or enforced.
#[derive(Clone, Debug, PartialEq)]
pub struct Pwm {
    data: Vec<f32>,
    cols: usize,
}

impl Pwm {
    pub fn new(data: Vec<f32>, cols: usize) -> TomtomResult<Self> {
        if cols == 0 || data.len() != ALPHABET_SIZE * cols {
            return Err(TomtomError::InvalidShape {
                rows: if cols == 0 { 0 } else { data.len() / cols.max(1) },
                cols,
            });
        }
        Ok(Self { data, cols })
    }

    pub fn from_rows(rows: [Vec<f32>; ALPHABET_SIZE]) -> TomtomResult<Self> {
        let cols = rows[0].len();
        if cols == 0 || rows.iter().any(|r| r.len() != cols) {
            return Err(TomtomError::InvalidShape {
                rows: ALPHABET_SIZE,
                cols,
            });
        }
        let mut data = Vec::with_capacity(ALPHABET_SIZE * cols);
        for row in &rows {
            data.extend_from_slice(row);
        }
        Ok(Self { data, cols })
    }

    /// One-hot PWM from an ACGT string, for tests and small examples.
    pub fn one_hot(seq: &str) -> TomtomResult<Self> {
        let cols = seq.len();
        if cols == 0 {
            return Err(TomtomError::InvalidShape {
                rows: ALPHABET_SIZE,
                cols: 0,
            });
        }
        let mut data = vec![0.0f32; ALPHABET_SIZE * cols];
        for (col, base) in seq.bytes().enumerate() {
            let row = base_to_row(base).ok_or(TomtomError::InvalidShape {
                rows: ALPHABET_SIZE,
                cols,
            })?;
            data[row * cols + col] = 1.0;
        }
        Ok(Self { data, cols })
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        ALPHABET_SIZE
    }

    /// Column `col` as `[A, C, G, T]`.
    #[inline]
    pub fn column(&self, col: usize) -> [f32; ALPHABET_SIZE] {
        [
            self.data[col],
            self.data[self.cols + col],
            self.data[2 * self.cols + col],
            self.data[3 * self.cols + col],
        ]
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Reverses column order and swaps rows A<->T, C<->G.
    pub fn reverse_complement(&self) -> Self {
        let cols = self.cols;
        let mut data = vec![0.0f32; self.data.len()];
        // row order A=0 C=1 G=2 T=3; complement swaps row 0<->3, 1<->2
        const SWAPPED: [usize; ALPHABET_SIZE] = [3, 2, 1, 0];
        for row in 0..ALPHABET_SIZE {
            let src_row = &self.data[row * cols..(row + 1) * cols];
            let dst_row = SWAPPED[row];
            for col in 0..cols {
                data[dst_row * cols + (cols - 1 - col)] = src_row[col];
            }
        }
        Self { data, cols }
    }

    pub(crate) fn fingerprint_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&self.cols.to_le_bytes());
        for &v in &self.data {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
}

fn base_to_row(base: u8) -> Option<usize> {
    match base.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

pub(crate) fn validate_batch(pwms: &[Pwm], which: &'static str) -> TomtomResult<()> {
    if pwms.is_empty() {
        return Err(TomtomError::EmptyInput { which });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_round_trips_columns() {
        let p = Pwm::one_hot("ACGT").unwrap();
        assert_eq!(p.cols(), 4);
        assert_eq!(p.column(0), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(p.column(1), [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(p.column(2), [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(p.column(3), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn reverse_complement_of_acgt_is_acgt() {
        // ACGT is a palindrome under reverse-complement.
        let p = Pwm::one_hot("ACGT").unwrap();
        let rc = p.reverse_complement();
        assert_eq!(p, rc);
    }

    #[test]
    fn reverse_complement_reverses_and_swaps() {
        let p = Pwm::one_hot("AAAA").unwrap();
        let rc = p.reverse_complement();
        // complement of A is T, at every position
        for col in 0..rc.cols() {
            assert_eq!(rc.column(col), [0.0, 0.0, 0.0, 1.0]);
        }

        let p = Pwm::one_hot("AC").unwrap();
        let rc = p.reverse_complement();
        // reverse("AC") -> "CA", complement -> "GT"
        assert_eq!(rc.column(0), [0.0, 0.0, 1.0, 0.0]); // G
        assert_eq!(rc.column(1), [0.0, 0.0, 0.0, 1.0]); // T
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Pwm::from_rows([
            vec![1.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
        ])
        .unwrap_err();
        matches!(err, TomtomError::InvalidShape { .. });
    }

    #[test]
    fn rejects_zero_columns() {
        let err = Pwm::new(vec![], 0).unwrap_err();
        matches!(err, TomtomError::InvalidShape { .. });
    }
}
