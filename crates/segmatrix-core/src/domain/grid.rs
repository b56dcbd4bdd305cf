//! Per-frame digit grid input.
//!
//! The external video pipeline samples each frame down to one byte per digit:
//! bits 0–6 select segments a–g and bit 7 selects the decimal point. The grid
//! is row-major and read-only to the display layer.

use thiserror::Error;

/// Errors that can occur when constructing a [`DigitGrid`].
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    /// The byte buffer does not match the declared panel dimensions.
    #[error("grid length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// A fixed-size, row-major grid of digit segment bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl DigitGrid {
    /// Creates a grid from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::LengthMismatch`] when `cells.len()` is not
    /// `width * height`.
    pub fn new(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, GridError> {
        let expected = width * height;
        if cells.len() != expected {
            return Err(GridError::LengthMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Creates a grid with every digit set to `value`. Useful for test
    /// patterns (`0xFF` = all segments lit, `0x00` = blank).
    pub fn uniform(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    /// Grid width in digits.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in digits.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the segment byte at `(row, col)`, or `None` when the position
    /// lies outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells.get(row * self.width + col).copied()
    }

    /// The underlying row-major bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
