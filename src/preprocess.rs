//! Turning a hand drawn square image into a network input.
//!
//! Drawings rarely sit in the middle of the canvas the way MNIST digits do,
//! and their strokes are hard edged. Centering and a light blur bring them
//! closer to the training distribution.

use ndarray::{s, Array2, ArrayView2};

/// Pixels brighter than this count as ink when locating the drawing.
const INK_THRESHOLD: f32 = 0.1;

/// 3×3 binomial kernel, divided by 16 when applied.
const KERNEL: [[f32; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];

/// Moves the bounding box of the ink to the middle of the image.
///
/// Images whose ink spans a single row or column, or that have no ink, are
/// returned unchanged.
pub fn center(image: ArrayView2<f32>) -> Array2<f32> {
    let (rows, cols) = image.dim();
    let (mut top, mut bottom, mut left, mut right) = (rows, 0, cols, 0);
    for ((y, x), &v) in image.indexed_iter() {
        if v > INK_THRESHOLD {
            top = top.min(y);
            bottom = bottom.max(y);
            left = left.min(x);
            right = right.max(x);
        }
    }
    if top >= bottom || left >= right {
        return image.to_owned();
    }

    let (h, w) = (bottom - top + 1, right - left + 1);
    let (off_y, off_x) = ((rows - h) / 2, (cols - w) / 2);

    let mut centered = Array2::zeros((rows, cols));
    centered
        .slice_mut(s![off_y..off_y + h, off_x..off_x + w])
        .assign(&image.slice(s![top..=bottom, left..=right]));
    centered
}

/// Blurs the interior of the image with a 3×3 binomial kernel. The one pixel
/// border is left at zero.
pub fn blur(image: ArrayView2<f32>) -> Array2<f32> {
    let (rows, cols) = image.dim();
    let mut out = Array2::zeros((rows, cols));
    if rows < 3 || cols < 3 {
        return out;
    }
    for y in 1..rows - 1 {
        for x in 1..cols - 1 {
            let window = image.slice(s![y - 1..=y + 1, x - 1..=x + 1]);
            let mut sum = 0.0;
            for ((ky, kx), &v) in window.indexed_iter() {
                sum += v * KERNEL[ky][kx];
            }
            out[[y, x]] = sum / 16.0;
        }
    }
    out
}

/// Centers then blurs a drawing, returning it flattened row by row.
pub fn prepare(image: ArrayView2<f32>) -> Vec<f32> {
    blur(center(image).view()).iter().copied().collect()
}
