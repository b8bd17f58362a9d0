use ndarray::{ArrayBase, DataMut, Dimension};

/// A trait to replace all elements in a container with zeros.
pub trait ZeroOut {
    fn zero_out(&mut self);
}

impl ZeroOut for f32 {
    fn zero_out(&mut self) {
        *self = 0.0;
    }
}

impl<T> ZeroOut for [T]
where
    T: ZeroOut,
{
    fn zero_out(&mut self) {
        for elem in self {
            elem.zero_out();
        }
    }
}

impl<T> ZeroOut for Vec<T>
where
    T: ZeroOut,
{
    fn zero_out(&mut self) {
        self.as_mut_slice().zero_out();
    }
}

impl<S, D> ZeroOut for ArrayBase<S, D>
where
    S: DataMut<Elem = f32>,
    D: Dimension,
{
    fn zero_out(&mut self) {
        self.fill(0.0);
    }
}

/// Returns the index of the largest value, preferring the first on ties.
///
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Computes the mean squared error between `actual` and `expected`.
pub fn mean_square_error(actual: &[f32], expected: &[f32]) -> f32 {
    assert_eq!(actual.len(), expected.len());
    if actual.is_empty() {
        return 0.0;
    }
    let mut error = 0.0;
    for (&a, e) in actual.iter().zip(expected) {
        error += (a - e) * (a - e);
    }
    error / (actual.len() as f32)
}
