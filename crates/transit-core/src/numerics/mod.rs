//! Small numeric kernels shared by the phase runner and spectral aggregator.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("interpolation requires at least 1 grid point")]
    EmptyGrid,
    #[error("interpolation length mismatch: grid={grid}, values={values}")]
    LengthMismatch { grid: usize, values: usize },
    #[error("interpolation grid entry must be finite at index {index}, got {value}")]
    NonFiniteGrid { index: usize, value: f64 },
    #[error("interpolation grid must be non-decreasing, index {index} has {current} after {previous}")]
    DecreasingGrid {
        index: usize,
        previous: f64,
        current: f64,
    },
}

fn validate_grid(grid: &[f64], values: &[f64]) -> Result<(), InterpolationError> {
    if grid.is_empty() {
        return Err(InterpolationError::EmptyGrid);
    }
    if grid.len() != values.len() {
        return Err(InterpolationError::LengthMismatch {
            grid: grid.len(),
            values: values.len(),
        });
    }
    for (index, value) in grid.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(InterpolationError::NonFiniteGrid { index, value });
        }
        if index > 0 && value < grid[index - 1] {
            return Err(InterpolationError::DecreasingGrid {
                index,
                previous: grid[index - 1],
                current: value,
            });
        }
    }
    Ok(())
}

fn interpolate_unchecked(query: f64, grid: &[f64], values: &[f64]) -> f64 {
    let last = grid.len() - 1;
    if query <= grid[0] {
        return values[0];
    }
    if query >= grid[last] {
        return values[last];
    }

    let upper = grid.partition_point(|point| *point <= query);
    let lower = upper - 1;
    let fraction = (query - grid[lower]) / (grid[upper] - grid[lower]);
    values[lower] + (values[upper] - values[lower]) * fraction
}

/// Linear interpolation that holds the first/last value outside the grid.
pub fn interpolate_clamped_onto(
    queries: &[f64],
    grid: &[f64],
    values: &[f64],
) -> Result<Vec<f64>, InterpolationError> {
    validate_grid(grid, values)?;
    Ok(queries
        .iter()
        .map(|query| interpolate_unchecked(*query, grid, values))
        .collect())
}

/// Index of the grid point closest to `target`; ties resolve to the lower index.
pub fn nearest_index(grid: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in grid.iter().copied().enumerate() {
        let distance = (value - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

pub fn finite_extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(None, |extent, value| match extent {
            None => Some((value, value)),
            Some((low, high)) => Some((low.min(value), high.max(value))),
        })
}
