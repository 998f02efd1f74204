use super::SpectralError;
use crate::numerics::{finite_extent, nearest_index, stable_sum};

/// Builds a grid whose local resolving power does not exceed `resolution`.
///
/// Two indices walk the native grid: `anchor` marks the start of the current
/// bin and `probe` widens it until `native[probe] / (native[probe] -
/// native[anchor])` drops below `resolution`. The bin midpoint is emitted and
/// the anchor jumps to the native sample nearest that midpoint (always
/// strictly forward). The walk stops once a midpoint reaches the grid maximum
/// or the probe reaches the last native sample, so grids with fewer than
/// three samples produce no points.
pub fn bin_wave_to_r(native: &[f64], resolution: f64) -> Vec<f64> {
    let mut grid = Vec::new();
    let Some((lower_bound, upper_bound)) = finite_extent(native) else {
        return grid;
    };
    if lower_bound >= upper_bound {
        return grid;
    }

    let last_probe = native.len() - 1;
    let mut anchor = 0_usize;
    let mut probe = 1_usize;

    while probe < last_probe {
        let span = native[probe] - native[anchor];
        let local_resolution = native[probe] / span;
        if local_resolution < resolution {
            let midpoint = native[anchor] + span / 2.0;
            grid.push(midpoint);
            if midpoint >= upper_bound {
                break;
            }
            let nearest = nearest_index(native, midpoint).unwrap_or(anchor);
            anchor = nearest.max(anchor + 1);
            probe = anchor;
        } else {
            probe += 1;
        }
    }

    grid
}

fn window_sum(old_grid: &[f64], values: &[f64], contains: impl Fn(f64) -> bool) -> f64 {
    stable_sum(
        old_grid
            .iter()
            .zip(values)
            .filter(|(position, _)| contains(**position))
            .map(|(_, value)| *value),
    )
}

/// Sums (never averages) `values` into tophat windows centred on `new_grid`.
///
/// Bin `i > 0` covers `[new[i] - w[i-1]/2, new[i] + w[i]/2)` where `w[i]` is
/// the spacing to the next centre; the last bin reuses the previous spacing.
/// The first bin is the open window `(new[0] - w[0]/2, new[0] + w[0]/2)`.
pub fn uniform_tophat_sum(
    new_grid: &[f64],
    old_grid: &[f64],
    values: &[f64],
) -> Result<Vec<f64>, SpectralError> {
    if old_grid.len() != values.len() {
        return Err(SpectralError::LengthMismatch {
            field: "tophat values",
            expected: old_grid.len(),
            actual: values.len(),
        });
    }

    let count = new_grid.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut widths: Vec<f64> = new_grid.windows(2).map(|pair| pair[1] - pair[0]).collect();
    widths.push(widths.last().copied().unwrap_or(0.0));

    let mut summed = vec![0.0; count];
    for index in 1..count {
        let low = new_grid[index] - 0.5 * widths[index - 1];
        let high = new_grid[index] + 0.5 * widths[index];
        summed[index] = window_sum(old_grid, values, |position| {
            position >= low && position < high
        });
    }

    let low = new_grid[0] - 0.5 * widths[0];
    let high = new_grid[0] + 0.5 * widths[0];
    summed[0] = window_sum(old_grid, values, |position| {
        position > low && position < high
    });

    Ok(summed)
}
