use super::SpectralError;
use crate::common::constants::PPM;
use crate::domain::SimError;
use crate::numerics::interpolate_clamped_onto;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Systematic floor under the per-bin spectral error, in ppm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseFloor {
    Constant { ppm: f64 },
    Table(NoiseFloorTable),
}

impl NoiseFloor {
    /// Floor as a fraction, evaluated on `wave`.
    pub fn fractional_floor(&self, wave: &[f64]) -> Result<Vec<f64>, SpectralError> {
        match self {
            Self::Constant { ppm } if !ppm.is_finite() || *ppm < 0.0 => {
                Err(SpectralError::InvalidFloor { ppm: *ppm })
            }
            Self::Constant { ppm } => Ok(vec![ppm * PPM; wave.len()]),
            Self::Table(table) => Ok(table
                .ppm_on(wave)?
                .into_iter()
                .map(|ppm| ppm * PPM)
                .collect()),
        }
    }
}

/// Wavelength-dependent floor, sorted by wavelength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseFloorTable {
    wavelength: Vec<f64>,
    ppm: Vec<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum NoiseFloorTableError {
    #[error("failed to read noise floor table '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("noise floor table line {line} must hold two numeric columns, got '{content}'")]
    Parse { line: usize, content: String },
    #[error("noise floor table row {row} must be finite, got ({wavelength}, {ppm})")]
    NonFinite { row: usize, wavelength: f64, ppm: f64 },
    #[error("noise floor table must contain at least one row")]
    Empty,
}

impl From<NoiseFloorTableError> for SimError {
    fn from(error: NoiseFloorTableError) -> Self {
        match error {
            NoiseFloorTableError::Read { .. } => {
                SimError::io_system("IO.NOISE_FLOOR_TABLE", error.to_string())
            }
            _ => SimError::input_validation("INPUT.NOISE_FLOOR", error.to_string()),
        }
    }
}

impl NoiseFloorTable {
    pub fn new(mut rows: Vec<(f64, f64)>) -> Result<Self, NoiseFloorTableError> {
        if rows.is_empty() {
            return Err(NoiseFloorTableError::Empty);
        }
        for (row, (wavelength, ppm)) in rows.iter().copied().enumerate() {
            if !wavelength.is_finite() || !ppm.is_finite() {
                return Err(NoiseFloorTableError::NonFinite {
                    row,
                    wavelength,
                    ppm,
                });
            }
        }
        rows.sort_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0));
        let (wavelength, ppm) = rows.into_iter().unzip();
        Ok(Self { wavelength, ppm })
    }

    /// Parses whitespace-separated `wavelength ppm` rows; `#` starts a comment.
    pub fn parse(source: &str) -> Result<Self, NoiseFloorTableError> {
        let mut rows = Vec::new();
        for (index, raw_line) in source.lines().enumerate() {
            let content = raw_line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }

            let mut columns = content
                .split(|character: char| character.is_whitespace() || character == ',')
                .filter(|column| !column.is_empty());
            let parsed = match (columns.next(), columns.next()) {
                (Some(wavelength), Some(ppm)) => {
                    wavelength.parse::<f64>().ok().zip(ppm.parse::<f64>().ok())
                }
                _ => None,
            };
            let Some(row) = parsed else {
                return Err(NoiseFloorTableError::Parse {
                    line: index + 1,
                    content: content.to_string(),
                });
            };
            rows.push(row);
        }
        Self::new(rows)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NoiseFloorTableError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| NoiseFloorTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Floor in ppm on `wave`; outside the table the boundary rows are held.
    pub fn ppm_on(&self, wave: &[f64]) -> Result<Vec<f64>, SpectralError> {
        Ok(interpolate_clamped_onto(wave, &self.wavelength, &self.ppm)?)
    }
}

/// Raises every error below the floor up to the floor. Not a quadrature sum.
pub fn add_noise_floor(
    floor: &NoiseFloor,
    wave: &[f64],
    error: &[f64],
) -> Result<Vec<f64>, SpectralError> {
    if wave.len() != error.len() {
        return Err(SpectralError::LengthMismatch {
            field: "noise floor error",
            expected: wave.len(),
            actual: error.len(),
        });
    }

    let floor = floor.fractional_floor(wave)?;
    Ok(error
        .iter()
        .zip(floor)
        .map(|(error, floor)| if *error < floor { floor } else { *error })
        .collect())
}
