//! Per-zone inputs: facies probabilities and alpha coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{ProbabilityError, TruncationError};

/// Probability of one facies: fixed for the zone or one value per cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FaciesProbability {
    Constant(f64),
    PerCell(Vec<f64>),
}

impl FaciesProbability {
    #[inline]
    fn at(&self, cell: usize) -> f64 {
        match self {
            FaciesProbability::Constant(p) => *p,
            FaciesProbability::PerCell(v) => v[cell],
        }
    }
}

/// Probabilities of all facies of a zone, in zone facies order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FaciesProbability>", into = "Vec<FaciesProbability>")]
pub struct ProbabilityField {
    facies: Vec<FaciesProbability>,
    cells: Option<usize>,
}

impl ProbabilityField {
    /// Per-cell arrays must all have the same length.
    pub fn new(facies: Vec<FaciesProbability>) -> Result<Self, ProbabilityError> {
        let mut cells = None;
        for f in &facies {
            if let FaciesProbability::PerCell(v) = f {
                match cells {
                    None => cells = Some(v.len()),
                    Some(n) if n != v.len() => {
                        return Err(ProbabilityError::Length {
                            expected: n,
                            got: v.len(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(Self { facies, cells })
    }

    /// Same probabilities in every cell.
    pub fn constant(probs: &[f64]) -> Self {
        Self {
            facies: probs.iter().map(|&p| FaciesProbability::Constant(p)).collect(),
            cells: None,
        }
    }

    /// Number of facies.
    #[inline]
    pub fn len(&self) -> usize {
        self.facies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.facies.is_empty()
    }

    /// Cell count of the per-cell arrays; `None` when every facies is constant.
    #[inline]
    pub fn cells(&self) -> Option<usize> {
        self.cells
    }

    /// Write the probabilities of `cell` into `out`.
    #[inline]
    pub fn fill_cell(&self, cell: usize, out: &mut [f64]) {
        for (o, f) in out.iter_mut().zip(&self.facies) {
            *o = f.at(cell);
        }
    }
}

impl TryFrom<Vec<FaciesProbability>> for ProbabilityField {
    type Error = ProbabilityError;

    fn try_from(facies: Vec<FaciesProbability>) -> Result<Self, Self::Error> {
        Self::new(facies)
    }
}

impl From<ProbabilityField> for Vec<FaciesProbability> {
    fn from(field: ProbabilityField) -> Self {
        field.facies
    }
}

/// Alpha coordinates of a zone, cell-major: cell `i` is
/// `values[i*dims .. (i+1)*dims]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AlphaField {
    dims: usize,
    values: Vec<f64>,
}

impl AlphaField {
    pub fn new(dims: usize, values: Vec<f64>) -> Result<Self, TruncationError> {
        if dims == 0 || values.len() % dims != 0 {
            return Err(TruncationError::AlphaDimension {
                expected: dims,
                got: values.len() % dims.max(1),
            });
        }
        Ok(Self { dims, values })
    }

    /// Interleave one column per alpha dimension.
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self, TruncationError> {
        let dims = columns.len();
        let cells = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != cells) {
            return Err(TruncationError::CellOutOfRange {
                cell: bad.len().min(cells),
                cells: bad.len().max(cells),
            });
        }
        let mut values = Vec::with_capacity(dims * cells);
        for i in 0..cells {
            values.extend(columns.iter().map(|c| c[i]));
        }
        Self::new(dims, values)
    }

    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }

    #[inline]
    pub fn cells(&self) -> usize {
        self.values.len() / self.dims
    }

    #[inline]
    pub fn cell(&self, i: usize) -> &[f64] {
        &self.values[i * self.dims..(i + 1) * self.dims]
    }
}
