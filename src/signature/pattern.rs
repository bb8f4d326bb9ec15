//! Pattern metrics derived from a 2-D phase grid over the harmonic ladder.
//!
//! Grid cell `(i, j)` is `sin(hᵢ·(j+1)/100) · cos(hⱼ·(i+1)/100)`, so every
//! cell lies in `[-1, 1]` and the grid is generally not symmetric.

use serde::{Deserialize, Serialize};

use super::LADDER_LEN;

const HISTOGRAM_BINS: usize = 10;
const PHASE_SCALE: f64 = 100.0;

/// Shape descriptors of a signature, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMetrics {
    pub symmetry: f64,
    pub complexity: f64,
    pub coherence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouplingType {
    Harmonic,
    Resonant,
    Dissonant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouplingData {
    pub strength: f64,
    #[serde(rename = "type")]
    pub coupling_type: CouplingType,
}

type Grid = [[f64; LADDER_LEN]; LADDER_LEN];

pub fn phase_grid(ladder: &[f64; LADDER_LEN]) -> Grid {
    let mut grid = [[0.0; LADDER_LEN]; LADDER_LEN];
    for (i, row) in grid.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let a = (ladder[i] * (j + 1) as f64 / PHASE_SCALE).sin();
            let b = (ladder[j] * (i + 1) as f64 / PHASE_SCALE).cos();
            *cell = a * b;
        }
    }
    grid
}

impl PatternMetrics {
    pub fn from_ladder(ladder: &[f64; LADDER_LEN]) -> Self {
        let grid = phase_grid(ladder);
        Self {
            symmetry: symmetry(&grid),
            complexity: complexity(&grid),
            coherence: coherence(&grid),
        }
    }

    /// Mean absolute difference across the three metrics.
    pub fn mean_abs_diff(&self, other: &PatternMetrics) -> f64 {
        ((self.symmetry - other.symmetry).abs()
            + (self.complexity - other.complexity).abs()
            + (self.coherence - other.coherence).abs())
            / 3.0
    }
}

impl CouplingData {
    pub fn from_metrics(metrics: &PatternMetrics) -> Self {
        let strength = ((metrics.symmetry + metrics.coherence) / 2.0).clamp(0.0, 1.0);
        let coupling_type = if strength >= 0.66 {
            CouplingType::Harmonic
        } else if strength >= 0.33 {
            CouplingType::Resonant
        } else {
            CouplingType::Dissonant
        };
        Self {
            strength,
            coupling_type,
        }
    }
}

/// 1 − mean |Mᵢⱼ − Mⱼᵢ| / 2 over the upper triangle.
fn symmetry(grid: &Grid) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..LADDER_LEN {
        for j in (i + 1)..LADDER_LEN {
            total += (grid[i][j] - grid[j][i]).abs() / 2.0;
            pairs += 1;
        }
    }
    (1.0 - total / pairs as f64).clamp(0.0, 1.0)
}

/// Shannon entropy of a value histogram, normalized by its maximum.
fn complexity(grid: &Grid) -> f64 {
    let mut bins = [0usize; HISTOGRAM_BINS];
    for value in grid.iter().flatten() {
        let idx = (((value + 1.0) / 2.0) * HISTOGRAM_BINS as f64).floor() as usize;
        bins[idx.min(HISTOGRAM_BINS - 1)] += 1;
    }

    let n = (LADDER_LEN * LADDER_LEN) as f64;
    let entropy: f64 = bins
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum();
    (entropy / (HISTOGRAM_BINS as f64).ln()).clamp(0.0, 1.0)
}

/// 1 − population standard deviation of the grid.
fn coherence(grid: &Grid) -> f64 {
    let n = (LADDER_LEN * LADDER_LEN) as f64;
    let mean = grid.iter().flatten().sum::<f64>() / n;
    let variance = grid.iter().flatten().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance.sqrt()).clamp(0.0, 1.0)
}
