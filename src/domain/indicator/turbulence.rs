//! Turbulence index: how unusual one date's cross-instrument price vector is
//! relative to all earlier dates.
//!
//! turbulence[t] = (y[t] - μ) · Σ⁻¹ · (y[t] - μ)ᵀ
//!
//! where μ and Σ are the per-instrument means and the covariance matrix of every
//! date strictly before t. Dates inside the warm-up (one trading year) score 0, and
//! the first two positive scores after it are also recorded as 0 because the
//! covariance estimate is still unstable.
//!
//! Covariance is pairwise-complete: each instrument pair only uses dates on which
//! both have a price. The moments are accumulated incrementally (Welford) as the
//! date loop advances, so history is never rescanned.

use crate::domain::error::SignalError;
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Observations needed before the first score is computed.
pub const TURBULENCE_WARMUP: usize = 252;

/// Positive scores recorded as 0 right after the warm-up.
const SUPPRESSED_POSITIVE_SCORES: usize = 2;

/// Singular values at or below this fraction of the largest mark the covariance as
/// rank-deficient.
const RANK_TOLERANCE: f64 = 1e-12;

/// One long-format row: the price of `instrument` on `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub instrument: String,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TurbulenceRecord {
    pub date: NaiveDate,
    pub turbulence: f64,
}

/// Wide date × instrument price matrix. Dates ascend, instruments are sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    instruments: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl PriceMatrix {
    /// Pivot long observations into the wide matrix. Instruments absent on a date
    /// get `None`; a repeated (date, instrument) pair is an error.
    pub fn pivot(observations: &[PriceObservation]) -> Result<Self, SignalError> {
        let dates: Vec<NaiveDate> = observations
            .iter()
            .map(|o| o.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let instruments: Vec<String> = observations
            .iter()
            .map(|o| o.instrument.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();

        let date_index: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let instrument_index: HashMap<&str, usize> = instruments
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let mut rows = vec![vec![None; instruments.len()]; dates.len()];
        let mut seen = vec![vec![false; instruments.len()]; dates.len()];
        for obs in observations {
            let (r, c) = (date_index[&obs.date], instrument_index[obs.instrument.as_str()]);
            if seen[r][c] {
                return Err(SignalError::DuplicateObservation {
                    instrument: obs.instrument.clone(),
                    date: obs.date,
                });
            }
            seen[r][c] = true;
            rows[r][c] = obs.price.filter(|p| p.is_finite());
        }

        Ok(Self {
            dates,
            instruments,
            rows,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn row(&self, index: usize) -> &[Option<f64>] {
        &self.rows[index]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Running co-moments of one instrument pair over the dates both are defined.
#[derive(Debug, Clone, Copy, Default)]
struct PairMoments {
    count: usize,
    mean_a: f64,
    mean_b: f64,
    comoment: f64,
}

impl PairMoments {
    fn push(&mut self, a: f64, b: f64) {
        self.count += 1;
        let n = self.count as f64;
        let da = a - self.mean_a;
        self.mean_a += da / n;
        self.mean_b += (b - self.mean_b) / n;
        self.comoment += da * (b - self.mean_b);
    }

    fn covariance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.comoment / (self.count - 1) as f64)
    }
}

/// Pairwise-complete covariance accumulated row by row. Pair (a, a) doubles as the
/// per-instrument mean and variance.
#[derive(Debug, Clone)]
struct RunningCovariance {
    width: usize,
    pairs: Vec<PairMoments>,
}

impl RunningCovariance {
    fn new(width: usize) -> Self {
        Self {
            width,
            pairs: vec![PairMoments::default(); width * (width + 1) / 2],
        }
    }

    fn slot(a: usize, b: usize) -> usize {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        hi * (hi + 1) / 2 + lo
    }

    fn push_row(&mut self, row: &[Option<f64>]) {
        for b in 0..self.width {
            let Some(y) = row[b] else { continue };
            for a in 0..=b {
                if let Some(x) = row[a] {
                    self.pairs[Self::slot(a, b)].push(x, y);
                }
            }
        }
    }

    fn observations(&self, a: usize) -> usize {
        self.pairs[Self::slot(a, a)].count
    }

    fn mean(&self, a: usize) -> f64 {
        self.pairs[Self::slot(a, a)].mean_a
    }

    /// Covariance of `a` and `b`; pairs with fewer than two joint dates carry no
    /// co-movement information and count as 0.
    fn covariance(&self, a: usize, b: usize) -> f64 {
        self.pairs[Self::slot(a, b)].covariance().unwrap_or(0.0)
    }
}

/// Turbulence over `matrix` with the standard one-year warm-up.
pub fn turbulence_index(matrix: &PriceMatrix) -> Result<Vec<TurbulenceRecord>, SignalError> {
    turbulence_index_with_warmup(matrix, TURBULENCE_WARMUP)
}

pub fn turbulence_index_with_warmup(
    matrix: &PriceMatrix,
    warmup: usize,
) -> Result<Vec<TurbulenceRecord>, SignalError> {
    let mut history = RunningCovariance::new(matrix.instruments.len());
    let mut positive_scores = 0;
    let mut records = Vec::with_capacity(matrix.len());

    for (i, &date) in matrix.dates.iter().enumerate() {
        let row = matrix.row(i);
        let mut turbulence = 0.0;

        if i >= warmup {
            if let Some(score) = mahalanobis_sq(&history, row, date)? {
                if score > 0.0 {
                    positive_scores += 1;
                    if positive_scores > SUPPRESSED_POSITIVE_SCORES {
                        turbulence = score;
                    } else {
                        tracing::debug!(%date, score, "suppressing early turbulence score");
                    }
                }
            }
        }

        records.push(TurbulenceRecord { date, turbulence });
        history.push_row(row);
    }

    Ok(records)
}

/// Squared Mahalanobis distance of `row` from `history`, over the instruments that
/// are priced on this date and have at least two earlier prices. `None` when no
/// instrument qualifies.
fn mahalanobis_sq(
    history: &RunningCovariance,
    row: &[Option<f64>],
    date: NaiveDate,
) -> Result<Option<f64>, SignalError> {
    let retained: Vec<(usize, f64)> = row
        .iter()
        .enumerate()
        .filter_map(|(a, price)| price.map(|p| (a, p)))
        .filter(|&(a, _)| history.observations(a) >= 2)
        .collect();
    if retained.is_empty() {
        return Ok(None);
    }

    let k = retained.len();
    let deviation = DVector::from_iterator(k, retained.iter().map(|&(a, p)| p - history.mean(a)));
    let covariance =
        DMatrix::from_fn(k, k, |r, c| history.covariance(retained[r].0, retained[c].0));

    let singular = || SignalError::SingularMatrix {
        date,
        instruments: k,
    };
    if !is_full_rank(&covariance) {
        return Err(singular());
    }
    let inverse = covariance.try_inverse().ok_or_else(singular)?;
    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(singular());
    }

    Ok(Some(deviation.dot(&(inverse * &deviation))))
}

/// Numerical rank check through the singular values. LU inversion only rejects an
/// exact zero pivot, so a duplicated instrument can otherwise slip through.
fn is_full_rank(covariance: &DMatrix<f64>) -> bool {
    let singular_values = covariance.clone().svd(false, false).singular_values;
    let largest = singular_values.iter().fold(0.0_f64, |acc, v| acc.max(*v));
    if !largest.is_finite() || largest <= 0.0 {
        return false;
    }
    let tolerance = largest * RANK_TOLERANCE;
    singular_values.iter().all(|v| *v > tolerance)
}
