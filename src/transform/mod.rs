//! Reduction of hourly gridded data to daily values per organisation unit.
//!
//! The steps run in a fixed order: [`deaccumulate`] (for cumulative
//! variables only), [`temporal::daily_reduce`], then [`spatial::reduce`].

pub mod deaccumulate;
pub mod spatial;
pub mod temporal;

use chrono::NaiveDate;
use clap::ValueEnum;

pub use deaccumulate::deaccumulate;

/// Statistic used to collapse a group of samples into one value.
///
/// NaN samples are ignored; a group with no valid samples reduces to NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Statistic {
    Sum,
    Mean,
    Min,
    Max,
    Median,
}

impl Statistic {
    pub fn reduce<I: IntoIterator<Item = f64>>(&self, samples: I) -> f64 {
        let mut valid: Vec<f64> = samples.into_iter().filter(|v| !v.is_nan()).collect();
        if valid.is_empty() {
            return f64::NAN;
        }

        match self {
            Statistic::Sum => valid.iter().sum(),
            Statistic::Mean => valid.iter().sum::<f64>() / valid.len() as f64,
            Statistic::Min => valid.iter().copied().fold(f64::INFINITY, f64::min),
            Statistic::Max => valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Statistic::Median => {
                valid.sort_by(f64::total_cmp);
                let mid = valid.len() / 2;
                if valid.len() % 2 == 0 {
                    (valid[mid - 1] + valid[mid]) / 2.0
                } else {
                    valid[mid]
                }
            }
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Statistic::Sum => "sum",
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Median => "median",
        };
        f.write_str(name)
    }
}

/// One daily value for one organisation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedValue {
    pub org_unit: String,
    pub date: NaiveDate,
    pub value: f64,
}

// -- Tests -------------------------------------------------------------------
