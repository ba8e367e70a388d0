// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Daily aggregation and least-squares trend fitting.
//!
//! Pure functions only: nothing here touches the database, so every step of
//! the forecast can be exercised with hand-built inputs.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of days projected past today.
pub const HORIZON_DAYS: u64 = 30;

/// Below this many points there is no held-out set and no RMSE.
pub const MIN_POINTS_FOR_HOLDOUT: usize = 10;

const TRAIN_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One total per distinct date, strictly ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    points: Vec<(NaiveDate, Decimal)>,
}

impl DailySeries {
    /// Groups `(date, amount)` rows by date and sums them exactly.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Decimal)>,
    {
        let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for (date, amount) in rows {
            *by_day.entry(date).or_insert(Decimal::ZERO) += amount;
        }
        Self {
            points: by_day.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(NaiveDate, Decimal)] {
        &self.points
    }

    /// Totals as regression targets; the day index is the position.
    pub fn values(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|(_, v)| v.to_f64().unwrap_or(0.0))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendModel {
    /// Ordinary least squares of `y` against `0..n`.
    ///
    /// A single point (or otherwise zero x-variance) yields a flat line
    /// through the mean.
    pub fn fit(y: &[f64]) -> Self {
        let n = y.len() as f64;
        if y.is_empty() {
            return Self {
                slope: 0.0,
                intercept: 0.0,
            };
        }
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = y.iter().sum::<f64>() / n;
        let mut num = 0.0;
        let mut den = 0.0;
        for (i, &yi) in y.iter().enumerate() {
            let dx = i as f64 - x_mean;
            num += dx * (yi - y_mean);
            den += dx * dx;
        }
        let slope = if den.abs() < 1e-12 { 0.0 } else { num / den };
        Self {
            slope,
            intercept: y_mean - slope * x_mean,
        }
    }

    pub fn predict(&self, day_index: usize) -> f64 {
        self.intercept + self.slope * day_index as f64
    }
}

/// Root-mean-square error of the model over `actual`, whose first element sits
/// at `first_index`. `None` for an empty slice.
pub fn rmse(model: &TrendModel, first_index: usize, actual: &[f64]) -> Option<f64> {
    if actual.is_empty() {
        return None;
    }
    let mse = actual
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let err = y - model.predict(first_index + i);
            err * err
        })
        .sum::<f64>()
        / actual.len() as f64;
    Some(mse.sqrt())
}

/// History, 30-day projection and fit quality for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesForecast {
    pub history: Vec<SeriesPoint>,
    pub future: Vec<SeriesPoint>,
    pub rmse: Option<f64>,
    pub model: TrendModel,
}

impl SeriesForecast {
    pub fn hist_labels(&self) -> Vec<String> {
        self.history.iter().map(|p| p.date.to_string()).collect()
    }

    pub fn hist_values(&self) -> Vec<f64> {
        self.history.iter().map(|p| p.value).collect()
    }

    pub fn future_labels(&self) -> Vec<String> {
        self.future.iter().map(|p| p.date.to_string()).collect()
    }

    pub fn future_values(&self) -> Vec<f64> {
        self.future.iter().map(|p| p.value).collect()
    }

    pub fn future_total(&self) -> f64 {
        self.future.iter().map(|p| p.value).sum()
    }
}

/// Fits a trend to `series` and projects it over the next 30 calendar days
/// after `today`. `None` when the series has no points.
pub fn forecast_series(series: &DailySeries, today: NaiveDate) -> Option<SeriesForecast> {
    if series.is_empty() {
        return None;
    }
    let values = series.values();
    let n = values.len();

    let (model, rmse) = if n < MIN_POINTS_FOR_HOLDOUT {
        (TrendModel::fit(&values), None)
    } else {
        let split = (n as f64 * TRAIN_FRACTION).floor() as usize;
        let model = TrendModel::fit(&values[..split]);
        (model, rmse(&model, split, &values[split..]))
    };

    let last_index = n - 1;
    let future = (1..=HORIZON_DAYS)
        .map(|step| SeriesPoint {
            date: today.checked_add_days(Days::new(step)).unwrap_or(NaiveDate::MAX),
            value: model.predict(last_index + step as usize).max(0.0),
        })
        .collect();

    let history = series
        .points()
        .iter()
        .zip(values.iter())
        .map(|((date, _), &value)| SeriesPoint { date: *date, value })
        .collect();

    tracing::debug!(
        points = n,
        slope = model.slope,
        intercept = model.intercept,
        ?rmse,
        "fitted trend"
    );

    Some(SeriesForecast {
        history,
        future,
        rmse,
        model,
    })
}
