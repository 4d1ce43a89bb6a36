//! Weighted verdict scoring over a stock's key statistics.
//!
//! Each metric present in the statistics payload earns full, half or no
//! points against fixed thresholds. The score is the earned share of the
//! weight that was actually available, so missing metrics neither reward
//! nor punish a stock.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Score at or above which a stock is labelled BUY.
pub const BUY_THRESHOLD: u8 = 70;

/// Score at or above which a stock is labelled WATCH.
pub const WATCH_THRESHOLD: u8 = 40;

/// Fundamentals read from the upstream statistics payload.
///
/// Unknown fields are ignored; every metric is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fundamentals {
    /// Price to earnings ratio
    pub pe: Option<f64>,
    /// Price to book value ratio
    pub pbv: Option<f64>,
    /// Return on equity, percent
    pub roe: Option<f64>,
    /// Dividend yield, percent
    pub dividend_yield: Option<f64>,
    /// Debt to equity ratio
    pub debt_to_equity: Option<f64>,
    /// Net profit margin, percent
    pub net_profit_margin: Option<f64>,
}

const PE_KEYS: &[&str] = &["pe", "peRatio", "PE"];
const PBV_KEYS: &[&str] = &["pbv", "pbvRatio", "pb", "PBV"];
const ROE_KEYS: &[&str] = &["roe", "ROE"];
const DIVIDEND_YIELD_KEYS: &[&str] = &["dividendYield", "yield", "dvdYield"];
const DEBT_TO_EQUITY_KEYS: &[&str] = &["debtToEquity", "de", "DE"];
const NET_PROFIT_MARGIN_KEYS: &[&str] = &["netProfitMargin", "npm"];

impl Fundamentals {
    /// Read each metric independently from an arbitrary JSON payload.
    ///
    /// A metric takes the first of its accepted keys holding a finite
    /// number. Placeholders such as `"N/A"` leave only that metric empty;
    /// a payload that is not an object yields no metrics.
    pub fn from_value(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self::default();
        };
        Self {
            pe: metric(fields, PE_KEYS),
            pbv: metric(fields, PBV_KEYS),
            roe: metric(fields, ROE_KEYS),
            dividend_yield: metric(fields, DIVIDEND_YIELD_KEYS),
            debt_to_equity: metric(fields, DEBT_TO_EQUITY_KEYS),
            net_profit_margin: metric(fields, NET_PROFIT_MARGIN_KEYS),
        }
    }
}

fn metric(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_f64))
        .find(|v| v.is_finite())
}

/// Recommendation derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictLabel {
    /// Score of at least [`BUY_THRESHOLD`]
    Buy,
    /// Score of at least [`WATCH_THRESHOLD`]
    Watch,
    /// Anything lower, or no usable metrics
    Avoid,
}

impl VerdictLabel {
    /// Label for a 0..=100 score.
    pub const fn from_score(score: u8) -> Self {
        if score >= BUY_THRESHOLD {
            Self::Buy
        } else if score >= WATCH_THRESHOLD {
            Self::Watch
        } else {
            Self::Avoid
        }
    }
}

/// Points earned by one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionScore {
    /// Metric name as it appears in the payload
    pub name: String,
    /// Observed value
    pub value: f64,
    /// Points earned
    pub points: f64,
    /// Points available
    pub weight: f64,
}

/// Result of scoring one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// 0..=100
    pub score: u8,
    /// BUY / WATCH / AVOID
    pub label: VerdictLabel,
    /// Per-metric breakdown, only for metrics that were present
    pub criteria: Vec<CriterionScore>,
    /// True when no metric was available to score
    pub insufficient_data: bool,
}

/// Which side of a threshold is favourable.
#[derive(Clone, Copy)]
enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

struct Criterion {
    name: &'static str,
    weight: f64,
    full: f64,
    half: f64,
    direction: Direction,
    /// Values at or below zero are treated as losses and earn nothing.
    positive_only: bool,
}

const CRITERIA: [Criterion; 6] = [
    Criterion {
        name: "pe",
        weight: 20.0,
        full: 15.0,
        half: 25.0,
        direction: Direction::LowerIsBetter,
        positive_only: true,
    },
    Criterion {
        name: "pbv",
        weight: 15.0,
        full: 1.5,
        half: 3.0,
        direction: Direction::LowerIsBetter,
        positive_only: true,
    },
    Criterion {
        name: "roe",
        weight: 25.0,
        full: 15.0,
        half: 10.0,
        direction: Direction::HigherIsBetter,
        positive_only: false,
    },
    Criterion {
        name: "dividendYield",
        weight: 15.0,
        full: 4.0,
        half: 2.0,
        direction: Direction::HigherIsBetter,
        positive_only: false,
    },
    Criterion {
        name: "debtToEquity",
        weight: 15.0,
        full: 1.0,
        half: 2.0,
        direction: Direction::LowerIsBetter,
        positive_only: false,
    },
    Criterion {
        name: "netProfitMargin",
        weight: 10.0,
        full: 10.0,
        half: 5.0,
        direction: Direction::HigherIsBetter,
        positive_only: false,
    },
];

impl Criterion {
    fn points(&self, value: f64) -> f64 {
        if self.positive_only && value <= 0.0 {
            return 0.0;
        }
        let (meets_full, meets_half) = match self.direction {
            Direction::LowerIsBetter => (value <= self.full, value <= self.half),
            Direction::HigherIsBetter => (value >= self.full, value >= self.half),
        };
        if meets_full {
            self.weight
        } else if meets_half {
            self.weight / 2.0
        } else {
            0.0
        }
    }
}

/// Score a stock's fundamentals.
pub fn evaluate(fundamentals: &Fundamentals) -> Verdict {
    let values = [
        fundamentals.pe,
        fundamentals.pbv,
        fundamentals.roe,
        fundamentals.dividend_yield,
        fundamentals.debt_to_equity,
        fundamentals.net_profit_margin,
    ];

    let criteria: Vec<CriterionScore> = CRITERIA
        .iter()
        .zip(values)
        .filter_map(|(criterion, value)| {
            let value = value.filter(|v| v.is_finite())?;
            Some(CriterionScore {
                name: criterion.name.to_string(),
                value,
                points: criterion.points(value),
                weight: criterion.weight,
            })
        })
        .collect();

    let available: f64 = criteria.iter().map(|c| c.weight).sum();
    if criteria.is_empty() || available <= 0.0 {
        return Verdict {
            score: 0,
            label: VerdictLabel::Avoid,
            criteria,
            insufficient_data: true,
        };
    }

    let earned: f64 = criteria.iter().map(|c| c.points).sum();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (earned / available * 100.0).round().clamp(0.0, 100.0) as u8;

    Verdict {
        score,
        label: VerdictLabel::from_score(score),
        criteria,
        insufficient_data: false,
    }
}
