//! Stock identifiers and the upstream resources the proxy serves.

use serde::Serialize;
use std::fmt;

use crate::domain::errors::ProxyError;

/// Longest symbol accepted by the proxy.
pub const MAX_SYMBOL_LEN: usize = 10;

/// Default look-back for valuation history, in years.
pub const DEFAULT_VALUATION_YEARS: u32 = 5;

/// Accepted look-back range for valuation history; requests outside are clamped.
pub const VALUATION_YEARS_RANGE: (u32, u32) = (1, 10);

/// A validated, upper-cased stock symbol (e.g. `PTT`, `ADVANC`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Validate and normalise a raw path segment.
    pub fn parse(raw: &str) -> Result<Self, ProxyError> {
        if raw.is_empty()
            || raw.len() > MAX_SYMBOL_LEN
            || !raw.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ProxyError::InvalidSymbol(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// The normalised symbol text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An upstream resource served for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockResource {
    /// Price, market cap and company profile.
    Overview,
    /// Key ratios (P/E, P/BV, ROE, yields).
    Statistics,
    /// Historical valuation bands over `years`.
    Valuation {
        /// Look-back in years, already clamped.
        years: u32,
    },
    /// Quarterly operating results.
    QuarterlyOperations,
    /// Yearly operating results.
    YearlyOperations,
}

impl StockResource {
    /// Build a valuation resource, clamping `years` into the accepted range.
    pub fn valuation(years: Option<u32>) -> Self {
        let (min, max) = VALUATION_YEARS_RANGE;
        let years = years.unwrap_or(DEFAULT_VALUATION_YEARS).clamp(min, max);
        Self::Valuation { years }
    }

    /// Build a valuation resource from a raw `years` query value.
    ///
    /// Non-numeric input is rejected; numeric input outside the accepted
    /// range is clamped.
    pub fn valuation_from_query(raw: Option<&str>) -> Result<Self, ProxyError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::valuation(None));
        };
        let parsed: i64 = raw.parse().map_err(|_| ProxyError::InvalidParameter {
            name: "years".to_string(),
            reason: format!("'{raw}' is not a whole number"),
        })?;
        let (min, max) = VALUATION_YEARS_RANGE;
        let clamped = parsed.clamp(i64::from(min), i64::from(max));
        Ok(Self::valuation(u32::try_from(clamped).ok()))
    }

    /// Parse a resource name as used on the command line.
    pub fn from_name(name: &str, years: Option<u32>) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "overview" => Some(Self::Overview),
            "statistics" => Some(Self::Statistics),
            "valuation" => Some(Self::valuation(years)),
            "quarterly" | "operations/quarterly" => Some(Self::QuarterlyOperations),
            "yearly" | "operations/yearly" => Some(Self::YearlyOperations),
            _ => None,
        }
    }

    /// Path below `/stocks/<symbol>/` on the upstream.
    pub const fn upstream_path(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Statistics => "statistics",
            Self::Valuation { .. } => "valuation",
            Self::QuarterlyOperations => "operations/quarterly",
            Self::YearlyOperations => "operations/yearly",
        }
    }

    /// Query parameters forwarded upstream.
    pub fn upstream_query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Valuation { years } => vec![("years", years.to_string())],
            _ => Vec::new(),
        }
    }

    /// Cache key for this resource and symbol. Parameterised resources
    /// include their parameters so distinct requests never share an entry.
    pub fn cache_key(&self, symbol: &Symbol) -> String {
        match self {
            Self::Valuation { years } => format!("valuation:{years}:{symbol}"),
            other => format!("{}:{symbol}", other.upstream_path()),
        }
    }
}
