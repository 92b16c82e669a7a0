//! Data model shared by the engines and the store.

use crate::error::{DataError, Result};
use chrono::{Duration, NaiveDate};
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fund identifier as published by the data source (e.g. `"AAK"`).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct FundCode(String);

impl FundCode {
    /// Create a fund code, trimming surrounding whitespace.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FundCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Portfolio identifier assigned by the portfolio registry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into,
)]
#[serde(transparent)]
pub struct PortfolioId(i64);

impl PortfolioId {
    /// Raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date (inclusive)
    pub start: NaiveDate,
    /// Last date (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending on (and including) `end`.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.saturating_sub(1));
        Self {
            start: end - Duration::days(span),
            end,
        }
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One daily observation of a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Observation date
    pub date: NaiveDate,
    /// Unit price
    pub price: f64,
    /// Total market capitalization
    pub market_cap: f64,
    /// Number of investors holding the fund
    pub investor_count: f64,
}

impl PriceObservation {
    /// Create an observation.
    pub const fn new(date: NaiveDate, price: f64, market_cap: f64, investor_count: f64) -> Self {
        Self {
            date,
            price,
            market_cap,
            investor_count,
        }
    }
}

/// Static classification labels of a fund.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundMetadata {
    /// Fine-grained category
    pub category: Option<String>,
    /// Coarse category the fine one belongs to
    pub main_category: Option<String>,
}

impl FundMetadata {
    /// Create labels, treating blank strings as absent.
    pub fn new(category: Option<String>, main_category: Option<String>) -> Self {
        let clean = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            category: clean(category),
            main_category: clean(main_category),
        }
    }
}

/// A fund held by a portfolio with its target weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Held fund
    pub fund_code: FundCode,
    /// Weight in `[0, 1]`
    pub weight: f64,
}

impl Position {
    /// Create a position.
    pub fn new(fund_code: impl Into<FundCode>, weight: f64) -> Self {
        Self {
            fund_code: fund_code.into(),
            weight,
        }
    }
}

/// A weighted basket of funds.
///
/// Weights are individually bounded but their sum is not constrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Registry identifier
    pub id: PortfolioId,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Ordered positions, one per fund
    pub positions: Vec<Position>,
}

impl Portfolio {
    /// Create a validated portfolio.
    ///
    /// # Errors
    /// Rejects weights outside `[0, 1]` and funds listed more than once.
    pub fn new(id: PortfolioId, name: Option<String>, positions: Vec<Position>) -> Result<Self> {
        let portfolio = Self { id, name, positions };
        portfolio.validate()?;
        Ok(portfolio)
    }

    /// Check the registry rules on an already built portfolio.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for position in &self.positions {
            if !(0.0..=1.0).contains(&position.weight) {
                return Err(DataError::InvalidPortfolio {
                    id: self.id.get(),
                    reason: format!(
                        "weight {} of {} outside [0, 1]",
                        position.weight, position.fund_code
                    ),
                });
            }
            if !seen.insert(&position.fund_code) {
                return Err(DataError::InvalidPortfolio {
                    id: self.id.get(),
                    reason: format!("fund {} listed more than once", position.fund_code),
                });
            }
        }
        Ok(())
    }

    /// Sum of all position weights.
    pub fn total_weight(&self) -> f64 {
        self.positions.iter().map(|p| p.weight).sum()
    }
}

/// Three-level portfolio risk label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskClassification {
    /// Bottom of the composite range
    #[display("LOW")]
    Low,
    /// Middle of the composite range
    #[display("MEDIUM")]
    Medium,
    /// Top of the composite range
    #[display("HIGH")]
    High,
}

impl RiskClassification {
    /// All labels, lowest first.
    pub const fn all() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(DataError::Parse(format!("Invalid risk classification: {}", s))),
        }
    }
}

/// The four raw risk components of a portfolio, or their percentiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    /// Covariance-based volatility
    pub volatility: f64,
    /// Herfindahl concentration
    pub concentration: f64,
    /// Maximum drawdown
    pub max_drawdown: f64,
    /// Weighted illiquidity
    pub liquidity_penalty: f64,
}

/// Composite risk score of one portfolio on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRiskScore {
    /// Scored portfolio
    pub portfolio_id: PortfolioId,
    /// Calculation date
    pub date: NaiveDate,
    /// Composite score in `[0, 1]`
    pub risk_score: f64,
    /// Label derived from the score
    pub classification: RiskClassification,
    /// Raw component values
    pub components: RiskComponents,
    /// Cross-sectional percentiles of the components
    pub percentiles: RiskComponents,
}

/// Which rung of the peer hierarchy a fund was compared against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerTier {
    /// Funds sharing the fine category
    #[display("CATEGORY")]
    Category,
    /// Funds sharing the main category
    #[display("MAIN_CATEGORY")]
    MainCategory,
    /// Every fund scored in the run
    #[display("ALL")]
    Universe,
}

impl PeerTier {
    /// Label stored for the universe tier, which has no category name.
    pub const UNIVERSE_LABEL: &'static str = "ALL";

    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Category => "CATEGORY",
            Self::MainCategory => "MAIN_CATEGORY",
            Self::Universe => "ALL",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "CATEGORY" => Ok(Self::Category),
            "MAIN_CATEGORY" => Ok(Self::MainCategory),
            "ALL" => Ok(Self::Universe),
            _ => Err(DataError::Parse(format!("Invalid peer tier: {}", s))),
        }
    }
}

/// Peer-relative performance evaluation of one fund on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundPerformanceMetric {
    /// Evaluated fund
    pub fund_code: FundCode,
    /// Calculation date
    pub date: NaiveDate,
    /// Percentile of the sharpe-like ratio among peers (1 = best)
    pub performance_score: f64,
    /// Peer tier used
    pub peer_tier: PeerTier,
    /// Name of the peer group (`"ALL"` for the universe tier)
    pub peer_category: String,
    /// Both poor-performer conditions held
    pub is_poor_performer: bool,
    /// Flag confidence, present only when flagged
    pub confidence: Option<f64>,
    /// Compounded return divided by volatility
    pub sharpe_like: f64,
    /// Compounded return over the window
    pub total_return: f64,
    /// Sample volatility of daily returns
    pub volatility: f64,
    /// Robust z-score within the peer group
    pub robust_z: f64,
}
