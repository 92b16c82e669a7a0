//! SQLite store for price history, reference data and computed scores.

use crate::error::{DataError, Result};
use crate::model::{
    DateRange, FundCode, FundMetadata, FundPerformanceMetric, PeerTier, Portfolio, PortfolioId,
    PortfolioRiskScore, Position, PriceObservation, RiskClassification, RiskComponents,
};
use crate::provider::{PriceHistoryProvider, ReferenceDataProvider, ResultsStore};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// How long a writer waits for a concurrent transaction to commit.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const RISK_TABLE: &str = "portfolio_risk_scores";
const PERFORMANCE_TABLE: &str = "fund_performance_metrics";

const RISK_COLUMNS: &str = "portfolio_id, date, risk_score, risk,
     volatility, concentration, max_drawdown, liquidity_penalty,
     volatility_pct, concentration_pct, drawdown_pct, liquidity_pct";

const PERFORMANCE_COLUMNS: &str = "fund_code, date, performance_score, peer_tier, peer_category,
     is_poor_performer, confidence, sharpe_like, total_return, volatility, robust_z";

/// SQLite-backed implementation of every data seam.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

/// Row counts and freshness of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of price observations
    pub observation_count: usize,
    /// Number of distinct funds with prices
    pub fund_count: usize,
    /// Number of labelled funds
    pub labelled_fund_count: usize,
    /// Number of portfolios in the registry
    pub portfolio_count: usize,
    /// Number of stored risk rows
    pub risk_row_count: usize,
    /// Number of stored performance rows
    pub performance_row_count: usize,
    /// Most recent price date
    pub latest_price_date: Option<NaiveDate>,
    /// Most recent risk calculation date
    pub latest_risk_date: Option<NaiveDate>,
    /// Most recent performance calculation date
    pub latest_performance_date: Option<NaiveDate>,
}

impl SqliteStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fund_prices (
                code TEXT NOT NULL,
                date TEXT NOT NULL,
                price REAL NOT NULL,
                market_cap REAL NOT NULL,
                investor_count REAL NOT NULL,
                PRIMARY KEY (code, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_fund_prices_date ON fund_prices(date)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fund_labels (
                code TEXT PRIMARY KEY,
                category TEXT,
                main_category TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS portfolios (
                id INTEGER PRIMARY KEY,
                name TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS portfolio_positions (
                portfolio_id INTEGER NOT NULL REFERENCES portfolios(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                fund_code TEXT NOT NULL,
                weight REAL NOT NULL CHECK (weight >= 0 AND weight <= 1),
                PRIMARY KEY (portfolio_id, fund_code)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS portfolio_risk_scores (
                portfolio_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                risk_score REAL NOT NULL,
                risk TEXT NOT NULL CHECK (risk IN ('LOW', 'MEDIUM', 'HIGH')),
                volatility REAL NOT NULL,
                concentration REAL NOT NULL,
                max_drawdown REAL NOT NULL,
                liquidity_penalty REAL NOT NULL,
                volatility_pct REAL NOT NULL,
                concentration_pct REAL NOT NULL,
                drawdown_pct REAL NOT NULL,
                liquidity_pct REAL NOT NULL,
                PRIMARY KEY (portfolio_id, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS fund_performance_metrics (
                fund_code TEXT NOT NULL,
                date TEXT NOT NULL,
                performance_score REAL NOT NULL,
                peer_tier TEXT NOT NULL,
                peer_category TEXT NOT NULL,
                is_poor_performer INTEGER NOT NULL,
                confidence REAL,
                sharpe_like REAL NOT NULL,
                total_return REAL NOT NULL,
                volatility REAL NOT NULL,
                robust_z REAL NOT NULL,
                PRIMARY KEY (fund_code, date)
            )",
            [],
        )?;

        Ok(())
    }

    /// Store observations of one fund, replacing existing rows for the same dates.
    pub fn put_observations(&self, code: &FundCode, observations: &[PriceObservation]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for obs in observations {
            tx.execute(
                "INSERT OR REPLACE INTO fund_prices (code, date, price, market_cap, investor_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    code.as_str(),
                    obs.date.to_string(),
                    obs.price,
                    obs.market_cap,
                    obs.investor_count
                ],
            )?;
        }
        tx.commit()?;
        Ok(observations.len())
    }

    /// Store observations of many funds in one transaction.
    pub fn put_observation_rows(&self, rows: &[(FundCode, PriceObservation)]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO fund_prices (code, date, price, market_cap, investor_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (code, obs) in rows {
                stmt.execute(params![
                    code.as_str(),
                    obs.date.to_string(),
                    obs.price,
                    obs.market_cap,
                    obs.investor_count
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Delete price observations dated before `cutoff`.
    pub fn prune_prices_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM fund_prices WHERE date < ?1",
            params![cutoff.to_string()],
        )?;
        if deleted > 0 {
            info!(deleted, cutoff = %cutoff, "pruned old price observations");
        }
        Ok(deleted)
    }

    /// Store fund labels, replacing existing labels of the same funds.
    pub fn put_metadata(&self, labels: &[(FundCode, FundMetadata)]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for (code, meta) in labels {
            tx.execute(
                "INSERT OR REPLACE INTO fund_labels (code, category, main_category)
                 VALUES (?1, ?2, ?3)",
                params![code.as_str(), meta.category, meta.main_category],
            )?;
        }
        tx.commit()?;
        Ok(labels.len())
    }

    /// Insert or fully replace a portfolio and its positions.
    pub fn replace_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        portfolio.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO portfolios (id, name) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name",
            params![portfolio.id.get(), portfolio.name],
        )?;
        tx.execute(
            "DELETE FROM portfolio_positions WHERE portfolio_id = ?1",
            params![portfolio.id.get()],
        )?;
        for (idx, position) in portfolio.positions.iter().enumerate() {
            tx.execute(
                "INSERT INTO portfolio_positions (portfolio_id, position, fund_code, weight)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    portfolio.id.get(),
                    idx as i64,
                    position.fund_code.as_str(),
                    position.weight
                ],
            )?;
        }
        tx.commit()?;

        debug!(portfolio = %portfolio.id, positions = portfolio.positions.len(), "portfolio stored");
        Ok(())
    }

    /// Remove a portfolio; returns whether it existed.
    pub fn remove_portfolio(&self, id: PortfolioId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM portfolios WHERE id = ?1", params![id.get()])?;
        Ok(deleted > 0)
    }

    /// Every risk row computed for `date`, ordered by portfolio id.
    pub fn risk_scores_on(&self, date: NaiveDate) -> Result<Vec<PortfolioRiskScore>> {
        let sql = format!(
            "SELECT {RISK_COLUMNS} FROM portfolio_risk_scores
             WHERE date = ?1 ORDER BY portfolio_id"
        );
        self.query_risk(&sql, params![date.to_string()])
    }

    /// Every performance row computed for `date`, ordered by fund code.
    pub fn performance_metrics_on(&self, date: NaiveDate) -> Result<Vec<FundPerformanceMetric>> {
        let sql = format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM fund_performance_metrics
             WHERE date = ?1 ORDER BY fund_code"
        );
        self.query_performance(&sql, params![date.to_string()])
    }

    /// Most recent date with stored risk rows.
    pub fn latest_risk_date(&self) -> Result<Option<NaiveDate>> {
        self.max_date("SELECT MAX(date) FROM portfolio_risk_scores")
    }

    /// Most recent date with stored performance rows.
    pub fn latest_performance_date(&self) -> Result<Option<NaiveDate>> {
        self.max_date("SELECT MAX(date) FROM fund_performance_metrics")
    }

    /// Most recent date with price observations.
    pub fn latest_price_date(&self) -> Result<Option<NaiveDate>> {
        self.max_date("SELECT MAX(date) FROM fund_prices")
    }

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            observation_count: count("SELECT COUNT(*) FROM fund_prices")?,
            fund_count: count("SELECT COUNT(DISTINCT code) FROM fund_prices")?,
            labelled_fund_count: count("SELECT COUNT(*) FROM fund_labels")?,
            portfolio_count: count("SELECT COUNT(*) FROM portfolios")?,
            risk_row_count: count("SELECT COUNT(*) FROM portfolio_risk_scores")?,
            performance_row_count: count("SELECT COUNT(*) FROM fund_performance_metrics")?,
            latest_price_date: self.latest_price_date()?,
            latest_risk_date: self.latest_risk_date()?,
            latest_performance_date: self.latest_performance_date()?,
        })
    }

    fn max_date(&self, sql: &str) -> Result<Option<NaiveDate>> {
        let value: Option<String> = self.conn.query_row(sql, [], |row| row.get(0))?;
        value.as_deref().map(parse_date).transpose()
    }

    fn query_risk(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<PortfolioRiskScore>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawRiskRow::from_row)?;
        rows.map(|row| row?.into_score()).collect()
    }

    fn query_performance(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<FundPerformanceMetric>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawPerformanceRow::from_row)?;
        rows.map(|row| row?.into_metric()).collect()
    }

    fn write_risk_batch(&self, rows: &[PortfolioRiskScore]) -> rusqlite::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO portfolio_risk_scores ({RISK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.portfolio_id.get(),
                    row.date.to_string(),
                    row.risk_score,
                    row.classification.to_db_str(),
                    row.components.volatility,
                    row.components.concentration,
                    row.components.max_drawdown,
                    row.components.liquidity_penalty,
                    row.percentiles.volatility,
                    row.percentiles.concentration,
                    row.percentiles.max_drawdown,
                    row.percentiles.liquidity_penalty,
                ])?;
            }
        }
        tx.commit()
    }

    fn write_performance_batch(&self, rows: &[FundPerformanceMetric]) -> rusqlite::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO fund_performance_metrics ({PERFORMANCE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.fund_code.as_str(),
                    row.date.to_string(),
                    row.performance_score,
                    row.peer_tier.to_db_str(),
                    row.peer_category,
                    row.is_poor_performer,
                    row.confidence,
                    row.sharpe_like,
                    row.total_return,
                    row.volatility,
                    row.robust_z,
                ])?;
            }
        }
        tx.commit()
    }
}

impl PriceHistoryProvider for SqliteStore {
    fn observations(&self, fund_code: &FundCode, range: DateRange) -> Result<Vec<PriceObservation>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, price, market_cap, investor_count
             FROM fund_prices
             WHERE code = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(
            params![fund_code.as_str(), range.start.to_string(), range.end.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            },
        )?;

        let mut observations = Vec::new();
        for row in rows {
            let (date, price, market_cap, investor_count) = row?;
            observations.push(PriceObservation::new(
                parse_date(&date)?,
                price,
                market_cap,
                investor_count,
            ));
        }
        Ok(observations)
    }

    fn fund_codes(&self, range: DateRange) -> Result<Vec<FundCode>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT code FROM fund_prices
             WHERE date >= ?1 AND date <= ?2
             ORDER BY code",
        )?;
        let rows = stmt.query_map(params![range.start.to_string(), range.end.to_string()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut codes = Vec::new();
        for row in rows {
            codes.push(FundCode::new(row?));
        }
        Ok(codes)
    }
}

impl ReferenceDataProvider for SqliteStore {
    fn metadata(&self, fund_code: &FundCode) -> Result<Option<FundMetadata>> {
        let labels = self
            .conn
            .query_row(
                "SELECT category, main_category FROM fund_labels WHERE code = ?1",
                params![fund_code.as_str()],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        Ok(labels.map(|(category, main_category)| FundMetadata::new(category, main_category)))
    }

    fn active_portfolios(&self) -> Result<Vec<Portfolio>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM portfolios ORDER BY id")?;
        let headers = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut positions_stmt = self.conn.prepare(
            "SELECT fund_code, weight FROM portfolio_positions
             WHERE portfolio_id = ?1 ORDER BY position",
        )?;

        let mut portfolios = Vec::with_capacity(headers.len());
        for (id, name) in headers {
            let positions = positions_stmt
                .query_map(params![id], |row| {
                    Ok(Position::new(
                        FundCode::new(row.get::<_, String>(0)?),
                        row.get::<_, f64>(1)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            portfolios.push(Portfolio {
                id: PortfolioId::from(id),
                name,
                positions,
            });
        }
        Ok(portfolios)
    }
}

impl ResultsStore for SqliteStore {
    fn upsert_risk_scores(&self, date: NaiveDate, rows: &[PortfolioRiskScore]) -> Result<usize> {
        for row in rows {
            check_batch_date(row.portfolio_id.to_string(), row.date, date)?;
        }
        self.write_risk_batch(rows)
            .map_err(|source| DataError::BatchPersistence {
                table: RISK_TABLE,
                date,
                source,
            })?;
        info!(date = %date, rows = rows.len(), "risk batch committed");
        Ok(rows.len())
    }

    fn upsert_performance_metrics(
        &self,
        date: NaiveDate,
        rows: &[FundPerformanceMetric],
    ) -> Result<usize> {
        for row in rows {
            check_batch_date(row.fund_code.to_string(), row.date, date)?;
        }
        self.write_performance_batch(rows)
            .map_err(|source| DataError::BatchPersistence {
                table: PERFORMANCE_TABLE,
                date,
                source,
            })?;
        info!(date = %date, rows = rows.len(), "performance batch committed");
        Ok(rows.len())
    }

    fn latest_risk(&self, portfolio_id: PortfolioId) -> Result<Option<PortfolioRiskScore>> {
        let sql = format!(
            "SELECT {RISK_COLUMNS} FROM portfolio_risk_scores
             WHERE portfolio_id = ?1 ORDER BY date DESC LIMIT 1"
        );
        Ok(self
            .query_risk(&sql, params![portfolio_id.get()])?
            .into_iter()
            .next())
    }

    fn high_risk_portfolios(&self) -> Result<Vec<PortfolioRiskScore>> {
        let sql = format!(
            "SELECT {RISK_COLUMNS} FROM portfolio_risk_scores s
             WHERE s.date = (SELECT MAX(date) FROM portfolio_risk_scores
                             WHERE portfolio_id = s.portfolio_id)
               AND s.risk = 'HIGH'
             ORDER BY s.portfolio_id"
        );
        self.query_risk(&sql, [])
    }

    fn poor_performers(&self) -> Result<Vec<FundPerformanceMetric>> {
        let sql = format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM fund_performance_metrics m
             WHERE m.date = (SELECT MAX(date) FROM fund_performance_metrics
                             WHERE fund_code = m.fund_code)
               AND m.is_poor_performer = 1
             ORDER BY m.fund_code"
        );
        self.query_performance(&sql, [])
    }
}

fn check_batch_date(entity: String, row_date: NaiveDate, batch_date: NaiveDate) -> Result<()> {
    if row_date != batch_date {
        return Err(DataError::MismatchedBatchDate {
            entity,
            row_date,
            batch_date,
        });
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DataError::Parse(format!("Invalid date '{}': {}", s, e)))
}

/// Risk row as stored, before string columns are parsed.
struct RawRiskRow {
    portfolio_id: i64,
    date: String,
    risk_score: f64,
    risk: String,
    components: RiskComponents,
    percentiles: RiskComponents,
}

impl RawRiskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            portfolio_id: row.get(0)?,
            date: row.get(1)?,
            risk_score: row.get(2)?,
            risk: row.get(3)?,
            components: RiskComponents {
                volatility: row.get(4)?,
                concentration: row.get(5)?,
                max_drawdown: row.get(6)?,
                liquidity_penalty: row.get(7)?,
            },
            percentiles: RiskComponents {
                volatility: row.get(8)?,
                concentration: row.get(9)?,
                max_drawdown: row.get(10)?,
                liquidity_penalty: row.get(11)?,
            },
        })
    }

    fn into_score(self) -> Result<PortfolioRiskScore> {
        Ok(PortfolioRiskScore {
            portfolio_id: PortfolioId::from(self.portfolio_id),
            date: parse_date(&self.date)?,
            risk_score: self.risk_score,
            classification: RiskClassification::from_db_str(&self.risk)?,
            components: self.components,
            percentiles: self.percentiles,
        })
    }
}

/// Performance row as stored, before string columns are parsed.
struct RawPerformanceRow {
    fund_code: String,
    date: String,
    performance_score: f64,
    peer_tier: String,
    peer_category: String,
    is_poor_performer: bool,
    confidence: Option<f64>,
    sharpe_like: f64,
    total_return: f64,
    volatility: f64,
    robust_z: f64,
}

impl RawPerformanceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            fund_code: row.get(0)?,
            date: row.get(1)?,
            performance_score: row.get(2)?,
            peer_tier: row.get(3)?,
            peer_category: row.get(4)?,
            is_poor_performer: row.get(5)?,
            confidence: row.get(6)?,
            sharpe_like: row.get(7)?,
            total_return: row.get(8)?,
            volatility: row.get(9)?,
            robust_z: row.get(10)?,
        })
    }

    fn into_metric(self) -> Result<FundPerformanceMetric> {
        Ok(FundPerformanceMetric {
            fund_code: FundCode::new(self.fund_code),
            date: parse_date(&self.date)?,
            performance_score: self.performance_score,
            peer_tier: PeerTier::from_db_str(&self.peer_tier)?,
            peer_category: self.peer_category,
            is_poor_performer: self.is_poor_performer,
            confidence: self.confidence,
            sharpe_like: self.sharpe_like,
            total_return: self.total_return,
            volatility: self.volatility,
            robust_z: self.robust_z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, day).unwrap()
    }

    fn risk_row(id: i64, date: NaiveDate, score: f64, class: RiskClassification) -> PortfolioRiskScore {
        PortfolioRiskScore {
            portfolio_id: PortfolioId::from(id),
            date,
            risk_score: score,
            classification: class,
            components: RiskComponents {
                volatility: 0.01,
                concentration: 0.5,
                max_drawdown: 0.1,
                liquidity_penalty: 0.3,
            },
            percentiles: RiskComponents {
                volatility: score,
                concentration: score,
                max_drawdown: score,
                liquidity_penalty: score,
            },
        }
    }

    fn perf_row(code: &str, date: NaiveDate, flagged: bool) -> FundPerformanceMetric {
        FundPerformanceMetric {
            fund_code: FundCode::from(code),
            date,
            performance_score: if flagged { 0.05 } else { 0.6 },
            peer_tier: PeerTier::Universe,
            peer_category: PeerTier::UNIVERSE_LABEL.to_string(),
            is_poor_performer: flagged,
            confidence: flagged.then_some(0.6),
            sharpe_like: 1.0,
            total_return: 0.02,
            volatility: 0.02,
            robust_z: if flagged { -1.8 } else { 0.3 },
        }
    }

    #[test]
    fn test_store_initialization() {
        let store = SqliteStore::in_memory().unwrap();
        let stats = store.get_stats().unwrap();
        assert_eq!(stats, StoreStats::default());
    }

    #[test]
    fn test_price_round_trip_and_range() {
        let store = SqliteStore::in_memory().unwrap();
        let code = FundCode::from("AAK");
        let observations: Vec<_> = (1..=5)
            .map(|day| PriceObservation::new(d(day), 1.0 + day as f64, 1e6, 100.0))
            .collect();
        store.put_observations(&code, &observations).unwrap();

        let range = DateRange::new(d(2), d(4)).unwrap();
        let loaded = store.observations(&code, range).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].date, d(2));
        assert_eq!(store.fund_codes(range).unwrap(), vec![code.clone()]);

        // re-storing a date replaces it
        store
            .put_observations(&code, &[PriceObservation::new(d(2), 9.0, 1e6, 100.0)])
            .unwrap();
        assert_eq!(store.observations(&code, range).unwrap()[0].price, 9.0);
        assert_eq!(store.get_stats().unwrap().observation_count, 5);
    }

    #[test]
    fn test_prune_prices() {
        let store = SqliteStore::in_memory().unwrap();
        let code = FundCode::from("AAK");
        let observations: Vec<_> = (1..=5)
            .map(|day| PriceObservation::new(d(day), 1.0, 1.0, 1.0))
            .collect();
        store.put_observations(&code, &observations).unwrap();
        assert_eq!(store.prune_prices_before(d(3)).unwrap(), 2);
        assert_eq!(store.latest_price_date().unwrap(), Some(d(5)));
    }

    #[test]
    fn test_metadata_operations() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .put_metadata(&[(
                FundCode::from("AAK"),
                FundMetadata::new(Some("Hisse".to_string()), Some("Equity".to_string())),
            )])
            .unwrap();
        let meta = store.metadata(&FundCode::from("AAK")).unwrap().unwrap();
        assert_eq!(meta.category.as_deref(), Some("Hisse"));
        assert!(store.metadata(&FundCode::from("ZZZ")).unwrap().is_none());
    }

    #[test]
    fn test_portfolio_registry() {
        let store = SqliteStore::in_memory().unwrap();
        let portfolio = Portfolio::new(
            PortfolioId::from(2),
            Some("Balanced".to_string()),
            vec![Position::new("B", 0.3), Position::new("A", 0.7)],
        )
        .unwrap();
        store.replace_portfolio(&portfolio).unwrap();

        let loaded = store.active_portfolios().unwrap();
        assert_eq!(loaded, vec![portfolio.clone()]);

        let updated = Portfolio::new(PortfolioId::from(2), None, vec![Position::new("C", 1.0)]).unwrap();
        store.replace_portfolio(&updated).unwrap();
        assert_eq!(store.active_portfolios().unwrap(), vec![updated]);

        assert!(store.remove_portfolio(PortfolioId::from(2)).unwrap());
        assert!(store.active_portfolios().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_portfolio_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let bad = Portfolio {
            id: PortfolioId::from(1),
            name: None,
            positions: vec![Position::new("A", 1.5)],
        };
        assert!(store.replace_portfolio(&bad).is_err());
    }

    #[test]
    fn test_risk_upsert_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let rows = vec![
            risk_row(1, d(3), 0.2, RiskClassification::Low),
            risk_row(2, d(3), 0.9, RiskClassification::High),
        ];
        store.upsert_risk_scores(d(3), &rows).unwrap();
        store.upsert_risk_scores(d(3), &rows).unwrap();

        let stored = store.risk_scores_on(d(3)).unwrap();
        assert_eq!(stored, rows);
        assert_eq!(store.get_stats().unwrap().risk_row_count, 2);
    }

    #[test]
    fn test_mismatched_batch_date_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let rows = vec![risk_row(1, d(4), 0.2, RiskClassification::Low)];
        let err = store.upsert_risk_scores(d(3), &rows).unwrap_err();
        assert!(matches!(err, DataError::MismatchedBatchDate { .. }));
        assert!(store.risk_scores_on(d(4)).unwrap().is_empty());
    }

    #[test]
    fn test_failed_risk_batch_leaves_previous_rows() {
        let store = SqliteStore::in_memory().unwrap();
        let committed = vec![risk_row(1, d(3), 0.2, RiskClassification::Low)];
        store.upsert_risk_scores(d(3), &committed).unwrap();

        // NaN is bound as NULL, so the last row violates NOT NULL
        let rerun = vec![
            risk_row(1, d(3), 0.8, RiskClassification::High),
            risk_row(2, d(3), 0.5, RiskClassification::Medium),
            risk_row(3, d(3), f64::NAN, RiskClassification::Low),
        ];
        let err = store.upsert_risk_scores(d(3), &rerun).unwrap_err();

        assert!(matches!(
            err,
            DataError::BatchPersistence {
                table: RISK_TABLE,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert_eq!(store.risk_scores_on(d(3)).unwrap(), committed);
    }

    #[test]
    fn test_failed_performance_batch_is_not_visible() {
        let store = SqliteStore::in_memory().unwrap();
        let mut broken = perf_row("CCC", d(3), false);
        broken.sharpe_like = f64::NAN;
        let rows = vec![perf_row("AAA", d(3), true), perf_row("BBB", d(3), false), broken];

        let err = store.upsert_performance_metrics(d(3), &rows).unwrap_err();

        assert!(matches!(
            err,
            DataError::BatchPersistence {
                table: PERFORMANCE_TABLE,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert!(store.performance_metrics_on(d(3)).unwrap().is_empty());
        assert!(store.poor_performers().unwrap().is_empty());
    }

    #[test]
    fn test_latest_risk_and_high_set() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_risk_scores(
                d(1),
                &[
                    risk_row(1, d(1), 0.9, RiskClassification::High),
                    risk_row(2, d(1), 0.8, RiskClassification::High),
                ],
            )
            .unwrap();
        store
            .upsert_risk_scores(
                d(2),
                &[
                    risk_row(1, d(2), 0.1, RiskClassification::Low),
                    risk_row(2, d(2), 0.7, RiskClassification::High),
                ],
            )
            .unwrap();

        let latest = store.latest_risk(PortfolioId::from(1)).unwrap().unwrap();
        assert_eq!(latest.date, d(2));
        assert_eq!(latest.classification, RiskClassification::Low);

        let high: Vec<i64> = store
            .high_risk_portfolios()
            .unwrap()
            .iter()
            .map(|r| r.portfolio_id.get())
            .collect();
        assert_eq!(high, vec![2]);

        assert!(store.latest_risk(PortfolioId::from(99)).unwrap().is_none());
    }

    #[test]
    fn test_poor_performers_use_latest_row() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_performance_metrics(d(1), &[perf_row("AAK", d(1), true), perf_row("BBK", d(1), true)])
            .unwrap();
        store
            .upsert_performance_metrics(d(2), &[perf_row("AAK", d(2), false)])
            .unwrap();

        let flagged = store.poor_performers().unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].fund_code.as_str(), "BBK");
        assert_eq!(flagged[0].confidence, Some(0.6));

        let day_two = store.performance_metrics_on(d(2)).unwrap();
        assert_eq!(day_two, vec![perf_row("AAK", d(2), false)]);
        assert_eq!(day_two[0].confidence, None);
    }
}
