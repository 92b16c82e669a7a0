//! Loaders for the external input files.
//!
//! - prices: CSV with `date,code,price,market_cap,number_of_investors`
//!   (extra columns such as `number_of_shares` are ignored)
//! - labels: CSV with `code,category,main_category`
//! - portfolios: JSON array of `{id, name, positions: [{fund_code, weight}]}`

use crate::error::Result;
use crate::model::{FundCode, FundMetadata, Portfolio, PriceObservation};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct PriceRecord {
    date: NaiveDate,
    code: String,
    price: f64,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    number_of_investors: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LabelRecord {
    code: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    main_category: Option<String>,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Read price observations from CSV.
///
/// Missing market cap or investor counts are read as zero. Rows with a
/// blank fund code are skipped.
pub fn read_prices<R: Read>(reader: R) -> Result<Vec<(FundCode, PriceObservation)>> {
    let mut rows = Vec::new();
    for record in csv_reader(reader).deserialize::<PriceRecord>() {
        let record = record?;
        let code = FundCode::new(record.code);
        if code.as_str().is_empty() {
            warn!(date = %record.date, "skipping price row without fund code");
            continue;
        }
        rows.push((
            code,
            PriceObservation::new(
                record.date,
                record.price,
                record.market_cap.unwrap_or(0.0),
                record.number_of_investors.unwrap_or(0.0),
            ),
        ));
    }
    Ok(rows)
}

/// Read fund labels from CSV.
pub fn read_labels<R: Read>(reader: R) -> Result<Vec<(FundCode, FundMetadata)>> {
    let mut labels = Vec::new();
    for record in csv_reader(reader).deserialize::<LabelRecord>() {
        let record = record?;
        labels.push((
            FundCode::new(record.code),
            FundMetadata::new(record.category, record.main_category),
        ));
    }
    Ok(labels)
}

/// Read and validate a portfolio registry from JSON.
pub fn read_portfolios<R: Read>(reader: R) -> Result<Vec<Portfolio>> {
    let portfolios: Vec<Portfolio> = serde_json::from_reader(reader)?;
    for portfolio in &portfolios {
        portfolio.validate()?;
    }
    Ok(portfolios)
}

/// [`read_prices`] from a file.
pub fn read_prices_file<P: AsRef<Path>>(path: P) -> Result<Vec<(FundCode, PriceObservation)>> {
    read_prices(File::open(path)?)
}

/// [`read_labels`] from a file.
pub fn read_labels_file<P: AsRef<Path>>(path: P) -> Result<Vec<(FundCode, FundMetadata)>> {
    read_labels(File::open(path)?)
}

/// [`read_portfolios`] from a file.
pub fn read_portfolios_file<P: AsRef<Path>>(path: P) -> Result<Vec<Portfolio>> {
    read_portfolios(File::open(path)?)
}
