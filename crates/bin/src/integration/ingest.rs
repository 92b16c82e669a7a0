//! File imports with optional progress reporting.

use ankara_data::import::{read_labels_file, read_portfolios_file, read_prices_file};
use ankara_data::{DataError, FundCode, PriceObservation, SqliteStore};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::path::Path;

/// Rows written by an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    /// Rows written
    pub(crate) rows: usize,
    /// Distinct funds or portfolios touched
    pub(crate) entities: usize,
}

/// Import a price CSV, one transaction per fund.
pub(crate) fn import_prices(
    store: &SqliteStore,
    path: &Path,
    progress: Option<&ProgressBar>,
) -> Result<ImportSummary, DataError> {
    let mut by_fund: BTreeMap<FundCode, Vec<PriceObservation>> = BTreeMap::new();
    for (code, obs) in read_prices_file(path)? {
        by_fund.entry(code).or_default().push(obs);
    }

    if let Some(pb) = progress {
        pb.set_length(by_fund.len() as u64);
        pb.set_message("Writing prices...");
    }

    let mut rows = 0;
    for (code, observations) in &by_fund {
        rows += store.put_observations(code, observations)?;
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    Ok(ImportSummary {
        rows,
        entities: by_fund.len(),
    })
}

/// Import a label CSV.
pub(crate) fn import_labels(store: &SqliteStore, path: &Path) -> Result<ImportSummary, DataError> {
    let labels = read_labels_file(path)?;
    let rows = store.put_metadata(&labels)?;
    Ok(ImportSummary {
        rows,
        entities: labels.len(),
    })
}

/// Import a portfolio registry, replacing the positions of each listed portfolio.
pub(crate) fn import_portfolios(
    store: &SqliteStore,
    path: &Path,
    progress: Option<&ProgressBar>,
) -> Result<ImportSummary, DataError> {
    let portfolios = read_portfolios_file(path)?;
    if let Some(pb) = progress {
        pb.set_length(portfolios.len() as u64);
        pb.set_message("Writing portfolios...");
    }

    let mut rows = 0;
    for portfolio in &portfolios {
        store.replace_portfolio(portfolio)?;
        rows += portfolio.positions.len();
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    Ok(ImportSummary {
        rows,
        entities: portfolios.len(),
    })
}
