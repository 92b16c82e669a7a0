//! Peer group selection
//!
//! A fund is compared against the first group in an ordered chain of
//! policies that is large enough. The chain always ends with the universe of
//! scored funds, which needs no minimum size.

use crate::signal::FundSignal;
use ankara_data::PeerTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One rung of the peer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerPolicy {
    /// Funds sharing the fine category
    Category,
    /// Funds sharing the main category
    MainCategory,
    /// Every scored fund
    Universe,
}

impl PeerPolicy {
    /// Category, then main category, then universe.
    pub fn default_chain() -> Vec<Self> {
        vec![Self::Category, Self::MainCategory, Self::Universe]
    }

    /// Tier recorded when this policy is used.
    pub const fn tier(self) -> PeerTier {
        match self {
            Self::Category => PeerTier::Category,
            Self::MainCategory => PeerTier::MainCategory,
            Self::Universe => PeerTier::Universe,
        }
    }
}

/// The group a fund is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerSelection<'a> {
    /// Tier used
    pub tier: PeerTier,
    /// Group name (`"ALL"` for the universe)
    pub label: &'a str,
    /// Indices of the members in the scored set
    pub members: &'a [usize],
}

/// Funds of a run indexed by their labels.
#[derive(Debug, Clone, Default)]
pub struct PeerIndex {
    by_category: BTreeMap<String, Vec<usize>>,
    by_main_category: BTreeMap<String, Vec<usize>>,
    universe: Vec<usize>,
}

impl PeerIndex {
    /// Index the scored funds.
    pub fn new(signals: &[FundSignal]) -> Self {
        let mut index = Self::default();
        for (i, signal) in signals.iter().enumerate() {
            if let Some(category) = &signal.category {
                index.by_category.entry(category.clone()).or_default().push(i);
            }
            if let Some(main) = &signal.main_category {
                index.by_main_category.entry(main.clone()).or_default().push(i);
            }
            index.universe.push(i);
        }
        index
    }

    /// Walk `policies` and return the first group with at least `min_size` members.
    ///
    /// Falls back to the universe when no policy matches.
    pub fn select<'a>(
        &'a self,
        signal: &'a FundSignal,
        policies: &[PeerPolicy],
        min_size: usize,
    ) -> PeerSelection<'a> {
        policies
            .iter()
            .find_map(|&policy| self.candidate(signal, policy, min_size))
            .unwrap_or_else(|| self.universe())
    }

    fn candidate<'a>(
        &'a self,
        signal: &'a FundSignal,
        policy: PeerPolicy,
        min_size: usize,
    ) -> Option<PeerSelection<'a>> {
        let (label, map) = match policy {
            PeerPolicy::Category => (signal.category.as_deref()?, &self.by_category),
            PeerPolicy::MainCategory => (signal.main_category.as_deref()?, &self.by_main_category),
            PeerPolicy::Universe => return Some(self.universe()),
        };
        let members = map.get(label)?;
        (members.len() >= min_size).then_some(PeerSelection {
            tier: policy.tier(),
            label,
            members,
        })
    }

    fn universe(&self) -> PeerSelection<'_> {
        PeerSelection {
            tier: PeerTier::Universe,
            label: PeerTier::UNIVERSE_LABEL,
            members: &self.universe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SharpeLike;
    use ankara_data::FundCode;

    fn signal(code: &str, category: Option<&str>, main: Option<&str>) -> FundSignal {
        FundSignal {
            fund_code: FundCode::from(code),
            signal: SharpeLike {
                total_return: 0.0,
                volatility: 0.01,
                ratio: 0.0,
            },
            observations: 60,
            category: category.map(str::to_string),
            main_category: main.map(str::to_string),
        }
    }

    /// Three funds in a small category and three more sharing its main category.
    fn signals() -> Vec<FundSignal> {
        let mut s: Vec<_> = (0..3)
            .map(|i| signal(&format!("S{i}"), Some("Small"), Some("Equity")))
            .collect();
        s.extend((0..3).map(|i| signal(&format!("O{i}"), Some("Other"), Some("Equity"))));
        s.push(signal("LONE", None, None));
        s
    }

    #[test]
    fn test_falls_back_to_main_category() {
        let signals = signals();
        let index = PeerIndex::new(&signals);
        let chain = PeerPolicy::default_chain();

        let selection = index.select(&signals[0], &chain, 5);
        assert_eq!(selection.tier, PeerTier::MainCategory);
        assert_eq!(selection.label, "Equity");
        assert_eq!(selection.members.len(), 6);
    }

    #[test]
    fn test_category_used_when_large_enough() {
        let signals = signals();
        let index = PeerIndex::new(&signals);
        let selection = index.select(&signals[0], &PeerPolicy::default_chain(), 3);
        assert_eq!(selection.tier, PeerTier::Category);
        assert_eq!(selection.label, "Small");
    }

    #[test]
    fn test_unlabelled_fund_uses_universe() {
        let signals = signals();
        let index = PeerIndex::new(&signals);
        let selection = index.select(&signals[6], &PeerPolicy::default_chain(), 5);
        assert_eq!(selection.tier, PeerTier::Universe);
        assert_eq!(selection.label, "ALL");
        assert_eq!(selection.members.len(), 7);
    }

    #[test]
    fn test_empty_chain_falls_back_to_universe() {
        let signals = signals();
        let index = PeerIndex::new(&signals);
        assert_eq!(index.select(&signals[0], &[], 5).tier, PeerTier::Universe);
    }
}
