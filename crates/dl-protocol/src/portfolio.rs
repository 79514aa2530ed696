//! Claim records and the aggregated snapshot sent with each chat turn.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Open,
    Litigated,
    Settled,
    Closed,
}

impl ClaimStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Litigated => "litigated",
            Self::Settled => "settled",
            Self::Closed => "closed",
        }
    }

    /// Open and litigated claims still carry reserve.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Open | Self::Litigated)
    }
}

/// A single claim or litigated matter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimRecord {
    pub id: String,
    #[serde(default)]
    pub claimant: String,
    pub category: String,
    pub status: ClaimStatus,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub counsel: String,
    #[serde(default)]
    pub reserve: f64,
    #[serde(default)]
    pub paid: f64,
    #[serde(default)]
    pub exposure: f64,
    /// ISO date the claim was opened, as supplied by the source system.
    #[serde(default)]
    pub opened: String,
}

/// Count and money sums for one breakdown key.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub count: u64,
    pub reserve: f64,
    pub paid: f64,
    pub exposure: f64,
}

impl Bucket {
    pub fn add(&mut self, claim: &ClaimRecord) {
        self.count += 1;
        self.reserve += claim.reserve;
        self.paid += claim.paid;
        self.exposure += claim.exposure;
    }
}

/// Portfolio-wide totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PortfolioTotals {
    pub claims: u64,
    pub open: u64,
    pub litigated: u64,
    pub reserve: f64,
    pub paid: f64,
    pub exposure: f64,
}

/// Pre-aggregated portfolio data forwarded to the chat endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSnapshot {
    pub totals: PortfolioTotals,
    pub by_category: BTreeMap<String, Bucket>,
    pub by_status: BTreeMap<String, Bucket>,
    pub by_venue: BTreeMap<String, Bucket>,
    pub top_exposures: Vec<ClaimRecord>,
    pub sample: Vec<ClaimRecord>,
}
