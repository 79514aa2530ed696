//! Roll claim records up into the snapshot sent with each chat turn.

use std::path::{Path, PathBuf};

use dl_protocol::{ClaimRecord, ClaimStatus, PortfolioSnapshot, PortfolioTotals};
use thiserror::Error;
use tracing::debug;

/// Claims listed in `top_exposures`.
pub const TOP_EXPOSURES: usize = 10;
/// Default cap on `sample` rows.
pub const DEFAULT_SAMPLE_ROWS: usize = 250;

const UNSPECIFIED: &str = "unspecified";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a JSON array of claim records.
pub fn load_claims(path: &Path) -> Result<Vec<ClaimRecord>, DataError> {
    let contents = std::fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let claims: Vec<ClaimRecord> =
        serde_json::from_str(&contents).map_err(|source| DataError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), claims = claims.len(), "claims loaded");
    Ok(claims)
}

fn key(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Totals, breakdowns, the largest exposures and a capped sample in input order.
pub fn summarize(claims: &[ClaimRecord], sample_cap: usize) -> PortfolioSnapshot {
    let mut snapshot = PortfolioSnapshot::default();
    let mut totals = PortfolioTotals::default();

    for claim in claims {
        totals.claims += 1;
        match claim.status {
            ClaimStatus::Open => totals.open += 1,
            ClaimStatus::Litigated => totals.litigated += 1,
            ClaimStatus::Settled | ClaimStatus::Closed => {}
        }
        totals.reserve += claim.reserve;
        totals.paid += claim.paid;
        totals.exposure += claim.exposure;

        snapshot
            .by_category
            .entry(key(&claim.category))
            .or_default()
            .add(claim);
        snapshot
            .by_status
            .entry(claim.status.label().to_string())
            .or_default()
            .add(claim);
        snapshot
            .by_venue
            .entry(key(&claim.venue))
            .or_default()
            .add(claim);
    }

    let mut ranked: Vec<&ClaimRecord> = claims.iter().collect();
    // Stable sort keeps input order among equal exposures.
    ranked.sort_by(|a, b| b.exposure.total_cmp(&a.exposure));
    snapshot.top_exposures = ranked
        .into_iter()
        .take(TOP_EXPOSURES)
        .cloned()
        .collect();

    snapshot.sample = claims.iter().take(sample_cap).cloned().collect();
    snapshot.totals = totals;
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(id: usize, category: &str, status: ClaimStatus, exposure: f64) -> ClaimRecord {
        ClaimRecord {
            id: format!("CLM-{id}"),
            claimant: format!("Claimant {id}"),
            category: category.to_string(),
            status,
            venue: if id % 2 == 0 { "Cook County, IL" } else { "" }.to_string(),
            counsel: String::new(),
            reserve: 100.0,
            paid: 10.0,
            exposure,
            opened: "2024-01-01".to_string(),
        }
    }

    fn portfolio() -> Vec<ClaimRecord> {
        (0..30)
            .map(|i| {
                let status = match i % 4 {
                    0 => ClaimStatus::Open,
                    1 => ClaimStatus::Litigated,
                    2 => ClaimStatus::Settled,
                    _ => ClaimStatus::Closed,
                };
                let category = if i % 3 == 0 { "auto" } else { "premises" };
                claim(i, category, status, (i * 1000) as f64)
            })
            .collect()
    }

    #[test]
    fn totals_and_buckets() {
        let snap = summarize(&portfolio(), DEFAULT_SAMPLE_ROWS);
        assert_eq!(snap.totals.claims, 30);
        assert_eq!(snap.totals.open, 8);
        assert_eq!(snap.totals.litigated, 8);
        assert_eq!(snap.totals.reserve, 3000.0);
        assert_eq!(snap.by_category["auto"].count, 10);
        assert_eq!(snap.by_category["premises"].count, 20);
        assert_eq!(snap.by_status["settled"].count, 7);
        assert_eq!(snap.by_venue[UNSPECIFIED].count, 15);

        let bucket_sum: u64 = snap.by_status.values().map(|b| b.count).sum();
        assert_eq!(bucket_sum, snap.totals.claims);
    }

    #[test]
    fn top_exposures_are_ranked() {
        let snap = summarize(&portfolio(), DEFAULT_SAMPLE_ROWS);
        assert_eq!(snap.top_exposures.len(), TOP_EXPOSURES);
        assert_eq!(snap.top_exposures[0].id, "CLM-29");
        assert!(snap
            .top_exposures
            .windows(2)
            .all(|w| w[0].exposure >= w[1].exposure));
    }

    #[test]
    fn ties_keep_input_order() {
        let claims = vec![
            claim(1, "auto", ClaimStatus::Open, 5.0),
            claim(2, "auto", ClaimStatus::Open, 5.0),
        ];
        let snap = summarize(&claims, 10);
        assert_eq!(snap.top_exposures[0].id, "CLM-1");
        assert_eq!(snap.top_exposures[1].id, "CLM-2");
    }

    #[test]
    fn sample_is_capped_in_input_order() {
        let snap = summarize(&portfolio(), 5);
        let ids: Vec<_> = snap.sample.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["CLM-0", "CLM-1", "CLM-2", "CLM-3", "CLM-4"]);
    }

    #[test]
    fn empty_portfolio() {
        let snap = summarize(&[], DEFAULT_SAMPLE_ROWS);
        assert_eq!(snap, PortfolioSnapshot::default());
    }

    #[test]
    fn load_claims_reads_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.json");
        std::fs::write(
            &path,
            r#"[{"id":"A-1","category":"auto","status":"litigated","exposure":12000.5}]"#,
        )
        .unwrap();
        let claims = load_claims(&path).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].status, ClaimStatus::Litigated);
        assert_eq!(claims[0].reserve, 0.0);
    }

    #[test]
    fn load_claims_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_claims(&path).unwrap_err();
        assert!(matches!(err, DataError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));

        let missing = load_claims(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, DataError::Read { .. }));
    }
}
