//! End to end: a chunked SSE response through the Oracle client mapping into a
//! session, then to PDF.

use chrono::NaiveDate;
use dl_backend::mock::fixtures;
use dl_backend::oracle::events_from_response;
use dl_core::aggregate::summarize;
use dl_core::export::{export_reply, export_report, portfolio_report};
use dl_core::session::{drive, OracleSession, SessionStatus, TurnOutcome};
use dl_protocol::{ClaimRecord, ClaimStatus, StreamEvent};
use dl_report::{PageGeometry, Theme};
use futures::Stream;
use tokio_util::sync::CancellationToken;

const REPLY: [&str; 6] = [
    "Summary:\n",
    "- Auto claims carry the largest exposure (€1.2M).\n",
    "- Litigation is concentrated in Cook County.\n\n",
    "Recommendations:\n",
    "1. Revisit reserves on the top ten exposures.\n",
    "2. Engage defense counsel early on premises matters — see notes.",
];

fn claims() -> Vec<ClaimRecord> {
    (0..40)
        .map(|i| ClaimRecord {
            id: format!("CLM-{i:03}"),
            claimant: format!("Claimant {i}"),
            category: ["auto", "premises", "product"][i % 3].to_string(),
            status: if i % 5 == 0 {
                ClaimStatus::Litigated
            } else {
                ClaimStatus::Open
            },
            venue: ["Cook County, IL", "Harris County, TX"][i % 2].to_string(),
            counsel: String::new(),
            reserve: 25_000.0,
            paid: 1_000.0 * i as f64,
            exposure: 10_000.0 * (i + 1) as f64,
            opened: "2025-06-01".to_string(),
        })
        .collect()
}

fn ready_session() -> OracleSession {
    let mut session = OracleSession::new();
    session.set_snapshot(summarize(&claims(), 250));
    session
}

/// A `text/event-stream` response whose body arrives split at `sizes`,
/// read through the client's event mapping.
fn events(body: &str, sizes: &[usize]) -> impl Stream<Item = StreamEvent> + Send {
    let chunks = fixtures::chunked(body.as_bytes(), sizes);
    let response = http::Response::builder()
        .status(200)
        .header("content-type", "text/event-stream")
        .body(reqwest::Body::wrap_stream(fixtures::byte_stream(chunks)))
        .unwrap();
    events_from_response(reqwest::Response::from(response))
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

#[tokio::test]
async fn chunked_stream_reassembles_reply() {
    let body = fixtures::sse_body(&REPLY);
    let expected: String = REPLY.concat();

    for sizes in [&[1usize][..], &[3, 7], &[5, 1, 11], &[4096]] {
        let mut session = ready_session();
        let request = session.begin_turn("How does the portfolio look?").unwrap();
        assert_eq!(request.snapshot.totals.claims, 40);

        let mut streamed = String::new();
        let outcome = drive(
            &mut session,
            events(&body, sizes),
            &CancellationToken::new(),
            |t| streamed.push_str(t),
        )
        .await;

        assert_eq!(outcome, TurnOutcome::Completed, "sizes {sizes:?}");
        assert_eq!(streamed, expected, "sizes {sizes:?}");
        assert_eq!(session.last_reply(), Some(expected.as_str()));
    }
}

#[tokio::test]
async fn reply_exports_to_pdf() {
    let mut session = ready_session();
    session.begin_turn("Summarise").unwrap();
    let body = fixtures::sse_body(&REPLY);
    drive(&mut session, events(&body, &[9]), &CancellationToken::new(), |_| {}).await;

    let dir = tempfile::tempdir().unwrap();
    let reply = session.last_reply().unwrap();
    let path = export_reply(reply, &Theme::executive(), &PageGeometry::a4(), dir.path(), date())
        .unwrap();
    assert!(path.ends_with("oracle-analysis-2026-01-15.pdf"));
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));
}

#[tokio::test]
async fn in_band_error_fails_turn() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Partial \"}}]}\n\n\
                data: {\"error\":{\"message\":\"context too large\"}}\n\n";
    let mut session = ready_session();
    session.begin_turn("q").unwrap();
    let outcome = drive(&mut session, events(body, &[13]), &CancellationToken::new(), |_| {}).await;
    assert_eq!(outcome, TurnOutcome::Failed("context too large".to_string()));
    assert_eq!(
        session.status(),
        &SessionStatus::Failed("context too large".to_string())
    );
}

#[tokio::test]
async fn missing_sentinel_still_completes() {
    let mut body = fixtures::sse_body(&["no ", "sentinel"]);
    body.truncate(body.len() - "data: [DONE]\n\n".len());
    let mut session = ready_session();
    session.begin_turn("q").unwrap();
    let outcome = drive(&mut session, events(&body, &[2]), &CancellationToken::new(), |_| {}).await;
    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(session.last_reply(), Some("no sentinel"));
}

#[tokio::test]
async fn broken_line_before_final_delta_is_dropped_not_the_reply() {
    let body = format!(
        "data: {{broken\n{}",
        fixtures::sse_body(&["Reserve ", "is thin"])
    );
    for sizes in [&[4096usize][..], &[1], &[6, 2]] {
        let mut session = ready_session();
        session.begin_turn("q").unwrap();
        let outcome = drive(
            &mut session,
            events(&body, sizes),
            &CancellationToken::new(),
            |_| {},
        )
        .await;
        assert_eq!(outcome, TurnOutcome::Completed, "sizes {sizes:?}");
        assert_eq!(session.last_reply(), Some("Reserve is thin"), "sizes {sizes:?}");
    }
}

#[test]
fn portfolio_report_exports_for_every_theme() {
    let snapshot = summarize(&claims(), 250);
    let report = portfolio_report(&snapshot, date());
    let dir = tempfile::tempdir().unwrap();
    for name in Theme::NAMES {
        let theme = Theme::by_name(name).unwrap();
        let out = dir.path().join(name);
        let path = export_report(&report, &theme, &PageGeometry::letter(), &out, date()).unwrap();
        assert!(path.ends_with("portfolio-overview-2026-01-15.pdf"));
        assert!(std::fs::metadata(&path).unwrap().len() > 1000);
    }
}
