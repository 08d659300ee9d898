//! Event loop: replays each instrument's records through its ledger.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::info;

use crate::domain::ModelParameters;
use crate::pricing::validate_size;
use crate::report::BacktestReportRow;

use super::ledger::{InstrumentLedger, InstrumentRun};
use super::record::{RfqRecord, TickRule};
use super::state::BacktestSettings;

/// Group records by instrument key.
///
/// Within an instrument, records are stable-sorted into chronological order.
/// A record without a timestamp inherits the timestamp of the record before it
/// in the table, so it keeps its position after that record. Records ahead of
/// the first timestamp keep table order at the front.
pub fn group_by_instrument(
    records: impl IntoIterator<Item = RfqRecord>,
) -> BTreeMap<String, Vec<RfqRecord>> {
    let mut grouped: BTreeMap<String, Vec<RfqRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.instrument.clone())
            .or_default()
            .push(record);
    }
    for events in grouped.values_mut() {
        let mut carried: Option<NaiveDateTime> = None;
        let mut keyed: Vec<(Option<NaiveDateTime>, RfqRecord)> = events
            .drain(..)
            .map(|r| {
                if r.timestamp.is_some() {
                    carried = r.timestamp;
                }
                (carried, r)
            })
            .collect();
        keyed.sort_by_key(|(key, _)| *key);
        events.extend(keyed.into_iter().map(|(_, r)| r));
    }
    grouped
}

/// Run one instrument's events in order and keep the full event tape.
pub fn run_instrument_detailed(
    instrument: &str,
    events: &[RfqRecord],
    params: &ModelParameters,
    settings: &BacktestSettings,
) -> InstrumentRun {
    let mut ledger = InstrumentLedger::new(instrument, params, settings);
    let mut tick_rule = TickRule::default();

    for record in events {
        let snapshot = record.snapshot();
        if let Err(e) = snapshot.validate() {
            ledger.skip(&e);
            continue;
        }
        let size = record.size.unwrap_or(settings.default_rfq_size);
        if let Err(e) = validate_size(size) {
            ledger.skip(&e);
            continue;
        }
        // only priced events advance the tick rule
        let side = tick_rule.resolve(snapshot.mid, record.client_side);
        if ledger.process(&snapshot, size, side).is_err() {
            continue;
        }
    }

    ledger.close()
}

/// Run one instrument's events in order and return its report row.
pub fn run_instrument(
    instrument: &str,
    events: &[RfqRecord],
    params: &ModelParameters,
    settings: &BacktestSettings,
) -> BacktestReportRow {
    run_instrument_detailed(instrument, events, params, settings).row
}

/// Run every instrument sequentially, in key order.
pub fn run_batch(
    events_by_instrument: &BTreeMap<String, Vec<RfqRecord>>,
    params: &ModelParameters,
    settings: &BacktestSettings,
) -> Vec<BacktestReportRow> {
    let rows: Vec<BacktestReportRow> = events_by_instrument
        .iter()
        .map(|(instrument, events)| run_instrument(instrument, events, params, settings))
        .collect();
    info!(instruments = rows.len(), "batch backtest complete");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientSide, MarketSnapshot};
    use chrono::NaiveDate;

    fn record(instrument: &str, mid: f64) -> RfqRecord {
        RfqRecord::from_snapshot(MarketSnapshot::new(
            instrument,
            mid,
            5.0,
            mid + 0.25,
            mid - 0.25,
            2_000.0,
        ))
    }

    fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn grouping_preserves_order_and_sorts_by_time() {
        let mut late = record("AAA", 101.0);
        late.timestamp = Some(at(2, 10));
        let mut early = record("AAA", 100.0);
        early.timestamp = Some(at(1, 10));
        let other = record("BBB", 50.0);

        let grouped = group_by_instrument(vec![late, other, early]);
        assert_eq!(grouped.len(), 2);
        let aaa = &grouped["AAA"];
        assert_eq!(aaa[0].mid, 100.0);
        assert_eq!(aaa[1].mid, 101.0);
    }

    #[test]
    fn untimed_record_keeps_table_position() {
        let mut first = record("AAA", 100.0);
        first.timestamp = Some(at(1, 10));
        let mut second = record("AAA", 100.1);
        second.timestamp = Some(at(2, 10));
        // timestamp cell was unreadable
        let third = record("AAA", 100.2);

        let grouped = group_by_instrument(vec![first, second, third]);
        let mids: Vec<f64> = grouped["AAA"].iter().map(|r| r.mid).collect();
        assert_eq!(mids, vec![100.0, 100.1, 100.2]);
    }

    #[test]
    fn untimed_record_follows_its_predecessor_when_sorted() {
        let mut late = record("AAA", 101.0);
        late.timestamp = Some(at(3, 10));
        let after_late = record("AAA", 101.5);
        let mut early = record("AAA", 100.0);
        early.timestamp = Some(at(1, 10));
        let leading = record("AAA", 99.0);

        let grouped = group_by_instrument(vec![leading, late, after_late, early]);
        let mids: Vec<f64> = grouped["AAA"].iter().map(|r| r.mid).collect();
        assert_eq!(mids, vec![99.0, 100.0, 101.0, 101.5]);
    }

    #[test]
    fn empty_instrument_yields_zero_row() {
        let params = ModelParameters::default();
        let row = run_instrument("AAA", &[], &params, &BacktestSettings::default());
        assert_eq!(row, BacktestReportRow::empty("AAA"));
    }

    #[test]
    fn invalid_rows_are_skipped_not_fatal() {
        let params = ModelParameters::default();
        let mut bad = record("AAA", 100.0);
        bad.high = f64::NAN;
        let events = vec![record("AAA", 100.0), bad, record("AAA", 100.5)];
        let run = run_instrument_detailed("AAA", &events, &params, &BacktestSettings::default());
        assert_eq!(run.row.event_count, 2);
        assert_eq!(run.row.skipped_events, 1);
        assert_eq!(run.events[1].sequence, 2);
    }

    #[test]
    fn invalid_size_is_skipped_without_moving_tick_rule() {
        let params = ModelParameters::default();
        let events = vec![
            record("AAA", 100.0),
            // downtick, but the size is unusable
            record("AAA", 99.0).with_rfq(f64::NAN, ClientSide::Sell),
            record("AAA", 99.0),
        ];
        let run = run_instrument_detailed("AAA", &events, &params, &BacktestSettings::default());
        assert_eq!(run.row.event_count, 2);
        assert_eq!(run.row.skipped_events, 1);
        // 99.0 versus the last priced mid of 100.0 is a downtick
        assert_eq!(run.events[1].client_side, ClientSide::Sell);
        assert_eq!(run.events[1].sequence, 2);
    }

    #[test]
    fn skipped_size_does_not_leak_explicit_side() {
        let params = ModelParameters::default();
        let events = vec![
            record("AAA", 100.0),
            record("AAA", 100.0).with_rfq(-1.0, ClientSide::Sell),
            record("AAA", 100.0),
        ];
        let run = run_instrument_detailed("AAA", &events, &params, &BacktestSettings::default());
        // unchanged mid repeats the last priced side, not the skipped one
        assert_eq!(run.events[1].client_side, ClientSide::Buy);
    }

    #[test]
    fn missing_size_uses_default() {
        let params = ModelParameters::default();
        let settings = BacktestSettings {
            default_rfq_size: 250.0,
            ..BacktestSettings::default()
        };
        let run = run_instrument_detailed("AAA", &[record("AAA", 100.0)], &params, &settings);
        assert_eq!(run.events[0].quote.size, 250.0);
    }

    #[test]
    fn missing_side_follows_tick_rule() {
        let params = ModelParameters::default();
        let events = vec![
            record("AAA", 100.0),
            record("AAA", 99.0),
            record("AAA", 99.5).with_rfq(10.0, ClientSide::Sell),
        ];
        let run = run_instrument_detailed("AAA", &events, &params, &BacktestSettings::default());
        let sides: Vec<ClientSide> = run.events.iter().map(|e| e.client_side).collect();
        assert_eq!(sides, vec![ClientSide::Buy, ClientSide::Sell, ClientSide::Sell]);
    }

    #[test]
    fn batch_emits_one_row_per_instrument() {
        let params = ModelParameters::default();
        let grouped = group_by_instrument(vec![
            record("BBB", 50.0),
            record("AAA", 100.0),
            record("AAA", 100.2),
        ]);
        let rows = run_batch(&grouped, &params, &BacktestSettings::default());
        let keys: Vec<&str> = rows.iter().map(|r| r.instrument.as_str()).collect();
        assert_eq!(keys, vec!["AAA", "BBB"]);
        assert_eq!(rows[0].event_count, 2);
        assert_eq!(rows[1].event_count, 1);
    }
}
