use std::sync::Arc;

use attackgen_core::results::{
    load_results, AttackResults, MaxEntry, MaxesSnapshot, PgeRecord, ResultSeriesExtractor,
    SeriesError,
};

fn pge(trace: usize, subkey: usize, pge: f64) -> PgeRecord {
    PgeRecord { trace, subkey, pge }
}

fn bound(results: AttackResults) -> ResultSeriesExtractor {
    ResultSeriesExtractor::new(Some(Arc::new(results)))
}

#[test]
fn unbound_extractor_reports_no_results() {
    let extractor = ResultSeriesExtractor::default();
    assert_eq!(extractor.corr_vs_trace(0), Err(SeriesError::NoResults));
    assert_eq!(extractor.pge_vs_trace(0), Err(SeriesError::NoResults));
    assert_eq!(extractor.output_vs_time(0), Err(SeriesError::NoResults));
}

#[test]
fn single_pge_record_shows_up_only_for_its_subkey() {
    let extractor = bound(AttackResults {
        num_subkeys: 16,
        pge_total: vec![pge(5, 2, 1.5)],
        ..Default::default()
    });

    let series = extractor.pge_vs_trace(2).unwrap();
    assert_eq!(series.traces, [5]);
    assert_eq!(series.pge, [1.5]);

    let empty = extractor.pge_vs_trace(0).unwrap();
    assert!(empty.traces.is_empty());
    assert!(empty.pge.is_empty());
}

#[test]
fn pge_is_averaged_per_trace_in_first_seen_order() {
    let extractor = bound(AttackResults {
        num_subkeys: 2,
        pge_total: vec![
            pge(50, 0, 4.0),
            pge(10, 0, 8.0),
            pge(50, 0, 2.0),
            pge(10, 1, 1.0),
            pge(30, 1, 6.0),
            pge(10, 0, 6.0),
        ],
        ..Default::default()
    });

    let sub0 = extractor.pge_vs_trace(0).unwrap();
    assert_eq!(sub0.traces, [50, 10]);
    assert_eq!(sub0.pge, [3.0, 7.0]);

    let sub1 = extractor.pge_vs_trace(1).unwrap();
    assert_eq!(sub1.traces, [10, 30]);
    assert_eq!(sub1.pge, [1.0, 6.0]);
}

#[test]
fn pge_rejects_records_outside_subkey_range() {
    let extractor = bound(AttackResults {
        num_subkeys: 1,
        pge_total: vec![pge(1, 3, 0.0)],
        ..Default::default()
    });
    assert!(matches!(extractor.pge_vs_trace(0), Err(SeriesError::MalformedResults(_))));
    assert_eq!(
        extractor.pge_vs_trace(1),
        Err(SeriesError::SubkeyOutOfRange { subkey: 1, num_subkeys: 1 })
    );
}

#[test]
fn correlation_matrix_is_indexed_by_guess_then_checkpoint() {
    let entry = |guess, value| MaxEntry { guess, stat: 0.0, value };
    let extractor = bound(AttackResults {
        num_subkeys: 1,
        diffs: vec![vec![vec![0.0; 4]; 3]],
        maxes_list: vec![vec![
            MaxesSnapshot { trace: 25, maxes: vec![entry(2, 0.9), entry(0, 0.4), entry(1, 0.1)] },
            MaxesSnapshot { trace: 50, maxes: vec![entry(0, 0.7), entry(2, 0.6), entry(1, -0.2)] },
        ]],
        ..Default::default()
    });

    let series = extractor.corr_vs_trace(0).unwrap();
    assert_eq!(series.traces, [25, 50]);
    assert_eq!(series.values, [vec![0.4, 0.7], vec![0.1, -0.2], vec![0.9, 0.6]]);
}

#[test]
fn correlation_snapshot_with_too_few_guesses_is_malformed() {
    let extractor = bound(AttackResults {
        num_subkeys: 1,
        diffs: vec![vec![vec![0.0]; 2]],
        maxes_list: vec![vec![MaxesSnapshot {
            trace: 1,
            maxes: vec![MaxEntry { guess: 0, stat: 0.0, value: 1.0 }],
        }]],
        ..Default::default()
    });
    assert!(matches!(extractor.corr_vs_trace(0), Err(SeriesError::MalformedResults(_))));
}

#[test]
fn envelope_splits_guesses_around_the_known_key() {
    // Offset 3 holds the interesting values; all other columns are flat.
    let mut diffs = vec![vec![0.0; 5]; 6];
    diffs[0][3] = 0.2;
    diffs[1][3] = -0.3;
    diffs[2][3] = 0.1;
    diffs[3][3] = 0.8; // correct key
    diffs[4][3] = 0.5;
    diffs[5][3] = -0.25;

    let extractor = bound(AttackResults {
        num_subkeys: 1,
        diffs: vec![diffs],
        known_key: vec![Some(3)],
        ..Default::default()
    });

    let series = extractor.output_vs_time(0).unwrap();
    assert_eq!(series.offsets, [0, 1, 2, 3, 4]);
    assert_eq!(series.correct[3], 0.8);
    assert_eq!(series.below.as_ref().unwrap()[3], -0.3);
    assert_eq!(series.above.as_ref().unwrap()[3], 0.5);
    // Flat columns tie at zero magnitude.
    assert_eq!(series.below.unwrap()[0], 0.0);
}

#[test]
fn envelope_is_absent_when_no_guess_lies_on_that_side() {
    let extractor = bound(AttackResults {
        num_subkeys: 1,
        diffs: vec![vec![vec![0.9, 0.1], vec![0.2, -0.4]]],
        known_key: vec![Some(0)],
        ..Default::default()
    });
    let series = extractor.output_vs_time(0).unwrap();
    assert_eq!(series.below, None);
    assert_eq!(series.above, Some(vec![0.2, -0.4]));
}

#[test]
fn envelope_requires_known_key() {
    let extractor = bound(AttackResults {
        num_subkeys: 2,
        diffs: vec![vec![vec![0.0]], vec![vec![0.0]]],
        known_key: vec![Some(0), None],
        ..Default::default()
    });
    assert_eq!(extractor.output_vs_time(1), Err(SeriesError::MissingKnownKey(1)));
}

#[test]
fn swapping_results_changes_what_is_read() {
    let mut extractor = bound(AttackResults {
        num_subkeys: 1,
        pge_total: vec![pge(1, 0, 1.0)],
        ..Default::default()
    });
    extractor.set_results(Some(Arc::new(AttackResults {
        num_subkeys: 1,
        pge_total: vec![pge(9, 0, 4.0)],
        ..Default::default()
    })));
    assert_eq!(extractor.pge_vs_trace(0).unwrap().traces, [9]);

    extractor.set_results(None);
    assert_eq!(extractor.pge_vs_trace(0), Err(SeriesError::NoResults));
}

#[test]
fn results_file_uses_triples_for_max_entries() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("results.json");
    std::fs::write(
        &path,
        r#"{
            "num_subkeys": 1,
            "maxes_list": [[{"trace": 10, "maxes": [[1, 42, 0.75], [0, 7, 0.25]]}]],
            "diffs": [[[0.1, 0.2], [0.3, 0.4]]],
            "known_key": [1],
            "pge_total": [{"trace": 10, "subkey": 0, "pge": 0.0}]
        }"#,
    )
    .unwrap();

    let results = load_results(&path).expect("results");
    assert_eq!(results.maxes_list[0][0].maxes[0], MaxEntry { guess: 1, stat: 42.0, value: 0.75 });

    let series = bound(results).corr_vs_trace(0).unwrap();
    assert_eq!(series.values, [vec![0.25], vec![0.75]]);
}

#[test]
fn results_file_errors_are_reported_with_context() {
    let temp = tempfile::tempdir().unwrap();
    let err = load_results(&temp.path().join("missing.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read results file"));
}
