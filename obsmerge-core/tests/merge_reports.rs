use obsmerge_core::{
    AggregateReport, MergeError, MergeOptions, Observation, ObservationMerger, merge_observations,
};
use serde_json::{Value, json};

fn buyer_observation(num_sims: u64, payoff: f64, stddev: Option<f64>) -> Value {
    let features = stddev.map_or_else(|| json!({}), |sd| json!({ "payoff_stddev": sd }));
    json!({
        "features": { "config": { "numSims": num_sims, "market": "CDA" } },
        "players": [
            { "role": "buyer", "strategy": "s1", "payoff": payoff, "features": features }
        ]
    })
}

fn merge_values(values: Vec<Value>) -> Result<AggregateReport, MergeError> {
    let options = MergeOptions::default();
    let parsed = values
        .into_iter()
        .map(|value| Observation::from_value(value, &options));
    merge_observations(parsed, options.clone())
}

#[test]
fn two_observations_merge_into_weighted_report() {
    let report = merge_values(vec![
        buyer_observation(2, 10.0, Some(2.0)),
        buyer_observation(3, 20.0, Some(1.0)),
    ])
    .unwrap();

    let summary = report.strategy("buyer", "s1").expect("buyer/s1 summary");
    assert!((summary.mean - 16.0).abs() < 1e-12);
    assert!((summary.egta_sample_stddev - 50.0_f64.sqrt()).abs() < 1e-9);
    assert!((summary.egta_sample_stddev - 7.071).abs() < 1e-3);
    let true_stddev = summary.true_sample_stddev.expect("true stddev present");
    assert!((true_stddev - 31.5_f64.sqrt()).abs() < 1e-9);
}

#[test]
fn one_observation_without_stddev_drops_true_stddev_everywhere() {
    let mut seller = buyer_observation(4, 5.0, Some(1.0));
    seller["players"][0]["role"] = json!("seller");
    let mut seller_again = buyer_observation(4, 7.0, Some(1.0));
    seller_again["players"][0]["role"] = json!("seller");

    let mut first = buyer_observation(2, 10.0, Some(2.0));
    first["players"]
        .as_array_mut()
        .unwrap()
        .push(seller["players"][0].clone());
    let mut second = buyer_observation(3, 20.0, Some(1.0));
    second["players"]
        .as_array_mut()
        .unwrap()
        .push(seller_again["players"][0].clone());
    let mut third = buyer_observation(3, 18.0, None);
    third["players"]
        .as_array_mut()
        .unwrap()
        .push(seller_again["players"][0].clone());

    let report = merge_values(vec![first, second, third]).unwrap();
    for (role, strategy, summary) in report.strategies() {
        assert!(
            summary.true_sample_stddev.is_none(),
            "{role}/{strategy} kept true_sample_stddev"
        );
    }
    let json = serde_json::to_value(&report).unwrap();
    assert!(json["players"]["buyer"]["s1"].get("true_sample_stddev").is_none());
    assert!(json["players"]["seller"]["s1"].get("egta_sample_stddev").is_some());
}

#[test]
fn feature_means_across_observations() {
    let values = [1.0, 2.0, 3.0]
        .iter()
        .map(|&x| {
            let mut value = buyer_observation(1, x, Some(0.0));
            value["features"]["x"] = json!(x);
            value
        })
        .collect();
    let report = merge_values(values).unwrap();
    assert_eq!(report.feature_mean("x"), Some(2.0));
    assert_eq!(report.features.config["market"], json!("CDA"));
}

#[test]
fn malformed_observation_aborts_the_run() {
    let broken = json!({
        "features": { "surplus": "plenty", "config": { "numSims": 1 } },
        "players": []
    });
    let err = merge_values(vec![buyer_observation(2, 10.0, Some(1.0)), broken]).unwrap_err();
    assert!(err.is_malformed());
    assert!(err.to_string().contains("features.surplus"));
}

#[test]
fn strategy_seen_once_cannot_report_egta_stddev() {
    let mut other = buyer_observation(2, 10.0, Some(1.0));
    other["players"][0]["strategy"] = json!("s2");
    let err = merge_values(vec![
        buyer_observation(2, 10.0, Some(1.0)),
        buyer_observation(2, 12.0, Some(1.0)),
        other,
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        MergeError::InsufficientSamples { ref statistic, .. }
            if statistic == "players.buyer.s2.egta_sample_stddev"
    ));
}

#[test]
fn workers_merged_pairwise_match_a_single_pass() {
    let observations: Vec<Value> = (0..12_u32)
        .map(|i| {
            let payoff = f64::from(i).mul_add(1.5, 10.0);
            buyer_observation(u64::from(i % 4 + 1), payoff, Some(f64::from(i % 3)))
        })
        .collect();
    let options = MergeOptions::default();

    let single = merge_values(observations.clone()).unwrap();

    let mut workers: Vec<ObservationMerger> = (0..3)
        .map(|_| ObservationMerger::new(options.clone()))
        .collect();
    for (index, value) in observations.into_iter().enumerate() {
        let observation = Observation::from_value(value, &options).unwrap();
        workers[index % 3].ingest(observation).unwrap();
    }
    let mut combined = ObservationMerger::new(options);
    for worker in workers.into_iter().rev() {
        combined.absorb(worker).unwrap();
    }
    let parallel = combined.finish().unwrap();

    let a = single.strategy("buyer", "s1").unwrap();
    let b = parallel.strategy("buyer", "s1").unwrap();
    assert!((a.mean - b.mean).abs() < 1e-9);
    assert!((a.egta_sample_stddev - b.egta_sample_stddev).abs() < 1e-9);
    let gap = a.true_sample_stddev.unwrap() - b.true_sample_stddev.unwrap();
    assert!(gap.abs() < 1e-9);
}

#[test]
fn non_finite_strings_abort_the_run() {
    let mut nan_feature = buyer_observation(2, 10.0, Some(1.0));
    nan_feature["features"]["x"] = json!("NaN");
    let mut inf_payoff = buyer_observation(2, 12.0, Some(1.0));
    inf_payoff["players"][0]["payoff"] = json!("inf");

    let valid = buyer_observation(2, 14.0, Some(1.0));

    let err = merge_values(vec![nan_feature, valid.clone()]).unwrap_err();
    assert!(matches!(err, MergeError::NotNumeric { ref path, .. } if path == "features.x"));

    let err = merge_values(vec![valid, inf_payoff]).unwrap_err();
    assert!(matches!(
        err,
        MergeError::NotNumeric { ref path, .. } if path == "players[0].payoff"
    ));
}

#[test]
fn huge_sim_counts_fail_instead_of_overflowing() {
    let err = merge_values(vec![
        buyer_observation(u64::MAX, 10.0, Some(1.0)),
        buyer_observation(u64::MAX, 12.0, Some(1.0)),
    ])
    .unwrap_err();
    assert!(err.is_malformed());
    assert!(matches!(
        err,
        MergeError::CountOverflow { ref statistic, .. } if statistic == "players.buyer.s1.mean"
    ));
}

#[test]
fn absorbing_overflowing_workers_is_an_error() {
    let options = MergeOptions::default();
    let huge = Observation::from_value(buyer_observation(u64::MAX, 10.0, None), &options).unwrap();
    let small = Observation::from_value(buyer_observation(3, 12.0, None), &options).unwrap();

    let mut left = ObservationMerger::new(options.clone());
    left.ingest(huge).unwrap();
    let mut right = ObservationMerger::new(options);
    right.ingest(small).unwrap();

    let err = left.absorb(right).unwrap_err();
    assert!(matches!(err, MergeError::CountOverflow { .. }));
}

#[test]
fn reads_observations_from_json_text() {
    let options = MergeOptions::default();
    let texts = [
        r#"{"features":{"config":{"numSims":"2"}},"players":[{"role":"r","strategy":"s","payoff":"1.5","features":{}}]}"#,
        r#"{"features":{"config":{"numSims":"2"}},"players":[{"role":"r","strategy":"s","payoff":2.5,"features":{}}]}"#,
    ];
    let parsed = texts
        .iter()
        .map(|text| Observation::from_reader(text.as_bytes(), &options));
    let report = merge_observations(parsed, options.clone()).unwrap();
    let summary = report.strategy("r", "s").unwrap();
    assert!((summary.mean - 2.0).abs() < 1e-12);
    assert!(summary.true_sample_stddev.is_none());
}
