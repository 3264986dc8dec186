mod common;

use std::path::Path;

use common::{read_to_string, write};
use kpiagg::datamodel::{TargetMetric, TargetMetrics};
use kpiagg::pipeline::{AggregatedRun, unify_runs};

fn manifest() -> TargetMetrics {
    TargetMetrics::new(vec![
        TargetMetric::new(1, "container_cpu_usage_seconds_total"),
        TargetMetric::new(2, "kube_pod_status_ready"),
    ])
}

/// Aggregated run with one `agg-kpi-{i}-mean` column per catalog entry,
/// `entries` holding `(local index, ns label, value)`.
async fn aggregated_run(root: &Path, name: &str, entries: &[(u32, &str, f64)]) -> AggregatedRun {
    let dir = root.join("aggregated").join(name);
    let records: Vec<String> = entries
        .iter()
        .map(|(index, ns, _)| format!("{{\"index\": {}, \"kpi\": {{\"ns\": \"{}\"}}}}", index, ns))
        .collect();
    write(
        &dir.join("metric-1-kpi-map.json"),
        &format!("[{}]", records.join(", ")),
    )
    .await;

    let header: Vec<String> = entries
        .iter()
        .map(|(index, _, _)| format!("agg-kpi-{}-mean", index))
        .collect();
    let values: Vec<String> = entries.iter().map(|(_, _, value)| value.to_string()).collect();
    write(
        &dir.join("metric-1.csv"),
        &format!(
            "timestamp,{}\n2021-01-01 00:00:00,{}\n",
            header.join(","),
            values.join(",")
        ),
    )
    .await;
    AggregatedRun::new(dir)
}

#[tokio::test]
async fn test_rebuild_unification() {
    let root = tempfile::tempdir().unwrap();
    let runs = vec![
        aggregated_run(root.path(), "run-a", &[(1, "c", 1.0), (2, "a", 2.0)]).await,
        aggregated_run(root.path(), "run-b", &[(1, "b", 3.0)]).await,
    ];
    let unified_dir = root.path().join("unified");

    let unified = unify_runs(&manifest(), &runs, &unified_dir, false).await.unwrap();
    // no run has metric 2
    assert_eq!(unified, vec![1]);

    assert_eq!(
        read_to_string(&unified_dir.join("kpi-map").join("metric-1-kpi-map.csv")).await,
        ",ns\n1,a\n2,b\n3,c\n"
    );
    assert_eq!(
        read_to_string(&unified_dir.join("run-a").join("metric-1.csv")).await,
        "timestamp,agg-kpi-1-mean,agg-kpi-3-mean\n2021-01-01 00:00:00,2,1\n"
    );
    assert_eq!(
        read_to_string(&unified_dir.join("run-b").join("metric-1.csv")).await,
        "timestamp,agg-kpi-2-mean\n2021-01-01 00:00:00,3\n"
    );
}

#[tokio::test]
async fn test_rebuild_is_reproducible() {
    let root = tempfile::tempdir().unwrap();
    let runs = vec![
        aggregated_run(root.path(), "run-a", &[(1, "c", 1.0), (2, "a", 2.0)]).await,
        aggregated_run(root.path(), "run-b", &[(1, "a", 3.0), (2, "b", 4.0)]).await,
    ];

    let first = root.path().join("first");
    let second = root.path().join("second");
    unify_runs(&manifest(), &runs, &first, false).await.unwrap();
    unify_runs(&manifest(), &runs, &second, false).await.unwrap();
    for file in ["kpi-map/metric-1-kpi-map.csv", "run-a/metric-1.csv", "run-b/metric-1.csv"] {
        assert_eq!(
            read_to_string(&first.join(file)).await,
            read_to_string(&second.join(file)).await
        );
    }
}

#[tokio::test]
async fn test_incremental_unification_appends() {
    let root = tempfile::tempdir().unwrap();
    let unified_dir = root.path().join("unified");
    let first = vec![aggregated_run(root.path(), "run-a", &[(1, "c", 1.0), (2, "a", 2.0), (3, "b", 5.0)]).await];
    unify_runs(&manifest(), &first, &unified_dir, false).await.unwrap();

    let later = vec![aggregated_run(root.path(), "run-c", &[(1, "d", 7.0), (2, "a", 8.0)]).await];
    unify_runs(&manifest(), &later, &unified_dir, true).await.unwrap();

    assert_eq!(
        read_to_string(&unified_dir.join("kpi-map").join("metric-1-kpi-map.csv")).await,
        ",ns\n1,a\n2,b\n3,c\n4,d\n"
    );
    assert_eq!(
        read_to_string(&unified_dir.join("run-c").join("metric-1.csv")).await,
        "timestamp,agg-kpi-1-mean,agg-kpi-4-mean\n2021-01-01 00:00:00,8,7\n"
    );
}

#[tokio::test]
async fn test_incremental_rerun_keeps_numeric_text_labels() {
    let root = tempfile::tempdir().unwrap();
    let unified_dir = root.path().join("unified");
    let runs = vec![aggregated_run(root.path(), "run-a", &[(1, "200", 1.0)]).await];
    unify_runs(&manifest(), &runs, &unified_dir, false).await.unwrap();
    unify_runs(&manifest(), &runs, &unified_dir, true).await.unwrap();

    assert_eq!(
        read_to_string(&unified_dir.join("kpi-map").join("metric-1-kpi-map.csv")).await,
        ",ns\n1,200\n"
    );
    assert_eq!(
        read_to_string(&unified_dir.join("run-a").join("metric-1.csv")).await,
        "timestamp,agg-kpi-1-mean\n2021-01-01 00:00:00,1\n"
    );
}
