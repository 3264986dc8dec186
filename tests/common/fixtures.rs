/// Mesh target metrics: a container metric, one metric without a policy and
/// one without raw data.
pub fn mesh_manifest() -> &'static str {
    r#"index,name
1,container_cpu_usage_seconds_total
2,grpc_server_handled_total
3,container_memory_working_set_bytes"#
}

/// Cloud target metrics, numbered by row.
pub fn cloud_manifest() -> &'static str {
    r#"name
kubernetes.io/container/cpu/core_usage_time
networking.googleapis.com/pod_flow/rtt"#
}

/// Load-generator statistics history with one endpoint row per sample.
pub fn load_history() -> String {
    let mut csv = String::from(
        "Timestamp,User Count,Type,Name,Requests/s,Failures/s,50%,95%,Total Median Response Time,Total Average Response Time\n",
    );
    for minute in 0..3i64 {
        let timestamp = super::T0 + minute * 60;
        csv.push_str(&format!(
            "{},{},,Aggregated,{},0.0,40,120,42,50.5\n",
            timestamp,
            10 + minute,
            2.0 + minute as f64
        ));
        csv.push_str(&format!("{},{},GET,/login,9.0,9.0,900,900,900,900\n", timestamp, 10 + minute));
    }
    csv
}
