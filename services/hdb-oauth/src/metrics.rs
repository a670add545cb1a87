//! Prometheus metrics exposition
//!
//! - `hdb_oauth_credentials_issued_total` (counter)
//! - `hdb_oauth_exchange_errors_total` (counter): label `kind`
//! - `hdb_oauth_validations_total` (counter): label `outcome`
//! - `hdb_oauth_revocations_total` (counter): label `outcome`
//! - `hdb_oauth_hash_duration_seconds` (histogram), recorded by the hasher

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Key derivation at 100k iterations takes tens of milliseconds; the buckets
/// span low test iteration counts up to a badly overloaded host.
const HASH_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("hdb_oauth_hash_duration_seconds".to_string()),
        HASH_BUCKETS,
    )
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

pub fn record_issued() {
    metrics::counter!("hdb_oauth_credentials_issued_total").increment(1);
}

pub fn record_exchange_error(kind: &'static str) {
    metrics::counter!("hdb_oauth_exchange_errors_total", "kind" => kind).increment(1);
}

/// `outcome` is `accepted` or one of `AuthError::outcome()`.
pub fn record_validation(outcome: &'static str) {
    metrics::counter!("hdb_oauth_validations_total", "outcome" => outcome).increment(1);
}

pub fn record_revocation(outcome: &'static str) {
    metrics::counter!("hdb_oauth_revocations_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_issued();
        record_exchange_error("http");
        record_validation("accepted");
        record_revocation("revoked");
    }

    /// Local recorder so tests don't fight over the global singleton.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn counters_carry_labels() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_issued();
        record_issued();
        record_exchange_error("rejected");
        record_validation("accepted");
        record_validation("rejected");
        record_revocation("nothing_to_revoke");

        let output = handle.render();
        assert!(output.contains("hdb_oauth_credentials_issued_total 2"), "got: {output}");
        assert!(output.contains("hdb_oauth_exchange_errors_total{kind=\"rejected\"} 1"));
        assert!(output.contains("hdb_oauth_validations_total{outcome=\"accepted\"} 1"));
        assert!(output.contains("hdb_oauth_validations_total{outcome=\"rejected\"} 1"));
        assert!(output.contains("hdb_oauth_revocations_total{outcome=\"nothing_to_revoke\"} 1"));
    }

    #[test]
    fn hash_duration_renders_as_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        metrics::histogram!("hdb_oauth_hash_duration_seconds").record(0.02);

        let output = handle.render();
        assert!(
            output.contains("hdb_oauth_hash_duration_seconds_bucket"),
            "histogram must render _bucket lines, got: {output}"
        );
        assert!(output.contains("le=\"0.025\""));
        assert!(output.contains("le=\"+Inf\""));
    }
}
