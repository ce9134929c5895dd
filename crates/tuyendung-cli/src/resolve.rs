//! `resolve` command handler.
//!
//! Reads job records from a JSON file, resolves each against the current
//! reference data, and prints labels (or the full results with `--json`).

use std::{path::Path, sync::Arc};

use anyhow::Context;
use tuyendung_core::{AppConfig, JobLocation};
use tuyendung_geo::{GeoClient, GeoLookupStore, GeoSnapshot};

pub(crate) const DEFAULT_FALLBACK: &str = "location not specified";

#[derive(Debug, Clone)]
pub(crate) struct ResolveOptions {
    pub offline: bool,
    pub json: bool,
    pub fallback: String,
}

/// Resolve every job in `path` and print the results.
///
/// A failed reference-data fetch is logged and resolution continues with
/// whatever the job records carry themselves.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid JSON.
pub(crate) async fn run_resolve(
    config: &AppConfig,
    path: &Path,
    options: &ResolveOptions,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let jobs = parse_jobs(&raw).with_context(|| format!("{} is not valid JSON", path.display()))?;

    let snapshot = if options.offline {
        Arc::new(GeoSnapshot::default())
    } else {
        load_snapshot(config).await?
    };

    let results = snapshot.resolver().resolve_values(jobs);
    let unresolved = results.iter().filter(|r| r.is_unresolved()).count();
    tracing::debug!(jobs = results.len(), unresolved, "resolved job locations");

    println!("{}", render(&results, options)?);
    Ok(())
}

async fn load_snapshot(config: &AppConfig) -> anyhow::Result<Arc<GeoSnapshot>> {
    let client = GeoClient::from_config(config)?;
    let store = GeoLookupStore::new();
    if let Err(e) = store.refresh(&client).await {
        tracing::warn!(
            error = %e,
            "reference data unavailable; resolving from job records only"
        );
    }
    Ok(store.snapshot())
}

/// A top-level array is a list of jobs; anything else is a single job.
fn parse_jobs(raw: &str) -> serde_json::Result<Vec<serde_json::Value>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    Ok(match value {
        serde_json::Value::Array(jobs) => jobs,
        other => vec![other],
    })
}

fn render(results: &[JobLocation], options: &ResolveOptions) -> serde_json::Result<String> {
    if options.json {
        return serde_json::to_string_pretty(results);
    }
    Ok(results
        .iter()
        .map(|r| r.label_or(&options.fallback))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    /// Defaults plus an unreachable geography service, independent of the
    /// process environment.
    fn test_config() -> AppConfig {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TUYENDUNG_ENV", "test"),
            ("TUYENDUNG_GEO_BASE_URL", "http://127.0.0.1:9/api/v2"),
            ("TUYENDUNG_GEO_REQUEST_TIMEOUT_SECS", "1"),
            ("TUYENDUNG_GEO_MAX_RETRIES", "0"),
        ]);
        tuyendung_core::build_app_config(|key| {
            vars.get(key)
                .map(|v| (*v).to_string())
                .ok_or(std::env::VarError::NotPresent)
        })
        .expect("fixed test config is valid")
    }

    fn options(json: bool) -> ResolveOptions {
        ResolveOptions {
            offline: true,
            json,
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }

    #[test]
    fn parse_jobs_wraps_single_object() {
        let jobs = parse_jobs(r#"{"province_code": "01"}"#).expect("valid json");
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn parse_jobs_keeps_array_order() {
        let jobs = parse_jobs(r#"[{"province_code": "01"}, {"province_code": "79"}]"#)
            .expect("valid json");
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1]["province_code"], "79");
    }

    #[test]
    fn parse_jobs_rejects_invalid_json() {
        assert!(parse_jobs("{not json").is_err());
    }

    #[test]
    fn render_uses_fallback_for_missing_labels() {
        let snapshot = GeoSnapshot::default();
        let jobs = parse_jobs(
            r#"[{"address": {"province": {"name": "Hà Nội"}}}, {"province_code": "01"}]"#,
        )
        .expect("valid json");
        let results = snapshot.resolver().resolve_values(jobs);

        let out = render(&results, &options(false)).expect("render");
        assert_eq!(out, format!("Hà Nội\n{DEFAULT_FALLBACK}"));
    }

    #[test]
    fn render_json_emits_all_fields() {
        let results = vec![JobLocation::default()];
        let out = render(&results, &options(true)).expect("render");
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json");
        assert!(parsed[0]["province_code"].is_null());
        assert!(parsed[0]["label"].is_null());
    }

    #[tokio::test]
    async fn run_resolve_offline_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"ward": {{"name": "Phường 1"}}}}"#).expect("write");

        run_resolve(&test_config(), file.path(), &options(false))
            .await
            .expect("offline resolve should succeed");
    }

    #[tokio::test]
    async fn run_resolve_reports_missing_file() {
        let err = run_resolve(
            &test_config(),
            Path::new("/nonexistent/jobs.json"),
            &options(false),
        )
        .await
        .expect_err("missing file should fail");
        assert!(err.to_string().contains("failed to read"));
    }

    #[tokio::test]
    async fn load_snapshot_falls_back_to_empty_tables_when_service_is_down() {
        let snapshot = load_snapshot(&test_config())
            .await
            .expect("client builds from config");
        assert!(snapshot.lookup.is_empty());
        assert!(snapshot.refreshed_at.is_none());
    }
}
