use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use campus_housing::config::HousingConfig;
use campus_housing::error::AppError;
use campus_housing::workflows::housing::memory::SnapshotError;
use campus_housing::workflows::housing::{
    HousingService, HousingSnapshot, InMemoryHousingStore, OveragePolicy, QuotaRuleTable,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

pub(crate) type MemoryHousingService = HousingService<InMemoryHousingStore, QuotaRuleTable>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Built-in quota table, replaced by the configured CSV overrides when present.
pub(crate) fn load_quota_table(config: &HousingConfig) -> Result<QuotaRuleTable, AppError> {
    match &config.quota_rules_path {
        Some(path) => {
            let table = QuotaRuleTable::from_path(path)?;
            info!(path = %path.display(), "loaded quota rule overrides");
            Ok(table)
        }
        None => Ok(QuotaRuleTable::standard()),
    }
}

/// Empty store, or the configured snapshot when one exists on disk. With a snapshot path
/// configured the store writes every committed change back to it.
pub(crate) fn load_store(config: &HousingConfig) -> Result<InMemoryHousingStore, AppError> {
    let Some(path) = &config.snapshot_path else {
        return Ok(InMemoryHousingStore::default());
    };

    let store = if path.exists() {
        let snapshot = HousingSnapshot::from_path(path)?;
        info!(
            path = %path.display(),
            requests = snapshot.requests.len(),
            rooms = snapshot.rooms.len(),
            allocations = snapshot.allocations.len(),
            "restored housing snapshot"
        );
        InMemoryHousingStore::from_snapshot(snapshot)
    } else {
        InMemoryHousingStore::default()
    };
    Ok(store.with_snapshot_file(path))
}

pub(crate) fn build_housing_service(
    config: &HousingConfig,
) -> Result<Arc<MemoryHousingService>, AppError> {
    let quota = load_quota_table(config)?;
    let store = load_store(config)?;
    Ok(Arc::new(HousingService::new(
        Arc::new(store),
        Arc::new(quota),
        OveragePolicy::new(config.overage_tolerance),
    )))
}

/// Writes the current store contents to the configured snapshot path, if any.
pub(crate) fn persist_snapshot(
    config: &HousingConfig,
    service: &MemoryHousingService,
) -> Result<(), AppError> {
    let Some(path) = &config.snapshot_path else {
        return Ok(());
    };
    let snapshot = service.store().snapshot().map_err(SnapshotError::from)?;
    snapshot.write_to_path(path)?;
    info!(path = %path.display(), "saved housing snapshot");
    Ok(())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
