//! Current reference-data snapshot, shared between resolvers and the refresher.
//!
//! A [`GeoSnapshot`] is immutable once built. [`GeoLookupStore`] hands out
//! `Arc`s to the current one and a refresh swaps in a freshly built snapshot;
//! readers holding the old `Arc` keep resolving against it undisturbed.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tuyendung_core::{AdminCode, GeoLookup, GeographicUnit, JobLocationResolver};

use crate::client::GeoClient;
use crate::error::GeoError;

/// Reference lists plus the lookup tables derived from them.
#[derive(Debug, Clone, Default)]
pub struct GeoSnapshot {
    pub provinces: Vec<GeographicUnit>,
    pub wards: Vec<GeographicUnit>,
    pub lookup: GeoLookup,
    /// `None` until the first successful fetch.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl GeoSnapshot {
    #[must_use]
    pub fn build(
        provinces: Vec<GeographicUnit>,
        wards: Vec<GeographicUnit>,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        let lookup = GeoLookup::build(&provinces, &wards);
        Self {
            provinces,
            wards,
            lookup,
            refreshed_at: Some(refreshed_at),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> JobLocationResolver<'_> {
        JobLocationResolver::new(&self.lookup)
    }

    /// Wards whose parent province has the same lookup key as `province_code`.
    pub fn wards_in<'a>(
        &'a self,
        province_code: &'a AdminCode,
    ) -> impl Iterator<Item = &'a GeographicUnit> + 'a {
        self.wards
            .iter()
            .filter(move |ward| ward.belongs_to(province_code))
    }
}

/// Outcome of a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub provinces: usize,
    pub wards: usize,
    pub refreshed_at: DateTime<Utc>,
}

/// Shared handle to the current [`GeoSnapshot`]. Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct GeoLookupStore {
    current: Arc<RwLock<Arc<GeoSnapshot>>>,
}

impl GeoLookupStore {
    /// A store holding the empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<GeoSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Installs `snapshot` as current and returns it.
    pub fn replace(&self, snapshot: GeoSnapshot) -> Arc<GeoSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&snapshot);
        snapshot
    }

    /// Fetches both reference lists and installs a new snapshot.
    ///
    /// Provinces and wards are fetched concurrently. The current snapshot is
    /// only replaced when both succeed.
    ///
    /// # Errors
    ///
    /// Returns the first [`GeoError`] from either fetch; the previous snapshot
    /// stays in place.
    pub async fn refresh(&self, client: &GeoClient) -> Result<RefreshSummary, GeoError> {
        let (provinces, wards) = tokio::try_join!(client.list_provinces(), client.list_wards())?;

        let snapshot = GeoSnapshot::build(provinces, wards, Utc::now());
        let summary = RefreshSummary {
            provinces: snapshot.lookup.provinces.len(),
            wards: snapshot.lookup.wards.len(),
            refreshed_at: snapshot.refreshed_at.unwrap_or_else(Utc::now),
        };
        self.replace(snapshot);

        tracing::info!(
            provinces = summary.provinces,
            wards = summary.wards,
            "reference data refreshed"
        );
        Ok(summary)
    }
}
