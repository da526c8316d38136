// Collector - turns cached engine entities into metric records
//
// There is one collection operation per entity class. Each one checks the
// session, refreshes the cache for its class (a no-op while the data is
// fresh), then walks the cached entities, filters them by name, resolves
// parent names and emits one typed record per entity. An entity missing a
// required attribute is reported through the accumulator and skipped; only a
// failed refresh aborts the class.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::cache::EntityCache;
use crate::error::CollectError;
use crate::filter::FilterSet;
use crate::metrics::{truncate_to, Accumulator};
use crate::session::SessionManager;

mod api_summary;
mod datacenter;
mod gluster_volume;
mod host;
mod storage_domain;
mod vm;

/// Entity collectors that can be switched on and off by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorKind {
    Datacenters,
    GlusterVolumes,
    Hosts,
    StorageDomains,
    Vms,
}

impl CollectorKind {
    pub const ALL: &'static [CollectorKind] = &[
        CollectorKind::Datacenters,
        CollectorKind::GlusterVolumes,
        CollectorKind::Hosts,
        CollectorKind::StorageDomains,
        CollectorKind::Vms,
    ];

    /// Name used in the collectors include/exclude lists
    pub fn name(self) -> &'static str {
        match self {
            CollectorKind::Datacenters => "Datacenters",
            CollectorKind::GlusterVolumes => "GlusterVolumes",
            CollectorKind::Hosts => "Hosts",
            CollectorKind::StorageDomains => "StorageDomains",
            CollectorKind::Vms => "VMs",
        }
    }
}

/// Collection engine for one oVirt Engine
///
/// Owns the entity cache; not meant to be shared between tasks.
pub struct Collector {
    /// Engine host name, tagged on every record
    engine: String,
    filters: FilterSet,
    cache: EntityCache,
    precision: Duration,
}

impl Collector {
    /// Creates a collector
    ///
    /// # Arguments
    /// * `engine` - Engine host name used for the `ovirt-engine` tag
    /// * `filters` - Cluster, host and VM name filters
    /// * `data_duration` - How long cached entity lists stay fresh
    /// * `precision` - Rounding applied to record timestamps
    pub fn new(
        engine: impl Into<String>,
        filters: FilterSet,
        data_duration: Duration,
        precision: Duration,
    ) -> Self {
        Collector {
            engine: engine.into(),
            filters,
            cache: EntityCache::new(data_duration),
            precision,
        }
    }

    /// Forgets cached entities, e.g. after the session was reopened
    pub fn reset_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Runs the collection operation of one entity class
    pub async fn collect(
        &mut self,
        kind: CollectorKind,
        session: &SessionManager,
        acc: &mut dyn Accumulator,
    ) -> Result<(), CollectError> {
        match kind {
            CollectorKind::Datacenters => self.collect_datacenters(session, acc).await,
            CollectorKind::GlusterVolumes => self.collect_gluster_volumes(session, acc).await,
            CollectorKind::Hosts => self.collect_hosts(session, acc).await,
            CollectorKind::StorageDomains => self.collect_storage_domains(session, acc).await,
            CollectorKind::Vms => self.collect_vms(session, acc).await,
        }
    }

    /// Collection time shared by every record of one class invocation
    fn timestamp(&self) -> DateTime<Utc> {
        truncate_to(Utc::now(), self.precision)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::filter::NameFilter;
    use crate::ovirt::fake::{EngineData, FakeConnector, FakeEngine};

    pub const NO_PATTERNS: &[&str] = &[];

    pub fn collector(filters: FilterSet) -> Collector {
        Collector::new(
            "engine.test",
            filters,
            Duration::from_secs(54),
            Duration::from_secs(1),
        )
    }

    pub fn exclude(patterns: &[&str]) -> NameFilter {
        NameFilter::new(NO_PATTERNS, patterns).unwrap()
    }

    pub async fn open_session(data: EngineData) -> (SessionManager, FakeEngine) {
        let engine = FakeEngine::new(data);
        let mut session = SessionManager::new(Box::new(FakeConnector::new(engine.clone())));
        session.open(Duration::from_secs(5)).await.unwrap();
        (session, engine)
    }
}
