// Entity cache - short-lived snapshots of the engine's entity lists
//
// Each class is refreshed as a whole snapshot when its data is older than
// `data_duration`. Dependent classes first make sure their prerequisites are
// fresh (VMs -> hosts -> datacenters and clusters), so within one polling
// tick all classes come from the same generation of fetches. Fetches are
// sequential, not transactional: the join is only as consistent as a few
// seconds of engine activity allow.
//
// Cross-reference lookups scan the cached slices by id and return an empty
// string when nothing matches.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::CollectError;
use crate::ovirt::{ApiError, Cluster, DataCenter, EngineApi, Host, Link, StorageDomain, Vm};

/// Cached entity lists of one engine session
///
/// Not meant to be shared: callers serialize access through `&mut`.
#[derive(Debug)]
pub struct EntityCache {
    data_duration: Duration,
    datacenters: Vec<DataCenter>,
    clusters: Vec<Cluster>,
    hosts: Vec<Host>,
    storage_domains: Vec<StorageDomain>,
    vms: Vec<Vm>,
    last_dc_update: Option<Instant>,
    last_host_update: Option<Instant>,
    last_sd_update: Option<Instant>,
    last_vm_update: Option<Instant>,
}

impl EntityCache {
    /// Creates an empty cache whose slices stay fresh for `data_duration`
    pub fn new(data_duration: Duration) -> Self {
        EntityCache {
            data_duration,
            datacenters: Vec::new(),
            clusters: Vec::new(),
            hosts: Vec::new(),
            storage_domains: Vec::new(),
            vms: Vec::new(),
            last_dc_update: None,
            last_host_update: None,
            last_sd_update: None,
            last_vm_update: None,
        }
    }

    pub fn data_duration(&self) -> Duration {
        self.data_duration
    }

    /// Drops every slice; the next refresh of each class fetches again
    pub fn clear(&mut self) {
        *self = EntityCache::new(self.data_duration);
    }

    fn is_stale(&self, last: Option<Instant>, now: Instant) -> bool {
        match last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.data_duration,
        }
    }

    /// Refreshes datacenters and clusters together when stale
    ///
    /// Both lists are committed only if both fetches succeed; on error the
    /// previous snapshot stays available.
    pub async fn refresh_datacenters_and_clusters(
        &mut self,
        api: &dyn EngineApi,
        now: Instant,
    ) -> Result<(), CollectError> {
        if !self.is_stale(self.last_dc_update, now) {
            return Ok(());
        }

        let datacenters = required("datacenter", api.datacenters().await)?;
        // datacenters do not embed their clusters, so query the full list
        let clusters = required("cluster", api.clusters().await)?;

        debug!(
            "Cached {} datacenter(s) and {} cluster(s)",
            datacenters.len(),
            clusters.len()
        );
        self.datacenters = datacenters;
        self.clusters = clusters;
        self.last_dc_update = Some(now);
        Ok(())
    }

    /// Refreshes hosts when stale, after datacenters and clusters
    pub async fn refresh_hosts(
        &mut self,
        api: &dyn EngineApi,
        now: Instant,
    ) -> Result<(), CollectError> {
        self.refresh_datacenters_and_clusters(api, now).await?;
        if !self.is_stale(self.last_host_update, now) {
            return Ok(());
        }

        let hosts = required("hosts", api.hosts().await)?;
        debug!("Cached {} host(s)", hosts.len());
        self.hosts = hosts;
        self.last_host_update = Some(now);
        Ok(())
    }

    /// Refreshes storage domains when stale, after datacenters and clusters
    pub async fn refresh_storage_domains(
        &mut self,
        api: &dyn EngineApi,
        now: Instant,
    ) -> Result<(), CollectError> {
        self.refresh_datacenters_and_clusters(api, now).await?;
        if !self.is_stale(self.last_sd_update, now) {
            return Ok(());
        }

        let storage_domains = required("storagedomain", api.storage_domains().await)?;
        debug!("Cached {} storage domain(s)", storage_domains.len());
        self.storage_domains = storage_domains;
        self.last_sd_update = Some(now);
        Ok(())
    }

    /// Refreshes VMs when stale, after hosts (and so datacenters and clusters)
    pub async fn refresh_vms(
        &mut self,
        api: &dyn EngineApi,
        now: Instant,
    ) -> Result<(), CollectError> {
        self.refresh_hosts(api, now).await?;
        if !self.is_stale(self.last_vm_update, now) {
            return Ok(());
        }

        let vms = required("VM", api.vms().await)?;
        debug!("Cached {} VM(s)", vms.len());
        self.vms = vms;
        self.last_vm_update = Some(now);
        Ok(())
    }

    pub fn datacenters(&self) -> &[DataCenter] {
        &self.datacenters
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn storage_domains(&self) -> &[StorageDomain] {
        &self.storage_domains
    }

    pub fn vms(&self) -> &[Vm] {
        &self.vms
    }

    /// Name of the datacenter with the given id
    pub fn datacenter_name(&self, id: &str) -> &str {
        self.datacenters
            .iter()
            .find(|dc| dc.id.as_deref() == Some(id))
            .and_then(|dc| dc.name.as_deref())
            .unwrap_or_default()
    }

    fn find_cluster(&self, cluster: &Link) -> Option<&Cluster> {
        let id = cluster.id.as_deref()?;
        self.clusters.iter().find(|cl| cl.id.as_deref() == Some(id))
    }

    /// Name of the referenced cluster
    pub fn cluster_name(&self, cluster: &Link) -> &str {
        self.find_cluster(cluster)
            .and_then(|cl| cl.name.as_deref())
            .unwrap_or_default()
    }

    /// Name of the datacenter owning the referenced cluster
    pub fn cluster_datacenter_name(&self, cluster: &Link) -> &str {
        self.find_cluster(cluster)
            .and_then(|cl| cl.data_center.as_ref())
            .and_then(|dc| dc.id.as_deref())
            .map(|dc_id| self.datacenter_name(dc_id))
            .unwrap_or_default()
    }

    /// Name of the referenced host
    pub fn host_name(&self, host: &Link) -> &str {
        let Some(id) = host.id.as_deref() else {
            return "";
        };
        self.hosts
            .iter()
            .find(|h| h.id.as_deref() == Some(id))
            .and_then(|h| h.name.as_deref())
            .unwrap_or_default()
    }

    /// Number of cached clusters belonging to the datacenter
    pub fn count_clusters_in(&self, datacenter_id: &str) -> usize {
        self.clusters
            .iter()
            .filter_map(|cl| cl.data_center.as_ref())
            .filter(|dc| dc.id.as_deref() == Some(datacenter_id))
            .count()
    }
}

/// Maps a list fetch result onto the collection error taxonomy
fn required<T>(
    class: &'static str,
    fetched: Result<Option<Vec<T>>, ApiError>,
) -> Result<Vec<T>, CollectError> {
    match fetched {
        Ok(Some(items)) => Ok(items),
        Ok(None) => Err(CollectError::EmptyResult { class }),
        Err(source) => Err(CollectError::Fetch { class, source }),
    }
}
