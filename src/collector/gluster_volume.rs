// Gluster volume collector
//
// Volumes are embedded in the cluster documents (fetched with
// `follow=gluster_volumes`), so this class only needs the datacenter and
// cluster snapshot.

use std::time::Instant;

use super::Collector;
use crate::error::CollectError;
use crate::metrics::records::GlusterVolumeMetric;
use crate::metrics::{Accumulator, Measurement};
use crate::session::SessionManager;
use crate::status::GlusterVolumeStatus;

const CLASS: &str = "GlusterVolumes";
const ENTITY: &str = "gluster volume";

impl Collector {
    /// Emits one `ovirtstat_glustervolume` record per volume of every cluster
    /// passing the cluster filter
    pub async fn collect_gluster_volumes(
        &mut self,
        session: &SessionManager,
        acc: &mut dyn Accumulator,
    ) -> Result<(), CollectError> {
        let api = session.api().map_err(|e| e.in_class(CLASS))?;
        self.cache
            .refresh_datacenters_and_clusters(api, Instant::now())
            .await
            .map_err(|e| e.in_class(CLASS))?;
        let timestamp = self.timestamp();

        for cluster in self.cache.clusters() {
            let Some(cluster_name) = cluster.name.as_deref() else {
                acc.add_error(CollectError::missing("cluster", "Name", None));
                continue;
            };
            if !self.filters.clusters.matches(cluster_name) {
                continue;
            }
            // virt-only clusters carry no volume list
            let Some(volumes) = &cluster.gluster_volumes else {
                continue;
            };
            let dc_name = self.cache.cluster_datacenter_name(&cluster.link());

            for volume in &volumes.gluster_volume {
                let Some(id) = volume.id.as_deref() else {
                    acc.add_error(CollectError::missing(ENTITY, "Id", None));
                    continue;
                };
                let Some(name) = volume.name.as_deref() else {
                    acc.add_error(CollectError::missing(ENTITY, "Name", None));
                    continue;
                };
                let Some(status) = volume.status.as_deref() else {
                    acc.add_error(CollectError::missing(ENTITY, "status", Some(name)));
                    continue;
                };

                let metric = GlusterVolumeMetric {
                    engine: self.engine.clone(),
                    id: id.to_string(),
                    name: name.to_string(),
                    cluster_name: cluster_name.to_string(),
                    dc_name: dc_name.to_string(),
                    volume_type: volume.volume_type.clone().unwrap_or_default(),
                    bricks: volume.bricks.as_ref().map_or(0, |b| b.brick.len()),
                    disperse_count: volume.disperse_count.unwrap_or(0),
                    redundancy_count: volume.redundancy_count.unwrap_or(0),
                    replica_count: volume.replica_count.unwrap_or(0),
                    stripe_count: volume.stripe_count.unwrap_or(0),
                    status: status.to_string(),
                    status_code: GlusterVolumeStatus::code_of(Some(status)),
                };
                acc.add_record(metric.into_record(timestamp));
            }
        }

        Ok(())
    }
}
