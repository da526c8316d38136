// Host collector

use std::time::Instant;

use super::Collector;
use crate::error::CollectError;
use crate::metrics::records::HostMetric;
use crate::metrics::{Accumulator, Measurement};
use crate::session::SessionManager;
use crate::status::HostStatus;

const CLASS: &str = "Hosts";
const ENTITY: &str = "host";

impl Collector {
    /// Emits one `ovirtstat_host` record per host passing the host and
    /// cluster filters
    pub async fn collect_hosts(
        &mut self,
        session: &SessionManager,
        acc: &mut dyn Accumulator,
    ) -> Result<(), CollectError> {
        let api = session.api().map_err(|e| e.in_class(CLASS))?;
        self.cache
            .refresh_hosts(api, Instant::now())
            .await
            .map_err(|e| e.in_class(CLASS))?;
        let timestamp = self.timestamp();

        for host in self.cache.hosts() {
            let Some(id) = host.id.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "Id", None));
                continue;
            };
            let Some(name) = host.name.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "Name", None));
                continue;
            };
            if !self.filters.hosts.matches(name) {
                continue;
            }

            let (mut cluster_name, mut dc_name) = ("", "");
            if let Some(cluster) = &host.cluster {
                cluster_name = self.cache.cluster_name(cluster);
                if !self.filters.clusters.matches(cluster_name) {
                    continue;
                }
                dc_name = self.cache.cluster_datacenter_name(cluster);
            }

            let Some(status) = host.status.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "status", Some(name)));
                continue;
            };

            let cpu = host.cpu.as_ref();
            let topology = cpu.and_then(|cpu| cpu.topology.as_ref());
            let summary = host.summary.as_ref();

            let metric = HostMetric {
                engine: self.engine.clone(),
                id: id.to_string(),
                name: name.to_string(),
                cluster_name: cluster_name.to_string(),
                dc_name: dc_name.to_string(),
                host_type: host.host_type.clone().unwrap_or_default(),
                cpu_cores: topology.and_then(|t| t.cores).unwrap_or(0),
                cpu_sockets: topology.and_then(|t| t.sockets).unwrap_or(0),
                cpu_speed: cpu.and_then(|cpu| cpu.speed).unwrap_or(0.0),
                cpu_threads: topology.and_then(|t| t.threads).unwrap_or(0),
                memory_size: host.memory.unwrap_or(0),
                reinstallation_required: host.reinstallation_required.unwrap_or(false),
                status: status.to_string(),
                status_code: HostStatus::code_of(Some(status)),
                vm_active: summary.and_then(|s| s.active).unwrap_or(0),
                vm_migrating: summary.and_then(|s| s.migrating).unwrap_or(0),
                vm_total: summary.and_then(|s| s.total).unwrap_or(0),
            };
            acc.add_record(metric.into_record(timestamp));
        }

        Ok(())
    }
}
