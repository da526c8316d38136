// VM collector
//
// A VM is emitted only when its own name, the name of the host it runs on
// and the name of its cluster all pass their filters.

use std::time::Instant;

use super::Collector;
use crate::error::CollectError;
use crate::metrics::records::VmMetric;
use crate::metrics::{Accumulator, Measurement};
use crate::session::SessionManager;
use crate::status::VmStatus;

const CLASS: &str = "VMs";
const ENTITY: &str = "VM";

impl Collector {
    /// Emits one `ovirtstat_vm` record per VM passing the filters
    pub async fn collect_vms(
        &mut self,
        session: &SessionManager,
        acc: &mut dyn Accumulator,
    ) -> Result<(), CollectError> {
        let api = session.api().map_err(|e| e.in_class(CLASS))?;
        self.cache
            .refresh_vms(api, Instant::now())
            .await
            .map_err(|e| e.in_class(CLASS))?;
        let timestamp = self.timestamp();

        for vm in self.cache.vms() {
            let Some(id) = vm.id.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "Id", None));
                continue;
            };
            let Some(name) = vm.name.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "Name", None));
                continue;
            };
            if !self.filters.vms.matches(name) {
                continue;
            }

            // VMs that are not running have no host reference
            let mut host_name = "";
            if let Some(host) = &vm.host {
                host_name = self.cache.host_name(host);
                if !self.filters.hosts.matches(host_name) {
                    continue;
                }
            }

            let (mut cluster_name, mut dc_name) = ("", "");
            if let Some(cluster) = &vm.cluster {
                cluster_name = self.cache.cluster_name(cluster);
                if !self.filters.clusters.matches(cluster_name) {
                    continue;
                }
                dc_name = self.cache.cluster_datacenter_name(cluster);
            }

            let Some(status) = vm.status.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "status", Some(name)));
                continue;
            };

            let topology = vm.cpu.as_ref().and_then(|cpu| cpu.topology.as_ref());
            let metric = VmMetric {
                engine: self.engine.clone(),
                id: id.to_string(),
                name: name.to_string(),
                cluster_name: cluster_name.to_string(),
                dc_name: dc_name.to_string(),
                host_name: host_name.to_string(),
                vm_type: vm.vm_type.clone().unwrap_or_default(),
                cpu_cores: topology.and_then(|t| t.cores).unwrap_or(0),
                cpu_sockets: topology.and_then(|t| t.sockets).unwrap_or(0),
                cpu_threads: topology.and_then(|t| t.threads).unwrap_or(0),
                memory_size: vm.memory.unwrap_or(0),
                run_once: vm.run_once.unwrap_or(false),
                stateless: vm.stateless.unwrap_or(false),
                status: status.to_string(),
                status_code: VmStatus::code_of(Some(status)),
            };
            acc.add_record(metric.into_record(timestamp));
        }

        Ok(())
    }
}
