// Typed records, one per measurement
//
// Field and tag names here are what downstream dashboards and alert rules
// query, so they must not change.

use super::{FieldValue, Measurement};

/// Tag carrying the engine host name on every record
pub const ENGINE_TAG: &str = "ovirt-engine";

/// `ovirtstat_apisummary`: engine version and topline counters
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSummaryMetric {
    pub engine: String,
    pub version: String,
    pub hosts: i64,
    pub storagedomains: i64,
    pub users: i64,
    /// Active and total VMs, when the engine reports a VM summary
    pub vms: Option<(i64, i64)>,
}

impl Measurement for ApiSummaryMetric {
    const NAME: &'static str = "ovirtstat_apisummary";

    fn tags(&self) -> Vec<(&'static str, String)> {
        vec![(ENGINE_TAG, self.engine.clone())]
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = vec![
            ("version", self.version.clone().into()),
            ("hosts", self.hosts.into()),
            ("storagedomains", self.storagedomains.into()),
            ("users", self.users.into()),
        ];
        if let Some((active, total)) = self.vms {
            fields.push(("vms_active", active.into()));
            fields.push(("vms_total", total.into()));
        }
        fields
    }
}

/// `ovirtstat_datacenter`
#[derive(Debug, Clone, PartialEq)]
pub struct DatacenterMetric {
    pub engine: String,
    pub id: String,
    pub name: String,
    pub clusters: usize,
    pub local: bool,
    pub status: String,
    pub status_code: i16,
}

impl Measurement for DatacenterMetric {
    const NAME: &'static str = "ovirtstat_datacenter";

    fn tags(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENGINE_TAG, self.engine.clone()),
            ("id", self.id.clone()),
            ("name", self.name.clone()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("clusters", self.clusters.into()),
            ("local", self.local.into()),
            ("status", self.status.clone().into()),
            ("status_code", self.status_code.into()),
        ]
    }
}

/// `ovirtstat_host`
#[derive(Debug, Clone, PartialEq)]
pub struct HostMetric {
    pub engine: String,
    pub id: String,
    pub name: String,
    pub cluster_name: String,
    pub dc_name: String,
    pub host_type: String,
    pub cpu_cores: i64,
    pub cpu_sockets: i64,
    pub cpu_speed: f64,
    pub cpu_threads: i64,
    pub memory_size: i64,
    pub reinstallation_required: bool,
    pub status: String,
    pub status_code: i16,
    pub vm_active: i64,
    pub vm_migrating: i64,
    pub vm_total: i64,
}

impl Measurement for HostMetric {
    const NAME: &'static str = "ovirtstat_host";

    fn tags(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENGINE_TAG, self.engine.clone()),
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("clustername", self.cluster_name.clone()),
            ("dcname", self.dc_name.clone()),
            ("type", self.host_type.clone()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("cpu_cores", self.cpu_cores.into()),
            ("cpu_sockets", self.cpu_sockets.into()),
            ("cpu_speed", self.cpu_speed.into()),
            ("cpu_threads", self.cpu_threads.into()),
            ("memory_size", self.memory_size.into()),
            ("reinstallation_required", self.reinstallation_required.into()),
            ("status", self.status.clone().into()),
            ("status_code", self.status_code.into()),
            ("vm_active", self.vm_active.into()),
            ("vm_migrating", self.vm_migrating.into()),
            ("vm_total", self.vm_total.into()),
        ]
    }
}

/// `ovirtstat_storagedomain`
#[derive(Debug, Clone, PartialEq)]
pub struct StorageDomainMetric {
    pub engine: String,
    pub id: String,
    pub name: String,
    pub domain_type: String,
    pub storage_type: String,
    pub available: i64,
    pub committed: i64,
    pub used: i64,
    pub connections: usize,
    pub logical_units: usize,
    pub master: bool,
    pub status: String,
    pub status_code: i16,
    pub external_status: String,
    pub external_status_code: i16,
}

impl Measurement for StorageDomainMetric {
    const NAME: &'static str = "ovirtstat_storagedomain";

    fn tags(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENGINE_TAG, self.engine.clone()),
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("type", self.domain_type.clone()),
            ("storage_type", self.storage_type.clone()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("available", self.available.into()),
            ("committed", self.committed.into()),
            ("used", self.used.into()),
            ("connections", self.connections.into()),
            ("logical_units", self.logical_units.into()),
            ("master", self.master.into()),
            ("status", self.status.clone().into()),
            ("status_code", self.status_code.into()),
            ("external_status", self.external_status.clone().into()),
            ("external_status_code", self.external_status_code.into()),
        ]
    }
}

/// `ovirtstat_glustervolume`
#[derive(Debug, Clone, PartialEq)]
pub struct GlusterVolumeMetric {
    pub engine: String,
    pub id: String,
    pub name: String,
    pub cluster_name: String,
    pub dc_name: String,
    pub volume_type: String,
    pub bricks: usize,
    pub disperse_count: i64,
    pub redundancy_count: i64,
    pub replica_count: i64,
    pub stripe_count: i64,
    pub status: String,
    pub status_code: i16,
}

impl Measurement for GlusterVolumeMetric {
    const NAME: &'static str = "ovirtstat_glustervolume";

    fn tags(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENGINE_TAG, self.engine.clone()),
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("clustername", self.cluster_name.clone()),
            ("dcname", self.dc_name.clone()),
            ("type", self.volume_type.clone()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            // field name kept as dashboards know it
            ("briks", self.bricks.into()),
            ("disperse_count", self.disperse_count.into()),
            ("redundancy_count", self.redundancy_count.into()),
            ("replica_count", self.replica_count.into()),
            ("stripe_count", self.stripe_count.into()),
            ("status", self.status.clone().into()),
            ("status_code", self.status_code.into()),
        ]
    }
}

/// `ovirtstat_vm`
#[derive(Debug, Clone, PartialEq)]
pub struct VmMetric {
    pub engine: String,
    pub id: String,
    pub name: String,
    pub cluster_name: String,
    pub dc_name: String,
    pub host_name: String,
    pub vm_type: String,
    pub cpu_cores: i64,
    pub cpu_sockets: i64,
    pub cpu_threads: i64,
    pub memory_size: i64,
    pub run_once: bool,
    pub stateless: bool,
    pub status: String,
    pub status_code: i16,
}

impl Measurement for VmMetric {
    const NAME: &'static str = "ovirtstat_vm";

    fn tags(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENGINE_TAG, self.engine.clone()),
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("clustername", self.cluster_name.clone()),
            ("dcname", self.dc_name.clone()),
            ("hostname", self.host_name.clone()),
            ("type", self.vm_type.clone()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("cpu_cores", self.cpu_cores.into()),
            ("cpu_sockets", self.cpu_sockets.into()),
            ("cpu_threads", self.cpu_threads.into()),
            ("memory_size", self.memory_size.into()),
            ("run_once", self.run_once.into()),
            ("stateless", self.stateless.into()),
            ("status", self.status.clone().into()),
            ("status_code", self.status_code.into()),
        ]
    }
}

/// `internal_ovirtstat`: cost of the collection cycle itself
#[derive(Debug, Clone, PartialEq)]
pub struct SelfMetric {
    pub alias: String,
    pub engine: String,
    pub version: String,
    pub gather_time_ns: i64,
    pub sessions_created: i64,
}

impl Measurement for SelfMetric {
    const NAME: &'static str = "internal_ovirtstat";

    fn tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("alias", self.alias.clone()),
            (ENGINE_TAG, self.engine.clone()),
            ("ovirtstat_version", self.version.clone()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("gather_time_ns", self.gather_time_ns.into()),
            ("sessions_created", self.sessions_created.into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_api_summary_without_vm_counters() {
        let metric = ApiSummaryMetric {
            engine: "engine.local".to_string(),
            version: "4.5.4".to_string(),
            hosts: 3,
            storagedomains: 2,
            users: 7,
            vms: None,
        };
        let record = metric.into_record(Utc::now());

        assert_eq!(record.measurement, "ovirtstat_apisummary");
        assert_eq!(record.tag(ENGINE_TAG), Some("engine.local"));
        assert_eq!(record.field("users"), Some(&FieldValue::Int(7)));
        assert!(record.field("vms_total").is_none());
    }

    #[test]
    fn test_storage_domain_record_shape() {
        let metric = StorageDomainMetric {
            engine: "engine.local".to_string(),
            id: "sd1".to_string(),
            name: "data01".to_string(),
            domain_type: "data".to_string(),
            storage_type: "nfs".to_string(),
            available: 10,
            committed: 5,
            used: 4,
            connections: 1,
            logical_units: 0,
            master: true,
            status: "active".to_string(),
            status_code: 0,
            external_status: "ok".to_string(),
            external_status_code: 0,
        };
        let record = metric.into_record(Utc::now());

        let tag_keys: Vec<_> = record.tags.keys().copied().collect();
        assert_eq!(tag_keys, vec!["id", "name", "ovirt-engine", "storage_type", "type"]);
        assert_eq!(record.fields.len(), 10);
        assert_eq!(record.field("master"), Some(&FieldValue::Bool(true)));
        assert_eq!(record.field("connections"), Some(&FieldValue::Int(1)));
    }
}
