// oVirt Engine REST API documents
//
// Only the attributes the collectors read are modelled. The engine's JSON
// dialect encodes numbers and booleans as strings ("memory": "8589934592"),
// so those fields go through the lenient deserializers below, which accept
// both encodings. Nested collections are wrapped in an object keyed by the
// singular element name ("bricks": {"brick": [...]}).

use serde::de::{self, IgnoredAny};
use serde::{Deserialize, Deserializer};

/// Reference to another entity, as embedded in a document
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Link {
    #[serde(default)]
    pub id: Option<String>,
}

impl Link {
    pub fn to(id: impl Into<String>) -> Self {
        Link { id: Some(id.into()) }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataCenter {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub local: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_center: Option<Link>,
    #[serde(default)]
    pub gluster_volumes: Option<GlusterVolumes>,
}

impl Cluster {
    pub fn link(&self) -> Link {
        Link {
            id: self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlusterVolumes {
    #[serde(default)]
    pub gluster_volume: Vec<GlusterVolume>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlusterVolume {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bricks: Option<Bricks>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub disperse_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub redundancy_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub replica_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stripe_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bricks {
    #[serde(default)]
    pub brick: Vec<IgnoredAny>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Host {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub host_type: Option<String>,
    #[serde(default)]
    pub cpu: Option<Cpu>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub memory: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub reinstallation_required: Option<bool>,
    #[serde(default)]
    pub summary: Option<VmSummary>,
    #[serde(default)]
    pub cluster: Option<Link>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cpu {
    #[serde(default)]
    pub topology: Option<CpuTopology>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuTopology {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub cores: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub sockets: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub threads: Option<i64>,
}

/// Per-host counts of running virtual machines
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VmSummary {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub active: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub migrating: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageDomain {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub external_status: Option<String>,
    #[serde(default, rename = "type")]
    pub domain_type: Option<String>,
    #[serde(default)]
    pub storage: Option<HostStorage>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub available: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub used: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub committed: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub master: Option<bool>,
    #[serde(default)]
    pub storage_connections: Option<StorageConnections>,
}

impl StorageDomain {
    /// Storage backend type and number of logical units behind the domain
    ///
    /// Block domains list their LUNs either directly or through the volume group.
    pub fn backend_info(&self) -> (String, usize) {
        let Some(storage) = &self.storage else {
            return (String::new(), 0);
        };
        let storage_type = storage.storage_type.clone().unwrap_or_default();
        let logical_units = match (&storage.logical_units, &storage.volume_group) {
            (Some(units), _) => units.logical_unit.len(),
            (None, Some(group)) => group
                .logical_units
                .as_ref()
                .map_or(0, |units| units.logical_unit.len()),
            (None, None) => 0,
        };
        (storage_type, logical_units)
    }

    pub fn connection_count(&self) -> usize {
        self.storage_connections
            .as_ref()
            .map_or(0, |conns| conns.storage_connection.len())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostStorage {
    #[serde(default, rename = "type")]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub logical_units: Option<LogicalUnits>,
    #[serde(default)]
    pub volume_group: Option<VolumeGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeGroup {
    #[serde(default)]
    pub logical_units: Option<LogicalUnits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogicalUnits {
    #[serde(default)]
    pub logical_unit: Vec<IgnoredAny>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConnections {
    #[serde(default)]
    pub storage_connection: Vec<IgnoredAny>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vm {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub vm_type: Option<String>,
    #[serde(default)]
    pub cpu: Option<Cpu>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub memory: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub stateless: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub run_once: Option<bool>,
    #[serde(default)]
    pub cluster: Option<Link>,
    #[serde(default)]
    pub host: Option<Link>,
}

/// Engine root document (`GET /ovirt-engine/api`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    #[serde(default)]
    pub product_info: Option<ProductInfo>,
    #[serde(default)]
    pub summary: Option<ApiSummary>,
}

impl Api {
    pub fn full_version(&self) -> Option<&str> {
        self.product_info
            .as_ref()?
            .version
            .as_ref()?
            .full_version
            .as_deref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub full_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSummary {
    #[serde(default)]
    pub hosts: Option<ApiSummaryItem>,
    #[serde(default)]
    pub storage_domains: Option<ApiSummaryItem>,
    #[serde(default)]
    pub users: Option<ApiSummaryItem>,
    #[serde(default)]
    pub vms: Option<ApiSummaryItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSummaryItem {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub active: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBool {
    Bool(bool),
    Text(String),
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawNumber::Int(value)) => Ok(Some(value)),
        Some(RawNumber::Float(value)) => Ok(Some(value as i64)),
        Some(RawNumber::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid integer '{}': {}", text, e))),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawNumber::Int(value)) => Ok(Some(value as f64)),
        Some(RawNumber::Float(value)) => Ok(Some(value)),
        Some(RawNumber::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid number '{}': {}", text, e))),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawBool>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawBool::Bool(value)) => Ok(Some(value)),
        Some(RawBool::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            other => Err(de::Error::custom(format!("invalid boolean '{}'", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_document() {
        let host: Host = serde_json::from_str(
            r#"{
                "href": "/ovirt-engine/api/hosts/h1",
                "id": "h1",
                "name": "hv01",
                "status": "up",
                "type": "rhel",
                "memory": "270582939648",
                "reinstallation_required": "false",
                "cpu": {
                    "name": "Intel(R) Xeon(R) Gold 6230",
                    "speed": "2100",
                    "topology": {"cores": "20", "sockets": "2", "threads": "2"}
                },
                "summary": {"active": "12", "migrating": "1", "total": "14"},
                "cluster": {"href": "/ovirt-engine/api/clusters/c1", "id": "c1"}
            }"#,
        )
        .unwrap();

        assert_eq!(host.id.as_deref(), Some("h1"));
        assert_eq!(host.host_type.as_deref(), Some("rhel"));
        assert_eq!(host.memory, Some(270_582_939_648));
        assert_eq!(host.reinstallation_required, Some(false));
        let cpu = host.cpu.unwrap();
        assert_eq!(cpu.speed, Some(2100.0));
        assert_eq!(cpu.topology.unwrap().sockets, Some(2));
        assert_eq!(host.summary.unwrap().migrating, Some(1));
        assert_eq!(host.cluster, Some(Link::to("c1")));
    }

    #[test]
    fn test_native_json_encodings_are_accepted() {
        let vm: Vm = serde_json::from_str(
            r#"{"id": "v1", "memory": 1073741824, "stateless": true, "run_once": "TRUE"}"#,
        )
        .unwrap();
        assert_eq!(vm.memory, Some(1_073_741_824));
        assert_eq!(vm.stateless, Some(true));
        assert_eq!(vm.run_once, Some(true));
        assert!(vm.status.is_none());
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let result: Result<Vm, _> = serde_json::from_str(r#"{"memory": "lots"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_storage_domain_backend_info() {
        let block: StorageDomain = serde_json::from_str(
            r#"{
                "id": "sd1",
                "name": "fc-data",
                "type": "data",
                "storage": {
                    "type": "fcp",
                    "volume_group": {
                        "id": "vg1",
                        "logical_units": {"logical_unit": [{"id": "lun1"}, {"id": "lun2"}]}
                    }
                },
                "storage_connections": {"storage_connection": [{"id": "conn1"}]}
            }"#,
        )
        .unwrap();
        assert_eq!(block.backend_info(), ("fcp".to_string(), 2));
        assert_eq!(block.connection_count(), 1);

        let nfs: StorageDomain = serde_json::from_str(
            r#"{"id": "sd2", "storage": {"type": "nfs", "address": "nas", "path": "/export"}}"#,
        )
        .unwrap();
        assert_eq!(nfs.backend_info(), ("nfs".to_string(), 0));
        assert_eq!(nfs.connection_count(), 0);

        assert_eq!(StorageDomain::default().backend_info(), (String::new(), 0));
    }

    #[test]
    fn test_cluster_with_gluster_volumes() {
        let cluster: Cluster = serde_json::from_str(
            r#"{
                "id": "c1",
                "name": "gluster-cl",
                "data_center": {"id": "dc1"},
                "gluster_volumes": {"gluster_volume": [{
                    "id": "gv1",
                    "name": "vmstore",
                    "volume_type": "replicate",
                    "status": "up",
                    "replica_count": "3",
                    "bricks": {"brick": [{"id": "b1"}, {"id": "b2"}, {"id": "b3"}]}
                }]}
            }"#,
        )
        .unwrap();
        let volumes = cluster.gluster_volumes.unwrap().gluster_volume;
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].replica_count, Some(3));
        assert_eq!(volumes[0].bricks.as_ref().unwrap().brick.len(), 3);
        assert_eq!(volumes[0].stripe_count, None);
    }

    #[test]
    fn test_api_root_document() {
        let api: Api = serde_json::from_str(
            r#"{
                "product_info": {"name": "oVirt Engine", "version": {"full_version": "4.5.4-1.el8", "major": "4"}},
                "summary": {
                    "hosts": {"active": "3", "total": "4"},
                    "storage_domains": {"active": "5", "total": "6"},
                    "users": {"active": "2", "total": "9"},
                    "vms": {"active": "40", "total": "52"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(api.full_version(), Some("4.5.4-1.el8"));
        let summary = api.summary.unwrap();
        assert_eq!(summary.hosts.unwrap().total, Some(4));
        assert_eq!(summary.vms.unwrap().active, Some(40));
        assert_eq!(Api::default().full_version(), None);
    }
}
