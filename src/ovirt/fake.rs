// In-memory engine used by the tests
//
// Clones share state, so a test can keep a handle on the engine while the
// session owns a boxed copy, then inspect which fetches happened and in
// which order.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::model::*;
use super::{ApiError, Connector, EngineApi};

/// Entity lists served by the fake engine; `None` means "collection absent"
#[derive(Debug, Clone, Default)]
pub struct EngineData {
    pub api: Api,
    pub datacenters: Option<Vec<DataCenter>>,
    pub clusters: Option<Vec<Cluster>>,
    pub hosts: Option<Vec<Host>>,
    pub storage_domains: Option<Vec<StorageDomain>>,
    pub vms: Option<Vec<Vm>>,
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    data: Arc<Mutex<EngineData>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
    failing: Arc<Mutex<Vec<&'static str>>>,
    down: Arc<AtomicBool>,
    closed: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new(data: EngineData) -> Self {
        FakeEngine {
            data: Arc::new(Mutex::new(data)),
            ..Default::default()
        }
    }

    /// Fetch calls made so far, in order ("datacenters", "clusters", ...)
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, what: &str) -> usize {
        self.calls().iter().filter(|call| **call == what).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Makes the named fetch fail until cleared
    pub fn fail(&self, what: &'static str) {
        self.failing.lock().unwrap().push(what);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Makes liveness tests fail, as an expired session would
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn update(&self, change: impl FnOnce(&mut EngineData)) {
        change(&mut self.data.lock().unwrap());
    }

    fn serve<T: Clone>(
        &self,
        what: &'static str,
        pick: impl FnOnce(&EngineData) -> T,
    ) -> Result<T, ApiError> {
        self.calls.lock().unwrap().push(what);
        if self.failing.lock().unwrap().contains(&what) {
            return Err(ApiError::Protocol(format!("{} unavailable", what)));
        }
        Ok(pick(&self.data.lock().unwrap()))
    }
}

#[async_trait]
impl EngineApi for FakeEngine {
    async fn test(&self) -> Result<(), ApiError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ApiError::Protocol("session expired".to_string()));
        }
        Ok(())
    }

    async fn api(&self) -> Result<Api, ApiError> {
        self.serve("api", |data| data.api.clone())
    }

    async fn datacenters(&self) -> Result<Option<Vec<DataCenter>>, ApiError> {
        self.serve("datacenters", |data| data.datacenters.clone())
    }

    async fn clusters(&self) -> Result<Option<Vec<Cluster>>, ApiError> {
        self.serve("clusters", |data| data.clusters.clone())
    }

    async fn hosts(&self) -> Result<Option<Vec<Host>>, ApiError> {
        self.serve("hosts", |data| data.hosts.clone())
    }

    async fn storage_domains(&self) -> Result<Option<Vec<StorageDomain>>, ApiError> {
        self.serve("storage_domains", |data| data.storage_domains.clone())
    }

    async fn vms(&self) -> Result<Option<Vec<Vm>>, ApiError> {
        self.serve("vms", |data| data.vms.clone())
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector handing out sessions on a shared fake engine
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub engine: FakeEngine,
    refuse: Arc<AtomicBool>,
    connects: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new(engine: FakeEngine) -> Self {
        FakeConnector {
            engine,
            ..Default::default()
        }
    }

    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    fn endpoint(&self) -> &str {
        "https://engine.test/ovirt-engine/api"
    }

    async fn connect(&self, _timeout: Duration) -> Result<Box<dyn EngineApi>, ApiError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ApiError::Protocol("invalid_grant".to_string()));
        }
        self.engine.set_down(false);
        Ok(Box::new(self.engine.clone()))
    }
}

pub fn datacenter(id: &str, name: &str, status: &str) -> DataCenter {
    DataCenter {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        status: Some(status.to_string()),
        local: Some(false),
    }
}

pub fn cluster(id: &str, name: &str, datacenter_id: &str) -> Cluster {
    Cluster {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        data_center: Some(Link::to(datacenter_id)),
        gluster_volumes: None,
    }
}

pub fn host(id: &str, name: &str, cluster_id: &str, status: &str) -> Host {
    Host {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        status: Some(status.to_string()),
        host_type: Some("rhel".to_string()),
        cpu: Some(Cpu {
            topology: Some(CpuTopology {
                cores: Some(8),
                sockets: Some(2),
                threads: Some(2),
            }),
            speed: Some(2400.0),
        }),
        memory: Some(68_719_476_736),
        reinstallation_required: Some(false),
        summary: Some(VmSummary {
            active: Some(1),
            migrating: Some(0),
            total: Some(1),
        }),
        cluster: Some(Link::to(cluster_id)),
    }
}

pub fn vm(id: &str, name: &str, cluster_id: &str, host_id: Option<&str>, status: &str) -> Vm {
    Vm {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        status: Some(status.to_string()),
        vm_type: Some("server".to_string()),
        cpu: Some(Cpu {
            topology: Some(CpuTopology {
                cores: Some(2),
                sockets: Some(1),
                threads: Some(1),
            }),
            speed: None,
        }),
        memory: Some(4_294_967_296),
        stateless: Some(false),
        run_once: Some(false),
        cluster: Some(Link::to(cluster_id)),
        host: host_id.map(Link::to),
    }
}

pub fn storage_domain(id: &str, name: &str, status: Option<&str>) -> StorageDomain {
    StorageDomain {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        status: status.map(str::to_string),
        external_status: Some("ok".to_string()),
        domain_type: Some("data".to_string()),
        storage: Some(HostStorage {
            storage_type: Some("nfs".to_string()),
            logical_units: None,
            volume_group: None,
        }),
        available: Some(500),
        used: Some(300),
        committed: Some(200),
        master: Some(true),
        storage_connections: None,
    }
}

/// One datacenter with one cluster, two hosts and three VMs
pub fn small_engine() -> EngineData {
    EngineData {
        api: serde_json::from_str(
            r#"{
                "product_info": {"version": {"full_version": "4.5.4-1.el8"}},
                "summary": {
                    "hosts": {"active": "2", "total": "2"},
                    "storage_domains": {"active": "1", "total": "1"},
                    "users": {"active": "1", "total": "3"},
                    "vms": {"active": "2", "total": "3"}
                }
            }"#,
        )
        .expect("static document"),
        datacenters: Some(vec![datacenter("dc1", "Default", "up")]),
        clusters: Some(vec![cluster("c1", "prod", "dc1")]),
        hosts: Some(vec![
            host("h1", "hv01", "c1", "up"),
            host("h2", "hv02", "c1", "maintenance"),
        ]),
        storage_domains: Some(vec![storage_domain("sd1", "data01", Some("active"))]),
        vms: Some(vec![
            vm("v1", "web01", "c1", Some("h1"), "up"),
            vm("v2", "web02", "c1", Some("h2"), "up"),
            vm("v3", "db01", "c1", Some("h1"), "down"),
        ]),
    }
}
