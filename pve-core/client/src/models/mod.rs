//! PVE 数据模型
//!
//! 响应模型只覆盖类型化接口用到的字段, 其余字段请通过
//! [`PveResult::data`](crate::PveResult::data) 访问。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::params::Params;

/// 任务状态 (`/nodes/{node}/tasks/{upid}/status`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// `running` 或 `stopped`
    pub status: String,

    /// 任务结束后的退出状态, 成功时为 `OK`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exitstatus: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upid: Option<String>,

    /// 任务类型, 例如 `qmstart`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u64>,

    /// 任务开始时间 (Unix 时间戳)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starttime: Option<i64>,
}

impl TaskStatus {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }

    /// 任务已结束且退出状态为 `OK`
    pub fn is_success(&self) -> bool {
        !self.is_running() && self.exitstatus.as_deref() == Some("OK")
    }
}

/// API 版本信息 (`/version`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub release: String,
    pub repoid: String,
}

/// 节点列表项 (`/nodes`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeListItem {
    /// 节点名称
    pub node: String,

    /// `online` / `offline` / `unknown`
    pub status: String,

    /// CPU 使用率 (0.0 ~ 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxcpu: Option<u32>,

    /// 内存使用量 (字节)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxmem: Option<u64>,

    /// 运行时间 (秒)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_fingerprint: Option<String>,
}

/// 集群资源 (`/cluster/resources`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResource {
    /// 资源 ID, 例如 `qemu/100`
    pub id: String,

    /// `qemu` / `lxc` / `node` / `storage` / `pool` / `sdn`
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmid: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxmem: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxdisk: Option<u64>,
}

/// 创建虚拟机请求 (`POST /nodes/{node}/qemu`)
///
/// `net` / `scsi` / `ide` 为索引参数, 例如 `net: {0: "virtio,bridge=vmbr0"}` 编码为 `net0=...`。
#[derive(Debug, Clone, Default)]
pub struct CreateVmParams {
    pub vmid: u32,
    pub name: Option<String>,

    /// 内存 (MB)
    pub memory: Option<u32>,
    pub cores: Option<u32>,
    pub sockets: Option<u32>,

    /// 操作系统类型, 例如 `l26` / `win11`
    pub ostype: Option<String>,

    /// SCSI 控制器型号, 例如 `virtio-scsi-single`
    pub scsihw: Option<String>,
    pub boot: Option<String>,
    pub onboot: Option<bool>,

    /// 创建后立即启动
    pub start: Option<bool>,
    pub description: Option<String>,
    pub pool: Option<String>,
    pub net: BTreeMap<u32, String>,
    pub scsi: BTreeMap<u32, String>,
    pub ide: BTreeMap<u32, String>,

    /// 其余参数, 同名时覆盖上面的字段
    pub extra: Params,
}

impl CreateVmParams {
    pub fn new(vmid: u32) -> Self {
        Self {
            vmid,
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new()
            .with("vmid", self.vmid)
            .with("name", self.name.as_deref())
            .with("memory", self.memory)
            .with("cores", self.cores)
            .with("sockets", self.sockets)
            .with("ostype", self.ostype.as_deref())
            .with("scsihw", self.scsihw.as_deref())
            .with("boot", self.boot.as_deref())
            .with("onboot", self.onboot)
            .with("start", self.start)
            .with("description", self.description.as_deref())
            .with("pool", self.pool.as_deref())
            .with("net", self.net.clone())
            .with("scsi", self.scsi.clone())
            .with("ide", self.ide.clone());
        params.extend(self.extra.clone());
        params
    }
}

/// 克隆虚拟机请求 (`POST /nodes/{node}/qemu/{vmid}/clone`)
#[derive(Debug, Clone, Default)]
pub struct CloneVmParams {
    /// 新虚拟机 ID
    pub newid: u32,
    pub name: Option<String>,
    pub description: Option<String>,

    /// 完全克隆 (否则为链接克隆, 仅模板支持)
    pub full: Option<bool>,

    /// 目标节点
    pub target: Option<String>,

    /// 目标存储
    pub storage: Option<String>,
    pub pool: Option<String>,

    /// 克隆指定快照
    pub snapname: Option<String>,
}

impl CloneVmParams {
    pub fn new(newid: u32) -> Self {
        Self {
            newid,
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> Params {
        Params::new()
            .with("newid", self.newid)
            .with("name", self.name.as_deref())
            .with("description", self.description.as_deref())
            .with("full", self.full)
            .with("target", self.target.as_deref())
            .with("storage", self.storage.as_deref())
            .with("pool", self.pool.as_deref())
            .with("snapname", self.snapname.as_deref())
    }
}

/// 创建容器请求 (`POST /nodes/{node}/lxc`)
#[derive(Debug, Clone, Default)]
pub struct CreateLxcParams {
    pub vmid: u32,

    /// 模板卷, 例如 `local:vztmpl/debian-12-standard_12.2-1_amd64.tar.zst`
    pub ostemplate: String,
    pub hostname: Option<String>,
    pub password: Option<String>,
    pub memory: Option<u32>,
    pub cores: Option<u32>,

    /// 根文件系统, 例如 `local-lvm:8`
    pub rootfs: Option<String>,
    pub unprivileged: Option<bool>,
    pub start: Option<bool>,
    pub net: BTreeMap<u32, String>,

    /// 挂载点 `mp0`, `mp1`, ...
    pub mp: BTreeMap<u32, String>,
}

impl CreateLxcParams {
    pub fn new(vmid: u32, ostemplate: impl Into<String>) -> Self {
        Self {
            vmid,
            ostemplate: ostemplate.into(),
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> Params {
        Params::new()
            .with("vmid", self.vmid)
            .with("ostemplate", self.ostemplate.as_str())
            .with("hostname", self.hostname.as_deref())
            .with("password", self.password.as_deref())
            .with("memory", self.memory)
            .with("cores", self.cores)
            .with("rootfs", self.rootfs.as_deref())
            .with("unprivileged", self.unprivileged)
            .with("start", self.start)
            .with("net", self.net.clone())
            .with("mp", self.mp.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_vm_params_encoding() {
        let mut req = CreateVmParams::new(120);
        req.name = Some("web01".to_string());
        req.memory = Some(2048);
        req.onboot = Some(true);
        req.net.insert(0, "virtio,bridge=vmbr0".to_string());
        req.net.insert(3, "e1000,bridge=vmbr1".to_string());
        req.scsi.insert(0, "local-lvm:32".to_string());
        req.extra.insert("cpu", "host");

        let encoded = req.to_params().encode();
        let get = |k: &str| encoded.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());

        assert_eq!(get("vmid"), Some("120"));
        assert_eq!(get("name"), Some("web01"));
        assert_eq!(get("memory"), Some("2048"));
        assert_eq!(get("onboot"), Some("1"));
        assert_eq!(get("net0"), Some("virtio,bridge=vmbr0"));
        assert_eq!(get("net3"), Some("e1000,bridge=vmbr1"));
        assert_eq!(get("net1"), None);
        assert_eq!(get("scsi0"), Some("local-lvm:32"));
        assert_eq!(get("cpu"), Some("host"));
        assert_eq!(get("description"), None);
        assert!(!encoded.iter().any(|(n, _)| n.starts_with("ide")));
    }

    #[test]
    fn test_clone_params_encoding() {
        let mut req = CloneVmParams::new(201);
        req.full = Some(false);
        req.target = Some("pve2".to_string());
        assert_eq!(
            req.to_params().encode(),
            vec![
                ("newid".to_string(), "201".to_string()),
                ("full".to_string(), "0".to_string()),
                ("target".to_string(), "pve2".to_string()),
            ]
        );
    }

    #[test]
    fn test_lxc_params_mount_points() {
        let mut req = CreateLxcParams::new(300, "local:vztmpl/debian-12.tar.zst");
        req.mp.insert(1, "local-lvm:4,mp=/data".to_string());
        let encoded = req.to_params().encode();
        assert!(encoded.contains(&("mp1".to_string(), "local-lvm:4,mp=/data".to_string())));
        assert!(!encoded.iter().any(|(n, _)| n == "mp0"));
    }

    #[test]
    fn test_task_status_decoding() {
        let status: TaskStatus = serde_json::from_value(json!({
            "status": "stopped",
            "exitstatus": "OK",
            "type": "qmstart",
            "id": "100",
            "node": "pve1",
            "pid": 1234,
            "starttime": 1705095875,
        }))
        .unwrap();
        assert!(!status.is_running());
        assert!(status.is_success());
        assert_eq!(status.task_type.as_deref(), Some("qmstart"));

        let running: TaskStatus = serde_json::from_value(json!({ "status": "running" })).unwrap();
        assert!(running.is_running());
        assert!(!running.is_success());
    }

    #[test]
    fn test_cluster_resource_decoding() {
        let resource: ClusterResource = serde_json::from_value(json!({
            "id": "qemu/100",
            "type": "qemu",
            "node": "pve1",
            "vmid": 100,
            "status": "running",
            "template": 0,
        }))
        .unwrap();
        assert_eq!(resource.resource_type, "qemu");
        assert_eq!(resource.vmid, Some(100));
    }
}
