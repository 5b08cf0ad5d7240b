//! Typed views of the array's JSON payloads

use serde::{Deserialize, Serialize, Serializer};

/// `{"content": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct Instance<T> {
    pub content: T,
}

/// `{"entries": [{"content": {...}}], "entryCount": n}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub entries: Vec<Instance<T>>,
    #[serde(default)]
    pub entry_count: Option<u64>,
}

impl<T> Collection<T> {
    pub fn into_contents(self) -> Vec<T> {
        self.entries.into_iter().map(|e| e.content).collect()
    }
}

/// Reference to another array object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

impl ResourceRef {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicSystemInfo {
    pub id: String,
    pub model: String,
    pub name: String,
    pub software_version: String,
    pub api_version: String,
    pub earliest_api_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub storage_resource: Option<ResourceRef>,
    pub lun: Option<ResourceRef>,
    pub creation_time: Option<String>,
    pub expiration_time: Option<String>,
    pub is_auto_delete: bool,
    pub is_read_only: bool,
    pub state: Option<u32>,
    pub size: Option<u64>,
    pub access_type: Option<u32>,
    pub parent_snap: Option<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Health {
    pub value: u32,
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub lun_type: Option<u32>,
    pub wwn: String,
    pub size_total: u64,
    pub size_used: Option<u64>,
    pub size_allocated: u64,
    pub pool: Option<ResourceRef>,
    pub storage_resource: Option<ResourceRef>,
    pub tiering_policy: Option<u32>,
    pub is_thin_enabled: bool,
    pub is_data_reduction_enabled: bool,
    pub health: Option<Health>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filesystem {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub fs_type: Option<u32>,
    pub size_total: u64,
    pub size_used: Option<u64>,
    pub size_allocated: u64,
    pub is_thin_enabled: bool,
    pub is_data_reduction_enabled: bool,
    pub pool: Option<ResourceRef>,
    pub nas_server: Option<ResourceRef>,
    pub storage_resource: Option<ResourceRef>,
    pub nfs_share: Vec<ResourceRef>,
    pub supported_protocols: Option<u32>,
    #[serde(rename = "hostIOSize")]
    pub host_io_size: Option<u64>,
}

impl Filesystem {
    /// Storage resource backing the filesystem
    pub fn storage_resource_id(&self) -> Option<&str> {
        self.storage_resource
            .as_ref()
            .map(|r| r.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseInfo {
    pub id: String,
    pub name: String,
    pub is_installed: bool,
    pub is_valid: bool,
    pub version: Option<String>,
}

impl LicenseInfo {
    pub fn is_usable(&self) -> bool {
        self.is_installed && self.is_valid
    }
}

/// Result of a snapshot copy action
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CopySnapshots {
    pub copies: Vec<ResourceRef>,
}

/// `{"storageResource": {"id": ...}}` returned by storage resource actions
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatedStorageResource {
    pub storage_resource: ResourceRef,
}

macro_rules! numeric_enum {
    ($name:ident) => {
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u32(*self as u32)
            }
        }
    };
}

/// How a filesystem snapshot is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemAccessType {
    /// Read-only `.snapshot` directory
    Checkpoint = 1,
    /// Shared through its own NFS/SMB shares
    Protocol = 2,
}
numeric_enum!(FilesystemAccessType);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieringPolicy {
    AutotierHigh = 0,
    Autotier = 1,
    Highest = 2,
    Lowest = 3,
}
numeric_enum!(TieringPolicy);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsSupportedProtocol {
    Nfs = 0,
    Cifs = 1,
    Multiprotocol = 2,
}
numeric_enum!(FsSupportedProtocol);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSnapshotRequest {
    pub storage_resource: ResourceRef,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem_access_type: Option<FilesystemAccessType>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModifySnapshotRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_auto_delete: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CopySnapshotRequest {
    pub copy_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FastVpParameters {
    pub tiering_policy: TieringPolicy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IoLimitParameters {
    pub io_limit_policy: ResourceRef,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LunParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<ResourceRef>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_thin_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_data_reduction_enabled: Option<bool>,
    #[serde(rename = "fastVPParameters", skip_serializing_if = "Option::is_none")]
    pub fast_vp_parameters: Option<FastVpParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_limit_parameters: Option<IoLimitParameters>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLunRequest {
    pub name: String,
    pub description: String,
    pub lun_parameters: LunParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModifyLunRequest {
    pub lun_parameters: LunParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLunThinCloneRequest {
    pub snap: ResourceRef,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FsParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<ResourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nas_server: Option<ResourceRef>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_protocols: Option<FsSupportedProtocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_thin_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_data_reduction_enabled: Option<bool>,
    #[serde(rename = "hostIOSize", skip_serializing_if = "Option::is_none")]
    pub host_io_size: Option<u64>,
    #[serde(rename = "fastVPParameters", skip_serializing_if = "Option::is_none")]
    pub fast_vp_parameters: Option<FastVpParameters>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFilesystemRequest {
    pub name: String,
    pub description: String,
    pub fs_parameters: FsParameters,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModifyFilesystemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_parameters: Option<FsParameters>,
}
