//! Filesystem operations

use tracing::{info, warn};
use unity_core::{decode_error, validation_error, HttpMethod, UnityResult};

use crate::client::Client;
use crate::executor::to_body;
use crate::license::{DATA_REDUCTION, THIN_PROVISIONING};
use crate::types::{
    CreateFilesystemRequest, CreatedStorageResource, FastVpParameters, Filesystem,
    FsParameters, FsSupportedProtocol, Instance, ModifyFilesystemRequest, ResourceRef,
    TieringPolicy,
};
use crate::uri;
use crate::validation::{checked_name, require_id};

/// Description given to a filesystem whose deletion waits for its snapshots
pub const MARKED_FOR_DELETION: &str =
    "csi-marked-filesystem-for-deletion(do not remove this from description)";

/// Optional settings of a new filesystem
#[derive(Debug, Clone, Default)]
pub struct CreateFilesystemOptions {
    pub description: String,
    pub tiering_policy: Option<TieringPolicy>,
    /// Expected host I/O size in bytes, left to the array when unset
    pub host_io_size: Option<u64>,
    pub supported_protocol: Option<FsSupportedProtocol>,
    pub is_thin: bool,
    pub is_data_reduction: bool,
}

/// What [`FilesystemApi::delete_filesystem`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Snapshots still exist; the filesystem goes with its last snapshot
    MarkedForDeletion,
}

pub struct FilesystemApi<'a> {
    client: &'a Client,
}

impl<'a> FilesystemApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Create a filesystem on `pool_id` served by `nas_server_id`
    pub async fn create_filesystem(
        &self,
        name: &str,
        pool_id: &str,
        nas_server_id: &str,
        size: u64,
        options: &CreateFilesystemOptions,
    ) -> UnityResult<Filesystem> {
        let name = checked_name(name, "filesystem")?;
        let pool_id = require_id(pool_id, "pool_id", "storage Pool ID cannot be empty")?;
        let nas_server_id =
            require_id(nas_server_id, "nas_server_id", "NAS server ID cannot be empty")?;
        if options.is_data_reduction && !options.is_thin {
            return Err(validation_error!(
                "data reduction requires a thin filesystem",
                "is_data_reduction",
                "filesystem"
            ));
        }

        let licenses = self.client.licenses();
        if options.is_thin {
            licenses
                .require(
                    THIN_PROVISIONING,
                    "thin provisioning is not supported on array and hence cannot create filesystem",
                )
                .await?;
        }
        if options.is_data_reduction {
            licenses
                .require(
                    DATA_REDUCTION,
                    "data reduction is not supported on array and hence cannot create filesystem",
                )
                .await?;
        }

        let request = CreateFilesystemRequest {
            name: name.to_string(),
            description: options.description.clone(),
            fs_parameters: FsParameters {
                pool: Some(ResourceRef::new(pool_id)),
                nas_server: Some(ResourceRef::new(nas_server_id)),
                size,
                supported_protocols: options.supported_protocol,
                is_thin_enabled: Some(options.is_thin),
                is_data_reduction_enabled: options.is_data_reduction.then_some(true),
                host_io_size: options.host_io_size,
                fast_vp_parameters: options
                    .tiering_policy
                    .map(|tiering_policy| FastVpParameters { tiering_policy }),
            },
        };

        let created: Instance<CreatedStorageResource> = self
            .client
            .execute(
                HttpMethod::Post,
                &uri::type_action(uri::STORAGE_RESOURCE, "createFilesystem"),
                Some(&to_body(&request)?),
            )
            .await?;
        info!(
            storage_resource_id = %created.content.storage_resource.id,
            name = %name,
            "Created filesystem"
        );

        self.find_filesystem_by_name(name).await
    }

    pub async fn find_filesystem_by_name(&self, name: &str) -> UnityResult<Filesystem> {
        let name = require_id(name, "name", "filesystem name cannot be empty")?;
        let path = uri::with_fields(
            &uri::instance_by_name(uri::FILESYSTEM, name),
            uri::FILESYSTEM_FIELDS,
        );
        let fs: Instance<Filesystem> = self.client.execute(HttpMethod::Get, &path, None).await?;
        Ok(fs.content)
    }

    pub async fn find_filesystem_by_id(&self, id: &str) -> UnityResult<Filesystem> {
        let id = require_id(id, "id", "filesystem ID cannot be empty")?;
        let path = uri::with_fields(&uri::instance(uri::FILESYSTEM, id), uri::FILESYSTEM_FIELDS);
        let fs: Instance<Filesystem> = self.client.execute(HttpMethod::Get, &path, None).await?;
        Ok(fs.content)
    }

    /// Grow a filesystem to `new_size` bytes; the current size is a no-op
    pub async fn expand_filesystem(&self, id: &str, new_size: u64) -> UnityResult<()> {
        let fs = self.find_filesystem_by_id(id).await?;
        if fs.size_total == new_size {
            info!(filesystem_id = %fs.id, size = new_size, "Filesystem already has the requested size");
            return Ok(());
        }
        if new_size < fs.size_total {
            return Err(validation_error!(
                format!(
                    "requested new capacity {} is smaller than the current capacity {}",
                    new_size, fs.size_total
                ),
                "new_size",
                "filesystem"
            ));
        }

        let request = ModifyFilesystemRequest {
            fs_parameters: Some(FsParameters {
                size: new_size,
                ..Default::default()
            }),
            ..Default::default()
        };
        self.modify(&fs, &request).await?;
        info!(filesystem_id = %fs.id, size = new_size, "Expanded filesystem");
        Ok(())
    }

    /// Tag a filesystem so it is deleted together with its last snapshot
    pub async fn mark_filesystem_for_deletion(&self, fs: &Filesystem) -> UnityResult<()> {
        let request = ModifyFilesystemRequest {
            description: Some(MARKED_FOR_DELETION.to_string()),
            ..Default::default()
        };
        self.modify(fs, &request).await?;
        info!(filesystem_id = %fs.id, "Marked filesystem for deletion");
        Ok(())
    }

    /// Delete a filesystem, or mark it when snapshots still depend on it
    pub async fn delete_filesystem(&self, id: &str) -> UnityResult<DeleteOutcome> {
        let fs = self.find_filesystem_by_id(id).await?;
        let storage_resource_id = storage_resource_of(&fs)?;

        let (snapshots, _) = self
            .client
            .snapshots()
            .list_snapshots(0, 0, storage_resource_id, "")
            .await?;
        if !snapshots.is_empty() {
            warn!(
                filesystem_id = %fs.id,
                snapshots = snapshots.len(),
                "Filesystem has snapshots, deferring deletion"
            );
            self.mark_filesystem_for_deletion(&fs).await?;
            return Ok(DeleteOutcome::MarkedForDeletion);
        }

        self.delete_storage_resource(storage_resource_id).await?;
        info!(filesystem_id = %fs.id, "Deleted filesystem");
        Ok(DeleteOutcome::Deleted)
    }

    pub(crate) async fn delete_storage_resource(&self, storage_resource_id: &str) -> UnityResult<()> {
        self.client
            .execute_no_content(
                HttpMethod::Delete,
                &uri::instance(uri::STORAGE_RESOURCE, storage_resource_id),
                None,
            )
            .await
    }

    async fn modify(&self, fs: &Filesystem, request: &ModifyFilesystemRequest) -> UnityResult<()> {
        let storage_resource_id = storage_resource_of(fs)?;
        self.client
            .execute_no_content(
                HttpMethod::Post,
                &uri::instance_action(uri::STORAGE_RESOURCE, storage_resource_id, "modifyFilesystem"),
                Some(&to_body(request)?),
            )
            .await
    }
}

fn storage_resource_of(fs: &Filesystem) -> UnityResult<&str> {
    fs.storage_resource_id().ok_or_else(|| {
        decode_error!(
            format!("filesystem {} has no storage resource", fs.id),
            "filesystem"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use serde_json::json;
    use std::sync::Arc;
    use unity_core::ErrorKind;

    fn fs_json(size: u64) -> serde_json::Value {
        json!({"content": {
            "id": "fs_1", "name": "fs-1", "description": "",
            "sizeTotal": size, "storageResource": {"id": "res_1"},
            "nasServer": {"id": "nas_1"}, "pool": {"id": "pool_1"}
        }})
    }

    fn licensed(call: &RecordedCall) -> Option<unity_core::ApiResponse> {
        call.path.starts_with("/api/instances/license/").then(|| {
            json_response(200, json!({"content": {"isInstalled": true, "isValid": true}}))
        })
    }

    #[tokio::test]
    async fn test_create_filesystem() {
        let mock = Arc::new(MockTransport::array(|call| {
            if let Some(response) = licensed(call) {
                return Ok(response);
            }
            match call.method {
                HttpMethod::Post => {
                    assert_eq!(call.path, "/api/types/storageResource/action/createFilesystem");
                    Ok(json_response(200, json!({"content": {"storageResource": {"id": "res_1"}}})))
                }
                _ => Ok(json_response(200, fs_json(5368709120))),
            }
        }));
        let client = logged_in_client(&mock).await;

        let options = CreateFilesystemOptions {
            description: "data".to_string(),
            host_io_size: Some(8192),
            supported_protocol: Some(FsSupportedProtocol::Nfs),
            is_thin: true,
            is_data_reduction: true,
            ..Default::default()
        };
        let fs = client
            .filesystems()
            .create_filesystem("fs-1", "pool_1", "nas_1", 5368709120, &options)
            .await
            .unwrap();

        assert_eq!(fs.id, "fs_1");
        assert_eq!(mock.count("/api/instances/license/"), 2);

        let create = mock
            .calls()
            .into_iter()
            .find(|c| c.method == HttpMethod::Post)
            .unwrap();
        let body = create.body.unwrap();
        assert_eq!(body["fsParameters"]["nasServer"]["id"], "nas_1");
        assert_eq!(body["fsParameters"]["hostIOSize"], 8192);
        assert_eq!(body["fsParameters"]["supportedProtocols"], 0);
        assert_eq!(body["fsParameters"]["isDataReductionEnabled"], true);
        assert!(body["fsParameters"].get("fastVPParameters").is_none());
    }

    #[tokio::test]
    async fn test_create_filesystem_validation() {
        let mock = Arc::new(MockTransport::array(|_| Ok(no_content())));
        let client = logged_in_client(&mock).await;
        let filesystems = client.filesystems();
        let options = CreateFilesystemOptions::default();

        let err = filesystems
            .create_filesystem(&"f".repeat(64), "pool_1", "nas_1", 1, &options)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "invalid filesystem name Error:name too long error");

        let err = filesystems
            .create_filesystem("fs-1", "", "nas_1", 1, &options)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "storage Pool ID cannot be empty");

        let err = filesystems
            .create_filesystem("fs-1", "pool_1", "", 1, &options)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "NAS server ID cannot be empty");

        let dedup_only = CreateFilesystemOptions {
            is_data_reduction: true,
            ..Default::default()
        };
        let err = filesystems
            .create_filesystem("fs-1", "pool_1", "nas_1", 1, &dedup_only)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(mock.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_expand_filesystem() {
        let mock = Arc::new(MockTransport::array(|call| match call.method {
            HttpMethod::Get => Ok(json_response(200, fs_json(1024))),
            _ => {
                assert_eq!(
                    call.path,
                    "/api/instances/storageResource/res_1/action/modifyFilesystem"
                );
                assert_eq!(call.body.as_ref().unwrap(), &json!({"fsParameters": {"size": 2048}}));
                Ok(no_content())
            }
        }));
        let client = logged_in_client(&mock).await;
        let filesystems = client.filesystems();

        filesystems.expand_filesystem("fs_1", 2048).await.unwrap();
        filesystems.expand_filesystem("fs_1", 1024).await.unwrap();
        let err = filesystems.expand_filesystem("fs_1", 512).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(mock.count("/api/instances/storageResource/"), 1);
    }

    #[tokio::test]
    async fn test_delete_filesystem_without_snapshots() {
        let mock = Arc::new(MockTransport::array(|call| {
            if call.path.starts_with("/api/instances/filesystem/fs_1") {
                return Ok(json_response(200, fs_json(1024)));
            }
            if call.path.starts_with("/api/types/snap/instances") {
                return Ok(json_response(200, json!({"entries": []})));
            }
            assert_eq!(call.method, HttpMethod::Delete);
            assert_eq!(call.path, "/api/instances/storageResource/res_1");
            Ok(no_content())
        }));
        let client = logged_in_client(&mock).await;

        let outcome = client.filesystems().delete_filesystem("fs_1").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
    }

    #[tokio::test]
    async fn test_delete_filesystem_with_snapshots_is_marked() {
        let mock = Arc::new(MockTransport::array(|call| {
            if call.path.starts_with("/api/instances/filesystem/fs_1") {
                return Ok(json_response(200, fs_json(1024)));
            }
            if call.path.starts_with("/api/types/snap/instances") {
                return Ok(json_response(
                    200,
                    json!({"entries": [{"content": {"id": "171798691846"}}]}),
                ));
            }
            assert_eq!(call.method, HttpMethod::Post);
            assert_eq!(
                call.body.as_ref().unwrap(),
                &json!({"description": MARKED_FOR_DELETION})
            );
            Ok(no_content())
        }));
        let client = logged_in_client(&mock).await;

        let outcome = client.filesystems().delete_filesystem("fs_1").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::MarkedForDeletion);
        assert_eq!(mock.count("/api/instances/storageResource/res_1/action/modifyFilesystem"), 1);
    }

    #[tokio::test]
    async fn test_find_filesystem_requires_id() {
        let mock = Arc::new(MockTransport::array(|_| Ok(no_content())));
        let client = logged_in_client(&mock).await;

        let err = client.filesystems().find_filesystem_by_id("").await.unwrap_err();
        assert_eq!(err.message(), "filesystem ID cannot be empty");
        assert_eq!(mock.operation_count(), 0);
    }
}
