//! Volume (LUN) operations

use tracing::{debug, info};
use unity_core::{validation_error, HttpMethod, UnityResult};

use crate::client::Client;
use crate::executor::to_body;
use crate::license::{DATA_REDUCTION, THIN_PROVISIONING};
use crate::types::{
    Collection, CreateLunRequest, CreateLunThinCloneRequest, CreatedStorageResource,
    FastVpParameters, Instance, IoLimitParameters, LunParameters, ModifyLunRequest, ResourceRef,
    TieringPolicy, Volume,
};
use crate::uri::{self, ListQuery};
use crate::validation::{checked_name, require_id};

/// Optional settings of a new volume
#[derive(Debug, Clone, Default)]
pub struct CreateLunOptions {
    pub description: String,
    pub tiering_policy: Option<TieringPolicy>,
    /// Host I/O limit policy applied to the volume
    pub host_io_limit_id: Option<String>,
    pub is_thin: bool,
    pub is_data_reduction: bool,
}

pub struct VolumeApi<'a> {
    client: &'a Client,
}

impl<'a> VolumeApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Create a volume of `size` bytes on `pool_id`.
    ///
    /// Thin provisioning and data reduction are checked against the array's
    /// licenses first.
    pub async fn create_lun(
        &self,
        name: &str,
        pool_id: &str,
        size: u64,
        options: &CreateLunOptions,
    ) -> UnityResult<Volume> {
        let name = checked_name(name, "volume")?;
        let pool_id = require_id(pool_id, "pool_id", "storage Pool ID cannot be empty")?;
        if options.is_data_reduction && !options.is_thin {
            return Err(validation_error!(
                "data reduction requires a thin volume",
                "is_data_reduction",
                "volume"
            ));
        }

        let licenses = self.client.licenses();
        if options.is_thin {
            licenses
                .require(
                    THIN_PROVISIONING,
                    "thin provisioning is not supported on array and hence cannot create volume",
                )
                .await?;
        }
        if options.is_data_reduction {
            licenses
                .require(
                    DATA_REDUCTION,
                    "data reduction is not supported on array and hence cannot create volume",
                )
                .await?;
        }

        let io_limit_parameters = options
            .host_io_limit_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| IoLimitParameters {
                io_limit_policy: ResourceRef::new(id),
            });

        let request = CreateLunRequest {
            name: name.to_string(),
            description: options.description.clone(),
            lun_parameters: LunParameters {
                pool: Some(ResourceRef::new(pool_id)),
                size,
                is_thin_enabled: Some(options.is_thin),
                is_data_reduction_enabled: options.is_data_reduction.then_some(true),
                fast_vp_parameters: options
                    .tiering_policy
                    .map(|tiering_policy| FastVpParameters { tiering_policy }),
                io_limit_parameters,
            },
        };

        let created: Instance<CreatedStorageResource> = self
            .client
            .execute(
                HttpMethod::Post,
                &uri::type_action(uri::STORAGE_RESOURCE, "createLun"),
                Some(&to_body(&request)?),
            )
            .await?;
        info!(
            storage_resource_id = %created.content.storage_resource.id,
            name = %name,
            "Created volume"
        );

        self.find_volume_by_name(name).await
    }

    pub async fn find_volume_by_name(&self, name: &str) -> UnityResult<Volume> {
        let name = require_id(name, "name", "volume name cannot be empty")?;
        let path = uri::with_fields(&uri::instance_by_name(uri::LUN, name), uri::VOLUME_FIELDS);
        let volume: Instance<Volume> = self.client.execute(HttpMethod::Get, &path, None).await?;
        Ok(volume.content)
    }

    pub async fn find_volume_by_id(&self, id: &str) -> UnityResult<Volume> {
        let id = require_id(id, "id", "volume ID cannot be empty")?;
        let path = uri::with_fields(&uri::instance(uri::LUN, id), uri::VOLUME_FIELDS);
        let volume: Instance<Volume> = self.client.execute(HttpMethod::Get, &path, None).await?;
        Ok(volume.content)
    }

    /// Page through volumes, see [`crate::SnapshotApi::list_snapshots`]
    pub async fn list_volumes(
        &self,
        start_token: u32,
        max_entries: u32,
    ) -> UnityResult<(Vec<Volume>, u32)> {
        let path = ListQuery::new(uri::VOLUME_FIELDS)
            .page(start_token, max_entries)
            .build(uri::LUN);
        let collection: Collection<Volume> =
            self.client.execute(HttpMethod::Get, &path, None).await?;
        let volumes = collection.into_contents();
        let next = uri::next_token(start_token, max_entries, volumes.len());

        debug!(count = volumes.len(), next_token = next, "Listed volumes");
        Ok((volumes, next))
    }

    /// Grow a volume to `new_size` bytes; the current size is a no-op
    pub async fn expand_volume(&self, id: &str, new_size: u64) -> UnityResult<()> {
        let volume = self.find_volume_by_id(id).await?;
        if volume.size_total == new_size {
            info!(volume_id = %volume.id, size = new_size, "Volume already has the requested size");
            return Ok(());
        }
        if new_size < volume.size_total {
            return Err(validation_error!(
                format!(
                    "requested new capacity {} is smaller than the current capacity {}",
                    new_size, volume.size_total
                ),
                "new_size",
                "volume"
            ));
        }

        let request = ModifyLunRequest {
            lun_parameters: LunParameters {
                size: new_size,
                ..Default::default()
            },
        };
        self.client
            .execute_no_content(
                HttpMethod::Post,
                &uri::instance_action(uri::STORAGE_RESOURCE, &volume.id, "modifyLun"),
                Some(&to_body(&request)?),
            )
            .await?;
        info!(volume_id = %volume.id, size = new_size, "Expanded volume");
        Ok(())
    }

    /// Delete a volume together with its storage resource
    pub async fn delete_volume(&self, id: &str) -> UnityResult<()> {
        let id = require_id(id, "id", "volume ID cannot be empty")?;
        self.client
            .execute_no_content(
                HttpMethod::Delete,
                &uri::instance(uri::STORAGE_RESOURCE, id),
                None,
            )
            .await?;
        info!(volume_id = %id, "Deleted volume");
        Ok(())
    }

    /// Thin clone of `volume_id` taken from its snapshot `snap_id`
    pub async fn create_lun_thin_clone(
        &self,
        name: &str,
        snap_id: &str,
        volume_id: &str,
    ) -> UnityResult<Volume> {
        let name = checked_name(name, "volume")?;
        let snap_id = require_id(snap_id, "snap_id", "snapshot ID cannot be empty")?;
        let volume_id = require_id(volume_id, "volume_id", "volume ID cannot be empty")?;

        let request = CreateLunThinCloneRequest {
            snap: ResourceRef::new(snap_id),
            name: name.to_string(),
        };
        self.client
            .execute_no_content(
                HttpMethod::Post,
                &uri::instance_action(uri::STORAGE_RESOURCE, volume_id, "createLunThinClone"),
                Some(&to_body(&request)?),
            )
            .await?;
        info!(source_volume_id = %volume_id, snapshot_id = %snap_id, name = %name, "Created thin clone");

        self.find_volume_by_name(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use serde_json::json;
    use std::sync::Arc;
    use unity_core::{ApiResponse, ErrorKind};

    fn volume_json(size: u64) -> serde_json::Value {
        json!({"content": {
            "id": "sv_1", "name": "vol-1", "sizeTotal": size,
            "pool": {"id": "pool_1"}, "storageResource": {"id": "sv_1"},
            "isThinEnabled": true, "health": {"value": 5, "descriptions": ["OK"]}
        }})
    }

    fn license(installed: bool) -> ApiResponse {
        json_response(
            200,
            json!({"content": {"isInstalled": installed, "isValid": true}}),
        )
    }

    #[tokio::test]
    async fn test_create_lun() {
        let mock = Arc::new(MockTransport::array(|call| {
            if call.path.starts_with("/api/instances/license/") {
                return Ok(license(true));
            }
            match call.method {
                HttpMethod::Post => {
                    assert_eq!(call.path, "/api/types/storageResource/action/createLun");
                    Ok(json_response(200, json!({"content": {"storageResource": {"id": "sv_1"}}})))
                }
                _ => {
                    assert!(call.path.starts_with("/api/instances/lun/name:vol-1"));
                    Ok(json_response(200, volume_json(1073741824)))
                }
            }
        }));
        let client = logged_in_client(&mock).await;

        let options = CreateLunOptions {
            description: "db".to_string(),
            tiering_policy: Some(TieringPolicy::Autotier),
            host_io_limit_id: Some("qp_1".to_string()),
            is_thin: true,
            is_data_reduction: false,
        };
        let volume = client
            .volumes()
            .create_lun("vol-1", "pool_1", 1073741824, &options)
            .await
            .unwrap();
        assert_eq!(volume.id, "sv_1");
        assert_eq!(volume.health.unwrap().value, 5);

        let create = mock
            .calls()
            .into_iter()
            .find(|c| c.method == HttpMethod::Post)
            .unwrap();
        assert_eq!(
            create.body.unwrap(),
            json!({
                "name": "vol-1",
                "description": "db",
                "lunParameters": {
                    "pool": {"id": "pool_1"},
                    "size": 1073741824u64,
                    "isThinEnabled": true,
                    "fastVPParameters": {"tieringPolicy": 1},
                    "ioLimitParameters": {"ioLimitPolicy": {"id": "qp_1"}}
                }
            })
        );
        assert_eq!(mock.count("/api/instances/license/THIN_PROVISIONING"), 1);
        assert_eq!(mock.count("/api/instances/license/DATA_REDUCTION"), 0);
    }

    #[tokio::test]
    async fn test_create_lun_without_thin_license() {
        let mock = Arc::new(MockTransport::array(|call| {
            assert!(call.path.starts_with("/api/instances/license/"));
            Ok(license(false))
        }));
        let client = logged_in_client(&mock).await;

        let options = CreateLunOptions {
            is_thin: true,
            ..Default::default()
        };
        let err = client
            .volumes()
            .create_lun("vol-1", "pool_1", 1, &options)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().starts_with("thin provisioning is not supported"));
        assert_eq!(mock.count("/api/types/storageResource"), 0);
    }

    #[tokio::test]
    async fn test_create_lun_validation() {
        let mock = Arc::new(MockTransport::array(|_| Ok(no_content())));
        let client = logged_in_client(&mock).await;
        let volumes = client.volumes();
        let options = CreateLunOptions::default();

        let err = volumes
            .create_lun(&"v".repeat(64), "pool_1", 1, &options)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "invalid volume name Error:name too long error");

        let err = volumes.create_lun("  ", "pool_1", 1, &options).await.unwrap_err();
        assert_eq!(err.message(), "invalid volume name Error:name empty error");

        let err = volumes.create_lun("vol-1", "", 1, &options).await.unwrap_err();
        assert_eq!(err.message(), "storage Pool ID cannot be empty");

        assert_eq!(mock.operation_count(), 0);
    }

    #[tokio::test]
    async fn test_list_volumes() {
        let mock = Arc::new(MockTransport::array(|call| {
            assert_eq!(
                call.path,
                format!("/api/types/lun/instances?fields={}&per_page=1&page=1", uri::VOLUME_FIELDS)
            );
            Ok(json_response(200, json!({"entries": [volume_json(1)]})))
        }));
        let client = logged_in_client(&mock).await;

        let (volumes, next) = client.volumes().list_volumes(0, 1).await.unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(next, 1);
    }

    #[tokio::test]
    async fn test_expand_volume() {
        let mock = Arc::new(MockTransport::array(|call| match call.method {
            HttpMethod::Get => Ok(json_response(200, volume_json(1024))),
            _ => {
                assert_eq!(call.path, "/api/instances/storageResource/sv_1/action/modifyLun");
                assert_eq!(call.body.as_ref().unwrap(), &json!({"lunParameters": {"size": 4096}}));
                Ok(no_content())
            }
        }));
        let client = logged_in_client(&mock).await;
        let volumes = client.volumes();

        volumes.expand_volume("sv_1", 4096).await.unwrap();
        volumes.expand_volume("sv_1", 1024).await.unwrap();

        let err = volumes.expand_volume("sv_1", 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(mock.count("/api/instances/storageResource/"), 1);

        let err = volumes.expand_volume("", 10).await.unwrap_err();
        assert_eq!(err.message(), "volume ID cannot be empty");
    }

    #[tokio::test]
    async fn test_delete_volume() {
        let mock = Arc::new(MockTransport::array(|call| {
            assert_eq!(call.method, HttpMethod::Delete);
            assert_eq!(call.path, "/api/instances/storageResource/sv_1");
            Ok(no_content())
        }));
        let client = logged_in_client(&mock).await;
        let volumes = client.volumes();

        volumes.delete_volume("sv_1").await.unwrap();

        let err = volumes.delete_volume("").await.unwrap_err();
        assert_eq!(err.message(), "volume ID cannot be empty");
        assert_eq!(mock.operation_count(), 1);
    }

    #[tokio::test]
    async fn test_create_lun_thin_clone() {
        let mock = Arc::new(MockTransport::array(|call| match call.method {
            HttpMethod::Post => {
                assert_eq!(
                    call.path,
                    "/api/instances/storageResource/sv_1/action/createLunThinClone"
                );
                assert_eq!(
                    call.body.as_ref().unwrap(),
                    &json!({"snap": {"id": "38654705680"}, "name": "clone-1"})
                );
                Ok(json_response(200, json!({"content": {"storageResource": {"id": "sv_2"}}})))
            }
            _ => Ok(json_response(
                200,
                json!({"content": {"id": "sv_2", "name": "clone-1"}}),
            )),
        }));
        let client = logged_in_client(&mock).await;
        let volumes = client.volumes();

        let clone = volumes
            .create_lun_thin_clone("clone-1", "38654705680", "sv_1")
            .await
            .unwrap();
        assert_eq!(clone.id, "sv_2");

        let err = volumes
            .create_lun_thin_clone("clone-2", "", "sv_1")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "snapshot ID cannot be empty");
        let err = volumes
            .create_lun_thin_clone("clone-2", "38654705680", "")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "volume ID cannot be empty");
    }
}
