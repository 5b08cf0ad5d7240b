//! Snapshot operations

use tracing::{debug, info};
use unity_core::{decode_error, validation_error, HttpMethod, UnityResult};

use crate::client::Client;
use crate::executor::to_body;
use crate::filesystem::MARKED_FOR_DELETION;
use crate::types::{
    Collection, CopySnapshotRequest, CopySnapshots, CreateSnapshotRequest, Filesystem,
    FilesystemAccessType, Instance, ModifySnapshotRequest, ResourceRef, Snapshot,
};
use crate::uri::{self, ListQuery};
use crate::validation::{checked_name, parse_retention_duration, require_id};

pub struct SnapshotApi<'a> {
    client: &'a Client,
}

impl<'a> SnapshotApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Snapshot a volume or filesystem storage resource.
    ///
    /// `retention` is `days:hours:minutes:seconds`; empty keeps the snapshot
    /// until it is deleted.
    pub async fn create_snapshot(
        &self,
        storage_resource_id: &str,
        name: &str,
        description: &str,
        retention: &str,
    ) -> UnityResult<Snapshot> {
        self.create(storage_resource_id, name, description, retention, None)
            .await
    }

    /// Snapshot a filesystem, choosing how it is exposed
    pub async fn create_snapshot_with_fs_access_type(
        &self,
        storage_resource_id: &str,
        name: &str,
        description: &str,
        retention: &str,
        access_type: FilesystemAccessType,
    ) -> UnityResult<Snapshot> {
        self.create(
            storage_resource_id,
            name,
            description,
            retention,
            Some(access_type),
        )
        .await
    }

    async fn create(
        &self,
        storage_resource_id: &str,
        name: &str,
        description: &str,
        retention: &str,
        access_type: Option<FilesystemAccessType>,
    ) -> UnityResult<Snapshot> {
        let storage_resource_id = require_id(
            storage_resource_id,
            "storage_resource_id",
            "storage Resource ID cannot be empty",
        )?;
        let name = checked_name(name, "snapshot")?;
        let retention_duration = parse_retention_duration(retention)?;

        let request = CreateSnapshotRequest {
            storage_resource: ResourceRef::new(storage_resource_id),
            name: name.to_string(),
            description: description.to_string(),
            retention_duration,
            filesystem_access_type: access_type,
        };

        let created: Instance<Snapshot> = self
            .client
            .execute(
                HttpMethod::Post,
                &uri::instances(uri::SNAP),
                Some(&to_body(&request)?),
            )
            .await?;

        info!(
            snapshot_id = %created.content.id,
            storage_resource_id = %storage_resource_id,
            name = %name,
            "Created snapshot"
        );
        Ok(created.content)
    }

    pub async fn find_snapshot_by_name(&self, name: &str) -> UnityResult<Snapshot> {
        let name = require_id(name, "name", "name empty error")?;
        let path = uri::with_fields(
            &uri::instance_by_name(uri::SNAP, name),
            uri::SNAPSHOT_FIELDS,
        );
        let snapshot: Instance<Snapshot> = self.client.execute(HttpMethod::Get, &path, None).await?;
        Ok(snapshot.content)
    }

    pub async fn find_snapshot_by_id(&self, id: &str) -> UnityResult<Snapshot> {
        let id = require_id(id, "id", "snapshot ID cannot be empty")?;
        let path = uri::with_fields(&uri::instance(uri::SNAP, id), uri::SNAPSHOT_FIELDS);
        let snapshot: Instance<Snapshot> = self.client.execute(HttpMethod::Get, &path, None).await?;
        Ok(snapshot.content)
    }

    /// List snapshots, optionally of one storage resource or with one id.
    ///
    /// `start_token` is a page index and `max_entries` the page size (0 lists
    /// everything). The returned token addresses the next page and is 0 once
    /// the listing is exhausted.
    pub async fn list_snapshots(
        &self,
        start_token: u32,
        max_entries: u32,
        source_volume_id: &str,
        snapshot_id: &str,
    ) -> UnityResult<(Vec<Snapshot>, u32)> {
        let mut query = ListQuery::new(uri::SNAPSHOT_FIELDS);
        if !source_volume_id.trim().is_empty() {
            query = query.filter_eq("storageResource.id", source_volume_id.trim());
        }
        if !snapshot_id.trim().is_empty() {
            query = query.filter_eq("id", snapshot_id.trim());
        }
        let path = query.page(start_token, max_entries).build(uri::SNAP);

        let collection: Collection<Snapshot> =
            self.client.execute(HttpMethod::Get, &path, None).await?;
        let snapshots = collection.into_contents();
        let next = uri::next_token(start_token, max_entries, snapshots.len());

        debug!(count = snapshots.len(), next_token = next, "Listed snapshots");
        Ok((snapshots, next))
    }

    /// Change the description and retention of a snapshot
    pub async fn modify_snapshot(
        &self,
        id: &str,
        description: &str,
        retention: &str,
    ) -> UnityResult<()> {
        let id = require_id(id, "id", "snapshot ID cannot be empty")?;
        let request = ModifySnapshotRequest {
            description: Some(description.to_string()),
            retention_duration: parse_retention_duration(retention)?,
            is_auto_delete: None,
        };
        self.modify(id, &request).await
    }

    /// Exempt a snapshot from the array's automatic deletion
    pub async fn modify_snapshot_auto_delete_parameter(&self, id: &str) -> UnityResult<()> {
        let id = require_id(id, "id", "snapshot ID cannot be empty")?;
        let request = ModifySnapshotRequest {
            is_auto_delete: Some(false),
            ..Default::default()
        };
        self.modify(id, &request).await
    }

    async fn modify(&self, id: &str, request: &ModifySnapshotRequest) -> UnityResult<()> {
        self.client
            .execute_no_content(
                HttpMethod::Post,
                &uri::instance_action(uri::SNAP, id, "modify"),
                Some(&to_body(request)?),
            )
            .await?;
        info!(snapshot_id = %id, "Modified snapshot");
        Ok(())
    }

    /// Copy a snapshot and return the copy
    pub async fn copy_snapshot(&self, source_id: &str, copy_name: &str) -> UnityResult<Snapshot> {
        let source_id = require_id(source_id, "source_id", "Source Snapshot ID cannot be empty")?;
        if copy_name.trim().is_empty() {
            return Err(validation_error!(
                "Snapshot Name cannot be empty",
                "copy_name",
                "snapshot"
            ));
        }
        let copy_name = checked_name(copy_name, "snapshot")?;

        let request = CopySnapshotRequest {
            copy_name: copy_name.to_string(),
        };
        let result: Instance<CopySnapshots> = self
            .client
            .execute(
                HttpMethod::Post,
                &uri::instance_action(uri::SNAP, source_id, "copy"),
                Some(&to_body(&request)?),
            )
            .await?;

        let copy_id = result
            .content
            .copies
            .into_iter()
            .next()
            .map(|copy| copy.id)
            .ok_or_else(|| decode_error!("snapshot copy returned no copies", "snapshot"))?;

        info!(source_id = %source_id, copy_id = %copy_id, "Copied snapshot");
        self.find_snapshot_by_id(&copy_id).await
    }

    pub async fn delete_snapshot(&self, id: &str) -> UnityResult<()> {
        let id = require_id(id, "id", "snapshot ID cannot be empty")?;
        self.client
            .execute_no_content(HttpMethod::Delete, &uri::instance(uri::SNAP, id), None)
            .await?;
        info!(snapshot_id = %id, "Deleted snapshot");
        Ok(())
    }

    /// Delete a filesystem snapshot, then the source filesystem when it was
    /// marked for deletion and this was its last snapshot.
    ///
    /// Everything the filesystem deletion depends on is looked up before the
    /// snapshot goes, so a failed lookup leaves the array untouched.
    pub async fn delete_filesystem_as_snapshot(
        &self,
        snapshot_id: &str,
        source_fs: &Filesystem,
    ) -> UnityResult<()> {
        let snapshot_id = require_id(snapshot_id, "id", "snapshot ID cannot be empty")?;

        let pending_fs = if source_fs.description.contains(MARKED_FOR_DELETION) {
            self.filesystem_freed_by(snapshot_id, source_fs).await?
        } else {
            None
        };

        self.delete_snapshot(snapshot_id).await?;

        if let Some(storage_resource_id) = pending_fs {
            info!(
                filesystem_id = %source_fs.id,
                "Deleting filesystem marked for deletion after its last snapshot"
            );
            self.client
                .filesystems()
                .delete_storage_resource(&storage_resource_id)
                .await?;
        }
        Ok(())
    }

    /// Storage resource of `source_fs` when `snapshot_id` is its only snapshot
    async fn filesystem_freed_by(
        &self,
        snapshot_id: &str,
        source_fs: &Filesystem,
    ) -> UnityResult<Option<String>> {
        let storage_resource_id = match source_fs.storage_resource_id() {
            Some(id) => id.to_string(),
            None => {
                let fs = self
                    .client
                    .filesystems()
                    .find_filesystem_by_id(&source_fs.id)
                    .await?;
                fs.storage_resource_id()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        decode_error!(
                            format!("filesystem {} has no storage resource", fs.id),
                            "snapshot"
                        )
                    })?
            }
        };

        let (snapshots, _) = self
            .list_snapshots(0, 0, &storage_resource_id, "")
            .await?;
        let others = snapshots.iter().filter(|s| s.id != snapshot_id).count();
        if others > 0 {
            debug!(
                filesystem_id = %source_fs.id,
                remaining = others,
                "Filesystem still has snapshots"
            );
            return Ok(None);
        }
        Ok(Some(storage_resource_id))
    }
}
