//! REST paths of the array's management API

pub const LOGIN_SESSION_INFO_URI: &str = "/api/types/loginSessionInfo/instances";
pub const LOGOUT_URI: &str = "/api/types/loginSessionInfo/action/logout";
pub const BASIC_SYSTEM_INFO_URI: &str =
    "/api/types/basicSystemInfo/instances?fields=id,model,name,softwareVersion,apiVersion,earliestApiVersion";

pub const SNAP: &str = "snap";
pub const LUN: &str = "lun";
pub const FILESYSTEM: &str = "filesystem";
pub const STORAGE_RESOURCE: &str = "storageResource";
pub const LICENSE: &str = "license";

pub const SNAPSHOT_FIELDS: &str = "id,name,description,storageResource,lun,creationTime,expirationTime,isAutoDelete,isReadOnly,state,size,accessType,parentSnap";
pub const VOLUME_FIELDS: &str = "id,name,description,type,wwn,sizeTotal,sizeUsed,sizeAllocated,pool,storageResource,tieringPolicy,isThinEnabled,isDataReductionEnabled,health";
pub const FILESYSTEM_FIELDS: &str = "id,name,description,type,sizeTotal,sizeUsed,sizeAllocated,isThinEnabled,isDataReductionEnabled,pool,nasServer,storageResource,nfsShare,supportedProtocols,hostIOSize";
pub const LICENSE_FIELDS: &str = "id,name,isInstalled,isValid,version";

/// `/api/types/{resource}/instances`
pub fn instances(resource: &str) -> String {
    format!("/api/types/{}/instances", resource)
}

/// `/api/instances/{resource}/{id}`
pub fn instance(resource: &str, id: &str) -> String {
    format!("/api/instances/{}/{}", resource, urlencoding::encode(id))
}

/// `/api/instances/{resource}/name:{name}`
pub fn instance_by_name(resource: &str, name: &str) -> String {
    format!("/api/instances/{}/name:{}", resource, urlencoding::encode(name))
}

/// `/api/instances/{resource}/{id}/action/{action}`
pub fn instance_action(resource: &str, id: &str, action: &str) -> String {
    format!(
        "/api/instances/{}/{}/action/{}",
        resource,
        urlencoding::encode(id),
        action
    )
}

/// `/api/types/{resource}/action/{action}`
pub fn type_action(resource: &str, action: &str) -> String {
    format!("/api/types/{}/action/{}", resource, action)
}

/// Append a `fields=` selector
pub fn with_fields(uri: &str, fields: &str) -> String {
    format!("{}?fields={}", uri, fields)
}

/// Query builder for collection listings
#[derive(Debug, Default)]
pub struct ListQuery {
    params: Vec<String>,
    filters: Vec<String>,
}

impl ListQuery {
    pub fn new(fields: &str) -> Self {
        Self {
            params: vec![format!("fields={}", fields)],
            filters: Vec::new(),
        }
    }

    /// `<attribute> eq "<value>"`, several filters are joined with `and`
    pub fn filter_eq(mut self, attribute: &str, value: &str) -> Self {
        self.filters.push(format!("{} eq \"{}\"", attribute, value));
        self
    }

    /// Page through results; `max_entries == 0` lists everything
    pub fn page(mut self, start_token: u32, max_entries: u32) -> Self {
        if max_entries > 0 {
            self.params.push(format!("per_page={}", max_entries));
            self.params.push(format!("page={}", start_token + 1));
        }
        self
    }

    pub fn build(&self, resource: &str) -> String {
        let mut params = self.params.clone();
        if !self.filters.is_empty() {
            let filter = self.filters.join(" and ");
            params.insert(1, format!("filter={}", urlencoding::encode(&filter)));
        }
        format!("{}?{}", instances(resource), params.join("&"))
    }
}

/// Token for the page after `start_token`, 0 when there is none
pub fn next_token(start_token: u32, max_entries: u32, returned: usize) -> u32 {
    if max_entries > 0 && returned as u32 >= max_entries {
        start_token + 1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(instances(SNAP), "/api/types/snap/instances");
        assert_eq!(instance(SNAP, "38654705680"), "/api/instances/snap/38654705680");
        assert_eq!(
            instance_by_name(LUN, "vol 1"),
            "/api/instances/lun/name:vol%201"
        );
        assert_eq!(
            instance_action(STORAGE_RESOURCE, "sv_1", "modifyLun"),
            "/api/instances/storageResource/sv_1/action/modifyLun"
        );
        assert_eq!(
            type_action(STORAGE_RESOURCE, "createLun"),
            "/api/types/storageResource/action/createLun"
        );
    }

    #[test]
    fn test_list_query() {
        let uri = ListQuery::new("id,name")
            .filter_eq("storageResource.id", "sv_1")
            .page(2, 5)
            .build(SNAP);

        assert_eq!(
            uri,
            "/api/types/snap/instances?fields=id,name&filter=storageResource.id%20eq%20%22sv_1%22&per_page=5&page=3"
        );

        let uri = ListQuery::new("id")
            .filter_eq("storageResource.id", "res_1")
            .filter_eq("id", "38654705680")
            .build(SNAP);
        assert_eq!(
            uri,
            "/api/types/snap/instances?fields=id&filter=storageResource.id%20eq%20%22res_1%22%20and%20id%20eq%20%2238654705680%22"
        );

        let uri = ListQuery::new("id").page(0, 0).build(LUN);
        assert_eq!(uri, "/api/types/lun/instances?fields=id");
    }

    #[test]
    fn test_next_token() {
        assert_eq!(next_token(0, 10, 10), 1);
        assert_eq!(next_token(6, 5, 5), 7);
        assert_eq!(next_token(6, 5, 3), 0);
        assert_eq!(next_token(0, 0, 100), 0);
    }
}
