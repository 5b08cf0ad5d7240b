//! Feature license queries

use tracing::debug;
use unity_core::{validation_error, HttpMethod, UnityResult};

use crate::client::Client;
use crate::types::{Instance, LicenseInfo};
use crate::uri;
use crate::validation::require_id;

pub const THIN_PROVISIONING: &str = "THIN_PROVISIONING";
pub const DATA_REDUCTION: &str = "DATA_REDUCTION";

pub struct LicenseApi<'a> {
    client: &'a Client,
}

impl<'a> LicenseApi<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// License record of `feature`, e.g. `THIN_PROVISIONING`
    pub async fn is_feature_licensed(&self, feature: &str) -> UnityResult<LicenseInfo> {
        let feature = require_id(feature, "feature", "feature name cannot be empty")?;
        let path = uri::with_fields(&uri::instance(uri::LICENSE, feature), uri::LICENSE_FIELDS);

        let license: Instance<LicenseInfo> =
            self.client.execute(HttpMethod::Get, &path, None).await?;
        debug!(
            feature = %feature,
            installed = license.content.is_installed,
            valid = license.content.is_valid,
            "Fetched license"
        );
        Ok(license.content)
    }

    /// Fail with `message` unless `feature` is installed and valid
    pub(crate) async fn require(&self, feature: &str, message: &str) -> UnityResult<()> {
        if self.is_feature_licensed(feature).await?.is_usable() {
            Ok(())
        } else {
            Err(validation_error!(message, "license", "license"))
        }
    }
}
