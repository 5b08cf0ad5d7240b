//! Unity Client - authenticated access to a Unity storage array
//!
//! [`Client`] owns the session of one array endpoint. It logs in, caches the
//! `EMC-CSRF-TOKEN` issued by the array and, when a request is rejected
//! because the session expired, logs in again and repeats the request once.
//! Snapshot, volume, filesystem and license operations validate their input
//! locally and run through that executor.
//!
//! ```no_run
//! # async fn example() -> unity_core::UnityResult<()> {
//! use unity_client::Client;
//! use unity_core::ConnectConfig;
//!
//! let client = Client::new_with_args("https://10.0.0.1", true)?;
//! client
//!     .authenticate(&ConnectConfig::new("https://10.0.0.1", "admin", "secret", true))
//!     .await?;
//! let _nightly = client.snapshots().find_snapshot_by_name("nightly").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod executor;
pub mod filesystem;
pub mod license;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod uri;
pub mod validation;
pub mod volume;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use executor::Outcome;
pub use filesystem::{CreateFilesystemOptions, DeleteOutcome, FilesystemApi, MARKED_FOR_DELETION};
pub use license::LicenseApi;
pub use session::Session;
pub use snapshot::SnapshotApi;
pub use types::*;
pub use validation::{parse_retention_duration, validate_resource_name, NameError, MAX_RESOURCE_NAME_LENGTH};
pub use volume::{CreateLunOptions, VolumeApi};
