//! Account data model.
//!
//! An [`Account`] is split into two parts when stored:
//! - Key attributes (`uuid`, `login`, `migration_version`) that the directory indexes and
//!   conditions on.
//! - An opaque payload ([`AccountData`]) serialized through [`crate::codec`] with its own schema
//!   version, so the payload can evolve independently of the key layout.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device identifier of the primary (registration) device.
pub const MASTER_DEVICE_ID: u64 = 1;

/// A directory account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Stable account identifier. Immutable once stored.
    pub uuid: Uuid,
    /// Human-facing unique handle (phone number or username).
    pub login: String,
    /// Monotonic stamp owned by the migration subsystem.
    pub migration_version: i32,
    /// Serialized payload body.
    pub data: AccountData,
}

impl Account {
    /// Creates an account with an empty payload and migration version 0.
    pub fn new(uuid: Uuid, login: impl Into<String>) -> Self {
        Self { uuid, login: login.into(), migration_version: 0, data: AccountData::default() }
    }

    /// Sets the migration version, consuming and returning the account.
    #[must_use]
    pub fn with_migration_version(mut self, migration_version: i32) -> Self {
        self.migration_version = migration_version;
        self
    }

    /// Returns the primary device, if registered.
    pub fn master_device(&self) -> Option<&Device> {
        self.device(MASTER_DEVICE_ID)
    }

    /// Returns the device with the given id.
    pub fn device(&self, device_id: u64) -> Option<&Device> {
        self.data.devices.iter().find(|d| d.id == device_id)
    }

    /// An account is enabled when its primary device is enabled.
    pub fn is_enabled(&self) -> bool {
        self.master_device().is_some_and(|d| d.enabled)
    }

    /// Number of enabled devices.
    pub fn enabled_device_count(&self) -> usize {
        self.data.devices.iter().filter(|d| d.enabled).count()
    }

    /// Adds a device, replacing any existing device with the same id.
    pub fn add_device(&mut self, device: Device) {
        self.remove_device(device.id);
        self.data.devices.push(device);
    }

    /// Removes the device with the given id. Returns whether a device was removed.
    pub fn remove_device(&mut self, device_id: u64) -> bool {
        let before = self.data.devices.len();
        self.data.devices.retain(|d| d.id != device_id);
        self.data.devices.len() != before
    }

    /// Returns the id to assign to the next linked device.
    ///
    /// Reuses the first disabled device slot; otherwise one past the highest id.
    pub fn next_device_id(&self) -> u64 {
        let mut highest = MASTER_DEVICE_ID;
        for device in &self.data.devices {
            if !device.enabled {
                return device.id;
            }
            highest = highest.max(device.id);
        }
        highest + 1
    }

    /// Most recent activity across all devices (unix millis), or 0 with no devices.
    pub fn last_seen(&self) -> u64 {
        self.data.devices.iter().map(|d| d.last_seen).max().unwrap_or(0)
    }
}

/// Account payload body.
///
/// Field names on the wire are stable; new fields must be optional or carry a
/// serde default so older payloads keep decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    /// Registered devices.
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Public identity key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_key: Option<String>,
    /// Encrypted profile name.
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    /// Profile avatar reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Registration lock hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_lock: Option<String>,
    /// Salt for the registration lock hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_lock_salt: Option<String>,
    /// Unidentified (sealed sender) access key.
    #[serde(default, rename = "uak", skip_serializing_if = "Option::is_none")]
    pub unidentified_access_key: Option<Vec<u8>>,
    /// Whether sealed-sender delivery is allowed from anyone.
    #[serde(default, rename = "uua")]
    pub unrestricted_unidentified_access: bool,
    /// Whether the login appears in contact discovery.
    #[serde(default = "default_discoverable", rename = "inCds")]
    pub discoverable_by_login: bool,
}

fn default_discoverable() -> bool {
    true
}

impl Default for AccountData {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            identity_key: None,
            profile_name: None,
            avatar: None,
            registration_lock: None,
            registration_lock_salt: None,
            unidentified_access_key: None,
            unrestricted_unidentified_access: false,
            discoverable_by_login: default_discoverable(),
        }
    }
}

/// A device registered to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Device id, unique within the account.
    pub id: u64,
    /// Encrypted device name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Client registration id.
    #[serde(default)]
    pub registration_id: u32,
    /// Creation time (unix millis).
    #[serde(default)]
    pub created: u64,
    /// Last activity (unix millis).
    #[serde(default)]
    pub last_seen: u64,
    /// Client user agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Whether the device may send and receive.
    #[serde(default)]
    pub enabled: bool,
}

impl Device {
    /// Creates an enabled device with the given id.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: None,
            registration_id: 0,
            created: 0,
            last_seen: 0,
            user_agent: None,
            enabled: true,
        }
    }
}
