//! Proptest strategies for account directory types.
//!
//! Reusable generators for property-based testing across crates. Strategies
//! produce well-formed accounts and operation sequences while exploring
//! login collisions through a deliberately small login pool.
//!
//! # Usage
//!
//! ```no_run
//! use account_directory_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(ops in strategies::arb_directory_ops(4, 3)) {
//!         // apply ops and check an invariant
//!     }
//! }
//! ```

use account_directory_types::{Account, AccountData, Device};
use proptest::prelude::*;
use uuid::Uuid;

/// Generates an E.164-style phone number login.
pub fn arb_login() -> impl Strategy<Value = String> {
    "\\+1[2-9][0-9]{9}"
}

/// Generates a login from a pool of `pool` fixed values, so collisions are common.
pub fn arb_pooled_login(pool: usize) -> impl Strategy<Value = String> {
    (0..pool.max(1)).prop_map(|i| format!("+1415555{i:04}"))
}

/// Generates an arbitrary UUID.
pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Generates a device with id in `1..=6`.
pub fn arb_device() -> impl Strategy<Value = Device> {
    (1u64..=6, any::<u32>(), 0u64..2_000_000_000_000, any::<bool>()).prop_map(
        |(id, registration_id, last_seen, enabled)| Device {
            registration_id,
            created: last_seen / 2,
            last_seen,
            enabled,
            ..Device::new(id)
        },
    )
}

/// Generates a payload with 0-4 devices and optional profile fields.
pub fn arb_account_data() -> impl Strategy<Value = AccountData> {
    (
        proptest::collection::vec(arb_device(), 0..4),
        proptest::option::of("[A-Za-z0-9+/]{43}="),
        proptest::option::of("[a-z ]{1,16}"),
        proptest::option::of(proptest::collection::vec(any::<u8>(), 16)),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(devices, identity_key, profile_name, uak, unrestricted, discoverable)| {
                let mut data = AccountData {
                    identity_key,
                    profile_name,
                    unidentified_access_key: uak,
                    unrestricted_unidentified_access: unrestricted,
                    discoverable_by_login: discoverable,
                    ..AccountData::default()
                };
                for device in devices {
                    data.devices.retain(|d| d.id != device.id);
                    data.devices.push(device);
                }
                data
            },
        )
}

/// Generates an account with a random UUID, phone login, and payload.
pub fn arb_account() -> impl Strategy<Value = Account> {
    (arb_uuid(), arb_login(), 0i32..10, arb_account_data()).prop_map(
        |(uuid, login, migration_version, data)| Account {
            uuid,
            login,
            migration_version,
            data,
        },
    )
}

/// A steady-state directory operation over a fixed set of account slots.
///
/// Slots index a UUID table owned by the test, so several operations can
/// target the same account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOp {
    /// Create the account in `slot` with `login`.
    Create {
        /// Account slot.
        slot: usize,
        /// Login to claim.
        login: String,
    },
    /// Update the payload of the account in `slot`.
    Update {
        /// Account slot.
        slot: usize,
        /// New profile name.
        profile_name: String,
    },
    /// Delete the account in `slot`.
    Delete {
        /// Account slot.
        slot: usize,
    },
}

/// Generates 1-40 operations over `slots` accounts and a pool of `logins` logins.
pub fn arb_directory_ops(slots: usize, logins: usize) -> impl Strategy<Value = Vec<DirectoryOp>> {
    let slot = 0..slots.max(1);
    let op = prop_oneof![
        3 => (slot.clone(), arb_pooled_login(logins))
            .prop_map(|(slot, login)| DirectoryOp::Create { slot, login }),
        1 => (slot.clone(), "[a-z]{1,8}")
            .prop_map(|(slot, profile_name)| DirectoryOp::Update { slot, profile_name }),
        1 => slot.prop_map(|slot| DirectoryOp::Delete { slot }),
    ];
    proptest::collection::vec(op, 1..40)
}
