//! Attribute layout of the directory tables.
//!
//! | Table       | Partition key | Attributes                        |
//! |-------------|---------------|-----------------------------------|
//! | accounts    | `U` (16 B)    | `P` login, `D` payload, `V` version, `VD` |
//! | logins      | `P`           | `U` owner                         |
//! | misc        | `PN`          | `PV` (decimal string)             |
//! | tombstones  | `U`           |                                   |
//! | retries     | `U`           |                                   |

use account_directory_store::{AttributeValue, Item};
use account_directory_types::{Account, decode_payload, encode_payload};
use snafu::ResultExt;
use uuid::Uuid;

use crate::error::{CodecSnafu, DirectoryError, Result};

/// Account UUID, 16 raw bytes.
pub const ATTR_UUID: &str = "U";
/// Login.
pub const ATTR_LOGIN: &str = "P";
/// Serialized account payload.
pub const ATTR_DATA: &str = "D";
/// Migration version.
pub const ATTR_VERSION: &str = "V";
/// Directory-visibility marker.
pub const ATTR_VISIBILITY: &str = "VD";
/// Misc table key.
pub const ATTR_MISC_NAME: &str = "PN";
/// Misc table value.
pub const ATTR_MISC_VALUE: &str = "PV";

/// Value stored under [`ATTR_VISIBILITY`].
pub const VISIBILITY_DEFAULT: &str = "default";
/// Misc row holding the directory version.
pub const DIRECTORY_VERSION_KEY: &str = "directory_version";

pub(crate) fn uuid_value(uuid: Uuid) -> AttributeValue {
    AttributeValue::B(uuid.as_bytes().to_vec())
}

/// Key item for tables partitioned on the account UUID.
pub(crate) fn uuid_key(uuid: Uuid) -> Item {
    Item::from([(ATTR_UUID.to_string(), uuid_value(uuid))])
}

/// Key item for the login table.
pub(crate) fn login_key(login: &str) -> Item {
    Item::from([(ATTR_LOGIN.to_string(), AttributeValue::S(login.to_string()))])
}

/// Reads the `U` attribute of an item as a UUID.
pub(crate) fn read_uuid(item: &Item) -> Result<Uuid> {
    let bytes = item
        .get(ATTR_UUID)
        .and_then(AttributeValue::as_b)
        .ok_or_else(|| corrupt(format!("missing {ATTR_UUID} attribute")))?;
    Uuid::from_slice(bytes)
        .map_err(|_| corrupt(format!("{ATTR_UUID} holds {} bytes, expected 16", bytes.len())))
}

/// Full account row.
pub(crate) fn account_item(account: &Account) -> Result<Item> {
    let payload = encode_payload(&account.data).context(CodecSnafu)?;
    Ok(Item::from([
        (ATTR_UUID.to_string(), uuid_value(account.uuid)),
        (ATTR_LOGIN.to_string(), AttributeValue::S(account.login.clone())),
        (ATTR_DATA.to_string(), AttributeValue::B(payload)),
        (ATTR_VERSION.to_string(), AttributeValue::N(i64::from(account.migration_version))),
        (ATTR_VISIBILITY.to_string(), AttributeValue::S(VISIBILITY_DEFAULT.to_string())),
    ]))
}

/// Restores an account from its row. A missing `V` reads as version 0.
pub(crate) fn account_from_item(item: &Item) -> Result<Account> {
    let uuid = read_uuid(item)?;
    let login = item
        .get(ATTR_LOGIN)
        .and_then(AttributeValue::as_s)
        .ok_or_else(|| corrupt(format!("account {uuid} missing {ATTR_LOGIN} attribute")))?;
    let payload = item
        .get(ATTR_DATA)
        .and_then(AttributeValue::as_b)
        .ok_or_else(|| corrupt(format!("account {uuid} missing {ATTR_DATA} attribute")))?;
    let migration_version = match item.get(ATTR_VERSION) {
        None => 0,
        Some(value) => value
            .as_n()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| corrupt(format!("account {uuid} has invalid {ATTR_VERSION}")))?,
    };

    let mut account = Account::new(uuid, login).with_migration_version(migration_version);
    account.data = decode_payload(payload).context(CodecSnafu)?;
    Ok(account)
}

fn corrupt(reason: String) -> DirectoryError {
    DirectoryError::CorruptAccount { reason }
}
