//! Core types for the account directory.
//!
//! This crate provides the foundational types shared by every layer:
//! - The [`Account`] model and its device helpers
//! - The versioned account payload codec
//! - Configuration types with validating builders
//! - The [`ErrorCode`] catalog used by every crate's error enum

#![deny(unsafe_code)]

pub mod account;
pub mod codec;
pub mod config;
pub mod error;

pub use account::{Account, AccountData, Device, MASTER_DEVICE_ID};
pub use codec::{CodecError, PAYLOAD_SCHEMA_VERSION, decode_payload, encode_payload};
pub use error::ErrorCode;
pub use uuid::Uuid;
