//! Session encodings: the local storage record and shareable links.

pub mod share;
pub mod storage;

pub use share::{ShareParams, SharedSession, decode_from_share, encode_for_share};
pub use storage::{
    RestoreSource, Restored, STORAGE_KEY, STORAGE_VERSION, SessionSnapshot, decode_from_storage,
    encode_for_storage,
};
