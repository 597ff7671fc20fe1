//! Concrete storage for Sealed: file-backed key, SHA-256 content hashing,
//! AES-256-GCM artifacts, and the JSON metadata ledger, tied together by
//! [`engine::EncryptionEngine`].

mod atomic;
pub mod engine;
pub mod hasher;
pub mod key_provider;
pub mod ledger_file;
pub mod token;
