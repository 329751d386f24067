//! Storage module for image uploads
//!
//! Provides a MinIO/S3-compatible client; the rest of the system only ever
//! handles the reference names this module hands back.

mod object_store;

pub use object_store::ObjectStore;
