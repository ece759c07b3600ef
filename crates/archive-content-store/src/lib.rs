mod backend;
mod disk;
mod error;
mod s3;
mod store;

pub use backend::{ByteStream, ContentBackend, READ_CHUNK_BYTES, WRITE_CHUNK_BYTES};
pub use disk::DiskBackend;
pub use error::ContentStoreError;
pub use s3::S3Backend;
pub use store::{ContentStore, PutOutcome};
