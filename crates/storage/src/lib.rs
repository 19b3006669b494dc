#![forbid(unsafe_code)]

pub mod json_file;
pub mod repository;

pub use json_file::JsonFileRepository;
pub use repository::{
    InMemoryRepository, ProfileRecord, ProfileRepository, Storage, StorageError,
};
