// Persistence: record shapes, the repository traits, and the JSON file backend.

pub mod local;
pub mod records;
pub mod repository;

pub use local::LocalStorage;
pub use records::{ClientRecord, DeviceRecord};
pub use repository::{ClientRepository, DeviceRepository, LocalRepository, Repository};
