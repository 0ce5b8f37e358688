#![warn(clippy::pedantic)]

pub mod boot_record;
pub mod error;
pub mod layout;
pub mod nor;
pub mod ram;
pub mod storage;

pub use boot_record::BootRecord;
pub use error::StorageError;
pub use layout::{PartitionLayout, Region};
pub use nor::{NorFlashStorage, NorHandle};
pub use ram::RamFlash;
pub use storage::{SlotId, UpdateStorage};
