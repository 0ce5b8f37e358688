#![warn(clippy::pedantic)]

pub mod cursor;
pub mod error;
pub mod header;

pub use cursor::{Consumed, HeaderCursor};
pub use error::WireError;
pub use header::{HEADER_SIZE, SubElementHeader, TAG_UPGRADE_IMAGE};
