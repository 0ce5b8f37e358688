#![warn(clippy::pedantic)]

pub mod compression;
pub mod error;
pub mod packer;

pub use error::PackError;
pub use packer::ImagePacker;
