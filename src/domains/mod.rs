pub mod archive;
pub mod batch;
pub mod compression;
