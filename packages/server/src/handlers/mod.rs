pub mod download;
pub mod project;
pub mod upload;
