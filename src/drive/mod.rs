//! Google Drive integration: file listing and content download.

mod client;
mod types;

pub use client::DriveClient;
pub use types::{file_type_label, DriveFile, DriveFileList, FOLDER_MIME_TYPE};
