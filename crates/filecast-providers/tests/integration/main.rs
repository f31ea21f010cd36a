//! Integration tests for filecast-providers
//!
//! Drives the remote adapter against a scripted back-end client and against
//! a real `FolderBackend`, and checks record skipping, error classification
//! and probe behaviour end to end.

mod common;

mod test_folder_remote;
mod test_remote_adapter;
