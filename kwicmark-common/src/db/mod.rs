//! Database access layer shared by the Kwicmark modules

pub mod init;
pub mod models;

pub use init::init_database;
