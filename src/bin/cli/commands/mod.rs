pub mod advance_days;
pub mod due;
pub mod init;
pub mod summary;
