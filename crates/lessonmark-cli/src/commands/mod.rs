pub mod checkpoint;
pub mod init;
pub mod score;
pub mod select;
pub mod validate;
