pub mod checkbox;
pub mod files;
pub mod session;
pub mod summary;
