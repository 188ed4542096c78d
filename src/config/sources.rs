pub mod env;
pub mod global_file;
