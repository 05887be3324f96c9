pub mod config_dir;
pub mod config_file;
pub mod double_triple;
pub mod parameter_sync;
pub mod parameters;
pub mod patterns;
pub mod session;
pub mod sync_error;
pub mod transport;
pub mod util;
pub mod wire;

#[cfg(test)]
pub mod matchers;
