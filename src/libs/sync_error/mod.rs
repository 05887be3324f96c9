pub mod sync_error;
