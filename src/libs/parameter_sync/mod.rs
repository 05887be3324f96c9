pub mod parameter_sync;
