extern crate lazy_static;

pub mod libs;
