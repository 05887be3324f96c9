pub mod parameter_matchers;
