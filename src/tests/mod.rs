pub mod component_tests;
pub mod config_tests;
pub mod support;
