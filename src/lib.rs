pub mod checks;
pub mod config;
pub mod fixtures;
pub mod krpc;
pub mod space_center;
pub mod suite;
pub mod testing_tools;
