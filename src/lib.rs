pub mod age;
pub mod archive;
pub mod cache;
pub mod cli;
pub mod error;
pub mod github;
pub mod model;
pub mod stats;
pub mod svg;
pub mod util;
