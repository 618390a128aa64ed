//! Shared helpers: external commands, filesystem, minification and watch
//! categories.

pub mod category;
pub mod exec;
pub mod fs;
pub mod minify;
