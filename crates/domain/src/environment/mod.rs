//! Environment and global variable sets

mod globals;
mod variable;

pub use globals::GlobalVariableSet;
pub use variable::{EnvironmentVariableSet, VariableMap};
