//! Script sandbox
//!
//! A small JavaScript-flavoured language interpreted in-process. Scripts see
//! only the capability object of their phase: there are no loops, no
//! function definitions and no host bindings, so every script terminates.

mod ast;
mod builtins;
mod error;
mod interpreter;
mod lexer;
mod parser;
mod sandbox;
mod value;

pub use error::ScriptError;
pub use sandbox::SandboxScriptEngine;
pub use value::{Builtin, Callable, Capability, ScriptValue};
