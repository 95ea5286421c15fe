// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` glob bindings.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Turning each change event into one invocation per bound task.
//!
//! It does **not** know how tasks run; it hands names to a [`TaskInvoker`].

pub mod controller;
pub mod patterns;

pub use controller::{TaskInvoker, WatchController, WatchState, WatcherHandle};
pub use patterns::{
    build_bindings, build_bindings_from_config, compile_glob, glob_base, WatchBinding,
};
