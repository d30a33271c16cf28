// Core modules: platform naming, bundles, library resolution, handle accounting, errors.
pub mod bundle;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod handle;
pub mod linker;
pub mod platform;
pub mod resolver;
