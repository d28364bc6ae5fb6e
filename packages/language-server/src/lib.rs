//! Nextflow Language Server
//!
//! LSP front end over the `nextflow-compiler` analysis core: one backend
//! wiring the protocol surface, a keyed debouncer collapsing edit
//! bursts, the mutex-guarded analysis state, and one provider module per
//! editor feature.

pub mod backend;
pub mod configuration;
pub mod debounce;
pub mod providers;
pub mod state;
