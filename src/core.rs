pub mod activation_store;
pub mod cleanup;
pub mod deployment;
pub mod events;
pub mod games;
pub mod install;
pub mod linker;
pub mod notify;
pub mod orchestrator;
pub mod refresh;
pub mod store;
pub mod transfer;
