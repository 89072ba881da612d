pub mod error;
pub mod manifest;
pub mod mod_dto;
pub mod paths;
pub mod state;
