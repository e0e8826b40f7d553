//! Infrastructure layer: DTOs and the in-memory implementations of the
//! domain traits.

pub mod dto;
pub mod registry;
pub mod repository;
