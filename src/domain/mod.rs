//! Entities, value types and the ports the workflow engine talks through.

pub mod actor;
pub mod class;
pub mod id;
pub mod payment;
pub mod ports;
pub mod status;
pub mod teacher_request;
pub mod user;
