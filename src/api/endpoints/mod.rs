//! Route handlers, one module per resource.

pub mod medications;
pub mod patients;
pub mod prescriptions;
pub mod system;
