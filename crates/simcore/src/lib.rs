//! Core types shared by every simulation crate: the state bus passed between
//! models, the model traits and the fixed-step ODE solvers.

pub mod error;
pub mod solvers;
pub mod traits;

pub use error::*;
pub use solvers::*;
pub use traits::*;
