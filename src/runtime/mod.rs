pub mod registers;
pub mod runtime_error;
pub mod vm;

pub use registers::{Cell, Registers};
pub use runtime_error::RuntimeError;
pub use vm::{State, Vm, VmConfig};
