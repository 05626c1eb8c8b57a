//! Primitive types shared by every engine in the kernel: local ids, sides,
//! order types, and the execution-layer's order status enum.

pub mod errors;
pub mod types;

pub use errors::KernelError;
pub use types::{LocalId, OrderStatus, OrderType, Side};
