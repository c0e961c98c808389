//! Machine module - VM implementation
//!
//! The dispatch loop lives in `vm`; each instruction family is handled by a
//! trait in its own submodule, all implemented on [`VM`].

mod arithmetic;
mod control;
mod data;
mod slots;
mod vm;

// Public API
pub use vm::VM;

/// What the dispatch loop does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Advance past the current instruction.
    Next,
    /// Continue at an absolute stream offset.
    Jump(usize),
}
