//! Platform services behind the interpreter.
//!
//! Each service is an opaque boundary the interpreter drives through a
//! trait: the graphics surface (windowing and 2D primitives) and the
//! terminal single-key reader. Implementations own their platform state and
//! release it on drop, so the interpreter never touches a global handle.

pub mod graphics;
pub mod term;
