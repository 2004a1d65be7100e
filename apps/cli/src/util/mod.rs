pub mod macros;
pub mod prelude;
