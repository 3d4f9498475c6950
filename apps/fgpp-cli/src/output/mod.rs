//! Terminal output helpers

mod printer;
pub mod table;

pub use printer::{use_color, Style};
pub use table::{truncate, Table};
