pub mod flatten;
pub mod table;
pub mod xlsx;

pub use flatten::{flatten_record, value_at_path};
pub use table::{Table, MAX_ROWS_PER_SHEET};
