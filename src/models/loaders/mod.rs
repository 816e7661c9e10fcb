pub mod csv_loader;

pub use csv_loader::{read_headers, read_table, write_table};
