// Adapters: concrete implementations for the outside world (HTTP delivery, CSV input).

pub mod csv_source;
pub mod http;

pub use csv_source::{read_rows, read_rows_from_path};
pub use http::{HttpTransport, TransportError};
