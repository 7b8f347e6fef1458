pub mod data_uri;

pub use data_uri::{parse_data_uri, to_data_uri, DataUriError};
