//! Wire-level encodings handed to the ODBC driver.
//!
//! Both encoders are pure: no I/O, no shared state.

mod connection_string;
mod token;

pub use connection_string::{build_connection_string, raw_connection_string, SQL_SERVER_PORT};
pub use token::{decode_token, encode_token, EncodedToken, SQL_COPT_SS_ACCESS_TOKEN};
