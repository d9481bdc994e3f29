/// The custody API: method names, errors and the [spec::CustodyApi] trait.
pub mod spec;

/// The JSON-RPC server exposing the custody API.
pub mod server;
pub use server::{CustodyApiServer, CustodyEvent, CustodyRequest};
