//! The request/response protocol answered by the node's data-support
//! facade, represented in internal format.

mod request;
mod response;

pub use request::Request;
pub use response::Response;
