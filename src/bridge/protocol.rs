//! JSON-RPC protocol types for the subordinate process.
//!
//! ## Module Structure
//!
//! - `request_id` - RequestId type for type-safe request ID handling
//! - `request` - Request builders for the fixed set of remote methods
//! - `response` - Response classification and error descriptors

mod request;
mod request_id;
mod response;

pub use request::*;
pub use request_id::RequestId;
pub use response::*;
