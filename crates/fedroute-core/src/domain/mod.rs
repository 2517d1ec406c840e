//! # Domain Models
//!
//! Value types shared by the parser, the route model and the distributor.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestLine`] | Six-field `NET STA LOC CHA START END` request |
//! | [`Granularity`] | Key length used to compare requests with returned data |
//! | [`ServiceName`] | Service key declared in a data center block |

mod request_line;
mod service_name;

pub use request_line::{Granularity, RequestLine, EMPTY_LOCATION};
pub use service_name::ServiceName;
