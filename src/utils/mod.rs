pub mod headers;
pub mod logging;
pub mod path;
pub mod responses;
