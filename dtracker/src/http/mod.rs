pub mod http_method;
pub mod http_request;
pub mod http_status;

pub use http_method::HttpMethod;
pub use http_request::{HttpRequest, HttpRequestError};
pub use http_status::HttpStatus;
