pub mod url_encoder;

pub use url_encoder::encode;
