pub mod request_handler;
pub mod server;
pub mod thread_pool;
pub mod worker;

pub use request_handler::{RequestHandler, RequestHandlerError};
pub use server::Server;
pub use thread_pool::ThreadPool;
