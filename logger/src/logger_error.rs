/// Logger possible errors
#[derive(Debug)]
pub enum LoggerError {
    SpawnThreadError,
    BadLogPathError(String),
}
