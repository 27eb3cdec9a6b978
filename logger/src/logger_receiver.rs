use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use chrono::prelude::*;

use super::logger_error::LoggerError;
use super::logger_sender::{LogRecord, LoggerSender};

const LOGGER_THREAD_NAME: &str = "logger";

/// A logger that writes to a file on its own thread.
///
/// The logger works with channels: one receiver, and as many `LoggerSender`
/// clones as there are threads that want to log. Once the active log file
/// would grow past `max_file_bytes`, it is closed and a new timestamped file
/// is opened in its place.
#[derive(Debug)]
pub struct Logger {
    sender: LoggerSender,
}

impl Logger {
    /// Creates a new `Logger` writing rotated files under `dir_path`.
    ///
    /// Returns a `LoggerError` if:
    /// - a log file could not be created at `dir_path`
    /// - the receiver thread could not be spawned
    pub fn new(dir_path: &str, max_file_bytes: u64) -> Result<Self, LoggerError> {
        let (sender, receiver): (Sender<LogRecord>, Receiver<LogRecord>) = channel();

        fs::create_dir_all(dir_path)
            .map_err(|_| LoggerError::BadLogPathError(dir_path.to_string()))?;
        let file = Self::create_log_file(dir_path)?;
        Self::spawn_log_receiver(receiver, file, dir_path.to_string(), max_file_bytes)?;

        Ok(Self {
            sender: LoggerSender::new(sender),
        })
    }

    /// Creates a new `LoggerSender` for the current `Logger`.
    pub fn new_sender(&self) -> LoggerSender {
        self.sender.clone()
    }

    fn spawn_log_receiver(
        receiver: Receiver<LogRecord>,
        file: File,
        dir_path: String,
        max_file_bytes: u64,
    ) -> Result<(), LoggerError> {
        let builder = thread::Builder::new().name(LOGGER_THREAD_NAME.to_string());
        let result = builder.spawn(move || {
            let mut file = file;
            let mut written = 0u64;

            while let Ok(record) = receiver.recv() {
                let time = Local::now();
                let formatted = format!(
                    "{} {} {}\n",
                    time.format("[%Y/%m/%d %H:%M:%S]"),
                    record.level.tag(),
                    record.message
                )
                .into_bytes();

                if written + formatted.len() as u64 > max_file_bytes {
                    match Self::create_log_file(&dir_path) {
                        Ok(new_file) => {
                            file = new_file;
                            written = 0;
                        }
                        Err(err) => eprintln!("Error({:?}) rotating the log", err),
                    }
                }

                match file.write_all(&formatted) {
                    Ok(_) => written += formatted.len() as u64,
                    Err(err) => eprintln!("Error({err}) writing to the log"),
                }
            }
        });
        match result {
            Ok(_) => Ok(()),
            Err(_) => Err(LoggerError::SpawnThreadError),
        }
    }

    fn create_log_file(dir_path: &str) -> Result<File, LoggerError> {
        let time = Local::now();

        OpenOptions::new()
            .create(true)
            .write(true)
            .append(true)
            .open(format!(
                "{}/{}.log",
                dir_path,
                time.format("%Y-%m-%d_%H-%M-%S%.f")
            ))
            .map_err(|_| LoggerError::BadLogPathError(dir_path.to_string()))
    }
}
