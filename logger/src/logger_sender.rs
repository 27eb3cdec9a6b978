use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Error => "[ERROR]",
        }
    }
}

#[derive(Debug)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

/// A `LoggerSender` representing the sender channel connected to a `Logger`.
///
/// Cloned freely into every worker thread that needs to log; sending never
/// blocks on disk I/O, that work happens on the receiver's own thread.
#[derive(Debug, Clone)]
pub struct LoggerSender {
    sender: Sender<LogRecord>,
}

impl LoggerSender {
    pub fn new(sender: Sender<LogRecord>) -> Self {
        Self { sender }
    }

    /// Logs an informational message. Best-effort: if the receiver thread has
    /// already shut down, the message is silently dropped rather than
    /// propagated as an error to every call site.
    pub fn info(&self, message: &str) {
        self.send(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.send(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.send(LogLevel::Error, message);
    }

    fn send(&self, level: LogLevel, message: &str) {
        let _ = self.sender.send(LogRecord {
            level,
            message: message.to_string(),
        });
    }
}
