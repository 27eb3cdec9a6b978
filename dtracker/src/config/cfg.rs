use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;

const HTTP_PORT: &str = "HTTP_PORT";
const LOG_DIRECTORY: &str = "LOG_DIRECTORY";
const TORRENT_DATA_DIRECTORY: &str = "TORRENT_DATA_DIRECTORY";
const THREAD_POOL_SIZE: &str = "THREAD_POOL_SIZE";

const MIN_SETTINGS: usize = 1;

/// `Cfg` holds the tracker's configuration, previously loaded with `Cfg::new`.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub http_port: u16,
    pub log_directory: String,
    pub torrent_data_directory: String,
    pub thread_pool_size: usize,
}

impl Default for Cfg {
    fn default() -> Self {
        Self {
            http_port: 8080,
            log_directory: "./logs".to_string(),
            torrent_data_directory: "./torrent_data_folder".to_string(),
            thread_pool_size: 4,
        }
    }
}

impl Cfg {
    /// Builds a `Cfg` from the given config file path.
    ///
    /// The format of the config file must be `{config_name}={config_value}`
    /// (without brackets), one setting per line.
    pub fn new(path: &str) -> io::Result<Self> {
        let mut cfg = Self::default();

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut settings_loaded = 0;

        for line in reader.lines() {
            let current_line = line?;
            if current_line.trim().is_empty() {
                continue;
            }
            let setting: Vec<&str> = current_line.splitn(2, '=').collect();

            if setting.len() != 2 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid config input: {}", current_line),
                ));
            }
            cfg = Self::load_setting(cfg, setting[0], setting[1])?;
            settings_loaded += 1;
        }
        if settings_loaded < MIN_SETTINGS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Minimum number of correct settings were not reached: {}",
                    settings_loaded
                ),
            ));
        }
        Ok(cfg)
    }

    fn load_setting(mut self, name: &str, value: &str) -> io::Result<Self> {
        match name {
            HTTP_PORT => {
                self.http_port = value.parse().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("Invalid config, HTTP_PORT is not a number: {}", value),
                    )
                })?;
            }
            LOG_DIRECTORY => self.log_directory = value.to_string(),
            TORRENT_DATA_DIRECTORY => self.torrent_data_directory = value.to_string(),
            THREAD_POOL_SIZE => {
                self.thread_pool_size = value.parse().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("Invalid config, THREAD_POOL_SIZE is not a number: {}", value),
                    )
                })?;
            }
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid config setting name: {}", name),
                ))
            }
        }
        Ok(self)
    }
}
