use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;

const TCP_PORT: &str = "TCP_PORT";
const LOG_DIRECTORY: &str = "LOG_DIRECTORY";
const DOWNLOAD_DIRECTORY: &str = "DOWNLOAD_DIRECTORY";
const TORRENT_DIRECTORY: &str = "TORRENT_DIRECTORY";
const TRACKER_HTTP_TIMEOUT_SECONDS: &str = "TRACKER_HTTP_TIMEOUT_SECONDS";
const PEER_READ_WRITE_TIMEOUT_SECONDS: &str = "PEER_READ_WRITE_TIMEOUT_SECONDS";

const MIN_SETTINGS: usize = 3;

/// `Cfg` holds the configuration file information, previously loaded with `Cfg::new`.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub tcp_port: u16,
    pub log_directory: String,
    pub download_directory: String,
    pub torrent_directory: String,
    pub tracker_http_timeout_seconds: u64,
    pub peer_read_write_timeout_seconds: u64,
}

impl Default for Cfg {
    fn default() -> Self {
        Self {
            tcp_port: 6881,
            log_directory: "./logs".to_string(),
            download_directory: "./downloads".to_string(),
            torrent_directory: "./torrents".to_string(),
            tracker_http_timeout_seconds: 30,
            peer_read_write_timeout_seconds: 5,
        }
    }
}

impl Cfg {
    /// Builds a `Cfg` from the given config file path.
    ///
    /// The format of the config file must be `{config_name}={config_value}`
    /// (without brackets), one setting per line.
    ///
    /// It returns an `io::Error` if:
    /// - the path to the config file does not exist or could not be opened/read
    /// - the config file has the wrong format
    /// - an unknown setting name was in the config file
    /// - `TCP_PORT` is not a number
    /// - the minimum number of recognized settings was not reached
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
            TCP_PORT => {
                self.tcp_port = value.parse().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("Invalid config, TCP_PORT is not a number: {}", value),
                    )
                })?;
            }
            LOG_DIRECTORY => self.log_directory = value.to_string(),
            DOWNLOAD_DIRECTORY => self.download_directory = value.to_string(),
            TORRENT_DIRECTORY => self.torrent_directory = value.to_string(),
            TRACKER_HTTP_TIMEOUT_SECONDS => {
                self.tracker_http_timeout_seconds = value.parse().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Invalid config, TRACKER_HTTP_TIMEOUT_SECONDS is not a number",
                    )
                })?;
            }
            PEER_READ_WRITE_TIMEOUT_SECONDS => {
                self.peer_read_write_timeout_seconds = value.parse().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Invalid config, PEER_READ_WRITE_TIMEOUT_SECONDS is not a number",
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, io::Write};

    #[test]
    fn test_good_config() {
        let path = "./test_good_config.txt";
        let contents =
            b"TCP_PORT=1000\nLOG_DIRECTORY=./log\nDOWNLOAD_DIRECTORY=./download";
        create_and_write_file(path, contents);

        let config = Cfg::new(path).unwrap();
        assert_eq!(config.tcp_port, 1000);
        assert_eq!(config.log_directory, "./log");
        assert_eq!(config.download_directory, "./download");

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_bad_path() {
        let config = Cfg::new("bad path");
        assert!(config.is_err());
    }

    #[test]
    fn test_empty_file() {
        let path = "./test_empty_config.txt";
        create_and_write_file(path, b"");
        assert!(Cfg::new(path).is_err());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_setting_doesnt_exist() {
        let path = "./test_bad_setting.txt";
        create_and_write_file(
            path,
            b"WRONG_SETTING=1000\nLOG_DIRECTORY=./log\nDOWNLOAD_DIRECTORY=./download",
        );
        assert!(Cfg::new(path).is_err());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_bad_number_of_settings() {
        let path = "./test_too_few_settings.txt";
        create_and_write_file(path, b"TCP_PORT=1000\nLOG_DIRECTORY=./log");
        assert!(Cfg::new(path).is_err());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_tcp_port_not_a_number() {
        let path = "./test_bad_port.txt";
        create_and_write_file(
            path,
            b"TCP_PORT=abcd\nLOG_DIRECTORY=./log\nDOWNLOAD_DIRECTORY=./download",
        );
        assert!(Cfg::new(path).is_err());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_order_doesnt_matter() {
        let path = "./test_order_independent.txt";
        create_and_write_file(
            path,
            b"LOG_DIRECTORY=./log2\nDOWNLOAD_DIRECTORY=./download2\nTCP_PORT=2500",
        );
        let config = Cfg::new(path).unwrap();
        assert_eq!(config.tcp_port, 2500);
        fs::remove_file(path).unwrap();
    }

    fn create_and_write_file(path: &str, contents: &[u8]) {
        let mut file = File::create(path).unwrap();
        file.write_all(contents).unwrap();
    }
}
