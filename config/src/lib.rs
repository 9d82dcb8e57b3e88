//! Process-wide configuration: a single loader reads an XML document once at startup
//! and produces an immutable snapshot that every later reader fetches lock-free.
//!
//! ```xml
//! <root>
//!   <log>
//!     <log_level>INFO</log_level>
//!     <log_file_name>rapidrpc</log_file_name>
//!     <log_file_path>./log/</log_file_path>
//!     <log_max_file_size>104857600</log_max_file_size>
//!   </log>
//!   <server>
//!     <ip>127.0.0.1</ip>
//!     <port>8080</port>
//!     <io_threads>4</io_threads>
//!   </server>
//! </root>
//! ```

#![deny(missing_debug_implementations, rust_2018_idioms, unused_imports)]

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

/// Log verbosity, mirroring the three levels the logging crate filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl LogLevel {
    fn from_str_lenient(s: &str) -> Self {
        match s {
            "DEBUG" => LogLevel::Debug,
            "ERROR" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Errors that can occur while loading configuration. Per the loader's "fail the
/// process outright" mandate, callers are expected to propagate these up to `main`
/// and exit rather than attempt recovery.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: quick_xml::DeError },
    #[error("config already loaded; SetGlobalConfig-equivalent called more than once")]
    AlreadyLoaded,
}

#[derive(Debug, Deserialize)]
struct Document {
    log: LogSection,
    server: ServerSection,
}

#[derive(Debug, Deserialize)]
struct LogSection {
    log_level: Option<String>,
    log_file_name: Option<String>,
    log_file_path: Option<String>,
    log_max_file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    ip: Option<String>,
    port: Option<u16>,
    io_threads: Option<usize>,
}

/// An immutable, fully-resolved configuration snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevel,
    pub log_file_name: String,
    pub log_file_path: String,
    pub log_max_file_size: u64,
    pub server_ip: String,
    pub server_port: u16,
    pub server_io_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_file_name: "rapidrpc".to_string(),
            log_file_path: "./log/".to_string(),
            log_max_file_size: 100 * 1024 * 1024,
            server_ip: "127.0.0.1".to_string(),
            server_port: 8080,
            server_io_threads: 4,
        }
    }
}

impl Config {
    /// Parses `contents` as a configuration document, filling in defaults for any
    /// field the document omits. An unrecognized `log_level` value defaults to `INFO`
    /// rather than being treated as a parse error.
    fn from_xml(contents: &str) -> Result<Self, quick_xml::DeError> {
        let document: Document = quick_xml::de::from_str(contents)?;
        let defaults = Config::default();

        Ok(Config {
            log_level: document
                .log
                .log_level
                .as_deref()
                .map(LogLevel::from_str_lenient)
                .unwrap_or(defaults.log_level),
            log_file_name: document.log.log_file_name.unwrap_or(defaults.log_file_name),
            log_file_path: document.log.log_file_path.unwrap_or(defaults.log_file_path),
            log_max_file_size: document.log.log_max_file_size.unwrap_or(defaults.log_max_file_size),
            server_ip: document.server.ip.unwrap_or(defaults.server_ip),
            server_port: document.server.port.unwrap_or(defaults.server_port),
            server_io_threads: document.server.io_threads.unwrap_or(defaults.server_io_threads),
        })
    }

    /// Loads configuration from `path`. Intended to run once, before any worker
    /// thread starts.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_xml(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

static GLOBAL: OnceLock<Config> = OnceLock::new();

/// Installs `config` as the process-wide snapshot. Must be called at most once, before
/// any worker thread starts; a second call fails rather than silently replacing the
/// snapshot underneath threads that may already hold a reference to it.
pub fn set_global(config: Config) -> Result<(), ConfigError> {
    GLOBAL.set(config).map_err(|_| ConfigError::AlreadyLoaded)
}

/// The process-wide snapshot installed by [`set_global`]. Lock-free once installed.
///
/// # Panics
/// Panics if called before [`set_global`] — there is no sensible fallback for a
/// component that needs configuration before any has been loaded.
pub fn global() -> &'static Config {
    GLOBAL.get().expect("config::set_global was never called")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <root>
          <log>
            <log_level>DEBUG</log_level>
            <log_file_name>test</log_file_name>
            <log_file_path>/tmp/</log_file_path>
            <log_max_file_size>1024</log_max_file_size>
          </log>
          <server>
            <ip>0.0.0.0</ip>
            <port>9000</port>
            <io_threads>8</io_threads>
          </server>
        </root>
    "#;

    #[test]
    fn parses_fully_specified_document() {
        let config = Config::from_xml(SAMPLE).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_file_name, "test");
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.server_io_threads, 8);
    }

    #[test]
    fn unrecognized_log_level_defaults_to_info() {
        let doc = r#"
            <root>
              <log><log_level>VERBOSE</log_level></log>
              <server><port>8080</port></server>
            </root>
        "#;
        let config = Config::from_xml(doc).unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let doc = r#"
            <root>
              <log></log>
              <server></server>
            </root>
        "#;
        let config = Config::from_xml(doc).unwrap();
        let defaults = Config::default();
        assert_eq!(config.server_ip, defaults.server_ip);
        assert_eq!(config.log_max_file_size, defaults.log_max_file_size);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        assert!(Config::from_xml("<root><log>").is_err());
    }
}
