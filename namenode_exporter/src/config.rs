//! This module controls configuration parsing from the end user. The
//! configuration is read once at startup; an invalid configuration stops the
//! program before anything is bound or fetched.
use std::{net::SocketAddr, path::PathBuf, time::Duration};

use reqwest::Url;
use serde::Deserialize;

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// The JMX URL is not an absolute http or https URL.
    #[error("Invalid JMX URL {url:?}: {reason}")]
    JmxUrl {
        /// The URL as given
        url: String,
        /// Why it was rejected
        reason: String,
    },
    /// The JMX timeout is zero.
    #[error("JMX timeout must be greater than zero")]
    ZeroTimeout,
    /// The telemetry path is unusable.
    #[error("Telemetry path {0:?} must start with '/' and not be '/'")]
    TelemetryPath(String),
    /// The concurrency limit is zero.
    #[error("concurrent_requests_max must be greater than zero")]
    ZeroConcurrency,
}

fn default_jmx_url() -> String {
    "http://localhost:50070/jmx".to_string()
}

fn default_jmx_timeout_milliseconds() -> u64 {
    5_000
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9779))
}

fn default_telemetry_path() -> String {
    "/metrics".to_string()
}

fn default_concurrent_requests_max() -> usize {
    100
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// URL of the NameNode JMX servlet
    #[serde(default = "default_jmx_url")]
    pub jmx_url: String,
    /// Upper bound on a single fetch of the JMX servlet
    #[serde(default = "default_jmx_timeout_milliseconds")]
    pub jmx_timeout_milliseconds: u64,
    /// NameNode PID file, enables process metrics when set
    #[serde(default)]
    pub pid_file: Option<PathBuf>,
    /// Address -- IP plus port -- to serve metrics on
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,
    /// Path under which metrics are exposed
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,
    /// Number of concurrent HTTP connections to allow
    #[serde(default = "default_concurrent_requests_max")]
    pub concurrent_requests_max: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jmx_url: default_jmx_url(),
            jmx_timeout_milliseconds: default_jmx_timeout_milliseconds(),
            pid_file: None,
            listen_address: default_listen_address(),
            telemetry_path: default_telemetry_path(),
            concurrent_requests_max: default_concurrent_requests_max(),
        }
    }
}

impl Config {
    /// Parse a YAML document. Absent fields take their defaults.
    ///
    /// # Errors
    ///
    /// Function will return an error if the document is not valid YAML or
    /// names a field this program does not know.
    pub fn from_yaml(contents: &str) -> Result<Self, Error> {
        // An empty document deserializes to unit, not to a mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Check every field for values the program cannot run with.
    ///
    /// # Errors
    ///
    /// Function will return the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        self.jmx_url()?;
        if self.jmx_timeout_milliseconds == 0 {
            return Err(Error::ZeroTimeout);
        }
        if !self.telemetry_path.starts_with('/') || self.telemetry_path == "/" {
            return Err(Error::TelemetryPath(self.telemetry_path.clone()));
        }
        if self.concurrent_requests_max == 0 {
            return Err(Error::ZeroConcurrency);
        }
        Ok(())
    }

    /// The JMX URL, parsed.
    ///
    /// # Errors
    ///
    /// Function will return an error if the URL does not parse or its scheme
    /// is neither http nor https.
    pub fn jmx_url(&self) -> Result<Url, Error> {
        let url = Url::parse(&self.jmx_url).map_err(|err| Error::JmxUrl {
            url: self.jmx_url.clone(),
            reason: err.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(Error::JmxUrl {
                url: self.jmx_url.clone(),
                reason: format!("unsupported scheme {scheme}"),
            }),
        }
    }

    /// The JMX timeout as a [`Duration`].
    #[must_use]
    pub fn jmx_timeout(&self) -> Duration {
        Duration::from_millis(self.jmx_timeout_milliseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = Config::from_yaml("").expect("empty config should parse");
        assert_eq!(config, Config::default());
        config.validate().expect("defaults should be valid");
        assert_eq!(
            config.jmx_url().expect("default url").as_str(),
            "http://localhost:50070/jmx"
        );
        assert_eq!(config.jmx_timeout(), Duration::from_secs(5));
        assert_eq!(config.listen_address.port(), 9779);
    }

    #[test]
    fn config_deserializes() {
        let contents = r#"
jmx_url: "https://nn.example.com:9871/jmx"
jmx_timeout_milliseconds: 250
pid_file: "/var/run/hadoop/namenode.pid"
listen_address: "127.0.0.1:9100"
telemetry_path: "/prom"
concurrent_requests_max: 4
"#;
        let config = Config::from_yaml(contents).expect("config should parse");
        assert_eq!(
            config,
            Config {
                jmx_url: "https://nn.example.com:9871/jmx".to_string(),
                jmx_timeout_milliseconds: 250,
                pid_file: Some(PathBuf::from("/var/run/hadoop/namenode.pid")),
                listen_address: "127.0.0.1:9100".parse().expect("addr"),
                telemetry_path: "/prom".to_string(),
                concurrent_requests_max: 4,
            }
        );
        config.validate().expect("config should be valid");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result = Config::from_yaml("jmx_uri: http://localhost:50070/jmx\n");
        assert!(matches!(result, Err(Error::SerdeYaml(_))));
    }

    #[test]
    fn bad_values_fail_validation() {
        let cases = [
            (
                Config {
                    jmx_url: "localhost:50070/jmx".to_string(),
                    ..Config::default()
                },
                "url",
            ),
            (
                Config {
                    jmx_url: "ftp://localhost/jmx".to_string(),
                    ..Config::default()
                },
                "url",
            ),
            (
                Config {
                    jmx_timeout_milliseconds: 0,
                    ..Config::default()
                },
                "timeout",
            ),
            (
                Config {
                    telemetry_path: "/".to_string(),
                    ..Config::default()
                },
                "path",
            ),
            (
                Config {
                    telemetry_path: "metrics".to_string(),
                    ..Config::default()
                },
                "path",
            ),
            (
                Config {
                    concurrent_requests_max: 0,
                    ..Config::default()
                },
                "concurrency",
            ),
        ];
        for (config, what) in cases {
            let err = config.validate().expect_err(what);
            match (what, err) {
                ("url", Error::JmxUrl { .. })
                | ("timeout", Error::ZeroTimeout)
                | ("path", Error::TelemetryPath(_))
                | ("concurrency", Error::ZeroConcurrency) => {}
                (what, err) => panic!("{what}: unexpected error {err}"),
            }
        }
    }
}
