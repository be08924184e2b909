//! Configuration for verifier supervision.

use std::{collections::BTreeSet, path::PathBuf};

use serde::{Deserialize, Serialize};

/// The transport carrying verifier sessions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// A TCP listener bound to an ephemeral localhost port.
    Tcp,

    /// A unix domain socket inside a fresh owner-only temporary directory.
    #[cfg(unix)]
    Unix,
}

/// Configuration for the supervised verifier process.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The verifier executable to launch.
    ///
    /// Can be a bare program name, resolved through `PATH`, or an absolute
    /// path.
    pub verifier_path: PathBuf,

    /// The node base directory.
    ///
    /// The verifier process runs with this directory as its working
    /// directory, and its output is appended to log files under
    /// `logs/` inside it.
    pub base_dir: PathBuf,

    /// The transport used to carry verifier sessions.
    ///
    /// Both transports are loopback-only; the verifier is always a child
    /// process on the same machine.
    pub transport: TransportKind,

    /// The log level handed to the verifier process on its command line.
    pub verifier_log_level: String,

    /// Fully-qualified names of custom serializers the verifier must
    /// register before verifying.
    pub custom_serializers: BTreeSet<String>,

    /// Fully-qualified names making up the serialization whitelist.
    pub serialization_whitelist: BTreeSet<String>,

    /// An alternative serialization scheme for the verifier to install, if
    /// any.
    pub custom_serialization_scheme: Option<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            verifier_path: "okapi-verifier-sandbox".into(),
            base_dir: ".".into(),
            #[cfg(unix)]
            transport: TransportKind::Unix,
            #[cfg(not(unix))]
            transport: TransportKind::Tcp,
            verifier_log_level: "info".to_string(),
            custom_serializers: BTreeSet::new(),
            serialization_whitelist: BTreeSet::new(),
            custom_serialization_scheme: None,
        }
    }
}
