//! Definitions of constants.

use crate::protocol::external::types::{Magic, Version};

/// The maximum number of verification attempts per `verify` call.
///
/// Each attempt may launch a fresh sandbox process if the previous session
/// died. Transient faults (process crashes, socket errors, protocol
/// violations) are absorbed up to this budget; exhausting it surfaces the
/// last fault to the caller.
pub const MAX_VERIFY_ATTEMPTS: u32 = 5;

/// The magic bytes identifying verifier protocol frames.
pub const PROTOCOL_MAGIC: Magic = Magic(*b"okvp");

/// The current version of the verifier wire protocol.
pub const CURRENT_WIRE_VERSION: Version = Version(1);

/// The oldest wire version this node still accepts from a verifier.
///
/// Frames tagged outside `MIN_WIRE_VERSION..=CURRENT_WIRE_VERSION` are
/// protocol faults and end the session.
pub const MIN_WIRE_VERSION: Version = Version(1);

/// The directory under the node base dir receiving verifier process logs.
pub const LOG_DIR: &str = "logs";

/// The log file receiving the verifier process's standard output.
///
/// Opened in append mode, so output accumulates across restarts.
pub const STDOUT_LOG_FILE: &str = "verifier-stdout.log";

/// The log file receiving the verifier process's standard error.
///
/// Opened in append mode, so output accumulates across restarts.
pub const STDERR_LOG_FILE: &str = "verifier-stderr.log";

/// The socket file name used by the unix transport, created inside a fresh
/// owner-only temporary directory.
pub const SOCKET_FILE: &str = "verifier.sock";

#[cfg(test)]
mod tests {
    use super::*;

    /// Make sure the attempt budget and version range stay consistent.
    #[test]
    fn sanity_check() {
        assert!(MAX_VERIFY_ATTEMPTS >= 1, "at least one attempt must run");
        assert!(
            MIN_WIRE_VERSION <= CURRENT_WIRE_VERSION,
            "accepted version range must contain the current version"
        );
    }
}
