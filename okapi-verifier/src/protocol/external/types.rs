//! Newtypes for the verifier frame header fields.

use std::fmt;

/// A magic number identifying verifier protocol frames.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Magic(pub [u8; 4]);

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Magic").field(&hex::encode(self.0)).finish()
    }
}

/// A verifier wire protocol version number.
///
/// Every frame header is tagged with the sender's version; receivers accept
/// the range given in [`crate::constants`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Version(pub u32);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;

    #[test]
    fn magic_debug() {
        assert_eq!(
            format!("{:?}", constants::PROTOCOL_MAGIC),
            r#"Magic("6f6b7670")"#
        );
    }
}
