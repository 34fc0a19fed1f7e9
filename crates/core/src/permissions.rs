//! Permission grants attached to an access token.

use serde::{Deserialize, Serialize};

/// What a peer holding an access token is allowed to do.
///
/// The three grants are independent booleans — `can_download` does not
/// imply `can_stream`, and neither implies `can_browse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Browse library metadata (albums, artists, covers).
    pub can_browse: bool,
    /// Stream individual tracks.
    pub can_stream: bool,
    /// Export album manifests and pull whole albums.
    pub can_download: bool,
}

impl Permissions {
    /// Grants given to a freshly redeemed invitation: browse and stream,
    /// but no bulk download until the owner explicitly allows it.
    pub fn default_for_new_peer() -> Self {
        Self {
            can_browse: true,
            can_stream: true,
            can_download: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_peer_cannot_download() {
        let p = Permissions::default_for_new_peer();
        assert!(p.can_browse);
        assert!(p.can_stream);
        assert!(!p.can_download);
    }
}
