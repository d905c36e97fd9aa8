// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Layout versioning
//!
//! Each message kind describes its wire layout history in one
//! [`MessageSchema`] constant. Adding an optional trailing field means adding a
//! [`Revision`] and bumping `head_version`; `compat_version` only moves when a
//! mandatory field is removed or reordered.
//!
//! ```text
//!   sender                                  receiver (local head H)
//!   ──────                                  ───────────────────────
//!   negotiate(dest features) -> v           compat > H  => UnsupportedVersion
//!   envelope(head = v, compat = C)          otherwise read layout min(v, H),
//!   payload fields of revisions <= v        skip whatever follows
//! ```

use tracing::debug;

use crate::features::FeatureSet;

/// Layout version number as carried in the envelope
pub type Version = u16;

/// One step in a message kind's layout history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    /// Layout version this revision introduces
    pub version: Version,
    /// Destination features needed before the sender may use this layout
    pub requires: FeatureSet,
}

impl Revision {
    pub const fn new(version: Version, requires: FeatureSet) -> Self {
        Self { version, requires }
    }
}

/// Static description of a message kind's versioned layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSchema {
    /// Stable type name, also used when rendering messages
    pub name: &'static str,
    /// Newest layout this build writes and reads
    pub head_version: Version,
    /// Oldest layout whose decoder can still read the mandatory fields
    pub compat_version: Version,
    /// Known layouts in ascending order
    pub revisions: &'static [Revision],
}

impl MessageSchema {
    /// Highest compat_version a receiver built with this schema can honour
    pub const fn max_supported_compat(&self) -> Version {
        self.head_version
    }

    /// Choose the layout to encode with
    ///
    /// Without destination information the native head layout is used and
    /// older peers rely on `compat_version` to skip trailing fields. With a
    /// known destination the newest revision it can parse wins, never going
    /// below `compat_version`.
    pub fn negotiate(&self, destination: Option<FeatureSet>) -> Version {
        let Some(features) = destination else {
            return self.head_version;
        };

        let chosen = self
            .revisions
            .iter()
            .filter(|rev| rev.version >= self.compat_version && rev.version <= self.head_version)
            .filter(|rev| features.contains(rev.requires))
            .map(|rev| rev.version)
            .max()
            .unwrap_or(self.compat_version);

        if chosen < self.head_version {
            debug!(
                kind = self.name,
                head = self.head_version,
                chosen,
                %features,
                "Downgrading layout for destination"
            );
        }
        chosen
    }

    /// Whether a message with this compat_version can be read at all
    pub fn accepts(&self, compat_version: Version) -> bool {
        compat_version <= self.max_supported_compat()
    }

    /// Layout to read for a message the sender wrote at `head_version`
    pub fn layout_for(&self, head_version: Version) -> Version {
        head_version.min(self.head_version)
    }

    /// Check that the declaration is internally consistent
    pub fn is_well_formed(&self) -> bool {
        let ascending = self.revisions.windows(2).all(|w| w[0].version < w[1].version);
        let has_head = self.revisions.iter().any(|r| r.version == self.head_version);
        let baseline_free = self
            .revisions
            .iter()
            .find(|r| r.version == self.compat_version)
            .map(|r| r.requires.is_empty())
            .unwrap_or(false);
        self.compat_version <= self.head_version && ascending && has_head && baseline_free
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENDED: FeatureSet = FeatureSet::from_bits(1 << 40);
    const WIDE: FeatureSet = FeatureSet::from_bits(1 << 41);

    const SCHEMA: MessageSchema = MessageSchema {
        name: "probe",
        head_version: 3,
        compat_version: 1,
        revisions: &[
            Revision::new(1, FeatureSet::EMPTY),
            Revision::new(2, EXTENDED),
            Revision::new(3, EXTENDED.union(WIDE)),
        ],
    };

    #[test]
    fn test_negotiate_without_destination_uses_head() {
        assert_eq!(SCHEMA.negotiate(None), 3);
    }

    #[test]
    fn test_negotiate_downgrades_for_older_peers() {
        assert_eq!(SCHEMA.negotiate(Some(FeatureSet::EMPTY)), 1);
        assert_eq!(SCHEMA.negotiate(Some(EXTENDED)), 2);
        assert_eq!(SCHEMA.negotiate(Some(WIDE)), 1);
        assert_eq!(SCHEMA.negotiate(Some(EXTENDED | WIDE)), 3);
    }

    #[test]
    fn test_negotiate_never_below_compat() {
        const BUMPED: MessageSchema = MessageSchema {
            name: "probe",
            head_version: 3,
            compat_version: 2,
            revisions: &[
                Revision::new(1, FeatureSet::EMPTY),
                Revision::new(2, FeatureSet::EMPTY),
                Revision::new(3, EXTENDED),
            ],
        };
        assert_eq!(BUMPED.negotiate(Some(FeatureSet::EMPTY)), 2);
        assert!(BUMPED.is_well_formed());
    }

    #[test]
    fn test_accepts_and_layout() {
        assert!(SCHEMA.accepts(1));
        assert!(SCHEMA.accepts(3));
        assert!(!SCHEMA.accepts(4));
        assert_eq!(SCHEMA.layout_for(1), 1);
        assert_eq!(SCHEMA.layout_for(9), 3);
    }

    #[test]
    fn test_well_formed() {
        assert!(SCHEMA.is_well_formed());

        const MISSING_HEAD: MessageSchema = MessageSchema {
            name: "probe",
            head_version: 2,
            compat_version: 1,
            revisions: &[Revision::new(1, FeatureSet::EMPTY)],
        };
        assert!(!MISSING_HEAD.is_well_formed());

        const GATED_BASELINE: MessageSchema = MessageSchema {
            name: "probe",
            head_version: 1,
            compat_version: 1,
            revisions: &[Revision::new(1, EXTENDED)],
        };
        assert!(!GATED_BASELINE.is_well_formed());
    }
}
