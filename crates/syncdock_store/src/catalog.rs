//! The fixed query catalog.
//!
//! Every query this layer runs against the store is declared here, at
//! compile time. Keys come in pairs: a data key selecting whole documents
//! and a meta/id key selecting only document identifiers. Meta/id keys
//! carry `listen: false` and get no change listener by default.

/// Identity of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Private user profile documents.
    PrivateProfile,
    /// Identifiers of private user profile documents.
    PrivateProfileMetaId,
    /// User license documents.
    UserLicense,
    /// Identifiers of user license documents.
    UserLicenseMetaId,
    /// User settings documents.
    UserSettings,
    /// Identifiers of user settings documents.
    UserSettingsMetaId,
    /// Public user profile documents.
    UserProfile,
    /// Identifiers of public user profile documents.
    UserProfileMetaId,
}

impl QueryKey {
    /// Returns true for meta/id keys (identifier-only queries).
    #[must_use]
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            Self::PrivateProfileMetaId
                | Self::UserLicenseMetaId
                | Self::UserSettingsMetaId
                | Self::UserProfileMetaId
        )
    }

    /// Looks up this key's catalog definition.
    #[must_use]
    pub fn definition(&self) -> &'static QueryDef {
        let index = match self {
            Self::PrivateProfile => 0,
            Self::PrivateProfileMetaId => 1,
            Self::UserLicense => 2,
            Self::UserLicenseMetaId => 3,
            Self::UserSettings => 4,
            Self::UserSettingsMetaId => 5,
            Self::UserProfile => 6,
            Self::UserProfileMetaId => 7,
        };
        &CATALOG[index]
    }
}

/// One catalog entry: key, query source and listener policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDef {
    /// Entry identity.
    pub key: QueryKey,
    /// Declarative query text compiled against the open store.
    pub source: &'static str,
    /// Whether a change listener is registered at creation.
    pub listen: bool,
}

/// The full catalog, in creation order.
pub const CATALOG: &[QueryDef] = &[
    QueryDef {
        key: QueryKey::PrivateProfile,
        source: "SELECT * FROM _ WHERE type='userprofile_private'",
        listen: true,
    },
    QueryDef {
        key: QueryKey::PrivateProfileMetaId,
        source: "SELECT meta().id FROM _ WHERE type='userprofile_private'",
        listen: false,
    },
    QueryDef {
        key: QueryKey::UserLicense,
        source: "SELECT * FROM _ WHERE type='user_license'",
        listen: true,
    },
    QueryDef {
        key: QueryKey::UserLicenseMetaId,
        source: "SELECT meta().id FROM _ WHERE type='user_license'",
        listen: false,
    },
    QueryDef {
        key: QueryKey::UserSettings,
        source: "SELECT * FROM _ WHERE type='usersettings'",
        listen: true,
    },
    QueryDef {
        key: QueryKey::UserSettingsMetaId,
        source: "SELECT meta().id FROM _ WHERE type='usersettings'",
        listen: false,
    },
    QueryDef {
        key: QueryKey::UserProfile,
        source: "SELECT * FROM _ WHERE type='userprofile'",
        listen: true,
    },
    QueryDef {
        key: QueryKey::UserProfileMetaId,
        source: "SELECT meta().id FROM _ WHERE type='userprofile'",
        listen: false,
    },
];
