//! Storage key constants.

/// Keys of the persisted client session. All values are string-encoded.
pub struct StorageKeys;

impl StorageKeys {
    /// Opaque bearer token issued at login
    pub const TOKEN: &'static str = "token";

    /// Numeric id of the logged-in user
    pub const USER_ID: &'static str = "user_id";

    /// Username entered at login
    pub const USERNAME: &'static str = "username";

    /// Numeric id of the peer whose conversation was last open
    pub const SELECTED_USER_ID: &'static str = "selected_user_id";

    /// Every session key, cleared together on logout.
    pub const ALL: [&'static str; 4] = [
        Self::TOKEN,
        Self::USER_ID,
        Self::USERNAME,
        Self::SELECTED_USER_ID,
    ];
}
