//! WiFi credential selection.
//!
//! The radio side lives in the firmware binary; this only decides which
//! authentication mode the station uses.

/// Credentials the station joins with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiCredentials<'a> {
    /// WPA2-Personal, one shared key
    Personal { ssid: &'a str, password: &'a str },
    /// WPA2-Enterprise, per-user login
    Enterprise {
        ssid: &'a str,
        username: &'a str,
        password: &'a str,
    },
}

impl<'a> WifiCredentials<'a> {
    /// Pick enterprise authentication only when both username and password
    /// are configured, otherwise fall back to the pre-shared key.
    pub fn select(
        ssid: &'a str,
        psk: &'a str,
        enterprise_username: &'a str,
        enterprise_password: &'a str,
    ) -> Self {
        if !enterprise_username.is_empty() && !enterprise_password.is_empty() {
            Self::Enterprise {
                ssid,
                username: enterprise_username,
                password: enterprise_password,
            }
        } else {
            Self::Personal {
                ssid,
                password: psk,
            }
        }
    }

    pub fn ssid(&self) -> &'a str {
        match self {
            Self::Personal { ssid, .. } | Self::Enterprise { ssid, .. } => *ssid,
        }
    }

    pub fn is_enterprise(&self) -> bool {
        matches!(self, Self::Enterprise { .. })
    }
}
