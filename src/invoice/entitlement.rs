use serde::{Deserialize, Serialize};

/// Whether a download can be served without payment.
///
/// Premium accounts are never counted; everyone else gets `downloads_limit`
/// free documents.
pub fn can_download_free(downloads_used: u32, downloads_limit: u32, is_premium: bool) -> bool {
    is_premium || downloads_used < downloads_limit
}

/// Free download allowances, read from `[entitlements]` in config.toml.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadPolicy {
    #[serde(default = "default_guest_limit")]
    pub guest_limit: u32,
    #[serde(default = "default_member_limit")]
    pub member_limit: u32,
}

fn default_guest_limit() -> u32 {
    1
}

fn default_member_limit() -> u32 {
    2
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            guest_limit: default_guest_limit(),
            member_limit: default_member_limit(),
        }
    }
}

impl DownloadPolicy {
    pub fn limit_for(&self, signed_in: bool) -> u32 {
        if signed_in {
            self.member_limit
        } else {
            self.guest_limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_gates_non_premium() {
        assert!(can_download_free(0, 1, false));
        assert!(!can_download_free(1, 1, false));
        assert!(can_download_free(1, 2, false));
        assert!(!can_download_free(2, 2, false));
    }

    #[test]
    fn premium_overrides_counter() {
        assert!(can_download_free(5, 1, true));
        assert!(can_download_free(0, 0, true));
    }

    #[test]
    fn limits_depend_on_sign_in() {
        let policy = DownloadPolicy::default();
        assert_eq!(policy.limit_for(false), 1);
        assert_eq!(policy.limit_for(true), 2);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let policy: DownloadPolicy = toml::from_str("member_limit = 5").unwrap();
        assert_eq!(policy.guest_limit, 1);
        assert_eq!(policy.member_limit, 5);
    }
}
