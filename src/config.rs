//! Configuration for the analysis engine.
//!
//! This module provides [`AnalysisConfig`], which controls iteration caps, the
//! size of the worker pool, scope exclusions, match-all filtering and the
//! model-specific value rewrites applied before matching.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Patterns that match so broadly that an alternative containing one of them is
/// treated as matching everything.
pub const DEFAULT_NOISY_PATTERNS: &[&str] = &[
    "/lib64/.*",
    "/proc/.*",
    "/lib/.*",
    "/acct/uid_",
    r"|.*\d+|",
    r"(?:.*\d+|",
    r"|.*\d+)",
];

/// Default values of environment variables and system properties.
pub const DEFAULT_ENV_VALUES: &[(&str, &str)] = &[
    ("ANDROID_ROOT", "/system"),
    ("ANDROID_DATA", "/data"),
    ("ANDROID_EXPAND", "/mnt/expand"),
    ("ANDROID_STORAGE", "/storage"),
    ("DOWNLOAD_CACHE", "/data/cache"),
    ("OEM_ROOT", "/oem"),
    ("ODM_ROOT", "/odm"),
    ("VENDOR_ROOT", "/vendor"),
    ("PRODUCT_ROOT", "/product"),
    ("EXTERNAL_STORAGE", "/sdcard"),
    ("PRODUCT_SERVICES_ROOT", "/product_services"),
    ("dalvik.vm.stack-trace-dir", "/data/anr"),
    ("ro.boot.product.hardware.sku", "G020G"),
];

/// Methods whose return value is a user id.
pub const DEFAULT_USER_ID_METHODS: &[&str] = &[
    "<android.os.UserHandle: int myUserId()>",
    "<android.os.UserHandle: int getCallingUserId()>",
    "<android.os.UserHandle: int getUserId(int)>",
    "<android.app.ActivityManager: int getCurrentUser()>",
    "<com.samsung.android.knox.sdp.SdpUtil: int extractAndroidDefaultUserId(java.lang.String)>",
];

/// Fields holding a user id.
pub const DEFAULT_USER_ID_FIELDS: &[&str] = &[
    "<com.android.server.accounts.AccountManagerService$UserAccounts: int userId>",
    "<com.android.server.backup.UserBackupManagerService: int mUserId>",
    "<com.android.server.devicepolicy.Owners: int mDeviceOwnerUserId>",
    "<com.android.server.inputmethod.InputMethodUtils$InputMethodSettings: int mCurrentUserId>",
    "<com.android.server.pm.PackageInstallerSession: int userId>",
    "<com.android.server.tv.TvInputManagerService: int mCurrentUserId>",
    "<com.android.server.tv.TvInputManagerService$ServiceCallback: int mUserId>",
    "<com.android.server.tv.TvInputManagerService$SessionState: int userId>",
    "<com.android.server.wallpaper.WallpaperManagerService$WallpaperData: int userId>",
    "<com.android.server.wm.WindowManagerService: int mCurrentUserId>",
    "<com.samsung.android.knox.sdp.core.SdpEngineInfo: int mId>",
];

fn owned_set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Configuration for the analysis engine.
///
/// Every field has a default, so a partial JSON document deserializes into a
/// complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Cap on the outer loop of cycle collapsing, on simplifier rounds and on
    /// DNF rounds (default: 100). Exceeding it drops the affected seed.
    pub max_iterations: usize,

    /// Number of worker threads; 0 uses the rayon default (default: 0).
    pub worker_threads: usize,

    /// Cap on the number of rows a DNF conversion may produce (default: 10 000).
    pub max_alternatives: usize,

    /// Methods removed from every entry point's scope.
    pub excluded_methods: BTreeSet<String>,

    /// Seeds whose source method is listed here are moved to the removed bucket
    /// instead of being matched.
    pub excluded_seed_methods: BTreeSet<String>,

    /// Regex fragments that mark an alternative as match-all.
    pub noisy_patterns: Vec<String>,

    /// Values substituted for environment variables and system properties.
    pub env_defaults: BTreeMap<String, String>,

    /// Known constant values of fields, keyed by field signature.
    pub known_field_values: BTreeMap<String, String>,

    /// Known constant return values of methods, keyed by method signature.
    pub known_method_values: BTreeMap<String, String>,

    /// Replace user ids with `0` before matching (default: true).
    pub assume_single_user: bool,

    /// Methods whose return value is a user id.
    pub user_id_methods: BTreeSet<String>,

    /// Fields holding a user id.
    pub user_id_fields: BTreeSet<String>,

    /// Owner names (user or group) whose files count as privileged
    /// (default: `{"system"}`).
    pub privileged_principals: BTreeSet<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            worker_threads: 0,
            max_alternatives: 10_000,
            excluded_methods: BTreeSet::new(),
            excluded_seed_methods: BTreeSet::new(),
            noisy_patterns: DEFAULT_NOISY_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            env_defaults: DEFAULT_ENV_VALUES
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            known_field_values: BTreeMap::new(),
            known_method_values: BTreeMap::new(),
            assume_single_user: true,
            user_id_methods: owned_set(DEFAULT_USER_ID_METHODS),
            user_id_fields: owned_set(DEFAULT_USER_ID_FIELDS),
            privileged_principals: owned_set(&["system"]),
        }
    }
}

impl AnalysisConfig {
    /// Creates a new configuration with default settings.
    ///
    /// # Returns
    ///
    /// A new `AnalysisConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a "minimal" configuration for quick runs over small inputs.
    ///
    /// This configuration uses:
    /// - Fewer iterations (20 max)
    /// - At most 1 000 DNF rows per seed
    /// - A single worker thread
    ///
    /// # Returns
    ///
    /// A new `AnalysisConfig` optimized for speed over completeness.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            max_iterations: 20,
            max_alternatives: 1_000,
            worker_threads: 1,
            ..Self::default()
        }
    }

    /// Creates a "thorough" configuration for large call graphs.
    ///
    /// This configuration uses:
    /// - More iterations (500 max)
    /// - Up to 100 000 DNF rows per seed
    ///
    /// # Returns
    ///
    /// A new `AnalysisConfig` optimized for completeness over speed.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            max_iterations: 500,
            max_alternatives: 100_000,
            ..Self::default()
        }
    }

    /// Sets the iteration cap.
    ///
    /// # Arguments
    ///
    /// * `max` - The maximum number of fixpoint rounds.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Sets the number of worker threads.
    ///
    /// # Arguments
    ///
    /// * `threads` - The pool size; 0 uses the rayon default.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Sets the DNF row cap.
    #[must_use]
    pub fn with_max_alternatives(mut self, max: usize) -> Self {
        self.max_alternatives = max;
        self
    }

    /// Adds a method to exclude from every entry point's scope.
    #[must_use]
    pub fn exclude_method(mut self, method: impl Into<String>) -> Self {
        self.excluded_methods.insert(method.into());
        self
    }

    /// Adds a seed source method whose seeds are not matched.
    #[must_use]
    pub fn exclude_seed_method(mut self, method: impl Into<String>) -> Self {
        self.excluded_seed_methods.insert(method.into());
        self
    }

    /// Adds a privileged owner name.
    #[must_use]
    pub fn with_privileged_principal(mut self, name: impl Into<String>) -> Self {
        self.privileged_principals.insert(name.into());
        self
    }

    /// Enables or disables the single-user assumption.
    #[must_use]
    pub fn with_single_user(mut self, enable: bool) -> Self {
        self.assume_single_user = enable;
        self
    }

    /// Returns the number of workers the pool will run, resolving 0 to the
    /// rayon default.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.worker_threads == 0 {
            rayon::current_num_threads()
        } else {
            self.worker_threads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.max_alternatives, 10_000);
        assert_eq!(config.worker_threads, 0);
        assert!(config.assume_single_user);
        assert!(config.privileged_principals.contains("system"));
        assert_eq!(config.env_defaults["ANDROID_DATA"], "/data");
        assert!(config
            .user_id_methods
            .contains("<android.os.UserHandle: int myUserId()>"));
        assert!(!config.noisy_patterns.iter().any(|p| p == "/data/system/.*"));
    }

    #[test]
    fn test_presets() {
        assert_eq!(AnalysisConfig::minimal().max_iterations, 20);
        assert_eq!(AnalysisConfig::minimal().worker_threads, 1);
        assert_eq!(AnalysisConfig::thorough().max_alternatives, 100_000);
        assert_eq!(AnalysisConfig::new(), AnalysisConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = AnalysisConfig::new()
            .with_max_iterations(7)
            .with_worker_threads(3)
            .exclude_method("<A: void x()>")
            .with_single_user(false);
        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.effective_workers(), 3);
        assert!(config.excluded_methods.contains("<A: void x()>"));
        assert!(!config.assume_single_user);
    }

    #[test]
    fn test_partial_json() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"max_iterations": 5, "privileged_principals": ["root"]}"#)
                .unwrap();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.max_alternatives, 10_000);
        assert!(config.privileged_principals.contains("root"));
        assert!(!config.privileged_principals.contains("system"));
    }
}
