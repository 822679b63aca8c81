//! # Bridge Constants
//!
//! Names of the host functions exposed to scripts and the sentinel values
//! they accept.

/// Host function names as seen by the script caller
pub mod functions {
    pub const QUIT: &str = "quit";
    pub const CLOSE_ALL_WINDOWS: &str = "closeAllWindows";
    pub const GET_ARGV_SYNC: &str = "getArgvSync";
    pub const CLEAR_APP_CACHE: &str = "clearAppCache";
    pub const CLEAR_CACHE: &str = "clearCache";
    pub const SET_PROXY_CONFIG: &str = "setProxyConfig";
    pub const GET_DATA_PATH: &str = "getDataPath";
    pub const CRASH_BROWSER: &str = "crashBrowser";

    pub const ALL: &[&str] = &[
        QUIT,
        CLOSE_ALL_WINDOWS,
        GET_ARGV_SYNC,
        CLEAR_APP_CACHE,
        CLEAR_CACHE,
        SET_PROXY_CONFIG,
        GET_DATA_PATH,
        CRASH_BROWSER,
    ];
}

/// Sentinel values for the `pac_url` argument of `setProxyConfig`
pub mod pac {
    /// Connect directly, ignoring any rules
    pub const DIRECT: &str = "<direct>";
    /// Auto-detect proxy settings
    pub const AUTO: &str = "<auto>";
}

/// Default ports by proxy scheme
pub mod ports {
    pub const HTTP: u16 = 80;
    pub const HTTPS: u16 = 443;
    pub const SOCKS: u16 = 1080;
}

pub mod system {
    pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Environment variable prefix for configuration overrides
    pub const CONFIG_ENV_PREFIX: &str = "HOST_BRIDGE";

    /// Base name of configuration files (`host-bridge.toml`)
    pub const CONFIG_FILE_STEM: &str = "host-bridge";
}
