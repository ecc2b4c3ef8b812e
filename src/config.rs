use std::path::Path;
use std::time::Duration;

use humantime::{format_duration, parse_duration};
use serde::Deserialize;
use serde_with::{DeserializeAs, serde_as};

use crate::Result;
use crate::error::ConfigError;

const MAX_ANIMATION_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub notify: NotifySettings,
    pub busy: BusySettings,
    pub confirm: ConfirmSettings,
    pub connectivity: ConnectivitySettings,
    pub adapter: AdapterSettings,
}

#[derive(Debug, Clone)]
pub struct NotifySettings {
    /// Auto-dismiss delay when the caller does not pass one.
    pub default_duration: Duration,
    /// Delay between attaching a toast and revealing it.
    pub enter_delay: Duration,
    /// Exit animation window before a dismissed toast is detached.
    pub exit_animation: Duration,
    pub region_id: String,
}

#[derive(Debug, Clone)]
pub struct BusySettings {
    pub default_label: String,
    pub overlay_id: String,
}

#[derive(Debug, Clone)]
pub struct ConfirmSettings {
    /// Delay between an affirmative click and removal of the dialog markup.
    pub removal_delay: Duration,
    /// Fade window of the built-in modal widget.
    pub fade: Duration,
    pub fallback_label: String,
}

#[derive(Debug, Clone)]
pub struct ConnectivitySettings {
    pub banner_message: String,
    pub offline_notice: String,
    pub online_notice: String,
    /// Emit the offline notification when the page loads already offline.
    pub notify_offline_at_load: bool,
}

#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Substring of a link target that marks it as a delete action.
    pub delete_path_marker: String,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            default_duration: default_notify_duration(),
            enter_delay: default_enter_delay(),
            exit_animation: default_exit_animation(),
            region_id: default_region_id(),
        }
    }
}

impl Default for BusySettings {
    fn default() -> Self {
        Self {
            default_label: default_busy_label(),
            overlay_id: default_overlay_id(),
        }
    }
}

impl Default for ConfirmSettings {
    fn default() -> Self {
        Self {
            removal_delay: default_exit_animation(),
            fade: default_exit_animation(),
            fallback_label: default_fallback_label(),
        }
    }
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            banner_message: default_banner_message(),
            offline_notice: default_offline_notice(),
            online_notice: default_online_notice(),
            notify_offline_at_load: false,
        }
    }
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            delete_path_marker: default_delete_marker(),
        }
    }
}

impl Config {
    /// Loads an optional TOML file, then `FEEDBACK__SECTION__KEY` variables,
    /// then a few flat legacy variables (`NOTIFY_DURATION`, `BUSY_LABEL`,
    /// `OFFLINE_NOTIFY_AT_LOAD`, `DELETE_PATH_MARKER`).
    ///
    /// # Errors
    ///
    /// Fails on unreadable or malformed sources and on values that do not
    /// pass validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        let path = path.as_ref();
        builder = builder.add_source(::config::File::from(path).required(false));
        builder = builder.add_source(
            ::config::Environment::with_prefix("FEEDBACK")
                .separator("__")
                .try_parsing(true),
        );

        let mut raw: RawConfig = builder
            .build()
            .map_err(|err| ConfigError::Other(err.to_string()))?
            .try_deserialize()
            .map_err(|err| ConfigError::Parse(err.to_string()))?;

        raw.apply_env_overrides()?;
        raw.validate_and_build()
    }

    /// Parses a TOML document without consulting the environment.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML and on values that do not pass validation.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let raw: RawConfig = ::config::Config::builder()
            .add_source(::config::File::from_str(source, ::config::FileFormat::Toml))
            .build()
            .map_err(|err| ConfigError::Other(err.to_string()))?
            .try_deserialize()
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        raw.validate_and_build()
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    notify: RawNotify,
    #[serde(default)]
    busy: RawBusy,
    #[serde(default)]
    confirm: RawConfirm,
    #[serde(default)]
    connectivity: RawConnectivity,
    #[serde(default)]
    adapter: RawAdapter,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawNotify {
    #[serde(default = "default_notify_duration")]
    #[serde_as(as = "HumantimeDuration")]
    duration: Duration,
    #[serde(default = "default_enter_delay")]
    #[serde_as(as = "HumantimeDuration")]
    enter_delay: Duration,
    #[serde(default = "default_exit_animation")]
    #[serde_as(as = "HumantimeDuration")]
    exit_animation: Duration,
    #[serde(default = "default_region_id")]
    region_id: String,
}

#[derive(Debug, Deserialize)]
struct RawBusy {
    #[serde(default = "default_busy_label")]
    label: String,
    #[serde(default = "default_overlay_id")]
    overlay_id: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawConfirm {
    #[serde(default = "default_exit_animation")]
    #[serde_as(as = "HumantimeDuration")]
    removal_delay: Duration,
    #[serde(default = "default_exit_animation")]
    #[serde_as(as = "HumantimeDuration")]
    fade: Duration,
    #[serde(default = "default_fallback_label")]
    fallback_label: String,
}

#[derive(Debug, Deserialize)]
struct RawConnectivity {
    #[serde(default = "default_banner_message")]
    banner_message: String,
    #[serde(default = "default_offline_notice")]
    offline_notice: String,
    #[serde(default = "default_online_notice")]
    online_notice: String,
    #[serde(default)]
    notify_offline_at_load: bool,
}

#[derive(Debug, Deserialize)]
struct RawAdapter {
    #[serde(default = "default_delete_marker")]
    delete_path_marker: String,
}

impl Default for RawNotify {
    fn default() -> Self {
        Self {
            duration: default_notify_duration(),
            enter_delay: default_enter_delay(),
            exit_animation: default_exit_animation(),
            region_id: default_region_id(),
        }
    }
}

impl Default for RawBusy {
    fn default() -> Self {
        Self {
            label: default_busy_label(),
            overlay_id: default_overlay_id(),
        }
    }
}

impl Default for RawConfirm {
    fn default() -> Self {
        Self {
            removal_delay: default_exit_animation(),
            fade: default_exit_animation(),
            fallback_label: default_fallback_label(),
        }
    }
}

impl Default for RawConnectivity {
    fn default() -> Self {
        Self {
            banner_message: default_banner_message(),
            offline_notice: default_offline_notice(),
            online_notice: default_online_notice(),
            notify_offline_at_load: false,
        }
    }
}

impl Default for RawAdapter {
    fn default() -> Self {
        Self {
            delete_path_marker: default_delete_marker(),
        }
    }
}

impl RawConfig {
    /// Flat variables kept for deployments that predate the sectioned
    /// `FEEDBACK__*` names.
    fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        if let Some(duration) = env_duration("NOTIFY_DURATION")? {
            self.notify.duration = duration;
        }
        if let Some(label) = env_string("BUSY_LABEL")? {
            self.busy.label = label;
        }
        if let Some(flag) = env_bool("OFFLINE_NOTIFY_AT_LOAD")? {
            self.connectivity.notify_offline_at_load = flag;
        }
        if let Some(marker) = env_string("DELETE_PATH_MARKER")? {
            self.adapter.delete_path_marker = marker;
        }
        Ok(())
    }

    fn validate_and_build(self) -> Result<Config> {
        for (field, window) in [
            ("notify.enter_delay", self.notify.enter_delay),
            ("notify.exit_animation", self.notify.exit_animation),
            ("confirm.removal_delay", self.confirm.removal_delay),
            ("confirm.fade", self.confirm.fade),
        ] {
            if window > MAX_ANIMATION_WINDOW {
                return Err(ConfigError::InvalidField {
                    field,
                    message: format!(
                        "expected at most {}, got {}",
                        format_duration(MAX_ANIMATION_WINDOW),
                        format_duration(window)
                    ),
                }
                .into());
            }
        }
        if self.notify.region_id.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "notify.region_id",
                message: "region id cannot be empty".to_string(),
            }
            .into());
        }
        if self.busy.overlay_id.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "busy.overlay_id",
                message: "overlay id cannot be empty".to_string(),
            }
            .into());
        }
        if self.adapter.delete_path_marker.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "adapter.delete_path_marker",
                message: "an empty marker would match every link".to_string(),
            }
            .into());
        }

        Ok(Config {
            notify: NotifySettings {
                default_duration: self.notify.duration,
                enter_delay: self.notify.enter_delay,
                exit_animation: self.notify.exit_animation,
                region_id: self.notify.region_id,
            },
            busy: BusySettings {
                default_label: self.busy.label,
                overlay_id: self.busy.overlay_id,
            },
            confirm: ConfirmSettings {
                removal_delay: self.confirm.removal_delay,
                fade: self.confirm.fade,
                fallback_label: self.confirm.fallback_label,
            },
            connectivity: ConnectivitySettings {
                banner_message: self.connectivity.banner_message,
                offline_notice: self.connectivity.offline_notice,
                online_notice: self.connectivity.online_notice,
                notify_offline_at_load: self.connectivity.notify_offline_at_load,
            },
            adapter: AdapterSettings {
                delete_path_marker: self.adapter.delete_path_marker,
            },
        })
    }
}

/// `serde_with` adapter reading durations like `"300ms"` or `"5s"`.
pub struct HumantimeDuration;

impl<'de> DeserializeAs<'de, Duration> for HumantimeDuration {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<Duration, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

fn env_string(key: &'static str) -> std::result::Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(ConfigError::Other(err.to_string())),
    }
}

fn env_bool(key: &'static str) -> std::result::Result<Option<bool>, ConfigError> {
    if let Some(value) = env_string(key)? {
        if value.trim().is_empty() {
            return Ok(None);
        }
        return match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Ok(Some(true)),
            "0" | "false" | "no" | "n" => Ok(Some(false)),
            other => Err(ConfigError::InvalidField {
                field: key,
                message: format!("expected a boolean, got {other:?}"),
            }),
        };
    }
    Ok(None)
}

fn env_duration(key: &'static str) -> std::result::Result<Option<Duration>, ConfigError> {
    if let Some(value) = env_string(key)? {
        if value.trim().is_empty() {
            return Ok(None);
        }
        return parse_duration(value.trim())
            .map(Some)
            .map_err(|err| ConfigError::InvalidField {
                field: key,
                message: err.to_string(),
            });
    }
    Ok(None)
}

const fn default_notify_duration() -> Duration {
    Duration::from_secs(5)
}

const fn default_enter_delay() -> Duration {
    Duration::from_millis(10)
}

const fn default_exit_animation() -> Duration {
    Duration::from_millis(300)
}

fn default_region_id() -> String {
    "toast-container".to_string()
}

fn default_busy_label() -> String {
    "Loading...".to_string()
}

fn default_overlay_id() -> String {
    "loading-overlay".to_string()
}

fn default_fallback_label() -> String {
    "this item".to_string()
}

fn default_banner_message() -> String {
    "You are currently offline. Some features may be unavailable.".to_string()
}

fn default_offline_notice() -> String {
    "You are offline. Changes will be synced when connection is restored.".to_string()
}

fn default_online_notice() -> String {
    "Connection restored!".to_string()
}

fn default_delete_marker() -> String {
    "/delete/".to_string()
}
