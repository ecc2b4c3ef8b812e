use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Visual severity of a notification.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Modifier class applied next to `toast`.
    pub const fn toast_class(self) -> &'static str {
        match self {
            Self::Success => "toast-success",
            Self::Error => "toast-error",
            Self::Warning => "toast-warning",
            Self::Info => "toast-info",
        }
    }

    pub const fn icon_class(self) -> &'static str {
        match self {
            Self::Success => "bi-check-circle-fill",
            Self::Error => "bi-x-circle-fill",
            Self::Warning => "bi-exclamation-triangle-fill",
            Self::Info => "bi-info-circle-fill",
        }
    }

    /// Classifies a server-rendered flash element by its `alert-*` classes.
    /// Anything unrecognised is informational.
    pub fn from_alert_classes<'a>(classes: impl IntoIterator<Item = &'a str>) -> Self {
        let classes: Vec<&str> = classes.into_iter().collect();
        if classes.contains(&"alert-success") {
            Self::Success
        } else if classes.contains(&"alert-danger") {
            Self::Error
        } else if classes.contains(&"alert-warning") {
            Self::Warning
        } else {
            Self::Info
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network reachability as reported by the host.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub const fn from_online_flag(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }

    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "online",
            Self::Offline => "offline",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Connectivity, Severity};

    #[test]
    fn severity_reads_lowercase_names() {
        let parsed: Vec<Severity> =
            serde_json::from_str(r#"["success", "error", "warning", "info"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![Severity::Success, Severity::Error, Severity::Warning, Severity::Info]
        );
        assert!(serde_json::from_str::<Severity>(r#""danger""#).is_err());
    }

    #[test]
    fn severity_classifies_flash_alerts() {
        assert_eq!(
            Severity::from_alert_classes(["alert", "alert-danger"]),
            Severity::Error
        );
        assert_eq!(
            Severity::from_alert_classes(["alert", "alert-success"]),
            Severity::Success
        );
        assert_eq!(
            Severity::from_alert_classes(["alert", "alert-primary"]),
            Severity::Info
        );
    }

    #[test]
    fn connectivity_from_flag() {
        assert_eq!(Connectivity::from_online_flag(false), Connectivity::Offline);
        assert!(Connectivity::from_online_flag(true).is_online());
    }
}
