use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A stored enum column held a value this build does not know about.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

/// Lifecycle of a prayer request. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Open,
    Closed,
}

text_enum!(RequestStatus, "status", { Open => "OPEN", Closed => "CLOSED" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseKind {
    /// "I am praying for you" without a message
    Quick,
    Message,
}

text_enum!(ResponseKind, "response type", { Quick => "QUICK", Message => "MESSAGE" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewPrayerRequest,
    PrayerResponse,
    PrayerUpdate,
    PrayerClosed,
}

text_enum!(NotificationKind, "notification type", {
    NewPrayerRequest => "NEW_PRAYER_REQUEST",
    PrayerResponse => "PRAYER_RESPONSE",
    PrayerUpdate => "PRAYER_UPDATE",
    PrayerClosed => "PRAYER_CLOSED",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_matches_wire_format() {
        let json = serde_json::to_string(&NotificationKind::NewPrayerRequest).unwrap();
        assert_eq!(json, format!("\"{}\"", NotificationKind::NewPrayerRequest.as_str()));
        assert_eq!("PRAYER_CLOSED".parse::<NotificationKind>().unwrap(), NotificationKind::PrayerClosed);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "ARCHIVED".parse::<RequestStatus>().unwrap_err();
        assert_eq!(err.value, "ARCHIVED");
        assert_eq!(err.to_string(), "unknown status value: ARCHIVED");
    }
}
