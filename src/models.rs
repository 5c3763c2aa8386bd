use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::timeutil::to_daily_seconds;

/// User-configured daily alarm time. The PWA persists the fields as strings,
/// so deserialization accepts either numbers or numeric strings and treats
/// anything unparsable as 0.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TargetTime {
    #[serde(deserialize_with = "lenient_i64")]
    pub hour: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub minute: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub second: i64,
}

impl TargetTime {
    pub fn seconds(&self) -> u32 {
        to_daily_seconds(self.hour, self.minute, self.second)
    }
}

impl Default for TargetTime {
    fn default() -> TargetTime {
        TargetTime { hour: 19, minute: 0, second: 0 }
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::String(s) => s.trim().parse().unwrap_or(0),
    })
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// The browser `PushSubscription.toJSON()` shape.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscriptionJson {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    pub keys: PushKeys,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub seconds: u32,
    pub enabled: bool,
}

/// Body of the form `payload` field on POST /api/subscribe.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub subscription: PushSubscriptionJson,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
    /// Minutes to add to local time to get UTC (JS `Date.getTimezoneOffset`).
    #[serde(default)]
    pub timezone_offset: i32,
}

/// Body of the form `payload` field on POST /api/unsubscribe.
#[derive(Deserialize, Clone, Debug)]
pub struct UnsubscribePayload {
    pub endpoint: String,
}

/// Form wrapper: the PWA posts `payload=<json>` as urlencoded form data.
#[derive(Deserialize, Clone, Debug)]
pub struct PayloadForm {
    pub payload: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SendRequest {
    pub subscription: PushSubscriptionJson,
    pub payload: NotificationPayload,
}

/// Local calendar dates (YYYY-MM-DD) of the last push per threshold, the
/// scanner's once-per-day guard.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LastSent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifteen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub five: Option<String>,
}

/// One persisted subscriber, keyed in the store by `subscription.endpoint`.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub subscription: PushSubscriptionJson,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
    #[serde(default)]
    pub timezone_offset: i32,
    #[serde(default)]
    pub last_sent: HashMap<String, LastSent>,
}

impl From<SubscribePayload> for SubscriptionRecord {
    fn from(payload: SubscribePayload) -> SubscriptionRecord {
        SubscriptionRecord {
            subscription: payload.subscription,
            schedules: payload.schedules,
            timezone_offset: payload.timezone_offset,
            last_sent: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlarmType {
    #[default]
    Beep,
    Low,
    Phone,
    Pulse,
    Ascending,
}

/// Global client settings persisted under the `settings` key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub default_alarm_type: AlarmType,
    #[serde(default = "default_true")]
    pub enable_notifications: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            default_alarm_type: AlarmType::Beep,
            enable_notifications: true,
            theme: default_theme(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_theme() -> String {
    String::from("dark")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_time_accepts_string_fields() {
        let t: TargetTime = serde_json::from_str(r#"{"hour":"19","minute":"00","second":"30"}"#)
            .unwrap();
        assert_eq!(t, TargetTime { hour: 19, minute: 0, second: 30 });
        assert_eq!(t.seconds(), 68430);
    }

    #[test]
    fn target_time_treats_garbage_fields_as_zero() {
        let t: TargetTime = serde_json::from_str(r#"{"hour":"xx","minute":5,"second":""}"#)
            .unwrap();
        assert_eq!(t, TargetTime { hour: 0, minute: 5, second: 0 });
    }

    #[test]
    fn subscribe_payload_parses_browser_shape() {
        let json = r#"{
            "subscription": {
                "endpoint": "https://push.example.org/send/abc",
                "expirationTime": null,
                "keys": { "p256dh": "pk", "auth": "ak" }
            },
            "schedules": [
                { "seconds": 28800, "enabled": true },
                { "seconds": 72000, "enabled": false }
            ],
            "timezoneOffset": -540
        }"#;
        let payload: SubscribePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.subscription.endpoint, "https://push.example.org/send/abc");
        assert_eq!(payload.schedules.len(), 2);
        assert_eq!(payload.timezone_offset, -540);

        let record = SubscriptionRecord::from(payload);
        assert!(record.last_sent.is_empty());
    }

    #[test]
    fn settings_defaults_apply_to_missing_fields() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.default_alarm_type, AlarmType::Beep);
        assert!(s.enable_notifications);
        assert_eq!(s.theme, "dark");
    }

    #[test]
    fn record_round_trips_last_sent_dates() {
        let mut record = SubscriptionRecord {
            subscription: PushSubscriptionJson::default(),
            schedules: vec![ScheduleEntry { seconds: 28800, enabled: true }],
            timezone_offset: 0,
            last_sent: HashMap::new(),
        };
        record.last_sent.insert(
            "28800".to_string(),
            LastSent { fifteen: Some("2026-08-29".to_string()), five: None },
        );

        let json = serde_json::to_string(&record).unwrap();
        let back: SubscriptionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.last_sent["28800"].fifteen.as_deref(), Some("2026-08-29"));
        assert_eq!(back.last_sent["28800"].five, None);
    }
}
