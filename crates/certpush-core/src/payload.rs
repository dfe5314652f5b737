use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Core APS payload fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Aps {
    pub alert: Alert,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<Sound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutable_content: Option<u8>,
}

/// Alert content shown to the user.
#[derive(Debug, Serialize)]
pub struct Alert {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Sound configuration (name or critical-alert settings).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Sound {
    Name(String),
    Critical {
        name: String,
        critical: u8,
        volume: f32,
    },
}

/// Full notification payload with flattened client data.
#[derive(Debug, Serialize)]
pub struct NotificationPayload {
    pub aps: Aps,
    #[serde(flatten)]
    data: HashMap<String, Value>,
}

impl NotificationPayload {
    pub fn new(aps: Aps, mut data: HashMap<String, Value>) -> Self {
        // The aps dictionary always wins over a caller-supplied "aps" entry.
        data.remove("aps");
        Self { aps, data }
    }

    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    /// Convert into the payload map carried by a push message.
    pub fn into_map(self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut map = Map::new();
        map.insert("aps".to_string(), serde_json::to_value(self.aps)?);
        for (key, value) in self.data {
            map.insert(key, value);
        }
        Ok(map)
    }
}
