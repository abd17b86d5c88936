//! Calendar access through a provider binary.

pub mod protocol;
pub mod provider;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::error::VendoResult;
use crate::event::{Event, EventDraft};
use crate::remote::protocol::{CalendarInfo, CreateEvent, ListCalendars, ListEvents, UpdateEvent};
use crate::remote::provider::Provider;
use crate::run::{CalendarRead, CalendarWrite};

const DEFAULT_PROVIDER: &str = "google";

/// Provider-specific settings, passed to the provider verbatim.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RemoteConfig(pub HashMap<String, toml::Value>);

impl From<&RemoteConfig> for serde_json::Map<String, serde_json::Value> {
    fn from(config: &RemoteConfig) -> Self {
        config
            .0
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect()
    }
}

/// The `[remote]` section: which provider to run and its settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Remote {
    pub provider: Provider,
    #[serde(flatten)]
    pub config: RemoteConfig,
}

impl Default for Remote {
    fn default() -> Self {
        Remote::new(Provider::from_name(DEFAULT_PROVIDER), RemoteConfig::default())
    }
}

impl Remote {
    fn remote_config(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::from(&self.config)
    }

    pub fn new(provider: Provider, config: RemoteConfig) -> Self {
        Remote { provider, config }
    }

    pub async fn list_calendars(&self) -> VendoResult<Vec<CalendarInfo>> {
        self.provider
            .call(ListCalendars {
                remote_config: self.remote_config(),
            })
            .await
    }
}

#[async_trait]
impl CalendarRead for Remote {
    async fn list_events(&self, calendar_id: &str, range: &DateRange) -> VendoResult<Vec<Event>> {
        self.provider
            .call(ListEvents {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                from: range.from_rfc3339(),
                to: range.to_rfc3339(),
            })
            .await
    }
}

#[async_trait]
impl CalendarWrite for Remote {
    async fn create_event(&self, calendar_id: &str, draft: &EventDraft) -> VendoResult<Event> {
        self.provider
            .call(CreateEvent {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                event: draft.to_event(""),
            })
            .await
    }

    async fn update_event_time(
        &self,
        calendar_id: &str,
        event_id: &str,
        draft: &EventDraft,
    ) -> VendoResult<Event> {
        self.provider
            .call(UpdateEvent {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                event: draft.to_event(event_id),
            })
            .await
    }
}
