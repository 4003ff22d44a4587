// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::trigger::TriggerObject;
use crate::constants::OPERATOR_NAME;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Publishes human readable events against trigger objects.
/// Failing to publish is logged and otherwise ignored.
#[derive(Clone)]
pub struct EventRecorder {
    recorder: Recorder,
}

impl EventRecorder {
    pub fn new(client: Client, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: OPERATOR_NAME.to_string(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }

    pub async fn normal(&self, obj: &TriggerObject, reason: &str, note: String) {
        self.publish(obj, EventType::Normal, reason, note).await
    }

    pub async fn warning(&self, obj: &TriggerObject, reason: &str, note: String) {
        warn!("{} {}: {}", obj.kind(), obj.key(), note);
        self.publish(obj, EventType::Warning, reason, note).await
    }

    async fn publish(&self, obj: &TriggerObject, type_: EventType, reason: &str, note: String) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(note),
            action: "Sync".to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &obj.object_ref()).await {
            warn!("Failed to publish event for {} {}: {}", obj.kind(), obj.key(), e);
        }
    }
}
