use serde::Serialize;

/// What starts a workflow run. Each kind carries only the field it needs.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, strum::AsRefStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    Cron { schedule: String },
    Webhook { path: String },
    Queue { subject: String },
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: TriggerKind,
}

impl Trigger {
    pub fn manual() -> Self {
        Self {
            name: None,
            kind: TriggerKind::Manual,
        }
    }

    pub fn cron(schedule: impl Into<String>) -> Self {
        Self {
            name: None,
            kind: TriggerKind::Cron {
                schedule: schedule.into(),
            },
        }
    }

    pub fn webhook(path: impl Into<String>) -> Self {
        Self {
            name: None,
            kind: TriggerKind::Webhook {
                path: path.into(),
            },
        }
    }

    pub fn queue(subject: impl Into<String>) -> Self {
        Self {
            name: None,
            kind: TriggerKind::Queue {
                subject: subject.into(),
            },
        }
    }

    pub fn with_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = Some(name.into());
        self
    }

    /// trigger type as written in the document
    pub fn type_name(&self) -> &str {
        self.kind.as_ref()
    }

    pub fn is_webhook(&self) -> bool {
        matches!(self.kind, TriggerKind::Webhook { .. })
    }

    pub fn is_cron(&self) -> bool {
        matches!(self.kind, TriggerKind::Cron { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_type_name() {
        assert_eq!(Trigger::manual().type_name(), "manual");
        assert_eq!(Trigger::cron("0 * * * *").type_name(), "cron");
        assert_eq!(Trigger::webhook("/hook").type_name(), "webhook");
        assert_eq!(Trigger::queue("events.in").type_name(), "queue");
    }

    #[test]
    fn test_trigger_serializes_as_document_shape() {
        let trigger = Trigger::cron("*/5 * * * *").with_name("every-five");
        let value = serde_json::to_value(&trigger).unwrap();
        assert_eq!(value, serde_json::json!({"name": "every-five", "type": "cron", "schedule": "*/5 * * * *"}));
    }
}
