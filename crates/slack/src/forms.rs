//! Turns submitted modal state into domain forms. Failures are keyed by block
//! id so they can be shown inline with `response_action: errors`.

use std::collections::BTreeMap;

use meetbot_core::accounts::AccountSelection;
use meetbot_core::domain::meeting::{
    non_blank, parse_date, parse_time, EditForm, MeetingAction, MeetingDuration, MeetingForm,
    MeetingPassword,
};
use meetbot_core::errors::DomainError;
use serde_json::{json, Value};

use crate::interactions::ViewState;
use crate::modals::{
    ACCOUNT_BLOCK, ACCOUNT_SELECT, ACTION_BLOCK, ACTION_SELECT, DATE_BLOCK, DATE_SELECT,
    DURATION_BLOCK, DURATION_SELECT, PASSWORD_BLOCK, PASSWORD_INPUT, TIME_BLOCK, TIME_SELECT,
    TOPIC_BLOCK, TOPIC_INPUT,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(block_id: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(block_id, message);
        errors
    }

    pub fn insert(&mut self, block_id: &str, message: impl Into<String>) {
        self.errors.entry(block_id.to_owned()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, block_id: &str) -> Option<&str> {
        self.errors.get(block_id).map(String::as_str)
    }

    /// Response body that keeps the modal open and marks the failing inputs.
    pub fn to_response(&self) -> Value {
        json!({"response_action": "errors", "errors": self.errors})
    }
}

pub fn parse_meeting_form(state: &ViewState) -> Result<MeetingForm, FieldErrors> {
    let mut errors = FieldErrors::new();

    let action = match state.value(ACTION_BLOCK, ACTION_SELECT) {
        Some(raw) => raw
            .parse::<MeetingAction>()
            .map_err(|error| errors.insert(ACTION_BLOCK, reason(&error)))
            .ok(),
        None => {
            errors.insert(ACTION_BLOCK, "Choose an action.");
            None
        }
    };
    let account = match state.value(ACCOUNT_BLOCK, ACCOUNT_SELECT) {
        Some(raw) => Some(AccountSelection::parse(raw)),
        None => {
            errors.insert(ACCOUNT_BLOCK, "Choose a Zoom account.");
            None
        }
    };
    let date = optional(&mut errors, DATE_BLOCK, state.value(DATE_BLOCK, DATE_SELECT), parse_date);
    let time = optional(&mut errors, TIME_BLOCK, state.value(TIME_BLOCK, TIME_SELECT), parse_time);
    let duration = optional(
        &mut errors,
        DURATION_BLOCK,
        state.value(DURATION_BLOCK, DURATION_SELECT),
        MeetingDuration::parse,
    );
    let password = optional(
        &mut errors,
        PASSWORD_BLOCK,
        state.value(PASSWORD_BLOCK, PASSWORD_INPUT),
        MeetingPassword::parse,
    );
    let topic = non_blank(state.value(TOPIC_BLOCK, TOPIC_INPUT));

    match (action, account) {
        (Some(action), Some(account)) if errors.is_empty() => {
            Ok(MeetingForm { action, account, date, time, duration, topic, password })
        }
        _ => Err(errors),
    }
}

pub fn parse_edit_form(state: &ViewState) -> Result<EditForm, FieldErrors> {
    let mut errors = FieldErrors::new();

    let topic = non_blank(state.value(TOPIC_BLOCK, TOPIC_INPUT));
    if topic.is_none() {
        errors.insert(TOPIC_BLOCK, "Enter a topic.");
    }
    let date = optional(&mut errors, DATE_BLOCK, state.value(DATE_BLOCK, DATE_SELECT), parse_date);
    let time = optional(&mut errors, TIME_BLOCK, state.value(TIME_BLOCK, TIME_SELECT), parse_time);
    let duration = optional(
        &mut errors,
        DURATION_BLOCK,
        state.value(DURATION_BLOCK, DURATION_SELECT),
        MeetingDuration::parse,
    );
    if duration.is_none() {
        errors.insert(DURATION_BLOCK, "Choose a duration.");
    }
    let password = optional(
        &mut errors,
        PASSWORD_BLOCK,
        state.value(PASSWORD_BLOCK, PASSWORD_INPUT),
        MeetingPassword::parse,
    );

    match (topic, duration) {
        (Some(topic), Some(duration)) if errors.is_empty() => {
            Ok(EditForm { topic, date, time, duration, password })
        }
        _ => Err(errors),
    }
}

fn optional<T>(
    errors: &mut FieldErrors,
    block_id: &str,
    raw: Option<&str>,
    parse: impl Fn(&str) -> Result<T, DomainError>,
) -> Option<T> {
    match raw.map(parse) {
        Some(Ok(value)) => Some(value),
        Some(Err(error)) => {
            errors.insert(block_id, reason(&error));
            None
        }
        None => None,
    }
}

fn reason(error: &DomainError) -> String {
    match error {
        DomainError::InvalidField { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use meetbot_core::accounts::AccountSelection;
    use meetbot_core::domain::meeting::MeetingAction;
    use serde_json::{json, Value};

    use super::{parse_edit_form, parse_meeting_form, FieldErrors};
    use crate::interactions::ViewState;

    fn state(values: Value) -> ViewState {
        serde_json::from_value(json!({ "values": values })).expect("state")
    }

    fn select(action_id: &str, value: &str) -> Value {
        json!({ action_id: {"type": "static_select", "selected_option": {"value": value}} })
    }

    fn text(action_id: &str, value: &str) -> Value {
        json!({ action_id: {"type": "plain_text_input", "value": value} })
    }

    #[test]
    fn create_form_with_every_field() {
        let form = parse_meeting_form(&state(json!({
            "action_block": select("action_select", "create"),
            "account_block": select("account_select", "room2"),
            "date_block": {"date_select": {"type": "datepicker", "selected_date": "2026-10-21"}},
            "time_block": {"time_select": {"type": "timepicker", "selected_time": "14:30"}},
            "duration_block": select("duration_select", "90"),
            "topic_block": text("topic_input", "Planning"),
            "password_block": text("password_input", "pa55"),
        })))
        .expect("form");

        assert_eq!(form.action, MeetingAction::Create);
        assert_eq!(form.account, AccountSelection::One("room2".to_owned()));
        assert_eq!(form.date, NaiveDate::from_ymd_opt(2026, 10, 21));
        assert_eq!(form.time, NaiveTime::from_hms_opt(14, 30, 0));
        assert_eq!(form.duration.map(|duration| duration.minutes()), Some(90));
        assert_eq!(form.topic.as_deref(), Some("Planning"));
        assert_eq!(form.password.as_ref().map(|password| password.as_str()), Some("pa55"));
    }

    #[test]
    fn list_form_needs_only_action_and_account() {
        let form = parse_meeting_form(&state(json!({
            "action_block": select("action_select", "list"),
            "account_block": select("account_select", "all"),
        })))
        .expect("form");

        assert_eq!(form.action, MeetingAction::List);
        assert_eq!(form.account, AccountSelection::All);
        assert_eq!(form.date, None);
        assert_eq!(form.password, None);
    }

    #[test]
    fn invalid_inputs_are_reported_per_block() {
        let errors = parse_meeting_form(&state(json!({
            "account_block": select("account_select", "room1"),
            "password_block": text("password_input", "has space!"),
        })))
        .expect_err("invalid");

        assert_eq!(errors.get("action_block"), Some("Choose an action."));
        assert!(errors.get("password_block").is_some_and(|message| message.contains("1-10")));
        assert_eq!(errors.get("account_block"), None);

        let response = errors.to_response();
        assert_eq!(response["response_action"], json!("errors"));
        assert!(response["errors"]["password_block"].is_string());
    }

    #[test]
    fn edit_form_requires_topic_and_duration() {
        let errors = parse_edit_form(&state(json!({
            "topic_block": text("topic_input", "  "),
        })))
        .expect_err("missing");
        assert_eq!(errors.get("topic_block"), Some("Enter a topic."));
        assert_eq!(errors.get("duration_block"), Some("Choose a duration."));

        let form = parse_edit_form(&state(json!({
            "topic_block": text("topic_input", "Weekly sync"),
            "date_block": {"date_select": {"type": "datepicker", "selected_date": "2026-10-22"}},
            "time_block": {"time_select": {"type": "timepicker", "selected_time": "09:15"}},
            "duration_block": select("duration_select", "120"),
        })))
        .expect("form");
        assert_eq!(form.topic, "Weekly sync");
        assert_eq!(form.duration.minutes(), 120);
        assert_eq!(form.password, None);
    }

    #[test]
    fn first_error_per_block_wins() {
        let mut errors = FieldErrors::single("date_block", "first");
        errors.insert("date_block", "second");
        assert_eq!(errors.get("date_block"), Some("first"));
    }
}
