//! Interactivity payloads (`view_submission`, `block_actions`) as Slack sends
//! them inside the `payload` form field.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlackChannel {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ViewSubmission {
    #[serde(default)]
    pub user: SlackUser,
    pub view: ViewPayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ViewPayload {
    #[serde(default)]
    pub id: String,
    pub callback_id: String,
    #[serde(default)]
    pub private_metadata: String,
    #[serde(default)]
    pub state: ViewState,
}

/// `view.state.values`, keyed by block id then action id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, StateValue>>,
}

impl ViewState {
    /// The submitted value of one input, whatever its element type. Blank
    /// text counts as absent.
    pub fn value(&self, block_id: &str, action_id: &str) -> Option<&str> {
        let entry = self.values.get(block_id)?.get(action_id)?;
        entry
            .selected_option
            .as_ref()
            .map(|option| option.value.as_str())
            .or(entry.selected_date.as_deref())
            .or(entry.selected_time.as_deref())
            .or(entry.value.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct StateValue {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
    #[serde(default)]
    pub selected_date: Option<String>,
    #[serde(default)]
    pub selected_time: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BlockActionEvent {
    #[serde(default)]
    pub user: SlackUser,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub channel: Option<SlackChannel>,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
}

impl BlockActionEvent {
    pub fn first_action(&self) -> Option<&BlockAction> {
        self.actions.first()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
    #[serde(default)]
    pub block_id: String,
    #[serde(default)]
    pub value: Option<String>,
}
