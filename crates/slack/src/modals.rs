//! The meeting modal opened by the slash command and the edit modal opened
//! from a listed meeting.

use chrono::{NaiveDate, NaiveTime};
use meetbot_core::accounts::{AccountDirectory, ALL_ACCOUNTS_VALUE};
use meetbot_core::domain::meeting::{MeetingAction, MeetingDuration, MeetingPassword};
use meetbot_core::domain::metadata::{encode, EditModalState, ModalState};
use meetbot_core::errors::DomainError;

use crate::blocks::{
    DatePicker, Element, InputBlock, ModalBuilder, ModalView, PlainTextInput, SelectOption,
    StaticSelect, TextObject, TimePicker,
};

pub const MEETING_MODAL_CALLBACK_ID: &str = "meeting_modal";
pub const EDIT_MODAL_CALLBACK_ID: &str = "edit_meeting_modal";

pub const ACTION_BLOCK: &str = "action_block";
pub const ACTION_SELECT: &str = "action_select";
pub const ACCOUNT_BLOCK: &str = "account_block";
pub const ACCOUNT_SELECT: &str = "account_select";
pub const DATE_BLOCK: &str = "date_block";
pub const DATE_SELECT: &str = "date_select";
pub const TIME_BLOCK: &str = "time_block";
pub const TIME_SELECT: &str = "time_select";
pub const DURATION_BLOCK: &str = "duration_block";
pub const DURATION_SELECT: &str = "duration_select";
pub const TOPIC_BLOCK: &str = "topic_block";
pub const TOPIC_INPUT: &str = "topic_input";
pub const PASSWORD_BLOCK: &str = "password_block";
pub const PASSWORD_INPUT: &str = "password_input";

/// Values shown when the edit modal opens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditPrefill {
    pub topic: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
}

pub fn meeting_modal(
    accounts: &AccountDirectory,
    today: NaiveDate,
    default_duration: MeetingDuration,
    preset_action: Option<MeetingAction>,
    state: &ModalState,
) -> Result<ModalView, DomainError> {
    let action_select = StaticSelect::new(
        ACTION_SELECT,
        vec![
            SelectOption::new("Create a meeting", MeetingAction::Create.as_value()),
            SelectOption::new("List meetings", MeetingAction::List.as_value()),
        ],
    )
    .placeholder("Choose an action")
    .initial_value(preset_action.unwrap_or(MeetingAction::Create).as_value());

    let mut account_options: Vec<SelectOption> = accounts
        .all()
        .iter()
        .map(|account| SelectOption::new(account.name.clone(), account.id.clone()))
        .collect();
    if accounts.has_multiple() {
        account_options.push(SelectOption::new("All accounts", ALL_ACCOUNTS_VALUE));
    }
    let account_select = StaticSelect::new(ACCOUNT_SELECT, account_options)
        .placeholder("Choose an account")
        .initial_value(&accounts.default_account().id);

    let duration_select = duration_select(&MeetingDuration::CREATE_CHOICES)
        .initial_value(&default_duration.minutes().to_string());
    let topic_input = PlainTextInput::new(TOPIC_INPUT).placeholder("Meeting topic (optional)");

    Ok(ModalBuilder::new(MEETING_MODAL_CALLBACK_ID, "Zoom Meeting")
        .submit("Run")
        .close("Cancel")
        .private_metadata(encode(state)?)
        .input(InputBlock::new(ACTION_BLOCK, "Action", Element::StaticSelect(action_select)))
        .input(InputBlock::new(
            ACCOUNT_BLOCK,
            "Zoom account",
            Element::StaticSelect(account_select),
        ))
        .input(InputBlock::new(DATE_BLOCK, "Date", date_picker(today)))
        .input(InputBlock::new(TIME_BLOCK, "Start time (create)", time_picker(None)).optional())
        .input(
            InputBlock::new(
                DURATION_BLOCK,
                "Duration (create)",
                Element::StaticSelect(duration_select),
            )
            .optional(),
        )
        .input(
            InputBlock::new(TOPIC_BLOCK, "Topic", Element::PlainTextInput(topic_input)).optional(),
        )
        .input(password_input("Leave empty to generate one").optional())
        .build())
}

pub fn edit_meeting_modal(
    prefill: &EditPrefill,
    state: &EditModalState,
) -> Result<ModalView, DomainError> {
    let duration_select = duration_select(&MeetingDuration::EDIT_CHOICES)
        .initial_value(&prefill.duration_minutes.to_string());

    Ok(ModalBuilder::new(EDIT_MODAL_CALLBACK_ID, "Edit meeting")
        .submit("Update")
        .close("Cancel")
        .private_metadata(encode(state)?)
        .input(InputBlock::new(
            TOPIC_BLOCK,
            "Topic",
            Element::PlainTextInput(
                PlainTextInput::new(TOPIC_INPUT)
                    .placeholder("Meeting topic")
                    .initial_value(prefill.topic.clone()),
            ),
        ))
        .input(InputBlock::new(DATE_BLOCK, "Date", date_picker(prefill.date)))
        .input(InputBlock::new(TIME_BLOCK, "Start time", time_picker(Some(prefill.time))))
        .input(InputBlock::new(DURATION_BLOCK, "Duration", Element::StaticSelect(duration_select)))
        .input(
            password_input("Only fill in to change it").optional().hint(
                "Letters, digits and @-_* only, up to 10 characters. Leave empty to keep it.",
            ),
        )
        .build())
}

fn duration_select(choices: &[u32]) -> StaticSelect {
    let options = choices
        .iter()
        .map(|minutes| SelectOption::new(format!("{minutes} min"), minutes.to_string()))
        .collect();
    StaticSelect::new(DURATION_SELECT, options).placeholder("Choose a duration")
}

fn date_picker(initial: NaiveDate) -> Element {
    Element::Datepicker(DatePicker {
        action_id: DATE_SELECT.to_owned(),
        initial_date: Some(initial.format("%Y-%m-%d").to_string()),
        placeholder: Some(TextObject::plain("Choose a date")),
    })
}

fn time_picker(initial: Option<NaiveTime>) -> Element {
    Element::Timepicker(TimePicker {
        action_id: TIME_SELECT.to_owned(),
        initial_time: initial.map(|time| time.format("%H:%M").to_string()),
        placeholder: Some(TextObject::plain("Choose a time")),
    })
}

fn password_input(placeholder: &str) -> InputBlock {
    InputBlock::new(
        PASSWORD_BLOCK,
        "Password",
        Element::PlainTextInput(
            PlainTextInput::new(PASSWORD_INPUT)
                .placeholder(placeholder)
                .max_length(MeetingPassword::MAX_LEN as u32),
        ),
    )
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use meetbot_core::accounts::{parse_accounts_json, AccountDirectory};
    use meetbot_core::domain::meeting::{MeetingAction, MeetingDuration, MeetingId};
    use meetbot_core::domain::metadata::{decode, EditModalState, ModalState};
    use serde_json::{json, Value};

    use super::{edit_meeting_modal, meeting_modal, EditPrefill};

    fn directory(raw: &str) -> AccountDirectory {
        AccountDirectory::new(parse_accounts_json(raw).expect("accounts")).expect("directory")
    }

    fn two_rooms() -> AccountDirectory {
        directory(
            r#"[
                {"id":"room1","name":"Room A","accountId":"a1","clientId":"c1","clientSecret":"s1"},
                {"id":"room2","name":"Room B","accountId":"a2","clientId":"c2","clientSecret":"s2"}
            ]"#,
        )
    }

    fn state() -> ModalState {
        ModalState {
            response_url: "https://hooks.slack.com/commands/T1/1/abc".to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
        }
    }

    static NULL: Value = Value::Null;

    fn block<'a>(view: &'a Value, block_id: &str) -> &'a Value {
        view["blocks"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|block| block["block_id"] == json!(block_id)))
            .unwrap_or(&NULL)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 20).expect("date")
    }

    #[test]
    fn meeting_modal_has_every_input_and_round_trips_state() {
        let view = meeting_modal(&two_rooms(), today(), MeetingDuration::DEFAULT, None, &state())
            .expect("modal");
        let value = serde_json::to_value(&view).expect("serialize");

        assert_eq!(value["callback_id"], json!("meeting_modal"));
        for block_id in [
            "action_block",
            "account_block",
            "date_block",
            "time_block",
            "duration_block",
            "topic_block",
            "password_block",
        ] {
            assert!(!block(&value, block_id).is_null(), "missing {block_id}");
        }
        assert_eq!(block(&value, "date_block")["element"]["initial_date"], json!("2026-10-20"));
        assert_eq!(
            block(&value, "duration_block")["element"]["initial_option"]["value"],
            json!("60")
        );
        assert_eq!(block(&value, "password_block")["element"]["max_length"], json!(10));

        let metadata = value["private_metadata"].as_str().expect("metadata");
        assert_eq!(decode::<ModalState>("private_metadata", metadata).expect("decode"), state());
    }

    #[test]
    fn all_accounts_option_only_appears_with_several_accounts() {
        let value = serde_json::to_value(
            meeting_modal(&two_rooms(), today(), MeetingDuration::DEFAULT, None, &state())
                .expect("modal"),
        )
        .expect("serialize");
        let options = block(&value, "account_block")["element"]["options"].clone();
        assert_eq!(options.as_array().map(Vec::len), Some(3));
        assert_eq!(options[2]["value"], json!("all"));
        assert_eq!(
            block(&value, "account_block")["element"]["initial_option"]["value"],
            json!("room1")
        );

        let single = directory(
            r#"[{"id":"default","name":"Zoom","accountId":"a","clientId":"c","clientSecret":"s"}]"#,
        );
        let value = serde_json::to_value(
            meeting_modal(&single, today(), MeetingDuration::DEFAULT, None, &state())
                .expect("modal"),
        )
        .expect("serialize");
        assert_eq!(
            block(&value, "account_block")["element"]["options"].as_array().map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn preset_action_is_preselected() {
        let view = meeting_modal(
            &two_rooms(),
            today(),
            MeetingDuration::DEFAULT,
            Some(MeetingAction::List),
            &state(),
        )
        .expect("modal");
        let value = serde_json::to_value(&view).expect("serialize");

        assert_eq!(block(&value, "action_block")["element"]["initial_option"]["value"], json!("list"));
    }

    #[test]
    fn edit_modal_prefills_values_and_skips_unknown_duration() {
        let state = EditModalState {
            meeting_id: MeetingId("42".to_owned()),
            account_id: Some("room2".to_owned()),
            response_url: String::new(),
        };
        let mut prefill = EditPrefill {
            topic: "Weekly sync".to_owned(),
            date: today(),
            time: NaiveTime::from_hms_opt(14, 30, 0).expect("time"),
            duration_minutes: 120,
        };

        let value = serde_json::to_value(edit_meeting_modal(&prefill, &state).expect("modal"))
            .expect("serialize");
        assert_eq!(value["callback_id"], json!("edit_meeting_modal"));
        assert_eq!(block(&value, "topic_block")["element"]["initial_value"], json!("Weekly sync"));
        assert_eq!(block(&value, "time_block")["element"]["initial_time"], json!("14:30"));
        assert_eq!(
            block(&value, "duration_block")["element"]["initial_option"]["value"],
            json!("120")
        );
        assert!(block(&value, "password_block")["hint"].is_object());

        prefill.duration_minutes = 45;
        let value = serde_json::to_value(edit_meeting_modal(&prefill, &state).expect("modal"))
            .expect("serialize");
        assert!(block(&value, "duration_block")["element"].get("initial_option").is_none());
    }
}
