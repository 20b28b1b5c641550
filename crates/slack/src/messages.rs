//! Messages posted back to the channel or to the requesting user.

use meetbot_core::domain::meeting::MeetingId;
use meetbot_core::domain::metadata::{encode, MeetingActionRef, MeetingEditRef};
use meetbot_core::errors::DomainError;

use crate::blocks::{
    ButtonElement, ButtonStyle, ConfirmDialog, MessageBuilder, MessageTemplate, ResponseType,
    MAX_MESSAGE_BLOCKS,
};

pub const EDIT_MEETING_ACTION: &str = "edit_meeting";
pub const DELETE_MEETING_ACTION: &str = "delete_meeting";

/// A single meeting as shown after create or update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeetingCard {
    pub id: String,
    pub topic: String,
    pub account_name: String,
    pub start_label: String,
    pub duration_minutes: u32,
    pub password: Option<String>,
    pub join_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedMeeting {
    pub id: MeetingId,
    pub topic: String,
    /// Zoom's raw `start_time`, carried in the edit button payload.
    pub start_time: String,
    pub time_range: String,
    pub duration_minutes: u32,
    pub password: Option<String>,
    pub join_url: String,
    pub account_id: String,
    pub account_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedDay {
    pub label: String,
    pub meetings: Vec<ListedMeeting>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeetingList {
    pub range_label: String,
    pub account_label: String,
    pub show_account_names: bool,
    pub days: Vec<ListedDay>,
}

pub fn meeting_created_message(card: &MeetingCard) -> MessageTemplate {
    meeting_card_message("Zoom meeting created", ResponseType::InChannel, card)
}

pub fn meeting_updated_message(card: &MeetingCard) -> MessageTemplate {
    meeting_card_message("Zoom meeting updated", ResponseType::Ephemeral, card)
}

fn meeting_card_message(
    headline: &str,
    response_type: ResponseType,
    card: &MeetingCard,
) -> MessageTemplate {
    let password = card.password.as_deref().filter(|value| !value.is_empty()).unwrap_or("none");

    MessageBuilder::new(format!("{headline}: {}", card.topic))
        .response_type(response_type)
        .section(|section| {
            section.mrkdwn(format!("*{headline}*"));
        })
        .section(|section| {
            section
                .field(format!("*Topic:*\n{}", escape_mrkdwn(&card.topic)))
                .field(format!("*Account:*\n{}", escape_mrkdwn(&card.account_name)))
                .field(format!("*Starts:*\n{}", card.start_label))
                .field(format!("*Duration:*\n{} min", card.duration_minutes))
                .field(format!("*Meeting ID:*\n{}", card.id))
                .field(format!("*Password:*\n{}", escape_mrkdwn(password)));
        })
        .section(|section| {
            section.mrkdwn(format!("*Join URL:*\n{}", card.join_url));
        })
        .build()
}

/// Renders the week view. Days without meetings collapse to one context line;
/// anything past Slack's block limit is summarised in a trailing note.
pub fn meeting_list_message(list: &MeetingList) -> Result<MessageTemplate, DomainError> {
    let total: usize = list.days.iter().map(|day| day.meetings.len()).sum();
    let mut shown = 0usize;
    let budget = MAX_MESSAGE_BLOCKS - 1;

    let mut builder = MessageBuilder::new(format!(
        "Meetings {} ({})",
        list.range_label, list.account_label
    ))
    .response_type(ResponseType::Ephemeral)
    .section(|section| {
        section.mrkdwn(format!(
            "*Schedule for {}* ({})",
            list.range_label,
            escape_mrkdwn(&list.account_label)
        ));
    })
    .divider();

    'days: for day in &list.days {
        if day.meetings.is_empty() {
            if builder.block_count() + 1 > budget {
                break;
            }
            builder = builder.context(|context| {
                context.mrkdwn(format!("*{}* - _no meetings_", day.label));
            });
            continue;
        }

        if builder.block_count() + 3 > budget {
            break;
        }
        builder = builder.section(|section| {
            section.mrkdwn(format!("*{}*", day.label));
        });

        for meeting in &day.meetings {
            if builder.block_count() + 2 > budget {
                break 'days;
            }
            builder = append_listed_meeting(builder, meeting, list.show_account_names)?;
            shown += 1;
        }
    }

    if shown < total {
        let hidden = total - shown;
        builder = builder.context(|context| {
            context.mrkdwn(format!(
                "_{hidden} more meeting(s) not shown. Pick a single account or a later date to see them._"
            ));
        });
    }

    Ok(builder.build())
}

fn append_listed_meeting(
    builder: MessageBuilder,
    meeting: &ListedMeeting,
    show_account_name: bool,
) -> Result<MessageBuilder, DomainError> {
    let password = match meeting.password.as_deref().filter(|value| !value.is_empty()) {
        Some(password) => format!("`{password}`"),
        None => "_none_".to_owned(),
    };
    let mut text = format!(
        "*{}*  {}\nMeeting ID: `{}`\nPassword: {password}\n<{}|Join>",
        meeting.time_range,
        escape_mrkdwn(&meeting.topic),
        meeting.id,
        meeting.join_url
    );
    if show_account_name {
        text.push_str(&format!("\nAccount: {}", escape_mrkdwn(&meeting.account_name)));
    }

    let edit_value = encode(&MeetingEditRef {
        id: meeting.id.clone(),
        topic: meeting.topic.clone(),
        start_time: meeting.start_time.clone(),
        duration: meeting.duration_minutes,
        account_id: Some(meeting.account_id.clone()),
    })?;
    let delete_value = encode(&MeetingActionRef {
        meeting_id: meeting.id.clone(),
        account_id: Some(meeting.account_id.clone()),
    })?;
    let confirm = ConfirmDialog::new(
        "Delete meeting",
        format!("Delete \"{}\"?", escape_mrkdwn(&meeting.topic)),
        "Delete",
        "Cancel",
    );

    Ok(builder
        .section(|section| {
            section.mrkdwn(text);
        })
        .actions(format!("meeting.{}.{}", meeting.account_id, meeting.id), |actions| {
            actions
                .button(ButtonElement::new(EDIT_MEETING_ACTION, "Edit").value(edit_value))
                .button(
                    ButtonElement::new(DELETE_MEETING_ACTION, "Delete")
                        .style(ButtonStyle::Danger)
                        .value(delete_value)
                        .confirm(confirm),
                );
        }))
}

pub fn meeting_deleted_message(meeting_id: &MeetingId) -> MessageTemplate {
    MessageBuilder::new(format!("Meeting (ID: {meeting_id}) deleted."))
        .response_type(ResponseType::Ephemeral)
        .build()
}

pub fn error_message(message: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Error: {message}")).response_type(ResponseType::Ephemeral).build()
}

pub fn help_message(command: &str) -> MessageTemplate {
    MessageBuilder::new(format!("{command} help"))
        .response_type(ResponseType::Ephemeral)
        .section(|section| {
            section.mrkdwn(format!(
                "*Zoom meetings from Slack*\n• `{command}` opens the meeting form\n• `{command} create` opens it ready to create\n• `{command} list` opens it ready to list this week's meetings"
            ));
        })
        .build()
}

/// Escapes the three characters Slack treats as control sequences in mrkdwn.
pub fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
