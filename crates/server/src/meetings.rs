//! Meeting workflows behind the Slack handlers: open the modal, create or list
//! from its submission, and edit or delete from the list buttons.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use meetbot_core::accounts::{AccountDirectory, AccountSelection, ZoomAccount};
use meetbot_core::concurrency::map_bounded;
use meetbot_core::domain::meeting::{
    default_topic, EditForm, MeetingAction, MeetingForm, MeetingId, MeetingPassword,
};
use meetbot_core::domain::metadata::{
    decode, EditModalState, MeetingActionRef, MeetingEditRef, ModalState,
};
use meetbot_core::errors::{ApplicationError, DomainError};
use meetbot_core::schedule::{parse_zoom_timestamp, Schedule};
use meetbot_slack::blocks::MessageTemplate;
use meetbot_slack::commands::{CommandEnvelope, CommandRouteError, MeetingCommandService};
use meetbot_slack::events::{
    BlockActionService, EventContext, EventHandlerError, ViewSubmissionOutcome,
    ViewSubmissionService,
};
use meetbot_slack::forms::{parse_edit_form, parse_meeting_form, FieldErrors};
use meetbot_slack::interactions::{BlockActionEvent, ViewState, ViewSubmission};
use meetbot_slack::messages::{
    error_message, meeting_created_message, meeting_deleted_message, meeting_list_message,
    meeting_updated_message, ListedDay, ListedMeeting, MeetingCard, MeetingList,
    DELETE_MEETING_ACTION, EDIT_MEETING_ACTION,
};
use meetbot_slack::modals::{
    edit_meeting_modal, meeting_modal, EditPrefill, ACCOUNT_BLOCK, ACTION_BLOCK, ACTION_SELECT,
    EDIT_MODAL_CALLBACK_ID, MEETING_MODAL_CALLBACK_ID, TOPIC_BLOCK,
};
use meetbot_slack::web::SlackApi;
use meetbot_zoom::{
    Clock, CreateMeetingRequest, ListType, UpdateMeetingRequest, ZoomApi, ZoomError, ZoomMeeting,
};
use tracing::{debug, error, info, warn};

pub struct MeetingWorkflows {
    accounts: AccountDirectory,
    schedule: Schedule,
    zoom: Arc<dyn ZoomApi>,
    slack: Arc<dyn SlackApi>,
    clock: Arc<dyn Clock>,
    detail_concurrency: usize,
}

impl MeetingWorkflows {
    pub fn new(
        accounts: AccountDirectory,
        schedule: Schedule,
        zoom: Arc<dyn ZoomApi>,
        slack: Arc<dyn SlackApi>,
        clock: Arc<dyn Clock>,
        detail_concurrency: usize,
    ) -> Self {
        Self { accounts, schedule, zoom, slack, clock, detail_concurrency }
    }

    fn today(&self) -> NaiveDate {
        self.schedule.today(self.clock.now())
    }

    async fn submit_meeting_modal(
        &self,
        submission: &ViewSubmission,
        ctx: &EventContext,
    ) -> Result<ViewSubmissionOutcome, EventHandlerError> {
        let state: ModalState = decode("private_metadata", &submission.view.private_metadata)?;
        let form = match parse_meeting_form(&submission.view.state) {
            Ok(form) => form,
            Err(errors) => return Ok(ViewSubmissionOutcome::Errors(errors)),
        };

        let outcome = match form.action {
            MeetingAction::Create => {
                let account = match self.single_account(&form.account) {
                    Ok(account) => account,
                    Err(message) => {
                        return Ok(ViewSubmissionOutcome::Errors(FieldErrors::single(
                            ACCOUNT_BLOCK,
                            message,
                        )))
                    }
                };
                self.create_meeting(account, form, ctx).await
            }
            MeetingAction::List => {
                let accounts = match self.accounts.resolve(&form.account) {
                    Ok(accounts) => accounts,
                    Err(error) => {
                        return Ok(ViewSubmissionOutcome::Errors(FieldErrors::single(
                            ACCOUNT_BLOCK,
                            error.to_string(),
                        )))
                    }
                };
                self.list_meetings(&form, &accounts, ctx).await
            }
        };

        let message = outcome.unwrap_or_else(|error| {
            warn!(
                event_name = "meeting.modal.failed",
                correlation_id = %ctx.correlation_id,
                user_id = %state.user_id,
                action = form_action_label(&submission.view.state),
                error = %error,
                "meeting modal submission failed"
            );
            error_message(&error.user_message())
        });
        self.respond(&state.response_url, &message, ctx).await;
        Ok(ViewSubmissionOutcome::Close)
    }

    fn single_account(&self, selection: &AccountSelection) -> Result<&ZoomAccount, String> {
        match selection {
            AccountSelection::All => Err(DomainError::AccountRequired.to_string()),
            AccountSelection::One(id) => self.accounts.by_id(id).map_err(|error| error.to_string()),
        }
    }

    async fn create_meeting(
        &self,
        account: &ZoomAccount,
        form: MeetingForm,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, ApplicationError> {
        let date = form.date.unwrap_or_else(|| self.today());
        let topic = form.topic.unwrap_or_else(|| default_topic(date));
        let duration = form.duration.unwrap_or_else(|| self.schedule.default_duration());
        let password = form.password.unwrap_or_else(MeetingPassword::random).into_inner();

        let request = CreateMeetingRequest::scheduled(
            topic,
            self.schedule.local_start_time(date, form.time),
            duration.minutes(),
            self.schedule.timezone(),
            Some(password.clone()),
        );
        let meeting = self
            .zoom
            .create_meeting(account, &request)
            .await
            .map_err(|error| zoom_failure(error, "create_meeting", account, ctx))?;

        info!(
            event_name = "meeting.created",
            correlation_id = %ctx.correlation_id,
            account_id = %account.id,
            meeting_id = meeting.id,
            start_time = %request.start_time,
            "zoom meeting created"
        );
        Ok(meeting_created_message(&self.card(account, meeting, Some(password))))
    }

    async fn list_meetings(
        &self,
        form: &MeetingForm,
        accounts: &[&ZoomAccount],
        ctx: &EventContext,
    ) -> Result<MessageTemplate, ApplicationError> {
        let window = self.schedule.window(form.date.unwrap_or_else(|| self.today()));
        let zoom = self.zoom.as_ref();

        let listings: Vec<(&ZoomAccount, Result<Vec<ZoomMeeting>, ZoomError>)> = (Box::pin(map_bounded(
            accounts.iter().copied(),
            self.detail_concurrency,
            move |account| async move { (account, zoom.list_all_meetings(account, ListType::Scheduled).await) },
        )) as std::pin::Pin<Box<dyn std::future::Future<Output = _> + Send + '_>>)
            .await;

        let mut meetings = Vec::new();
        let mut failures = Vec::new();
        for (account, listing) in listings {
            match listing {
                Ok(found) => meetings.extend(found.into_iter().map(|meeting| (account, meeting))),
                Err(error) => failures.push(zoom_failure(error, "list_meetings", account, ctx)),
            }
        }
        // One unreachable account should not hide the others.
        if failures.len() == accounts.len() {
            if let Some(first) = failures.into_iter().next() {
                return Err(first);
            }
        }

        let days = self.schedule.bucket_by_day(&window, meetings, |(_, meeting)| {
            meeting.start_time.as_deref().and_then(parse_zoom_timestamp)
        });

        // The list endpoint omits passwords; fetch them per meeting.
        let lookups: Vec<(&ZoomAccount, MeetingId)> = days
            .iter()
            .flat_map(|day| day.items.iter())
            .map(|(account, meeting)| (*account, MeetingId::from(meeting.id)))
            .collect();
        let details: Vec<Result<Option<String>, ZoomError>> = (Box::pin(map_bounded(
            lookups,
            self.detail_concurrency,
            move |(account, meeting_id)| async move {
                zoom.get_meeting(account, &meeting_id).await.map(|detail| detail.password)
            },
        )) as std::pin::Pin<Box<dyn std::future::Future<Output = _> + Send + '_>>)
            .await;

        let mut details = details.into_iter();
        let mut listed_days = Vec::with_capacity(days.len());
        let mut count = 0usize;
        for day in days {
            let mut listed = Vec::with_capacity(day.items.len());
            for (account, meeting) in day.items {
                let password = match details.next() {
                    Some(Ok(password)) => password,
                    Some(Err(error)) => {
                        warn!(
                            event_name = "zoom.meeting.detail_failed",
                            correlation_id = %ctx.correlation_id,
                            account_id = %account.id,
                            meeting_id = meeting.id,
                            error = %error,
                            "meeting details unavailable; listing without password"
                        );
                        None
                    }
                    None => None,
                };
                listed.push(self.listed_meeting(account, meeting, password));
            }
            count += listed.len();
            listed_days.push(ListedDay { label: self.schedule.day_label(day.date), meetings: listed });
        }

        let range_label = match (window.first(), window.last()) {
            (Some(first), Some(last)) => self.schedule.range_label(*first, *last),
            _ => String::new(),
        };
        let (account_label, show_account_names) = match (&form.account, accounts) {
            (AccountSelection::One(_), [account]) => (account.name.clone(), false),
            _ => ("All accounts".to_owned(), accounts.len() > 1),
        };

        info!(
            event_name = "meeting.listed",
            correlation_id = %ctx.correlation_id,
            accounts = accounts.len(),
            meetings = count,
            "meetings listed"
        );
        Ok(meeting_list_message(&MeetingList {
            range_label,
            account_label,
            show_account_names,
            days: listed_days,
        })?)
    }

    fn listed_meeting(
        &self,
        account: &ZoomAccount,
        meeting: ZoomMeeting,
        password: Option<String>,
    ) -> ListedMeeting {
        let time_range = match meeting.start_time.as_deref().and_then(parse_zoom_timestamp) {
            Some(start) => format!(
                "{} - {}",
                self.schedule.clock_label(start),
                self.schedule.end_clock_label(start, meeting.duration)
            ),
            None => "--:--".to_owned(),
        };

        ListedMeeting {
            id: MeetingId::from(meeting.id),
            topic: meeting.topic,
            start_time: meeting.start_time.unwrap_or_default(),
            time_range,
            duration_minutes: meeting.duration,
            password: password.filter(|value| !value.is_empty()).or(meeting.password),
            join_url: meeting.join_url,
            account_id: account.id.clone(),
            account_name: account.name.clone(),
        }
    }

    fn card(
        &self,
        account: &ZoomAccount,
        meeting: ZoomMeeting,
        fallback_password: Option<String>,
    ) -> MeetingCard {
        let start_label = match meeting.start_time.as_deref() {
            Some(raw) => parse_zoom_timestamp(raw)
                .map(|start| self.schedule.full_label(start))
                .unwrap_or_else(|| raw.to_owned()),
            None => "not scheduled".to_owned(),
        };

        MeetingCard {
            id: meeting.id.to_string(),
            topic: meeting.topic,
            account_name: account.name.clone(),
            start_label,
            duration_minutes: meeting.duration,
            password: meeting.password.filter(|value| !value.is_empty()).or(fallback_password),
            join_url: meeting.join_url,
        }
    }

    async fn submit_edit_modal(
        &self,
        submission: &ViewSubmission,
        ctx: &EventContext,
    ) -> Result<ViewSubmissionOutcome, EventHandlerError> {
        let state: EditModalState = decode("private_metadata", &submission.view.private_metadata)?;
        let form = match parse_edit_form(&submission.view.state) {
            Ok(form) => form,
            Err(errors) => return Ok(ViewSubmissionOutcome::Errors(errors)),
        };
        let has_response_url = !state.response_url.trim().is_empty();

        match self.update_meeting(&state, form, ctx).await {
            Ok(message) => {
                if has_response_url {
                    self.respond(&state.response_url, &message, ctx).await;
                } else {
                    debug!(
                        event_name = "meeting.updated.no_reply",
                        correlation_id = %ctx.correlation_id,
                        meeting_id = %state.meeting_id,
                        "edit modal carried no response_url"
                    );
                }
                Ok(ViewSubmissionOutcome::Close)
            }
            Err(error) => {
                warn!(
                    event_name = "meeting.update.failed",
                    correlation_id = %ctx.correlation_id,
                    meeting_id = %state.meeting_id,
                    error = %error,
                    "meeting update failed"
                );
                if has_response_url {
                    self.respond(&state.response_url, &error_message(&error.user_message()), ctx)
                        .await;
                    Ok(ViewSubmissionOutcome::Close)
                } else {
                    Ok(ViewSubmissionOutcome::Errors(FieldErrors::single(
                        TOPIC_BLOCK,
                        error.user_message(),
                    )))
                }
            }
        }
    }

    async fn update_meeting(
        &self,
        state: &EditModalState,
        form: EditForm,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, ApplicationError> {
        let account = self.accounts.by_id_or_default(state.account_id.as_deref())?;
        let date = form.date.unwrap_or_else(|| self.today());
        let has_password = form.password.is_some();

        let request = UpdateMeetingRequest {
            topic: Some(form.topic),
            start_time: Some(self.schedule.local_start_time(date, form.time)),
            duration: Some(form.duration.minutes()),
            timezone: Some(self.schedule.timezone().to_owned()),
            password: form.password.map(MeetingPassword::into_inner),
        };
        self.zoom
            .update_meeting(account, &state.meeting_id, &request)
            .await
            .map_err(|error| zoom_failure(error, "update_meeting", account, ctx))?;
        info!(
            event_name = "meeting.updated",
            correlation_id = %ctx.correlation_id,
            account_id = %account.id,
            meeting_id = %state.meeting_id,
            has_password,
            "zoom meeting updated"
        );

        let meeting = self
            .zoom
            .get_meeting(account, &state.meeting_id)
            .await
            .map_err(|error| zoom_failure(error, "get_meeting", account, ctx))?;
        Ok(meeting_updated_message(&self.card(account, meeting, None)))
    }

    async fn delete_meeting(
        &self,
        value: &str,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, ApplicationError> {
        let reference = MeetingActionRef::parse_button_value(value)?;
        let account = self.accounts.by_id_or_default(reference.account_id.as_deref())?;

        self.zoom
            .delete_meeting(account, &reference.meeting_id)
            .await
            .map_err(|error| zoom_failure(error, "delete_meeting", account, ctx))?;
        info!(
            event_name = "meeting.deleted",
            correlation_id = %ctx.correlation_id,
            account_id = %account.id,
            meeting_id = %reference.meeting_id,
            "zoom meeting deleted"
        );
        Ok(meeting_deleted_message(&reference.meeting_id))
    }

    async fn open_edit_modal(
        &self,
        value: &str,
        trigger_id: &str,
        response_url: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        let reference: MeetingEditRef = decode("edit payload", value)?;
        let meeting_id = MeetingId::parse(reference.id.as_str())?;
        let account = self.accounts.by_id_or_default(reference.account_id.as_deref())?;

        let (date, time) = match parse_zoom_timestamp(&reference.start_time) {
            Some(start) => self.schedule.local_date_and_time(start),
            None => (self.today(), self.schedule.default_start_time()),
        };
        let prefill =
            EditPrefill { topic: reference.topic, date, time, duration_minutes: reference.duration };
        let state = EditModalState {
            meeting_id,
            account_id: Some(account.id.clone()),
            response_url: response_url.to_owned(),
        };
        let view = edit_meeting_modal(&prefill, &state)?;

        self.slack.open_view(trigger_id, &view).await.map_err(|error| {
            error!(
                event_name = "slack.edit_modal.open_failed",
                correlation_id = %ctx.correlation_id,
                meeting_id = %state.meeting_id,
                error = %error,
                "could not open edit modal"
            );
            ApplicationError::Integration("Could not open the edit form. Please try again.".to_owned())
        })?;
        debug!(
            event_name = "slack.edit_modal.opened",
            correlation_id = %ctx.correlation_id,
            meeting_id = %state.meeting_id,
            "edit modal opened"
        );
        Ok(())
    }

    async fn respond(&self, response_url: &str, message: &MessageTemplate, ctx: &EventContext) {
        if response_url.trim().is_empty() {
            warn!(
                event_name = "slack.response.skipped",
                correlation_id = %ctx.correlation_id,
                "no response_url to reply to"
            );
            return;
        }
        if let Err(error) = self.slack.post_response(response_url, message).await {
            error!(
                event_name = "slack.response.failed",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "could not post reply to response_url"
            );
        }
    }
}

fn zoom_failure(
    error: ZoomError,
    operation: &'static str,
    account: &ZoomAccount,
    ctx: &EventContext,
) -> ApplicationError {
    warn!(
        event_name = "zoom.request.failed",
        correlation_id = %ctx.correlation_id,
        account_id = %account.id,
        operation,
        error_code = ?error.code(),
        error = %error,
        "zoom request failed"
    );
    if error.is_not_found() {
        return ApplicationError::NotFound(error.user_message());
    }
    ApplicationError::Integration(error.user_message())
}

fn form_action_label(state: &ViewState) -> &str {
    state.value(ACTION_BLOCK, ACTION_SELECT).unwrap_or("unknown")
}

#[async_trait]
impl MeetingCommandService for MeetingWorkflows {
    async fn open_meeting_modal(&self, envelope: &CommandEnvelope) -> Result<(), CommandRouteError> {
        let view = meeting_modal(
            &self.accounts,
            self.today(),
            self.schedule.default_duration(),
            envelope.preset_action,
            &envelope.modal_state(),
        )
        .map_err(|error| CommandRouteError::Service(error.to_string()))?;

        self.slack.open_view(&envelope.trigger_id, &view).await.map_err(|error| {
            warn!(
                event_name = "slack.modal.open_failed",
                user_id = %envelope.user_id,
                error = %error,
                "could not open meeting modal"
            );
            CommandRouteError::Service(error.to_string())
        })?;

        info!(
            event_name = "slack.modal.opened",
            user_id = %envelope.user_id,
            channel_id = %envelope.channel_id,
            preset_action = envelope.preset_action.map(MeetingAction::as_value).unwrap_or("none"),
            "meeting modal opened"
        );
        Ok(())
    }
}

#[async_trait]
impl ViewSubmissionService for MeetingWorkflows {
    async fn submit_view(
        &self,
        submission: &ViewSubmission,
        ctx: &EventContext,
    ) -> Result<ViewSubmissionOutcome, EventHandlerError> {
        match submission.view.callback_id.as_str() {
            MEETING_MODAL_CALLBACK_ID => self.submit_meeting_modal(submission, ctx).await,
            EDIT_MODAL_CALLBACK_ID => self.submit_edit_modal(submission, ctx).await,
            other => {
                debug!(
                    event_name = "slack.view.ignored",
                    correlation_id = %ctx.correlation_id,
                    callback_id = other,
                    "unknown view callback"
                );
                Ok(ViewSubmissionOutcome::Close)
            }
        }
    }
}

#[async_trait]
impl BlockActionService for MeetingWorkflows {
    async fn handle_block_action(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let Some(action) = event.first_action() else {
            return Ok(());
        };
        let value = action.value.as_deref().unwrap_or_default();
        let response_url = event.response_url.as_deref().unwrap_or_default();

        let outcome = match action.action_id.as_str() {
            DELETE_MEETING_ACTION => self.delete_meeting(value, ctx).await.map(Some),
            EDIT_MEETING_ACTION => self
                .open_edit_modal(value, &event.trigger_id, response_url, ctx)
                .await
                .map(|()| None),
            other => {
                debug!(
                    event_name = "slack.block_action.ignored",
                    correlation_id = %ctx.correlation_id,
                    action_id = other,
                    "unknown block action"
                );
                return Ok(());
            }
        };

        let reply = outcome.unwrap_or_else(|error| {
            warn!(
                event_name = "slack.block_action.failed",
                correlation_id = %ctx.correlation_id,
                action_id = %action.action_id,
                user_id = %event.user.id,
                error = %error,
                "block action failed"
            );
            Some(error_message(&error.user_message()))
        });
        if let Some(message) = reply {
            self.respond(response_url, &message, ctx).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, NaiveTime, TimeZone, Utc};
    use meetbot_core::accounts::{AccountDirectory, ZoomAccount};
    use meetbot_core::domain::meeting::{MeetingAction, MeetingDuration, MeetingId};
    use meetbot_core::domain::metadata::{encode, EditModalState, ModalState};
    use meetbot_core::errors::ApplicationError;
    use meetbot_core::schedule::Schedule;
    use meetbot_slack::blocks::{MessageTemplate, ModalView, ResponseType};
    use meetbot_slack::commands::{CommandEnvelope, MeetingCommandService};
    use meetbot_slack::events::{
        BlockActionService, EventContext, ViewSubmissionOutcome, ViewSubmissionService,
    };
    use meetbot_slack::interactions::{BlockActionEvent, ViewSubmission};
    use meetbot_slack::web::{SlackApi, SlackApiError};
    use meetbot_zoom::{
        Clock, CreateMeetingRequest, ListMeetingsResponse, ListType, UpdateMeetingRequest,
        ZoomApi, ZoomError, ZoomMeeting,
    };
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use super::MeetingWorkflows;

    const RESPONSE_URL: &str = "https://hooks.slack.com/commands/T1/1/abc";

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct FakeZoom {
        meetings: HashMap<String, Vec<ZoomMeeting>>,
        unreachable_accounts: HashSet<String>,
        failing_details: HashSet<u64>,
        delete_error: Option<ZoomError>,
        created: Mutex<Vec<(String, CreateMeetingRequest)>>,
        updated: Mutex<Vec<(String, String, UpdateMeetingRequest)>>,
        deleted: Mutex<Vec<(String, String)>>,
    }

    impl FakeZoom {
        fn find(&self, meeting_id: &MeetingId) -> Option<ZoomMeeting> {
            self.meetings
                .values()
                .flatten()
                .find(|meeting| meeting.id.to_string() == meeting_id.as_str())
                .cloned()
        }
    }

    fn not_found() -> ZoomError {
        ZoomError::Api { status: 404, code: Some(3001), message: "Meeting does not exist".into() }
    }

    #[async_trait]
    impl ZoomApi for FakeZoom {
        async fn create_meeting(
            &self,
            account: &ZoomAccount,
            request: &CreateMeetingRequest,
        ) -> Result<ZoomMeeting, ZoomError> {
            self.created.lock().expect("lock").push((account.id.clone(), request.clone()));
            Ok(ZoomMeeting {
                id: 85_012_345_678,
                topic: request.topic.clone(),
                start_time: Some("2026-10-20T00:00:00Z".to_owned()),
                duration: request.duration,
                timezone: Some(request.timezone.clone()),
                join_url: "https://zoom.us/j/85012345678".to_owned(),
                password: request.password.clone(),
            })
        }

        async fn list_meetings(
            &self,
            account: &ZoomAccount,
            _list_type: ListType,
            _page_size: u32,
            _next_page_token: Option<&str>,
        ) -> Result<ListMeetingsResponse, ZoomError> {
            let meetings = self.meetings.get(&account.id).cloned().unwrap_or_default();
            Ok(ListMeetingsResponse { meetings, ..ListMeetingsResponse::default() })
        }

        async fn list_all_meetings(
            &self,
            account: &ZoomAccount,
            _list_type: ListType,
        ) -> Result<Vec<ZoomMeeting>, ZoomError> {
            if self.unreachable_accounts.contains(&account.id) {
                return Err(ZoomError::Transport("connection refused".to_owned()));
            }
            Ok(self.meetings.get(&account.id).cloned().unwrap_or_default())
        }

        async fn get_meeting(
            &self,
            _account: &ZoomAccount,
            meeting_id: &MeetingId,
        ) -> Result<ZoomMeeting, ZoomError> {
            let meeting = self.find(meeting_id).ok_or_else(not_found)?;
            if self.failing_details.contains(&meeting.id) {
                return Err(ZoomError::Transport("timeout".to_owned()));
            }
            Ok(ZoomMeeting { password: Some(format!("pw{}", meeting.id % 100)), ..meeting })
        }

        async fn update_meeting(
            &self,
            account: &ZoomAccount,
            meeting_id: &MeetingId,
            request: &UpdateMeetingRequest,
        ) -> Result<(), ZoomError> {
            self.updated.lock().expect("lock").push((
                account.id.clone(),
                meeting_id.as_str().to_owned(),
                request.clone(),
            ));
            Ok(())
        }

        async fn delete_meeting(
            &self,
            account: &ZoomAccount,
            meeting_id: &MeetingId,
        ) -> Result<(), ZoomError> {
            if let Some(error) = &self.delete_error {
                return Err(error.clone());
            }
            self.deleted
                .lock()
                .expect("lock")
                .push((account.id.clone(), meeting_id.as_str().to_owned()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSlack {
        views: Mutex<Vec<(String, ModalView)>>,
        posts: Mutex<Vec<(String, MessageTemplate)>>,
    }

    impl FakeSlack {
        fn posts(&self) -> Vec<(String, MessageTemplate)> {
            self.posts.lock().expect("lock").clone()
        }

        fn views(&self) -> Vec<(String, ModalView)> {
            self.views.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl SlackApi for FakeSlack {
        async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), SlackApiError> {
            self.views.lock().expect("lock").push((trigger_id.to_owned(), view.clone()));
            Ok(())
        }

        async fn post_response(
            &self,
            response_url: &str,
            message: &MessageTemplate,
        ) -> Result<(), SlackApiError> {
            self.posts.lock().expect("lock").push((response_url.to_owned(), message.clone()));
            Ok(())
        }
    }

    fn account(id: &str, name: &str) -> ZoomAccount {
        ZoomAccount {
            id: id.to_owned(),
            name: name.to_owned(),
            account_id: format!("acct-{id}"),
            client_id: format!("client-{id}"),
            client_secret: SecretString::from(format!("secret-{id}")),
        }
    }

    fn meeting(id: u64, topic: &str, start_time: &str, duration: u32) -> ZoomMeeting {
        ZoomMeeting {
            id,
            topic: topic.to_owned(),
            start_time: Some(start_time.to_owned()),
            duration,
            timezone: Some("Asia/Tokyo".to_owned()),
            join_url: format!("https://zoom.us/j/{id}"),
            password: None,
        }
    }

    fn workflows(zoom: Arc<FakeZoom>, slack: Arc<FakeSlack>) -> MeetingWorkflows {
        let accounts =
            AccountDirectory::new(vec![account("room1", "Room 1"), account("room2", "Room 2")])
                .expect("accounts");
        let schedule = Schedule::new(
            "Asia/Tokyo",
            540,
            NaiveTime::from_hms_opt(9, 0, 0).expect("time"),
            MeetingDuration::DEFAULT,
            7,
        )
        .expect("schedule");
        // 2026-10-20 08:30 in Tokyo.
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 23, 30, 0).single().expect("now");
        MeetingWorkflows::new(accounts, schedule, zoom, slack, Arc::new(FixedClock(now)), 4)
    }

    fn modal_metadata() -> String {
        encode(&ModalState {
            response_url: RESPONSE_URL.to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
        })
        .expect("metadata")
    }

    fn submission(callback_id: &str, private_metadata: String, values: Value) -> ViewSubmission {
        serde_json::from_value(json!({
            "user": {"id": "U1"},
            "view": {
                "id": "V1",
                "callback_id": callback_id,
                "private_metadata": private_metadata,
                "state": {"values": values},
            }
        }))
        .expect("submission")
    }

    fn select(action_id: &str, value: &str) -> Value {
        json!({ action_id: {"type": "static_select", "selected_option": {"value": value}} })
    }

    fn text(action_id: &str, value: &str) -> Value {
        json!({ action_id: {"type": "plain_text_input", "value": value} })
    }

    fn block_action(action_id: &str, value: &str, response_url: Option<&str>) -> BlockActionEvent {
        serde_json::from_value(json!({
            "user": {"id": "U1"},
            "trigger_id": "trigger-2",
            "response_url": response_url,
            "actions": [{"action_id": action_id, "block_id": "meeting.room2.42", "value": value}],
        }))
        .expect("block action")
    }

    fn rendered(message: &MessageTemplate) -> String {
        serde_json::to_string(message).expect("message json")
    }

    #[tokio::test]
    async fn slash_command_opens_modal_with_today_in_display_timezone() {
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(Arc::new(FakeZoom::default()), slack.clone());

        service
            .open_meeting_modal(&CommandEnvelope {
                command: "/meeting".to_owned(),
                preset_action: Some(MeetingAction::List),
                channel_id: "C1".to_owned(),
                user_id: "U1".to_owned(),
                trigger_id: "trigger-1".to_owned(),
                response_url: RESPONSE_URL.to_owned(),
            })
            .await
            .expect("open modal");

        let views = slack.views();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].0, "trigger-1");
        assert_eq!(views[0].1.callback_id, "meeting_modal");
        let view = serde_json::to_string(&views[0].1).expect("view json");
        assert!(view.contains("\"initial_date\":\"2026-10-20\""));
        assert!(views[0].1.private_metadata.contains("responseUrl"));
    }

    #[tokio::test]
    async fn create_fills_defaults_and_posts_in_channel_card() {
        let zoom = Arc::new(FakeZoom::default());
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(zoom.clone(), slack.clone());

        let outcome = service
            .submit_view(
                &submission(
                    "meeting_modal",
                    modal_metadata(),
                    json!({
                        "action_block": select("action_select", "create"),
                        "account_block": select("account_select", "room2"),
                    }),
                ),
                &EventContext::default(),
            )
            .await
            .expect("submit");
        assert_eq!(outcome, ViewSubmissionOutcome::Close);

        let created = zoom.created.lock().expect("lock").clone();
        assert_eq!(created.len(), 1);
        let (account_id, request) = &created[0];
        assert_eq!(account_id, "room2");
        assert_eq!(request.topic, "Slack Meeting (2026-10-20)");
        assert_eq!(request.start_time, "2026-10-20T09:00:00");
        assert_eq!(request.duration, 60);
        assert_eq!(request.timezone, "Asia/Tokyo");
        let password = request.password.clone().expect("generated password");
        assert!(!password.is_empty() && password.len() <= 10);

        let posts = slack.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, RESPONSE_URL);
        assert_eq!(posts[0].1.response_type, Some(ResponseType::InChannel));
        let body = rendered(&posts[0].1);
        assert!(body.contains("Room 2"));
        assert!(body.contains("2026-10-20 (Tue) 09:00"));
        assert!(body.contains(&password));
    }

    #[tokio::test]
    async fn create_for_all_accounts_is_rejected_inline() {
        let zoom = Arc::new(FakeZoom::default());
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(zoom.clone(), slack.clone());

        let outcome = service
            .submit_view(
                &submission(
                    "meeting_modal",
                    modal_metadata(),
                    json!({
                        "action_block": select("action_select", "create"),
                        "account_block": select("account_select", "all"),
                    }),
                ),
                &EventContext::default(),
            )
            .await
            .expect("submit");

        let ViewSubmissionOutcome::Errors(errors) = outcome else {
            panic!("expected inline errors, got {outcome:?}");
        };
        assert!(errors.get("account_block").is_some());
        assert!(zoom.created.lock().expect("lock").is_empty());
        assert!(slack.posts().is_empty());
    }

    #[tokio::test]
    async fn list_buckets_the_week_and_fills_passwords() {
        let mut zoom = FakeZoom::default();
        zoom.meetings.insert(
            "room1".to_owned(),
            vec![
                meeting(101, "Standup", "2026-10-20T01:00:00Z", 30),
                meeting(102, "Next month", "2026-11-20T01:00:00Z", 30),
            ],
        );
        zoom.meetings.insert(
            "room2".to_owned(),
            vec![
                // 10/19 23:30 UTC is 10/20 08:30 in Tokyo.
                meeting(201, "Early review", "2026-10-19T23:30:00Z", 60),
                meeting(202, "Retro", "2026-10-23T05:00:00Z", 90),
            ],
        );
        zoom.failing_details.insert(202);
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(Arc::new(zoom), slack.clone());

        let outcome = service
            .submit_view(
                &submission(
                    "meeting_modal",
                    modal_metadata(),
                    json!({
                        "action_block": select("action_select", "list"),
                        "account_block": select("account_select", "all"),
                    }),
                ),
                &EventContext::default(),
            )
            .await
            .expect("submit");
        assert_eq!(outcome, ViewSubmissionOutcome::Close);

        let posts = slack.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1.response_type, Some(ResponseType::Ephemeral));
        let body = rendered(&posts[0].1);
        assert!(body.contains("Schedule for 10/20 - 10/26"));
        assert!(body.contains("All accounts"));
        assert!(body.contains("08:30 - 09:30"));
        assert!(body.contains("10:00 - 10:30"));
        assert!(body.contains("14:00 - 15:30"));
        assert!(!body.contains("Next month"));
        assert!(body.contains("pw1"));
        assert!(body.contains("_none_"));
        assert!(body.contains("Account: Room 2"));
        let early = body.find("Early review").expect("early");
        let standup = body.find("Standup").expect("standup");
        assert!(early < standup);
    }

    #[tokio::test]
    async fn list_keeps_reachable_accounts_and_reports_total_failure() {
        let mut zoom = FakeZoom::default();
        zoom.meetings
            .insert("room1".to_owned(), vec![meeting(101, "Standup", "2026-10-20T01:00:00Z", 30)]);
        zoom.unreachable_accounts.insert("room2".to_owned());
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(Arc::new(zoom), slack.clone());

        let values = json!({
            "action_block": select("action_select", "list"),
            "account_block": select("account_select", "all"),
        });
        service
            .submit_view(
                &submission("meeting_modal", modal_metadata(), values),
                &EventContext::default(),
            )
            .await
            .expect("partial");
        assert!(rendered(&slack.posts()[0].1).contains("Standup"));

        let values = json!({
            "action_block": select("action_select", "list"),
            "account_block": select("account_select", "room2"),
        });
        service
            .submit_view(
                &submission("meeting_modal", modal_metadata(), values),
                &EventContext::default(),
            )
            .await
            .expect("failure");
        let failure = &slack.posts()[1].1;
        assert!(failure.fallback_text.starts_with("Error: Could not reach Zoom"));
    }

    #[tokio::test]
    async fn delete_button_routes_to_the_payload_account() {
        let zoom = Arc::new(FakeZoom::default());
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(zoom.clone(), slack.clone());

        service
            .handle_block_action(
                &block_action(
                    "delete_meeting",
                    r#"{"meetingId":"42","accountId":"room2"}"#,
                    Some(RESPONSE_URL),
                ),
                &EventContext::default(),
            )
            .await
            .expect("delete");

        assert_eq!(
            zoom.deleted.lock().expect("lock").clone(),
            vec![("room2".to_owned(), "42".to_owned())]
        );
        assert_eq!(slack.posts()[0].1.fallback_text, "Meeting (ID: 42) deleted.");
    }

    #[tokio::test]
    async fn delete_of_missing_meeting_posts_friendly_error() {
        let zoom = Arc::new(FakeZoom { delete_error: Some(not_found()), ..FakeZoom::default() });
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(zoom, slack.clone());

        service
            .handle_block_action(
                &block_action("delete_meeting", "42", Some(RESPONSE_URL)),
                &EventContext::default(),
            )
            .await
            .expect("handled");

        assert_eq!(
            slack.posts()[0].1.fallback_text,
            "Error: Meeting not found. It may already have been deleted."
        );
    }

    #[tokio::test]
    async fn edit_button_opens_prefilled_modal_in_local_time() {
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(Arc::new(FakeZoom::default()), slack.clone());
        let value = json!({
            "id": "42",
            "topic": "Weekly sync",
            "start_time": "2026-10-21T23:15:00Z",
            "duration": 45,
            "accountId": "room2",
        })
        .to_string();

        service
            .handle_block_action(
                &block_action("edit_meeting", &value, Some(RESPONSE_URL)),
                &EventContext::default(),
            )
            .await
            .expect("edit");

        let views = slack.views();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].0, "trigger-2");
        assert_eq!(views[0].1.callback_id, "edit_meeting_modal");
        let view = serde_json::to_string(&views[0].1).expect("view json");
        assert!(view.contains("\"initial_date\":\"2026-10-22\""));
        assert!(view.contains("\"initial_time\":\"08:15\""));
        assert!(view.contains("Weekly sync"));

        let state: EditModalState =
            serde_json::from_str(&views[0].1.private_metadata).expect("state");
        assert_eq!(state.meeting_id.as_str(), "42");
        assert_eq!(state.account_id.as_deref(), Some("room2"));
        assert_eq!(state.response_url, RESPONSE_URL);
        assert!(slack.posts().is_empty());
    }

    fn edit_values(password: Option<&str>) -> Value {
        let mut values = json!({
            "topic_block": text("topic_input", "Weekly sync v2"),
            "date_block": {"date_select": {"type": "datepicker", "selected_date": "2026-10-22"}},
            "time_block": {"time_select": {"type": "timepicker", "selected_time": "10:30"}},
            "duration_block": select("duration_select", "120"),
        });
        if let Some(password) = password {
            values["password_block"] = text("password_input", password);
        }
        values
    }

    fn edit_metadata(response_url: &str) -> String {
        encode(&EditModalState {
            meeting_id: MeetingId("201".to_owned()),
            account_id: Some("room2".to_owned()),
            response_url: response_url.to_owned(),
        })
        .expect("metadata")
    }

    #[tokio::test]
    async fn edit_submit_updates_and_posts_refreshed_card() {
        let mut zoom = FakeZoom::default();
        zoom.meetings
            .insert("room2".to_owned(), vec![meeting(201, "Weekly sync", "2026-10-22T01:30:00Z", 120)]);
        let zoom = Arc::new(zoom);
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(zoom.clone(), slack.clone());

        let outcome = service
            .submit_view(
                &submission("edit_meeting_modal", edit_metadata(RESPONSE_URL), edit_values(None)),
                &EventContext::default(),
            )
            .await
            .expect("submit");
        assert_eq!(outcome, ViewSubmissionOutcome::Close);

        let updated = zoom.updated.lock().expect("lock").clone();
        assert_eq!(updated.len(), 1);
        let (account_id, meeting_id, request) = &updated[0];
        assert_eq!(account_id, "room2");
        assert_eq!(meeting_id, "201");
        assert_eq!(request.topic.as_deref(), Some("Weekly sync v2"));
        assert_eq!(request.start_time.as_deref(), Some("2026-10-22T10:30:00"));
        assert_eq!(request.duration, Some(120));
        assert_eq!(request.timezone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(request.password, None);

        let posts = slack.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1.response_type, Some(ResponseType::Ephemeral));
        assert!(rendered(&posts[0].1).contains("Zoom meeting updated"));
    }

    #[tokio::test]
    async fn edit_submit_sends_password_only_when_given_and_skips_empty_response_url() {
        let mut zoom = FakeZoom::default();
        zoom.meetings
            .insert("room2".to_owned(), vec![meeting(201, "Weekly sync", "2026-10-22T01:30:00Z", 60)]);
        let zoom = Arc::new(zoom);
        let slack = Arc::new(FakeSlack::default());
        let service = workflows(zoom.clone(), slack.clone());

        service
            .submit_view(
                &submission("edit_meeting_modal", edit_metadata(""), edit_values(Some("n3w-pw"))),
                &EventContext::default(),
            )
            .await
            .expect("submit");

        let updated = zoom.updated.lock().expect("lock").clone();
        assert_eq!(updated[0].2.password.as_deref(), Some("n3w-pw"));
        assert!(slack.posts().is_empty());
    }

    #[tokio::test]
    async fn edit_submit_rejects_invalid_password_inline() {
        let zoom = Arc::new(FakeZoom::default());
        let service = workflows(zoom.clone(), Arc::new(FakeSlack::default()));

        let outcome = service
            .submit_view(
                &submission(
                    "edit_meeting_modal",
                    edit_metadata(RESPONSE_URL),
                    edit_values(Some("far too long password")),
                ),
                &EventContext::default(),
            )
            .await
            .expect("submit");

        assert!(matches!(
            outcome,
            ViewSubmissionOutcome::Errors(errors) if errors.get("password_block").is_some()
        ));
        assert!(zoom.updated.lock().expect("lock").is_empty());
    }

    #[test]
    fn zoom_not_found_is_reported_as_not_found() {
        let ctx = EventContext::default();
        let room = account("room1", "Room 1");

        let missing = super::zoom_failure(not_found(), "delete_meeting", &room, &ctx);
        assert_eq!(
            missing,
            ApplicationError::NotFound(
                "Meeting not found. It may already have been deleted.".to_owned()
            )
        );

        let busy = ZoomError::Api {
            status: 400,
            code: Some(3002),
            message: "Meeting is in progress".into(),
        };
        assert!(matches!(
            super::zoom_failure(busy, "delete_meeting", &room, &ctx),
            ApplicationError::Integration(_)
        ));
    }
}
