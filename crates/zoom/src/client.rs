use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meetbot_core::accounts::ZoomAccount;
use meetbot_core::config::ZoomConfig;
use meetbot_core::domain::meeting::MeetingId;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use tracing::{error, info, warn};

use crate::auth::ZoomAuthService;
use crate::error::ZoomError;
use crate::types::{
    CreateMeetingRequest, ListMeetingsResponse, ListType, UpdateMeetingRequest, ZoomMeeting,
};

#[async_trait]
pub trait ZoomApi: Send + Sync {
    async fn create_meeting(
        &self,
        account: &ZoomAccount,
        request: &CreateMeetingRequest,
    ) -> Result<ZoomMeeting, ZoomError>;

    async fn list_meetings(
        &self,
        account: &ZoomAccount,
        list_type: ListType,
        page_size: u32,
        next_page_token: Option<&str>,
    ) -> Result<ListMeetingsResponse, ZoomError>;

    /// Every meeting of `list_type`, following `next_page_token`.
    async fn list_all_meetings(
        &self,
        account: &ZoomAccount,
        list_type: ListType,
    ) -> Result<Vec<ZoomMeeting>, ZoomError>;

    async fn get_meeting(
        &self,
        account: &ZoomAccount,
        meeting_id: &MeetingId,
    ) -> Result<ZoomMeeting, ZoomError>;

    async fn update_meeting(
        &self,
        account: &ZoomAccount,
        meeting_id: &MeetingId,
        request: &UpdateMeetingRequest,
    ) -> Result<(), ZoomError>;

    async fn delete_meeting(
        &self,
        account: &ZoomAccount,
        meeting_id: &MeetingId,
    ) -> Result<(), ZoomError>;
}

pub struct HttpZoomClient {
    http: reqwest::Client,
    auth: Arc<ZoomAuthService>,
    base_url: String,
    page_size: u32,
    max_pages: u32,
}

impl HttpZoomClient {
    pub fn new(
        http: reqwest::Client,
        auth: Arc<ZoomAuthService>,
        base_url: impl Into<String>,
        page_size: u32,
        max_pages: u32,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, auth, base_url, page_size: page_size.max(1), max_pages: max_pages.max(1) }
    }

    pub fn from_config(config: &ZoomConfig) -> Result<Self, ZoomError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ZoomError::from)?;
        let auth = Arc::new(ZoomAuthService::new(
            http.clone(),
            config.token_url.clone(),
            config.token_refresh_margin_secs,
        ));
        Ok(Self::new(
            http,
            auth,
            config.api_base_url.clone(),
            config.list_page_size,
            config.max_list_pages,
        ))
    }

    pub fn auth(&self) -> &Arc<ZoomAuthService> {
        &self.auth
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends an authorized request. A 401 drops the rejected token and the
    /// request is replayed once with a fresh one.
    async fn send<F>(&self, account: &ZoomAccount, build: F) -> Result<Response, ZoomError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder + Send + Sync,
    {
        let mut retried = false;
        loop {
            let token = self.auth.access_token(account).await?;
            let response = build(&self.http).bearer_auth(token.expose_secret()).send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !retried {
                warn!(account = %account.id, "zoom rejected access token; refreshing");
                self.auth.invalidate(&account.id, &token).await;
                retried = true;
                continue;
            }
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            let failure = ZoomError::from_body(status.as_u16(), &body);
            error!(account = %account.id, status = %status, code = ?failure.code(), "zoom api error");
            return Err(failure);
        }
    }
}

#[async_trait]
impl ZoomApi for HttpZoomClient {
    async fn create_meeting(
        &self,
        account: &ZoomAccount,
        request: &CreateMeetingRequest,
    ) -> Result<ZoomMeeting, ZoomError> {
        info!(
            account = %account.id,
            topic = %request.topic,
            start_time = %request.start_time,
            has_password = request.password.is_some(),
            "creating zoom meeting"
        );

        let url = self.url("/users/me/meetings");
        let response = self.send(account, |http| http.post(&url).json(request)).await?;
        let meeting: ZoomMeeting = response.json().await?;

        info!(account = %account.id, meeting_id = meeting.id, "zoom meeting created");
        Ok(meeting)
    }

    async fn list_meetings(
        &self,
        account: &ZoomAccount,
        list_type: ListType,
        page_size: u32,
        next_page_token: Option<&str>,
    ) -> Result<ListMeetingsResponse, ZoomError> {
        info!(account = %account.id, list_type = list_type.as_str(), "fetching zoom meetings");

        let url = self.url("/users/me/meetings");
        let page_size = page_size.to_string();
        let response = self
            .send(account, |http| {
                let mut query = vec![("type", list_type.as_str()), ("page_size", page_size.as_str())];
                if let Some(token) = next_page_token {
                    query.push(("next_page_token", token));
                }
                http.get(&url).query(&query)
            })
            .await?;

        Ok(response.json().await?)
    }

    async fn list_all_meetings(
        &self,
        account: &ZoomAccount,
        list_type: ListType,
    ) -> Result<Vec<ZoomMeeting>, ZoomError> {
        let mut meetings = Vec::new();
        let mut next_page: Option<String> = None;

        for _ in 0..self.max_pages {
            let page = self
                .list_meetings(account, list_type, self.page_size, next_page.as_deref())
                .await?;
            next_page = page.next_page().map(str::to_owned);
            meetings.extend(page.meetings);
            if next_page.is_none() {
                return Ok(meetings);
            }
        }

        warn!(
            account = %account.id,
            max_pages = self.max_pages,
            fetched = meetings.len(),
            "zoom meeting list truncated at page limit"
        );
        Ok(meetings)
    }

    async fn get_meeting(
        &self,
        account: &ZoomAccount,
        meeting_id: &MeetingId,
    ) -> Result<ZoomMeeting, ZoomError> {
        info!(account = %account.id, meeting_id = %meeting_id, "fetching zoom meeting details");

        let url = self.url(&format!("/meetings/{meeting_id}"));
        let response = self.send(account, |http| http.get(&url)).await?;
        Ok(response.json().await?)
    }

    async fn update_meeting(
        &self,
        account: &ZoomAccount,
        meeting_id: &MeetingId,
        request: &UpdateMeetingRequest,
    ) -> Result<(), ZoomError> {
        info!(
            account = %account.id,
            meeting_id = %meeting_id,
            topic = ?request.topic,
            start_time = ?request.start_time,
            duration = ?request.duration,
            has_password = request.password.is_some(),
            "updating zoom meeting"
        );

        let url = self.url(&format!("/meetings/{meeting_id}"));
        self.send(account, |http| http.patch(&url).json(request)).await?;

        info!(account = %account.id, meeting_id = %meeting_id, "zoom meeting updated");
        Ok(())
    }

    async fn delete_meeting(
        &self,
        account: &ZoomAccount,
        meeting_id: &MeetingId,
    ) -> Result<(), ZoomError> {
        info!(account = %account.id, meeting_id = %meeting_id, "deleting zoom meeting");

        let url = self.url(&format!("/meetings/{meeting_id}"));
        self.send(account, |http| http.delete(&url)).await?;

        info!(account = %account.id, meeting_id = %meeting_id, "zoom meeting deleted");
        Ok(())
    }
}
