// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the registrar.
//!
//! Cookies are carried explicitly: every request sends the `Cookie` header
//! built from the [`Credential`] it was handed, so the engine's session store
//! stays the single source of truth for which session a request uses.

use std::future::Future;
use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use seatgrab_engine::{
    Acquirer, ContextError, Credential, LoginError, RawResponse, ResourceTarget,
};
use tracing::{debug, info, warn};

use crate::catalog::{parse_listing, Catalog, Course, DayError};
use crate::config::Config;
use crate::windows::{SessionWindow, WindowParser};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Datatable paging form the listing endpoint expects.
const LISTING_FORM: &str = "sEcho=1&iColumns=12&sColumns=&iDisplayStart=0&iDisplayLength=9999\
    &mDataProp_0=kch&mDataProp_1=kcmc&mDataProp_2=fzmc&mDataProp_3=xf\
    &mDataProp_4=skls&mDataProp_5=sksj&mDataProp_6=skdd&mDataProp_7=xqmc\
    &mDataProp_8=xkrs&mDataProp_9=syrs&mDataProp_10=ctsm&mDataProp_11=czOper";

/// Phrases the context page uses when the session may not enter a window.
const CONTEXT_DENIED: &[&str] = &["权限不足", "请重新登录"];

/// Login client that follows no redirects (the success signal is a 302) and
/// a regular client for everything else.
pub struct RegistrarClient {
    origin: String,
    app_root: String,
    catalog_days: u8,
    client: Client,
    login_client: Client,
    windows: WindowParser,
}

impl RegistrarClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        // Already installed is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder().timeout(config.request_timeout()).build()?;
        let login_client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            origin: config.base_url.trim_end_matches('/').to_owned(),
            app_root: config.app_root(),
            catalog_days: config.catalog_days,
            client,
            login_client,
            windows: WindowParser::new()?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.app_root, path)
    }

    /// Resolve a window link: absolute URLs pass through, anything else is
    /// taken relative to the origin.
    fn window_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_owned()
        } else if href.starts_with('/') {
            format!("{}{href}", self.origin)
        } else {
            format!("{}/{href}", self.origin)
        }
    }

    fn with_session(req: RequestBuilder, credential: &Credential) -> RequestBuilder {
        if credential.is_empty() {
            req
        } else {
            req.header(COOKIE, credential.header_value())
        }
    }

    /// Sign in with an encoded account (see [`crate::encode::encode_login`]).
    pub async fn login(&self, encoded: &str) -> Result<Credential, LoginError> {
        let resp = self
            .login_client
            .post(self.url("/xk/LoginToXk"))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(format!("encoded={encoded}"))
            .send()
            .await
            .map_err(|e| LoginError::Transport(e.to_string()))?;

        let status = resp.status();
        let cookies: Vec<(String, String)> =
            resp.cookies().map(|c| (c.name().to_owned(), c.value().to_owned())).collect();

        if status == StatusCode::FOUND {
            if cookies.is_empty() {
                return Err(LoginError::NoCookies);
            }
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            debug!(location = %location, cookies = cookies.len(), "login accepted");
            return Ok(Credential::new(cookies));
        }

        let body = resp.text().await.unwrap_or_default();
        Err(login_failure(status.as_u16(), &body))
    }

    /// Enter a window so later listing and enrollment calls are scoped to it.
    pub async fn establish_context(
        &self,
        credential: &Credential,
        window: &SessionWindow,
    ) -> Result<(), ContextError> {
        if window.url.is_empty() {
            return Err(ContextError::NoWindow);
        }
        let req = self.client.get(self.window_url(&window.url));
        let resp = Self::with_session(req, credential)
            .send()
            .await
            .map_err(|e| ContextError::Transport(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(ContextError::Status(status.as_u16()));
        }
        let body = resp.text().await.map_err(|e| ContextError::Transport(e.to_string()))?;
        if CONTEXT_DENIED.iter().any(|p| body.contains(p)) {
            return Err(ContextError::Forbidden);
        }
        Ok(())
    }

    /// Windows the account may enter.
    pub async fn list_windows(&self, credential: &Credential) -> anyhow::Result<Vec<SessionWindow>> {
        let req = self.client.get(self.url("/xsxk/xklc_list"));
        let resp = Self::with_session(req, credential).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            anyhow::bail!("window list failed: HTTP {}", status.as_u16());
        }
        let html = resp.text().await?;
        let windows = self.windows.parse(&html);
        if windows.is_empty() {
            anyhow::bail!("no enrollment windows found on the window list page");
        }
        info!(count = windows.len(), "enrollment windows found");
        Ok(windows)
    }

    /// Query every configured weekday concurrently and merge the results.
    pub async fn list_courses(&self, credential: &Credential) -> anyhow::Result<Catalog> {
        let days = 1..=self.catalog_days;
        let replies = join_all(days.map(|day| async move {
            (day, self.list_day(credential, day).await)
        }))
        .await;

        for (day, reply) in &replies {
            match reply {
                Ok(courses) => debug!(day, count = courses.len(), "listing received"),
                Err(e) => warn!(day, err = %e, "listing failed"),
            }
        }

        let (catalog, failures) = Catalog::merge(replies)?;
        info!(courses = catalog.len(), failed_days = failures.len(), "catalog loaded");
        Ok(catalog)
    }

    async fn list_day(&self, credential: &Credential, day: u8) -> Result<Vec<Course>, DayError> {
        let url = self.url(&format!(
            "/xsxkkc/xsxkFawxk?kcxx=&skls=&skxq={day}&skjc=&sfym=false&sfct=false&sfxx=true\
             &skxq_xx0103=&kzyxkbx=0&kzyxkxx=0&kzyxkrx=0&kzyxkqt=0"
        ));
        let req = self.client.post(url).header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(LISTING_FORM);
        let resp = Self::with_session(req, credential)
            .send()
            .await
            .map_err(|e| DayError::Transport(e.to_string()))?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(DayError::Status(status.as_u16()));
        }
        let body = resp.text().await.map_err(|e| DayError::Transport(e.to_string()))?;
        parse_listing(&body)
    }

    /// One enrollment attempt. Never fails: transport problems are folded
    /// into the reply for the classifier.
    pub async fn enroll(&self, credential: &Credential, target: &ResourceTarget) -> RawResponse {
        let stamp =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let url =
            self.url(&format!("/xsxkkc/fawxkOper?jx0404id={}&xkzy=&trjf=&_={stamp}", target.id));
        let resp = match Self::with_session(self.client.get(url), credential).send().await {
            Ok(resp) => resp,
            Err(e) => return RawResponse::Transport(e.to_string()),
        };
        let status = resp.status().as_u16();
        match resp.text().await {
            Ok(body) => RawResponse::Body { status, body },
            Err(e) => RawResponse::Transport(e.to_string()),
        }
    }
}

impl Acquirer for RegistrarClient {
    fn acquire<'a>(
        &'a self,
        credential: &'a Credential,
        target: &'a ResourceTarget,
    ) -> Pin<Box<dyn Future<Output = RawResponse> + Send + 'a>> {
        Box::pin(self.enroll(credential, target))
    }
}

/// Map a rejected login reply to the reason the registrar gave.
pub fn login_failure(status: u16, body: &str) -> LoginError {
    if body.contains("密码错误") || body.contains("密码不正确") {
        LoginError::IncorrectPassword
    } else if body.contains("账号不存在") || body.contains("用户名不存在") {
        LoginError::AccountNotFound
    } else if body.contains("验证码") && body.contains("错误") {
        LoginError::Captcha
    } else {
        LoginError::Rejected(status)
    }
}

#[cfg(test)]
#[path = "registrar_tests.rs"]
mod tests;
