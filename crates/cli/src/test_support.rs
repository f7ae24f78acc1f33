// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: an in-process fake registrar and assertion
//! helpers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::config::Config;

pub const APP_PATH: &str = "/ytkjxy_jsxsd";

/// Window list page with one enterable window.
pub fn window_page() -> String {
    format!(
        r#"<html><body><table id="tbKxkc">
<tr><th>学年学期</th><th>选课名称</th><th>选课时间</th><th>操作</th></tr>
<tr><td>2025-2026-1</td><td>公选课选课</td><td>2025-09-01 ~ 2025-09-07</td>
<td><a href="{APP_PATH}/xsxk/xklc_view?jx0502zbid=W1">进入选课</a></td></tr>
</table></body></html>"#
    )
}

pub fn listing(sections: &[(&str, &str, &str)]) -> String {
    let rows: Vec<serde_json::Value> = sections
        .iter()
        .map(|(kch, id, name)| {
            serde_json::json!({
                "kch": kch, "kcmc": name, "xf": 2, "skls": "张老师", "sksj": "周三 9-10节",
                "skdd": "A101", "xqmc": "本部", "syrs": "3", "jx0404id": id,
                "szkcflmc": "", "kkapList": [], "fzmc": ""
            })
        })
        .collect();
    serde_json::json!({ "aaData": rows }).to_string()
}

pub fn enroll_ok() -> (u16, String) {
    (200, r#"{"success":[true,"ok"],"message":"选课成功"}"#.to_owned())
}

pub fn enroll_full() -> (u16, String) {
    (200, r#"{"success":false,"message":"当前教学班已满"}"#.to_owned())
}

pub fn enroll_signed_out() -> (u16, String) {
    (200, "<html><body>请先登录</body></html>".to_owned())
}

/// How the fake answers a login.
#[derive(Debug, Clone)]
pub enum LoginReply {
    /// 302 with a fresh `JSESSIONID=sess-<n>`.
    Accept,
    /// 200 with the given page.
    Reject(String),
}

/// One recorded enrollment call.
#[derive(Debug, Clone)]
pub struct EnrollCall {
    pub section: String,
    pub cookie: Option<String>,
}

/// Mutable behaviour and call records of a [`FakeRegistrar`].
pub struct RegistrarState {
    pub login: Mutex<LoginReply>,
    pub logins: AtomicU32,
    pub login_bodies: Mutex<Vec<String>>,
    pub window_page: Mutex<String>,
    pub context: Mutex<(u16, String)>,
    pub contexts: AtomicU32,
    /// Listing reply per weekday; days not present answer with an empty list.
    pub listings: Mutex<HashMap<u8, (u16, String)>>,
    /// Enrollment script per section; the last reply repeats.
    pub enroll: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    pub enroll_calls: Mutex<Vec<EnrollCall>>,
    /// `name=value` cookies the enrollment endpoint treats as signed out.
    pub expired: Mutex<HashSet<String>>,
}

impl Default for RegistrarState {
    fn default() -> Self {
        Self {
            login: Mutex::new(LoginReply::Accept),
            logins: AtomicU32::new(0),
            login_bodies: Mutex::new(Vec::new()),
            window_page: Mutex::new(window_page()),
            context: Mutex::new((200, "<html><body>选课中心</body></html>".to_owned())),
            contexts: AtomicU32::new(0),
            listings: Mutex::new(HashMap::new()),
            enroll: Mutex::new(HashMap::new()),
            enroll_calls: Mutex::new(Vec::new()),
            expired: Mutex::new(HashSet::new()),
        }
    }
}

impl RegistrarState {
    pub fn script_enroll(&self, section: &str, replies: Vec<(u16, String)>) {
        self.enroll.lock().insert(section.to_owned(), replies.into());
    }

    pub fn set_listing(&self, day: u8, status: u16, body: String) {
        self.listings.lock().insert(day, (status, body));
    }

    pub fn expire(&self, cookie: &str) {
        self.expired.lock().insert(cookie.to_owned());
    }

    pub fn enroll_calls_for(&self, section: &str) -> Vec<EnrollCall> {
        self.enroll_calls.lock().iter().filter(|c| c.section == section).cloned().collect()
    }

    fn next_enroll(&self, section: &str) -> (u16, String) {
        let mut scripts = self.enroll.lock();
        match scripts.get_mut(section) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
        .unwrap_or_else(enroll_full)
    }
}

/// Registrar fake served on an ephemeral local port.
pub struct FakeRegistrar {
    pub addr: SocketAddr,
    pub state: Arc<RegistrarState>,
}

impl FakeRegistrar {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(RegistrarState::default());
        let app = Router::new()
            .route(&format!("{APP_PATH}/xk/LoginToXk"), post(login))
            .route(&format!("{APP_PATH}/xsxk/xklc_list"), get(window_list))
            .route(&format!("{APP_PATH}/xsxk/yxxsxk_index"), get(context))
            .route(&format!("{APP_PATH}/xsxkkc/xsxkFawxk"), post(listing_day))
            .route(&format!("{APP_PATH}/xsxkkc/fawxkOper"), get(enroll))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> Config {
        Config::test(&self.base_url())
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn login(State(s): State<Arc<RegistrarState>>, body: String) -> Response {
    let n = s.logins.fetch_add(1, Ordering::SeqCst) + 1;
    s.login_bodies.lock().push(body);
    let reply = s.login.lock().clone();
    match reply {
        LoginReply::Accept => (
            StatusCode::FOUND,
            [
                (SET_COOKIE, format!("JSESSIONID=sess-{n}; Path=/")),
                (LOCATION, format!("{APP_PATH}/framework/xsMain.jsp")),
            ],
        )
            .into_response(),
        LoginReply::Reject(page) => (StatusCode::OK, page).into_response(),
    }
}

async fn window_list(State(s): State<Arc<RegistrarState>>) -> Response {
    let page = s.window_page.lock().clone();
    (StatusCode::OK, page).into_response()
}

async fn context(State(s): State<Arc<RegistrarState>>) -> Response {
    s.contexts.fetch_add(1, Ordering::SeqCst);
    let (code, body) = s.context.lock().clone();
    (status(code), body).into_response()
}

async fn listing_day(
    State(s): State<Arc<RegistrarState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let day: u8 = q.get("skxq").and_then(|d| d.parse().ok()).unwrap_or(0);
    let reply = s.listings.lock().get(&day).cloned();
    let (code, body) = reply.unwrap_or_else(|| (200, listing(&[])));
    (status(code), body).into_response()
}

async fn enroll(
    State(s): State<Arc<RegistrarState>>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let section = q.get("jx0404id").cloned().unwrap_or_default();
    let cookie = headers.get(COOKIE).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let signed_out = cookie
        .as_deref()
        .is_some_and(|c| c.split("; ").any(|kv| s.expired.lock().contains(kv)));
    s.enroll_calls.lock().push(EnrollCall { section: section.clone(), cookie });
    let (code, body) = if signed_out { enroll_signed_out() } else { s.next_enroll(&section) };
    (status(code), body).into_response()
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
