// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::Ordering;

use seatgrab_engine::{ContextError, LoginError};

use super::*;
use crate::test_support::{FakeRegistrar, LoginReply, APP_PATH};

async fn setup() -> anyhow::Result<(FakeRegistrar, RegistrarReauthenticator)> {
    let fake = FakeRegistrar::start().await?;
    let client = Arc::new(RegistrarClient::new(&fake.config())?);
    let window = SessionWindow {
        term: String::new(),
        name: "公选课选课".into(),
        time: String::new(),
        url: format!("{APP_PATH}/xsxk/yxxsxk_index?jx0502zbid=W1"),
    };
    Ok((fake, RegistrarReauthenticator::new(client, "encoded".into(), window)))
}

#[tokio::test]
async fn logs_in_and_enters_window() -> anyhow::Result<()> {
    let (fake, reauth) = setup().await?;

    let first = reauth.run().await?;
    let second = reauth.run().await?;

    assert_eq!(first.get("JSESSIONID"), Some("sess-1"));
    assert_eq!(second.get("JSESSIONID"), Some("sess-2"));
    assert_eq!(fake.state.logins.load(Ordering::SeqCst), 2);
    assert_eq!(fake.state.contexts.load(Ordering::SeqCst), 2);
    assert_eq!(fake.state.login_bodies.lock()[0], "encoded=encoded");
    Ok(())
}

#[tokio::test]
async fn login_failure_skips_context() -> anyhow::Result<()> {
    let (fake, reauth) = setup().await?;
    *fake.state.login.lock() = LoginReply::Reject("密码错误".into());

    let result = reauth.run().await;

    assert_eq!(result.err(), Some(AuthError::Login(LoginError::IncorrectPassword)));
    assert_eq!(fake.state.contexts.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn context_failure_is_surfaced() -> anyhow::Result<()> {
    let (fake, reauth) = setup().await?;
    *fake.state.context.lock() = (200, "权限不足".into());

    let result = reauth.run().await;
    assert_eq!(result.err(), Some(AuthError::Context(ContextError::Forbidden)));
    Ok(())
}
