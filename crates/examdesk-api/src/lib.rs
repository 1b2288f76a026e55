// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use examdesk_app::{
    ListQuery, Page, Payment, PaymentId, PaymentInput, PaymentStatus, Question, QuestionId,
    QuestionInput, Section, SectionId, SectionInput, Test, TestAccess, TestAccessId,
    TestAccessInput, TestId, TestInput, Topic, TopicId, TopicInput, User, UserId, UserInput,
    UserStatus,
};
use log::debug;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        Self {
            token: (!token.is_empty()).then(|| token.to_owned()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

pub trait Resource {
    const PATH: &'static str;
    const NAME: &'static str;
    type Id: From<i64> + fmt::Display + Copy;
    type Item: DeserializeOwned + Serialize;
    type Input: Serialize + DeserializeOwned;
}

macro_rules! resource {
    ($marker:ident, $path:literal, $name:literal, $id:ty, $item:ty, $input:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $marker;

        impl Resource for $marker {
            const PATH: &'static str = $path;
            const NAME: &'static str = $name;
            type Id = $id;
            type Item = $item;
            type Input = $input;
        }
    };
}

resource!(Users, "users", "user", UserId, User, UserInput);
resource!(Tests, "tests", "test", TestId, Test, TestInput);
resource!(Sections, "sections", "section", SectionId, Section, SectionInput);
resource!(Topics, "topics", "topic", TopicId, Topic, TopicInput);
resource!(Questions, "questions", "question", QuestionId, Question, QuestionInput);
resource!(Payments, "payments", "payment", PaymentId, Payment, PaymentInput);
resource!(
    TestAccessGrants,
    "test-access",
    "test access grant",
    TestAccessId,
    TestAccess,
    TestAccessInput
);

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url {base_url:?} must use http or https, got {}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn ping(&self, ctx: &RequestContext) -> Result<()> {
        self.send(self.request(ctx, Method::GET, "health"))?;
        Ok(())
    }

    pub fn list<R: Resource>(
        &self,
        ctx: &RequestContext,
        query: &ListQuery,
    ) -> Result<Page<R::Item>> {
        let response = self.send(
            self.request(ctx, Method::GET, R::PATH)
                .query(&query.to_pairs()),
        )?;
        response
            .json()
            .with_context(|| format!("decode {} page", R::NAME))
    }

    pub fn get<R: Resource>(&self, ctx: &RequestContext, id: R::Id) -> Result<R::Item> {
        let response = self.send(self.request(ctx, Method::GET, &format!("{}/{id}", R::PATH)))?;
        response
            .json()
            .with_context(|| format!("decode {} {id}", R::NAME))
    }

    pub fn create<R: Resource>(&self, ctx: &RequestContext, input: &R::Input) -> Result<R::Item> {
        let response = self.send(self.request(ctx, Method::POST, R::PATH).json(input))?;
        response
            .json()
            .with_context(|| format!("decode created {}", R::NAME))
    }

    pub fn update<R: Resource>(
        &self,
        ctx: &RequestContext,
        id: R::Id,
        input: &R::Input,
    ) -> Result<R::Item> {
        let response = self.send(
            self.request(ctx, Method::PUT, &format!("{}/{id}", R::PATH))
                .json(input),
        )?;
        response
            .json()
            .with_context(|| format!("decode updated {} {id}", R::NAME))
    }

    pub fn delete<R: Resource>(&self, ctx: &RequestContext, id: R::Id) -> Result<()> {
        self.send(self.request(ctx, Method::DELETE, &format!("{}/{id}", R::PATH)))?;
        Ok(())
    }

    pub fn set_user_status(
        &self,
        ctx: &RequestContext,
        id: UserId,
        status: UserStatus,
    ) -> Result<User> {
        let response = self.send(
            self.request(ctx, Method::PATCH, &format!("{}/{id}/status", Users::PATH))
                .json(&StatusChange {
                    status: status.as_str(),
                }),
        )?;
        response.json().context("decode user after status change")
    }

    pub fn set_payment_status(
        &self,
        ctx: &RequestContext,
        id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment> {
        let response = self.send(
            self.request(ctx, Method::PATCH, &format!("{}/{id}/status", Payments::PATH))
                .json(&StatusChange {
                    status: status.as_str(),
                }),
        )?;
        response.json().context("decode payment after status change")
    }

    fn request(&self, ctx: &RequestContext, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{path}", self.base_url);
        debug!("{method} {url}");
        let builder = self.http.request(method, url);
        match ctx.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {base_url} timed out -- raise [api].timeout or retry ({error})");
    }
    anyhow!("cannot reach {base_url} -- check [api].base_url and that the backend is running ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message.or(envelope.error))
        .filter(|message| !message.trim().is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{'))
                .then(|| trimmed.to_owned())
        });

    let hint = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            " -- check [api].token or EXAMDESK_API_TOKEN"
        }
        _ => "",
    };

    match message {
        Some(message) => anyhow!("server error ({}): {message}{hint}", status.as_u16()),
        None => anyhow!("server returned {}{hint}", status.as_u16()),
    }
}

#[derive(Debug, Serialize)]
struct StatusChange<'a> {
    status: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
}
