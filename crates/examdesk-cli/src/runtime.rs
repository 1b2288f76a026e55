// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use examdesk_api::{
    Client, Payments, Questions, RequestContext, Resource, Sections, TestAccessGrants, Tests,
    Topics, Users,
};
use examdesk_app::{ListKind, ListQuery, TableView};
use serde_json::Value;

pub trait PageLoader {
    fn load_page(&mut self, kind: ListKind, query: &ListQuery) -> Result<TableView>;
}

macro_rules! with_resource {
    ($kind:expr, $resource:ident => $body:expr) => {
        match $kind {
            ListKind::Users => {
                type $resource = Users;
                $body
            }
            ListKind::Tests => {
                type $resource = Tests;
                $body
            }
            ListKind::Sections => {
                type $resource = Sections;
                $body
            }
            ListKind::Topics => {
                type $resource = Topics;
                $body
            }
            ListKind::Questions => {
                type $resource = Questions;
                $body
            }
            ListKind::Payments => {
                type $resource = Payments;
                $body
            }
            ListKind::TestAccess => {
                type $resource = TestAccessGrants;
                $body
            }
        }
    };
}

pub struct ApiRuntime {
    client: Client,
    ctx: RequestContext,
}

impl ApiRuntime {
    pub fn new(client: Client, ctx: RequestContext) -> Self {
        Self { client, ctx }
    }

    pub fn get(&self, kind: ListKind, id: i64) -> Result<Value> {
        with_resource!(kind, R => {
            let item = self.client.get::<R>(&self.ctx, id.into())?;
            to_json::<R>(&item)
        })
    }

    pub fn create(&self, kind: ListKind, input: &str) -> Result<Value> {
        with_resource!(kind, R => {
            let input = parse_input::<R>(input)?;
            let item = self.client.create::<R>(&self.ctx, &input)?;
            to_json::<R>(&item)
        })
    }

    pub fn update(&self, kind: ListKind, id: i64, input: &str) -> Result<Value> {
        with_resource!(kind, R => {
            let input = parse_input::<R>(input)?;
            let item = self.client.update::<R>(&self.ctx, id.into(), &input)?;
            to_json::<R>(&item)
        })
    }

    pub fn delete(&self, kind: ListKind, id: i64) -> Result<()> {
        with_resource!(kind, R => self.client.delete::<R>(&self.ctx, id.into()))
    }
}

impl PageLoader for ApiRuntime {
    fn load_page(&mut self, kind: ListKind, query: &ListQuery) -> Result<TableView> {
        with_resource!(kind, R => {
            let page = self.client.list::<R>(&self.ctx, query)?;
            Ok(TableView::from_page(kind, &page))
        })
    }
}

fn parse_input<R: Resource>(raw: &str) -> Result<R::Input> {
    serde_json::from_str(raw).with_context(|| format!("parse {} input JSON", R::NAME))
}

fn to_json<R: Resource>(item: &R::Item) -> Result<Value> {
    serde_json::to_value(item).with_context(|| format!("encode {} as JSON", R::NAME))
}

#[cfg(test)]
mod tests {
    use super::{ApiRuntime, PageLoader};
    use anyhow::Result;
    use examdesk_api::{Client, RequestContext};
    use examdesk_app::{ListKind, ListQuery, QuerySnapshot};
    use examdesk_testkit::{ExamFaker, MockApi, MockResponse, json_body, page_of};
    use std::time::Duration;

    fn runtime_for(mock: &MockApi) -> Result<ApiRuntime> {
        let client = Client::new(mock.base_url(), Duration::from_secs(2))?;
        Ok(ApiRuntime::new(client, RequestContext::with_token("admin")))
    }

    #[test]
    fn load_page_renders_payments_table() -> Result<()> {
        let mut faker = ExamFaker::new(12);
        let user = faker.user();
        let payments = vec![faker.payment(&user), faker.payment(&user)];
        let body = json_body(&page_of(payments, 0, 10, 2))?;
        let mock = MockApi::serve(vec![MockResponse::json(body)])?;
        let mut runtime = runtime_for(&mock)?;

        let query = ListQuery::from_snapshot(
            ListKind::Payments,
            &QuerySnapshot::parse("paymentStatus=PAID"),
        );
        let view = runtime.load_page(ListKind::Payments, &query)?;
        assert_eq!(view.summary(), "payments: page 1/1, 2 items");
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0][1], user.email);

        let requests = mock.finish()?;
        assert!(requests[0].url.starts_with("/api/payments?"));
        Ok(())
    }

    #[test]
    fn access_grants_use_test_access_path() -> Result<()> {
        let mock = MockApi::serve(vec![MockResponse::json(json_body(&page_of(
            Vec::<examdesk_app::TestAccess>::new(),
            0,
            10,
            0,
        ))?)])?;
        let mut runtime = runtime_for(&mock)?;

        let query = ListQuery::from_snapshot(ListKind::TestAccess, &QuerySnapshot::default());
        let view = runtime.load_page(ListKind::TestAccess, &query)?;
        assert!(view.rows.is_empty());

        let requests = mock.finish()?;
        assert!(requests[0].url.starts_with("/api/test-access?"));
        Ok(())
    }

    #[test]
    fn create_parses_input_and_returns_created_json() -> Result<()> {
        let created = r#"{"id":3,"title":"Algebra","description":"","status":"DRAFT"}"#;
        let mock = MockApi::serve(vec![MockResponse::json(created)])?;
        let runtime = runtime_for(&mock)?;

        let value = runtime.create(ListKind::Sections, r#"{"title":"Algebra","status":"DRAFT"}"#)?;
        assert_eq!(value["id"], 3);
        assert_eq!(value["title"], "Algebra");

        let requests = mock.finish()?;
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "/api/sections");
        Ok(())
    }

    #[test]
    fn create_rejects_invalid_input_before_sending() -> Result<()> {
        let mock = MockApi::serve(Vec::new())?;
        let runtime = runtime_for(&mock)?;

        let error = runtime
            .create(ListKind::Topics, r#"{"title":"No section"}"#)
            .expect_err("missing sectionId should fail");
        assert!(format!("{error:#}").contains("parse topic input JSON"));

        assert!(mock.finish()?.is_empty());
        Ok(())
    }

    #[test]
    fn delete_uses_entity_path() -> Result<()> {
        let mock = MockApi::serve(vec![MockResponse::status(204, "")])?;
        let runtime = runtime_for(&mock)?;
        runtime.delete(ListKind::Questions, 41)?;

        let requests = mock.finish()?;
        assert_eq!(requests[0].method, "DELETE");
        assert_eq!(requests[0].url, "/api/questions/41");
        Ok(())
    }
}
