// region:    --- Imports
use super::auth::Session;
use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

// endregion: --- Imports

// region:    --- Query Builder

/// Embedded resource in a select.
#[derive(Debug, Clone, PartialEq)]
pub enum Join {
    /// `parent.column` references `table.id`.
    One {
        alias: String,
        table: String,
        column: String,
        nested: Vec<Join>,
    },
    /// `table.column` references `parent.id`.
    Many {
        alias: String,
        table: String,
        column: String,
        nested: Vec<Join>,
        order: Option<Order>,
    },
}

impl Join {
    pub fn one(alias: &str, table: &str, column: &str) -> Self {
        Join::One {
            alias: alias.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            nested: Vec::new(),
        }
    }

    pub fn many(alias: &str, table: &str, column: &str) -> Self {
        Join::Many {
            alias: alias.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            nested: Vec::new(),
            order: None,
        }
    }

    /// Orders embedded rows. No effect on a to-one join.
    pub fn ordered(mut self, column: &str, ascending: bool) -> Self {
        if let Join::Many { order, .. } = &mut self {
            *order = Some(Order {
                column: column.to_string(),
                ascending,
            });
        }
        self
    }

    pub fn with(mut self, join: Join) -> Self {
        match &mut self {
            Join::One { nested, .. } | Join::Many { nested, .. } => nested.push(join),
        }
        self
    }

    pub fn alias(&self) -> &str {
        match self {
            Join::One { alias, .. } | Join::Many { alias, .. } => alias,
        }
    }

    fn render(&self, out: &mut String) {
        let (alias, table, column, nested) = match self {
            Join::One {
                alias,
                table,
                column,
                nested,
            }
            | Join::Many {
                alias,
                table,
                column,
                nested,
                ..
            } => (alias, table, column, nested),
        };
        out.push_str(&format!("{}:{}!{}(*", alias, table, column));
        for join in nested {
            out.push(',');
            join.render(out);
        }
        out.push(')');
    }

    /// `<path>.order` parameters for this join and the ones nested in it.
    fn order_params(&self, prefix: &str, params: &mut Vec<(String, String)>) {
        let path = if prefix.is_empty() {
            self.alias().to_string()
        } else {
            format!("{}.{}", prefix, self.alias())
        };
        let nested = match self {
            Join::One { nested, .. } => nested,
            Join::Many { nested, order, .. } => {
                if let Some(order) = order {
                    params.push((format!("{}.order", path), order.render()));
                }
                nested
            }
        };
        for join in nested {
            join.order_params(&path, params);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: String },
    /// Logical or of equality tests.
    AnyOf(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    fn render(&self) -> String {
        let direction = if self.ascending { "asc" } else { "desc" };
        format!("{}.{}", self.column, direction)
    }
}

/// Table-scoped read query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    joins: Vec<Join>,
    filters: Vec<Filter>,
    order: Option<Order>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Query {
            table: table.to_string(),
            joins: Vec::new(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn any_of<I, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: ToString,
    {
        self.filters.push(Filter::AnyOf(
            pairs
                .into_iter()
                .map(|(column, value)| (column.to_string(), value.to_string()))
                .collect(),
        ));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Value of the `select` parameter.
    pub fn select_clause(&self) -> String {
        let mut out = String::from("*");
        for join in &self.joins {
            out.push(',');
            join.render(&mut out);
        }
        out
    }

    /// Query-string parameters in PostgREST syntax.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select_clause())];
        for filter in &self.filters {
            match filter {
                Filter::Eq { column, value } => {
                    params.push((column.clone(), format!("eq.{}", value)));
                }
                Filter::AnyOf(pairs) => {
                    let terms: Vec<String> = pairs
                        .iter()
                        .map(|(column, value)| format!("{}.eq.{}", column, value))
                        .collect();
                    params.push(("or".to_string(), format!("({})", terms.join(","))));
                }
            }
        }
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.render()));
        }
        for join in &self.joins {
            join.order_params("", &mut params);
        }
        params
    }
}

// endregion: --- Query Builder

// region:    --- Relational Store

/// Relational side of the hosted backend.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn select(&self, query: &Query) -> MarketResult<Vec<Value>>;

    /// Exactly one row; `NotFound` when the query matches nothing.
    async fn select_one(&self, query: &Query) -> MarketResult<Value>;

    /// Inserts one row and returns it as stored.
    async fn insert(&self, table: &str, row: Value) -> MarketResult<Value>;

    async fn delete(&self, table: &str, column: &str, value: &str) -> MarketResult<()>;
}

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgREST client.
pub struct RestStore {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
    sessions: watch::Receiver<Option<Session>>,
}

impl RestStore {
    pub fn new(
        http: reqwest::Client,
        rest_url: String,
        anon_key: String,
        sessions: watch::Receiver<Option<Session>>,
    ) -> Self {
        Self {
            http,
            rest_url,
            anon_key,
            sessions,
        }
    }

    /// Signed-in user's token, or the anonymous key.
    fn bearer(&self) -> String {
        self.sessions
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }
}

/// Turns a non-2xx response into a store error carrying the body.
pub(crate) async fn check(response: Response) -> MarketResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MarketError::Store(format!("{}: {}", status, body)))
}

#[async_trait]
impl RelationalStore for RestStore {
    async fn select(&self, query: &Query) -> MarketResult<Vec<Value>> {
        debug!("{:<12} --> GET {} {:?}", "RestStore", query.table_name(), query.params());
        let response = self
            .request(Method::GET, query.table_name())
            .query(&query.params())
            .send()
            .await?;
        Ok(check(response).await?.json::<Vec<Value>>().await?)
    }

    async fn select_one(&self, query: &Query) -> MarketResult<Value> {
        debug!("{:<12} --> GET one {} {:?}", "RestStore", query.table_name(), query.params());
        let response = self
            .request(Method::GET, query.table_name())
            .header(ACCEPT, SINGLE_OBJECT)
            .query(&query.params())
            .send()
            .await?;
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(MarketError::NotFound(format!(
                "no matching row in {}",
                query.table_name()
            )));
        }
        Ok(check(response).await?.json::<Value>().await?)
    }

    async fn insert(&self, table: &str, row: Value) -> MarketResult<Value> {
        debug!("{:<12} --> POST {}", "RestStore", table);
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&row)
            .send()
            .await?;
        Ok(check(response).await?.json::<Value>().await?)
    }

    async fn delete(&self, table: &str, column: &str, value: &str) -> MarketResult<()> {
        debug!("{:<12} --> DELETE {} where {} = {}", "RestStore", table, column, value);
        let response = self
            .request(Method::DELETE, table)
            .query(&[(column, format!("eq.{}", value))])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

// endregion: --- Relational Store
