//! # Directory Client
//!
//! People search against a Graph-shaped `/v1.0/users` endpoint.
//!
//! `PeopleSearch` debounces keystrokes: each call takes a ticket, waits out
//! the debounce window and gives up when a newer call has started. A reply
//! that arrives after a newer call started is dropped as well.

use super::{ClientError, handle_response, http_client, transport_error};
use intake_core::{DirectoryQuery, DirectoryResponse, Person, RequestGeneration};
use std::time::Duration;

/// HTTP client for the user directory.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    graph_url: String,
    token: String,
}

impl DirectoryClient {
    pub fn new(graph_url: &str, token: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client(timeout)?,
            graph_url: graph_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// `GET {graph}/v1.0/users` with the query's filter.
    pub async fn search(&self, query: &DirectoryQuery) -> Result<Vec<Person>, ClientError> {
        let url = format!("{}/v1.0/users", self.graph_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&query.query_pairs())
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let body: DirectoryResponse = handle_response(resp).await?;
        Ok(body.into_people())
    }
}

/// Outcome of one debounced search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Term too short or a person is already chosen; results should clear.
    Skipped,
    /// A newer call started; leave the current results alone.
    Superseded,
    Results(Vec<Person>),
}

/// Debounced people search with stale-reply protection.
#[derive(Debug)]
pub struct PeopleSearch {
    client: DirectoryClient,
    debounce: Duration,
    generation: RequestGeneration,
}

impl PeopleSearch {
    pub fn new(client: DirectoryClient, debounce: Duration) -> Self {
        Self {
            client,
            debounce,
            generation: RequestGeneration::new(),
        }
    }

    pub async fn search(
        &self,
        term: &str,
        selected_email: Option<&str>,
    ) -> Result<SearchOutcome, ClientError> {
        let Some(query) = DirectoryQuery::plan(term, selected_email) else {
            self.generation.invalidate();
            return Ok(SearchOutcome::Skipped);
        };

        let ticket = self.generation.issue();
        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
        }
        if !self.generation.is_current(ticket) {
            return Ok(SearchOutcome::Superseded);
        }

        let people = self.client.search(&query).await?;
        match self.generation.accept(ticket, people) {
            Some(people) => {
                tracing::debug!(term = %query.term, count = people.len(), "Directory results");
                Ok(SearchOutcome::Results(people))
            }
            None => Ok(SearchOutcome::Superseded),
        }
    }
}
