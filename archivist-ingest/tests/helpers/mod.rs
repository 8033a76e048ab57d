//! Shared fixtures for pipeline tests

#![allow(dead_code)]

use archivist_ingest::models::{RunSummary, Source};
use archivist_ingest::services::{
    DriverOptions, FetchError, Fetched, Fetcher, MultiSourceDriver,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

pub const WG_A: &str = "11111111-1111-1111-1111-111111111111";
pub const WG_B: &str = "22222222-2222-2222-2222-222222222222";

/// In-memory fetcher: each URL maps to a canned response or a network error
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Result<(u16, Vec<u8>), String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, url: &str, payload: Value) -> Self {
        self.responses
            .insert(url.to_string(), Ok((200, payload.to_string().into_bytes())));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Ok((status, Vec::new())));
        self
    }

    pub fn raw(mut self, url: &str, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), Ok((200, body.as_bytes().to_vec())));
        self
    }

    pub fn network_error(mut self, url: &str) -> Self {
        self.responses
            .insert(url.to_string(), Err("connection refused".to_string()));
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        match self.responses.get(url) {
            Some(Ok((status, body))) => Ok(Fetched {
                status: *status,
                body: body.clone(),
            }),
            Some(Err(message)) => Err(FetchError::Network(message.clone())),
            None => Err(FetchError::Network(format!("no route to {}", url))),
        }
    }
}

/// On-disk test database; keep the TempDir alive for the duration of the test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("archive.db").display());
    let pool = archivist_common::db::init_database(&url).await.unwrap();
    (dir, pool)
}

pub async fn run(pool: &SqlitePool, fetcher: StaticFetcher, urls: &[&str]) -> RunSummary {
    let mut driver = MultiSourceDriver::new(pool.clone(), Arc::new(fetcher), DriverOptions::default());
    driver.run(&Source::from_urls(urls.iter().copied())).await
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Row counts of every entity table
pub async fn entity_counts(pool: &SqlitePool) -> [i64; 6] {
    [
        count(pool, "workgroups").await,
        count(pool, "meetings").await,
        count(pool, "agenda_items").await,
        count(pool, "action_items").await,
        count(pool, "decision_items").await,
        count(pool, "discussion_points").await,
    ]
}

/// Minimal valid record
pub fn meeting_record(workgroup_id: &str, workgroup: &str, date: &str, host: &str) -> Value {
    json!({
        "workgroup": workgroup,
        "workgroup_id": workgroup_id,
        "meetingInfo": {"date": date, "host": host},
        "agendaItems": [],
        "tags": {},
        "type": "sync"
    })
}

/// Record with one agenda item carrying every child kind
pub fn detailed_record(workgroup_id: &str, date: &str, purpose: &str) -> Value {
    json!({
        "workgroup": "Archives WG",
        "workgroup_id": workgroup_id,
        "type": "Custom",
        "meetingInfo": {
            "date": date,
            "host": "Alice",
            "documenter": "Bob",
            "purpose": purpose,
            "peoplePresent": "Alice, Bob",
            "meetingVideoLink": "https://video.example.org/1"
        },
        "agendaItems": [{
            "status": "resolved",
            "actionItems": [
                {"text": "Publish notes", "assignee": "Bob", "status": "todo"},
                {"text": "Book room", "assignee": "Alice", "status": "done"}
            ],
            "decisionItems": [{"decision": "Meet weekly", "effect": "affectsOnlyThisWorkgroup"}],
            "discussionPoints": ["Cadence", {"point": "Tooling"}]
        }],
        "tags": {"topicsCovered": "planning"}
    })
}
