#![allow(dead_code)]

use page_state_core::api::{PageSession, QueryParams};

pub fn session_with(pairs: &[(&str, &str)]) -> PageSession {
    PageSession::with_params(pairs.iter().copied().collect::<QueryParams>())
}

pub fn url(session: &PageSession) -> Vec<(String, String)> {
    session.query_pairs()
}

pub fn url_keys(session: &PageSession) -> Vec<String> {
    let mut keys: Vec<String> = session.query_pairs().into_iter().map(|(k, _)| k).collect();
    keys.sort();
    keys
}

pub fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
