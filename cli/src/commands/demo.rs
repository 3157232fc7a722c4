//! Scripted page passes showing URL sync and persistence side by side.

use std::sync::Arc;

use page_state_core::api::{
    self as core_api, AppConfig, MemoryStore, PageSession, PageStateDef, PersistenceBackend,
    QueryParams, SessionIdentity, StateHooks, StateVar, TypeDescriptor, Value,
};

use crate::commands::cli::DemoArgs;

const DEMO_CLASS: &str = "Dashboard";

struct ResetPageOnFilter;

impl StateHooks for ResetPageOnFilter {
    fn on_change(&self, session: &mut PageSession, field: &str, _old: &Value, _new: &Value) {
        if field != "status" {
            return;
        }
        if let Err(e) = session.reset(DEMO_CLASS, Some("page")) {
            tracing::warn!(target: "pstate.demo", stage = "hook.reset", error = %e);
        }
    }
}

fn register_demo_class() -> core_api::Result<()> {
    PageStateDef::builder(DEMO_CLASS)
        .field(
            "status",
            StateVar::new(1)
                .url_key("status")
                .value_map([(0, "pending"), (1, "active"), (2, "archived")]),
        )
        .field("page", StateVar::new(1).url_key("page"))
        .field(
            "tags",
            StateVar::new(Vec::<String>::new())
                .url_key("tags")
                .typed(TypeDescriptor::list(TypeDescriptor::STR)),
        )
        .field("visits", StateVar::new(0))
        .hooks(ResetPageOnFilter)
        .register()?;
    Ok(())
}

/// `a=1&b=2` into ordered pairs; pairs without `=` get an empty value.
pub fn parse_query(raw: &str) -> QueryParams {
    raw.trim_start_matches('?')
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| part.split_once('=').unwrap_or((part, "")))
        .collect()
}

fn print_url(label: &str, session: &PageSession) {
    let query: QueryParams = session.query_pairs().into_iter().collect();
    println!("{label:<12} ?{}", query.to_query_string());
}

fn page_pass(session: &mut PageSession) -> core_api::Result<()> {
    let status = session.get(DEMO_CLASS, "status")?;
    let page = session.get(DEMO_CLASS, "page")?;
    let visits = session.get(DEMO_CLASS, "visits")?.as_i64().unwrap_or(0);
    println!("{:<12} status={status} page={page} visits={visits}", "read");

    session.set(DEMO_CLASS, "visits", visits + 1)?;
    session.set(DEMO_CLASS, "page", page.as_i64().unwrap_or(1) + 1)?;
    print_url("next page", session);

    session.set(DEMO_CLASS, "tags", vec!["rust", "wasm"])?;
    print_url("tagged", session);

    session.set(DEMO_CLASS, "status", 2)?;
    print_url("filtered", session);
    Ok(())
}

async fn dump_store(store: &MemoryStore) {
    for key in store.keys() {
        let ttl = store
            .ttl_of(&key)
            .map_or_else(|| "none".to_string(), |s| format!("{s}s"));
        let payload = core_api::RemoteStore::get(store, &key)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        println!("  {key} (ttl {ttl}) {payload}");
    }
}

pub async fn handle_demo(args: DemoArgs, cfg: &AppConfig) -> anyhow::Result<()> {
    register_demo_class()?;

    let store = MemoryStore::new();
    let backend_for = |identity: &str| {
        PersistenceBackend::from_config(Arc::new(store.clone()), &cfg.persistence)
            .with_identity(SessionIdentity::Fixed(identity.to_string()))
    };
    let first_identity = cfg
        .persistence
        .session_id
        .clone()
        .unwrap_or_else(|| core_api::DEFAULT_SESSION_ID.to_string());

    println!("## pass 1 ({first_identity})");
    let backend = backend_for(&first_identity);
    let mut session = PageSession::with_params(parse_query(&args.url));
    print_url("initial", &session);
    backend.run_pass(&mut session, page_pass).await?;
    backend.wait_for_save().await;
    println!("stored:");
    dump_store(&store).await;

    println!("## pass 2 ({first_identity}, new tab, empty URL)");
    let mut fresh = PageSession::new();
    backend.run_pass(&mut fresh, page_pass).await?;
    backend.wait_for_save().await;

    if let Some(next) = args.switch_to.filter(|id| *id != first_identity) {
        println!("## pass 3 ({next}, same tab)");
        let switched = backend_for(&next);
        switched.run_pass(&mut fresh, page_pass).await?;
        switched.wait_for_save().await;
    }

    println!("stored:");
    dump_store(&store).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_strings_keep_order() {
        let params = parse_query("?status=archived&page=3&flag");
        assert_eq!(params.to_query_string(), "status=archived&page=3&flag=");
        assert!(parse_query("").is_empty());
    }
}
