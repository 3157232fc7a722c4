mod common;

use common::{pairs, session_with, url, url_keys};
use page_state_core::api::{
    ClassConfig, PageSession, PageStateDef, PageStateError, StateVar, TypeDescriptor, Value,
};
use pretty_assertions::assert_eq;

fn register_status(name: &str) {
    PageStateDef::builder(name)
        .field(
            "status",
            StateVar::new(1)
                .url_key("status")
                .value_map([(0, "pending"), (1, "active"), (2, "archived")]),
        )
        .register()
        .unwrap();
}

#[test]
fn first_read_writes_mapped_default_to_url() {
    register_status("SyncStatusFilter");
    let mut s = PageSession::new();

    assert_eq!(s.get("SyncStatusFilter", "status").unwrap(), Value::Int(1));
    assert_eq!(url(&s), pairs(&[("status", "active")]));

    s.set("SyncStatusFilter", "status", 0).unwrap();
    assert_eq!(url(&s), pairs(&[("status", "pending")]));
    assert_eq!(s.get("SyncStatusFilter", "status").unwrap(), Value::Int(0));
}

#[test]
fn mapped_url_value_initialises_field() {
    register_status("SyncStatusFromUrl");
    let mut s = session_with(&[("status", "archived")]);
    assert_eq!(s.get("SyncStatusFromUrl", "status").unwrap(), Value::Int(2));
}

#[test]
fn url_value_wins_over_default_and_is_typed() {
    PageStateDef::builder("SyncPagination")
        .field("page", StateVar::new(1).url_key("page"))
        .register()
        .unwrap();
    let mut s = session_with(&[("page", "5")]);

    assert_eq!(s.get("SyncPagination", "page").unwrap(), Value::Int(5));
    assert_eq!(url(&s), pairs(&[("page", "5")]));
}

#[test]
fn undecodable_url_value_falls_back_to_default() {
    PageStateDef::builder("SyncBadPage")
        .field("page", StateVar::new(1).url_key("page"))
        .register()
        .unwrap();
    let mut s = session_with(&[("page", "abc")]);

    assert_eq!(s.get("SyncBadPage", "page").unwrap(), Value::Int(1));
    assert_eq!(url(&s), pairs(&[("page", "1")]));
}

#[test]
fn selfish_write_removes_foreign_params() {
    PageStateDef::builder("SyncSelfish")
        .field("q", StateVar::new("default").url_key("q"))
        .field("p", StateVar::new(1).url_key("p"))
        .register()
        .unwrap();
    let mut s = session_with(&[("garbage", "gone"), ("f", "filter"), ("q", "initial")]);

    s.set("SyncSelfish", "q", "new_value").unwrap();

    assert_eq!(s.param("q").as_deref(), Some("new_value"));
    assert_eq!(s.param("garbage"), None);
    assert_eq!(s.param("f"), None);
    // Restore-on-touch re-asserts the class's other parameter.
    assert_eq!(url_keys(&s), ["p", "q"]);
}

#[test]
fn selfish_write_preserves_own_params() {
    PageStateDef::builder("SyncSelfishOwn")
        .field("q", StateVar::new("default").url_key("q"))
        .field("p", StateVar::new(1).url_key("p"))
        .register()
        .unwrap();
    let mut s = session_with(&[("p", "5"), ("garbage_again", "trash")]);

    s.set("SyncSelfishOwn", "q", "newer").unwrap();

    assert_eq!(s.param("q").as_deref(), Some("newer"));
    assert_eq!(s.param("p").as_deref(), Some("5"));
    assert_eq!(s.param("garbage_again"), None);
    assert_eq!(s.get("SyncSelfishOwn", "p").unwrap(), Value::Int(5));
}

#[test]
fn selfish_cleanup_runs_on_lazy_initialisation() {
    PageStateDef::builder("SyncSelfishInit")
        .field("q", StateVar::new("def").url_key("q"))
        .register()
        .unwrap();
    let mut s = session_with(&[("garbage", "trash"), ("q", "init_val")]);

    assert_eq!(s.get("SyncSelfishInit", "q").unwrap(), Value::from("init_val"));
    assert_eq!(url(&s), pairs(&[("q", "init_val")]));
}

#[test]
fn non_selfish_class_leaves_other_params() {
    PageStateDef::builder("SyncPolite")
        .config(ClassConfig::default().url_selfish(false))
        .field("q", StateVar::new("x").url_key("q"))
        .register()
        .unwrap();
    let mut s = session_with(&[("other", "1")]);

    s.set("SyncPolite", "q", "y").unwrap();
    assert_eq!(url(&s), pairs(&[("other", "1"), ("q", "y")]));
}

#[test]
fn url_prefix_applies_to_every_key() {
    PageStateDef::builder("SyncPrefixed")
        .config(ClassConfig::default().url_prefix("pf_"))
        .field("foo", StateVar::new("bar").url_key("foo"))
        .register()
        .unwrap();
    let mut s = PageSession::new();

    s.get("SyncPrefixed", "foo").unwrap();
    assert_eq!(url(&s), pairs(&[("pf_foo", "bar")]));
}

#[test]
fn prefixed_key_initialises_from_url() {
    PageStateDef::builder("SyncPrefixedInit")
        .config(ClassConfig::default().url_prefix("t1_"))
        .field("page", StateVar::new(1).url_key("page"))
        .register()
        .unwrap();
    let mut s = session_with(&[("t1_page", "3"), ("page", "9")]);

    assert_eq!(s.get("SyncPrefixedInit", "page").unwrap(), Value::Int(3));
}

#[test]
fn null_removes_param_when_ignoring_none() {
    PageStateDef::builder("SyncNoneIgnored")
        .field("filter", StateVar::new("some_filter").url_key("f"))
        .register()
        .unwrap();
    let mut s = PageSession::new();

    s.set("SyncNoneIgnored", "filter", "active").unwrap();
    assert_eq!(s.param("f").as_deref(), Some("active"));

    s.set("SyncNoneIgnored", "filter", Value::Null).unwrap();
    assert_eq!(s.param("f"), None);
    assert_eq!(s.get("SyncNoneIgnored", "filter").unwrap(), Value::Null);
    assert_eq!(s.param("f"), None);
}

#[test]
fn null_writes_empty_string_when_not_ignoring_none() {
    PageStateDef::builder("SyncNoneKept")
        .config(ClassConfig::default().ignore_none_url(false))
        .field("filter", StateVar::new("some_filter").url_key("f"))
        .register()
        .unwrap();
    let mut s = PageSession::new();

    s.set("SyncNoneKept", "filter", "active").unwrap();
    s.set("SyncNoneKept", "filter", Value::Null).unwrap();
    assert_eq!(s.param("f").as_deref(), Some(""));
}

#[test]
fn sharing_is_directional() {
    PageStateDef::builder("ShareDirA")
        .field("a", StateVar::new("").url_key("a"))
        .register()
        .unwrap();
    PageStateDef::builder("ShareDirB")
        .config(ClassConfig::default().share_url_with(["ShareDirA"]))
        .field("b", StateVar::new("").url_key("b"))
        .register()
        .unwrap();
    let mut s = PageSession::new();

    s.set("ShareDirA", "a", "1").unwrap();
    s.set("ShareDirB", "b", "2").unwrap();
    assert_eq!(url(&s), pairs(&[("a", "1"), ("b", "2")]));

    s.set("ShareDirA", "a", "3").unwrap();
    assert_eq!(url(&s), pairs(&[("a", "3")]));
}

#[test]
fn restore_never_overwrites_present_value() {
    PageStateDef::builder("SyncRestoreNoClobber")
        .field("q", StateVar::new("mine").url_key("q"))
        .register()
        .unwrap();
    let mut s = PageSession::new();
    s.get("SyncRestoreNoClobber", "q").unwrap();

    s.params_mut().set("q", "other".to_string());
    assert_eq!(s.get("SyncRestoreNoClobber", "q").unwrap(), Value::from("mine"));
    assert_eq!(s.param("q").as_deref(), Some("other"));

    s.params_mut().remove("q");
    s.get("SyncRestoreNoClobber", "q").unwrap();
    assert_eq!(s.param("q").as_deref(), Some("mine"));
}

#[test]
fn restore_is_idempotent() {
    PageStateDef::builder("SyncRestoreTwice")
        .field("a", StateVar::new(1).url_key("a"))
        .field("b", StateVar::new(vec!["x", "y"]).url_key("b"))
        .field("c", StateVar::new(Value::Null).url_key("c"))
        .register()
        .unwrap();
    let mut s = PageSession::new();
    s.get("SyncRestoreTwice", "a").unwrap();
    s.params_mut().remove("a");
    s.params_mut().remove("b");

    s.restore_url("SyncRestoreTwice").unwrap();
    let once = url(&s);
    s.restore_url("SyncRestoreTwice").unwrap();
    assert_eq!(url(&s), once);
    assert_eq!(url_keys(&s), ["a", "b"]);
}

#[test]
fn touch_without_restore_leaves_missing_params_missing() {
    PageStateDef::builder("SyncNoRestore")
        .config(ClassConfig::default().restore_url_on_touch(false))
        .field("q", StateVar::new("v").url_key("q"))
        .register()
        .unwrap();
    let mut s = PageSession::new();
    s.get("SyncNoRestore", "q").unwrap();
    s.params_mut().remove("q");

    s.get("SyncNoRestore", "q").unwrap();
    assert_eq!(s.param("q"), None);
}

#[test]
fn focus_claims_the_url_but_honours_sharing() {
    PageStateDef::builder("FocusShared")
        .field("keep", StateVar::new("").url_key("keep"))
        .register()
        .unwrap();
    PageStateDef::builder("FocusNav")
        .config(
            ClassConfig::default()
                .url_selfish(false)
                .share_url_with(["FocusShared"]),
        )
        .field("view", StateVar::new("home").url_key("view"))
        .register()
        .unwrap();
    let mut s = session_with(&[("view", "list"), ("keep", "1"), ("stale", "x")]);

    s.set("FocusNav", "view", "detail").unwrap();
    assert_eq!(s.param("stale").as_deref(), Some("x"));

    let removed = s.focus("FocusNav").unwrap();
    assert_eq!(removed, ["stale"]);
    assert_eq!(url_keys(&s), ["keep", "view"]);
}

#[test]
fn collections_roundtrip_through_the_url() {
    PageStateDef::builder("SyncTagsWriter")
        .field(
            "tags",
            StateVar::new(Vec::<String>::new())
                .url_key("tags")
                .typed(TypeDescriptor::list(TypeDescriptor::STR)),
        )
        .register()
        .unwrap();
    let mut writer = PageSession::new();
    writer
        .set("SyncTagsWriter", "tags", vec!["rust", "wasm"])
        .unwrap();
    let token = writer.param("tags").unwrap();

    let mut reader = session_with(&[("tags", token.as_str())]);
    assert_eq!(
        reader.get("SyncTagsWriter", "tags").unwrap(),
        Value::from(vec!["rust", "wasm"])
    );

    let mut legacy = session_with(&[("tags", "a||b")]);
    assert_eq!(
        legacy.get("SyncTagsWriter", "tags").unwrap(),
        Value::from(vec!["a", "b"])
    );
}

#[test]
fn fields_without_url_key_never_touch_the_url() {
    PageStateDef::builder("SyncLocalOnly")
        .field("draft", StateVar::new("text"))
        .register()
        .unwrap();
    let mut s = session_with(&[("other", "1")]);

    s.set("SyncLocalOnly", "draft", "changed").unwrap();
    assert_eq!(url(&s), pairs(&[("other", "1")]));
}

#[test]
fn reset_writes_defaults_through_sync() {
    PageStateDef::builder("SyncReset")
        .field("page", StateVar::new(1).url_key("page"))
        .field("query", StateVar::new(""))
        .register()
        .unwrap();
    let mut s = PageSession::new();
    s.set("SyncReset", "page", 7).unwrap();
    s.set("SyncReset", "query", "abc").unwrap();

    s.reset("SyncReset", Some("query")).unwrap();
    assert_eq!(s.get("SyncReset", "query").unwrap(), Value::from(""));
    assert_eq!(s.param("page").as_deref(), Some("7"));

    s.reset("SyncReset", None).unwrap();
    assert_eq!(s.get("SyncReset", "page").unwrap(), Value::Int(1));
    assert_eq!(s.param("page").as_deref(), Some("1"));

    assert!(matches!(
        s.reset("SyncReset", Some("nope")),
        Err(PageStateError::UnknownField { .. })
    ));
}

#[test]
fn dump_and_schema_reflect_class() {
    register_status("SyncDump");
    let mut s = PageSession::new();
    assert!(s.dump("SyncDump").unwrap().is_empty());

    s.get("SyncDump", "status").unwrap();
    let dump = s.dump("SyncDump").unwrap();
    assert_eq!(dump.get("status"), Some(&Value::Int(1)));

    let schema = s.schema("SyncDump").unwrap();
    assert_eq!(schema.len(), 1);
    assert_eq!(schema[0].url_key.as_deref(), Some("status"));
    assert_eq!(schema[0].declared_type, TypeDescriptor::INT);
}

#[test]
fn unknown_names_are_errors() {
    register_status("SyncUnknowns");
    let mut s = PageSession::new();

    assert!(matches!(
        s.get("SyncUnknowns", "nope"),
        Err(PageStateError::UnknownField { .. })
    ));
    assert!(matches!(
        s.set("SyncNeverRegistered", "x", 1),
        Err(PageStateError::UnknownClass(_))
    ));
}

#[test]
fn map_default_on_url_field_is_rejected_at_registration() {
    let err = PageStateDef::builder("SyncMapDefault")
        .field("meta", StateVar::new(Value::Map(Default::default())).url_key("m"))
        .register()
        .unwrap_err();
    assert!(matches!(err, PageStateError::InvalidSchema { .. }));
    assert!(page_state_core::api::lookup("SyncMapDefault").is_none());
}

#[test]
fn unencodable_write_changes_nothing() {
    PageStateDef::builder("SyncMapWrite")
        .field("filters", StateVar::new("").url_key("f"))
        .field("page", StateVar::new(1).url_key("page"))
        .register()
        .unwrap();
    let mut s = PageSession::new();
    s.get("SyncMapWrite", "page").unwrap();
    let url_before = url(&s);
    let dump_before = s.dump("SyncMapWrite").unwrap();

    let map = Value::Map([("a".to_string(), Value::Int(1))].into_iter().collect());
    let err = s.set("SyncMapWrite", "filters", map).unwrap_err();
    assert!(matches!(err, PageStateError::Encode { .. }));
    assert_eq!(url(&s), url_before);
    assert_eq!(s.dump("SyncMapWrite").unwrap(), dump_before);

    assert_eq!(s.get("SyncMapWrite", "page").unwrap(), Value::Int(1));
    s.set("SyncMapWrite", "page", 3).unwrap();
    assert_eq!(s.param("page").as_deref(), Some("3"));
    assert_eq!(s.get("SyncMapWrite", "filters").unwrap(), Value::from(""));
}
