//! Tests for Client
//!
//! These tests verify:
//! - Object round trips (store, fetch, head, delete)
//! - The max_transports ceiling under concurrent writes
//! - Streaming operations (list keys, secondary indexes)
//! - Sibling resolution, tombstones and usermeta
//! - Datatype fetch and update
//! - Quorum values resolved onto the wire
//! - Client shutdown

#[path = "../common/mod.rs"]
mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use serde_json::json;

use common::{FakeNode, Failure};
use riakwire::client::{DeleteOptions, FetchOptions, GetOptions, IndexQuery, PutOptions, UpdateOptions};
use riakwire::datatype::{Datatype, DtOp};
use riakwire::protocol::{Content, MessageCode, Request};
use riakwire::{Quorum, QuorumParam, RiakError};

// =============================================================================
// Server Operations
// =============================================================================

#[test]
fn test_ping_and_server_info() {
    let node = FakeNode::start();
    let client = node.client();

    client.ping().unwrap();
    let info = client.server_info().unwrap();
    assert_eq!(info.node.as_deref(), Some("fake@127.0.0.1"));
    assert_eq!(info.server_version.as_deref(), Some("2.9.0"));
}

// =============================================================================
// Object Operations
// =============================================================================

#[test]
fn test_store_and_fetch_json() {
    let node = FakeNode::start();
    let client = node.client();
    let bucket = client.bucket("users");

    let mut obj = bucket
        .new_object(Some("alice"), &json!({"name": "Alice", "age": 30}))
        .unwrap();
    obj.store(&PutOptions::default()).unwrap();
    assert!(obj.exists());
    assert!(obj.vclock().is_some());

    let fetched = bucket.get("alice", &GetOptions::default()).unwrap();
    assert!(fetched.exists());
    assert_eq!(fetched.content_type(), "application/json");
    assert_eq!(fetched.data().unwrap(), json!({"name": "Alice", "age": 30}));
}

#[test]
fn test_second_store_carries_vclock() {
    let node = FakeNode::start();
    let client = node.client();
    let bucket = client.bucket("users");

    let mut obj = bucket.new_binary(Some("k"), b"one".to_vec(), "text/plain");
    obj.store(&PutOptions::default()).unwrap();
    let first = obj.vclock().map(<[u8]>::to_vec);

    obj.set_encoded_data(b"two".to_vec());
    obj.store(&PutOptions::default()).unwrap();

    match node.last_request(MessageCode::PutReq) {
        Some(Request::Put(req)) => {
            assert_eq!(req.vclock, first);
            assert_eq!(req.content.value, b"two");
        }
        other => panic!("Expected a put request, got {:?}", other),
    }
    assert_ne!(obj.vclock().map(<[u8]>::to_vec), first);
}

#[test]
fn test_store_without_key_gets_assigned_key() {
    let node = FakeNode::start();
    let client = node.client();

    let mut obj = client
        .bucket("users")
        .new_object(None, &json!({"anon": true}))
        .unwrap();
    obj.store(&PutOptions::default()).unwrap();

    let key = obj.key().unwrap().to_string();
    assert!(key.starts_with("generated-"));
    assert!(node.contains("users", &key));
}

#[test]
fn test_return_body_fills_object() {
    let node = FakeNode::start();
    let client = node.client();

    let mut obj = client
        .bucket("users")
        .new_binary(Some("k"), b"body".to_vec(), "text/plain");
    obj.store(&PutOptions::default().return_body()).unwrap();
    assert_eq!(obj.encoded_data(), b"body");
    assert_eq!(obj.siblings().len(), 1);
    assert!(!obj.has_siblings());
}

#[test]
fn test_get_missing_key() {
    let node = FakeNode::start();
    let client = node.client();

    let obj = client
        .bucket("users")
        .get("nobody", &GetOptions::default())
        .unwrap();
    assert!(!obj.exists());
    assert!(obj.vclock().is_none());
}

#[test]
fn test_head_returns_metadata_only() {
    let node = FakeNode::start();
    let mut content = Content::new(b"large value".to_vec(), "text/plain");
    content.usermeta.push(("owner".into(), "carol".into()));
    node.insert_content("docs", "readme", content);

    let client = node.client();
    let obj = client
        .bucket("docs")
        .head("readme", &GetOptions::default())
        .unwrap();

    assert!(obj.exists());
    assert!(obj.encoded_data().is_empty());
    assert_eq!(obj.content_type(), "text/plain");
    assert_eq!(obj.usermeta(), &[("owner".to_string(), "carol".to_string())]);
    match node.last_request(MessageCode::GetReq) {
        Some(Request::Get(req)) => assert!(req.head),
        other => panic!("Expected a get request, got {:?}", other),
    }
}

#[test]
fn test_delete_uses_fetched_vclock() {
    let node = FakeNode::start();
    node.insert("users", "dave", b"x");
    let client = node.client();

    let mut obj = client
        .bucket("users")
        .get_binary("dave", &GetOptions::default())
        .unwrap();
    let vclock = obj.vclock().map(<[u8]>::to_vec);
    obj.delete(&DeleteOptions::default()).unwrap();

    assert!(!obj.exists());
    assert!(!node.contains("users", "dave"));
    match node.last_request(MessageCode::DelReq) {
        Some(Request::Delete(req)) => assert_eq!(req.vclock, vclock),
        other => panic!("Expected a delete request, got {:?}", other),
    }
}

#[test]
fn test_tombstone_fetch_keeps_vclock_for_next_store() {
    let node = FakeNode::start();
    node.insert_content(
        "users",
        "gone",
        Content {
            deleted: true,
            ..Default::default()
        },
    );
    let client = node.client();

    let mut obj = client
        .bucket("users")
        .get_binary("gone", &GetOptions::default())
        .unwrap();
    assert!(!obj.exists());
    assert!(obj.siblings().is_empty());
    let vclock = obj.vclock().map(<[u8]>::to_vec);
    assert!(vclock.is_some());

    obj.set_encoded_data(b"back".to_vec())
        .store(&PutOptions::default())
        .unwrap();
    match node.last_request(MessageCode::PutReq) {
        Some(Request::Put(req)) => assert_eq!(req.vclock, vclock),
        other => panic!("Expected a put request, got {:?}", other),
    }
}

#[test]
fn test_choose_sibling_resolves_on_store() {
    let node = FakeNode::start();
    node.insert_siblings(
        "users",
        "carol",
        vec![
            Content::new(b"{\"v\":1}".to_vec(), "application/json"),
            Content::new(b"{\"v\":2}".to_vec(), "application/json"),
        ],
    );
    let client = node.client();
    let bucket = client.bucket("users");

    let mut obj = bucket.get("carol", &GetOptions::default()).unwrap();
    assert!(obj.has_siblings());
    assert_eq!(obj.siblings().len(), 2);
    assert_eq!(obj.data().unwrap(), json!({"v": 1}));

    assert!(matches!(
        obj.choose_sibling(5),
        Err(RiakError::InvalidOperation(_))
    ));
    obj.choose_sibling(1).unwrap();
    assert!(!obj.has_siblings());
    assert_eq!(obj.data().unwrap(), json!({"v": 2}));
    obj.store(&PutOptions::default()).unwrap();

    let fetched = bucket.get("carol", &GetOptions::default()).unwrap();
    assert!(!fetched.has_siblings());
    assert_eq!(fetched.data().unwrap(), json!({"v": 2}));
}

#[test]
fn test_usermeta_round_trip() {
    let node = FakeNode::start();
    let client = node.client();
    let bucket = client.bucket("users");

    let mut obj = bucket.new_binary(Some("dave"), b"x".to_vec(), "text/plain");
    obj.set_usermeta("owner", "ops")
        .set_usermeta("tier", "gold")
        .set_usermeta("owner", "dev");
    obj.store(&PutOptions::default()).unwrap();

    let fetched = bucket.get_binary("dave", &GetOptions::default()).unwrap();
    assert_eq!(
        fetched.usermeta().to_vec(),
        vec![
            ("tier".to_string(), "gold".to_string()),
            ("owner".to_string(), "dev".to_string()),
        ]
    );
}

#[test]
fn test_index_entries_are_stored() {
    let node = FakeNode::start();
    let client = node.client();

    let mut obj = client
        .bucket("users")
        .new_binary(Some("erin"), b"x".to_vec(), "text/plain");
    obj.add_index("age_int", 41).add_index("city_bin", "oslo");
    obj.add_index("age_int", 41);
    obj.store(&PutOptions::default()).unwrap();

    match node.last_request(MessageCode::PutReq) {
        Some(Request::Put(req)) => {
            assert_eq!(req.content.indexes.len(), 2);
        }
        other => panic!("Expected a put request, got {:?}", other),
    }

    obj.remove_index("city_bin", None);
    assert_eq!(obj.indexes(), &[("age_int".to_string(), "41".to_string())]);
}

#[test]
fn test_server_error_surfaces_for_put() {
    let node = FakeNode::start();
    node.fail_next(MessageCode::PutReq, 1, Failure::Error(9, "precommit failed".into()));
    let client = node.client();

    let err = client
        .bucket("users")
        .new_binary(Some("k"), b"v".to_vec(), "text/plain")
        .store(&PutOptions::default())
        .unwrap_err();

    match err {
        RiakError::Server { code, message } => {
            assert_eq!(code, 9);
            assert_eq!(message, "precommit failed");
        }
        other => panic!("Expected server error, got {:?}", other),
    }
}

// =============================================================================
// Transport Ceiling
// =============================================================================

#[test]
fn test_concurrent_puts_over_ceiling() {
    let node = FakeNode::start();
    node.set_delay(MessageCode::PutReq, Duration::from_millis(500));
    let client = riakwire::Client::new(node.config().max_transports(3).build()).unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let client = client.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let key = format!("k{}", i);
                let mut obj = client
                    .bucket("load")
                    .new_binary(Some(key.as_str()), b"v".to_vec(), "text/plain");
                barrier.wait();
                let result = obj.store(&PutOptions::default()).map(|_| ());
                result
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(failures.len(), 1, "results: {:?}", results);
    assert!(failures[0].to_string().contains("too many transports"));
    assert_eq!(node.object_count("load"), 3);
}

// =============================================================================
// Streaming Operations
// =============================================================================

#[test]
fn test_list_keys_across_frames() {
    let node = FakeNode::start();
    for key in ["a", "b", "c", "d", "e"] {
        node.insert("letters", key, b"x");
    }
    let client = node.client();

    let mut keys = client.bucket("letters").get_keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);

    // Connection is back in the pool after the final frame.
    assert_eq!(client.pool().checked_out(), 0);
    assert_eq!(client.pool().idle(), 1);
}

#[test]
fn test_list_keys_empty_bucket() {
    let node = FakeNode::start();
    let client = node.client();
    assert!(client.bucket("empty").get_keys().unwrap().is_empty());
}

fn seed_ages(node: &FakeNode) {
    for (key, age) in [("ann", 25), ("bob", 31), ("cat", 38), ("dan", 52)] {
        let mut content = Content::new(b"x".to_vec(), "text/plain");
        content.indexes.push(("age_int".into(), age.to_string()));
        node.insert_content("people", key, content);
    }
}

#[test]
fn test_index_exact_and_range() {
    let node = FakeNode::start();
    seed_ages(&node);
    let client = node.client();
    let bucket = client.bucket("people");

    let exact = bucket.get_index("age_int", "31", None).unwrap();
    assert_eq!(exact.keys, vec!["bob"]);

    let range = bucket.get_index("age_int", "30", Some("40")).unwrap();
    assert_eq!(range.keys, vec!["bob", "cat"]);
    assert!(range.continuation.is_none());
}

#[test]
fn test_index_terms_and_pagination() {
    let node = FakeNode::start();
    seed_ages(&node);
    let client = node.client();
    let bucket = client.bucket("people");

    let query = IndexQuery::new("age_int", "0", Some("100".to_string()))
        .return_terms(true)
        .max_results(3);
    let first = bucket.query_index(&query).unwrap();
    assert_eq!(
        first.terms,
        vec![
            ("25".to_string(), "ann".to_string()),
            ("31".to_string(), "bob".to_string()),
            ("38".to_string(), "cat".to_string()),
        ]
    );
    let continuation = first.continuation.clone().unwrap();

    let next = bucket
        .query_index(&query.continuation(continuation))
        .unwrap();
    assert_eq!(next.terms, vec![("52".to_string(), "dan".to_string())]);
    assert!(next.continuation.is_none());
}

// =============================================================================
// Datatypes
// =============================================================================

#[test]
fn test_counter_update_and_fetch() {
    let node = FakeNode::start();
    let client = node.client();
    let bucket = client.bucket_type("counters", "hits");

    let opts = UpdateOptions {
        return_body: true,
        ..Default::default()
    };
    bucket
        .update_datatype(Some("home"), DtOp::increment(2), &opts)
        .unwrap();
    let update = bucket
        .update_datatype(Some("home"), DtOp::increment(3), &opts)
        .unwrap();
    assert_eq!(update.value, Some(Datatype::Counter(5)));

    let fetched = bucket.fetch_datatype("home", &FetchOptions::default()).unwrap();
    assert_eq!(fetched.value.and_then(|v| v.as_counter()), Some(5));
    assert!(fetched.context.is_some());
}

#[test]
fn test_set_update_assigns_key() {
    let node = FakeNode::start();
    let client = node.client();
    let bucket = client.bucket_type("sets", "tags");

    let update = bucket
        .update_datatype(None, DtOp::add_to_set(["rust", "kv"]), &UpdateOptions::default())
        .unwrap();
    let key = update.key.unwrap();

    let fetched = bucket.fetch_datatype(&key, &FetchOptions::default()).unwrap();
    let members = fetched.value.unwrap();
    let members: Vec<_> = members.as_set().unwrap().iter().cloned().collect();
    assert_eq!(members, vec!["kv", "rust"]);
}

#[test]
fn test_fetch_missing_datatype() {
    let node = FakeNode::start();
    let client = node.client();
    let fetched = client
        .bucket_type("counters", "hits")
        .fetch_datatype("nothing", &FetchOptions::default())
        .unwrap();
    assert!(fetched.value.is_none());
}

#[test]
fn test_register_cannot_be_top_level() {
    let node = FakeNode::start();
    let client = node.client();

    let err = client
        .bucket_type("maps", "m")
        .update_datatype(
            Some("k"),
            DtOp::Register {
                assign: "v".into(),
            },
            &UpdateOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, RiakError::InvalidOperation(_)));
    assert_eq!(node.count(MessageCode::DtUpdateReq), 0);
}

#[test]
fn test_modify_datatype_applies_update_locally() {
    let node = FakeNode::start();
    let client = node.client();
    let bucket = client.bucket_type("counters", "hits");

    let first = bucket
        .modify_datatype("home", DtOp::increment(2), &UpdateOptions::default())
        .unwrap();
    assert_eq!(first.value, Some(Datatype::Counter(2)));
    let second = bucket
        .modify_datatype("home", DtOp::increment(3), &UpdateOptions::default())
        .unwrap();
    assert_eq!(second.value, Some(Datatype::Counter(5)));

    match node.last_request(MessageCode::DtUpdateReq) {
        Some(Request::DtUpdate(req)) => {
            assert!(!req.return_body);
            assert_eq!(req.context, Some(b"ctx".to_vec()));
        }
        other => panic!("Expected a datatype update, got {:?}", other),
    }
    let fetched = bucket.fetch_datatype("home", &FetchOptions::default()).unwrap();
    assert_eq!(fetched.value, Some(Datatype::Counter(5)));
}

#[test]
fn test_modify_datatype_rejects_mismatched_kind() {
    let node = FakeNode::start();
    let client = node.client();
    let bucket = client.bucket_type("counters", "hits");

    bucket
        .modify_datatype("home", DtOp::increment(1), &UpdateOptions::default())
        .unwrap();
    let err = bucket
        .modify_datatype("home", DtOp::add_to_set(["x"]), &UpdateOptions::default())
        .unwrap_err();

    assert!(matches!(err, RiakError::InvalidOperation(_)));
    assert_eq!(node.count(MessageCode::DtUpdateReq), 1);
}

// =============================================================================
// Quorum on the Wire
// =============================================================================

#[test]
fn test_quorum_tiers_reach_the_wire() {
    let node = FakeNode::start();
    let client = node.client();
    client.set_default_quorum(QuorumParam::R, Quorum::All);
    client.set_default_quorum(QuorumParam::PR, Quorum::One);

    let mut bucket = client.bucket("q");
    bucket.set_quorum(QuorumParam::R, Some(Quorum::Quorum));

    bucket
        .get_binary("k", &GetOptions::default().pr(Quorum::Count(2)))
        .unwrap();
    match node.last_request(MessageCode::GetReq) {
        Some(Request::Get(req)) => {
            assert_eq!(req.r, Some(Quorum::Quorum.to_wire()));
            assert_eq!(req.pr, Some(2));
        }
        other => panic!("Expected a get request, got {:?}", other),
    }

    bucket.set_quorum(QuorumParam::R, None);
    bucket
        .get_binary("k", &GetOptions::default().r(Quorum::Count(1)))
        .unwrap();
    match node.last_request(MessageCode::GetReq) {
        Some(Request::Get(req)) => {
            assert_eq!(req.r, Some(1));
            assert_eq!(req.pr, Some(Quorum::One.to_wire()));
        }
        other => panic!("Expected a get request, got {:?}", other),
    }

    bucket.get_binary("k", &GetOptions::default()).unwrap();
    match node.last_request(MessageCode::GetReq) {
        Some(Request::Get(req)) => assert_eq!(req.r, Some(Quorum::All.to_wire())),
        other => panic!("Expected a get request, got {:?}", other),
    }
}

#[test]
fn test_write_quorums_default_to_node_value() {
    let node = FakeNode::start();
    let client = node.client();

    client
        .bucket("q")
        .new_binary(Some("k"), b"v".to_vec(), "text/plain")
        .store(&PutOptions::default().w(Quorum::Count(3)))
        .unwrap();
    match node.last_request(MessageCode::PutReq) {
        Some(Request::Put(req)) => {
            assert_eq!(req.w, Some(3));
            assert_eq!(req.dw, Some(Quorum::Default.to_wire()));
            assert_eq!(req.pw, Some(Quorum::Default.to_wire()));
        }
        other => panic!("Expected a put request, got {:?}", other),
    }
}

// =============================================================================
// Shutdown
// =============================================================================

#[test]
fn test_operations_after_quit_fail() {
    let node = FakeNode::start();
    let client = node.client();
    client.ping().unwrap();

    let report = client.quit();
    assert_eq!(report.forced, 0);
    assert!(client.pool().is_closed());

    match client.ping() {
        Err(RiakError::PoolClosed) => {}
        other => panic!("Expected PoolClosed, got {:?}", other),
    }
}

#[test]
fn test_clones_share_the_pool() {
    let node = FakeNode::start();
    let client = node.client();
    let clone = client.clone();

    let _conn = client.pool().acquire().unwrap();
    assert_eq!(clone.pool().checked_out(), 1);
}
