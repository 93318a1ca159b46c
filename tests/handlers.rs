use std::io::Read;

use rand::Rng;
use rouille::{Request, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use songs::config::DuplicateCheck;
use songs::sled::SledGateway;
use songs::{
    Fields, Handlers, KnownIds, MemoryGateway, Result, Server, Song, SongStoreError,
    StoreGateway, UpdateOutcome,
};

fn seed_songs() -> Vec<Song> {
    serde_json::from_value(json!([
        {"id": 1, "title": "A", "artist": "X"},
        {"id": 2, "title": "B", "artist": "Y"},
        {"id": 3, "title": "C", "artist": "Z"}
    ]))
    .unwrap()
}

fn server<G: StoreGateway>(store: G, check: DuplicateCheck) -> Server<G> {
    let songs = seed_songs();
    let known_ids = KnownIds::from_seed(&songs);
    store.seed(songs).unwrap();
    Server::new(Handlers::new(store, known_ids, check), 1)
}

fn call<G: StoreGateway>(
    server: &Server<G>,
    method: &str,
    url: &str,
    body: Option<&str>,
) -> (u16, Value) {
    let data = body.map(|b| b.as_bytes().to_vec()).unwrap_or_default();
    let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    let request = Request::fake_http(method, url, headers, data);

    decode(server.handle(&request))
}

fn decode(response: Response) -> (u16, Value) {
    let status = response.status_code;
    let (mut reader, _) = response.data.into_reader_and_size();
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).unwrap();

    if raw.is_empty() {
        (status, Value::Null)
    } else {
        (status, serde_json::from_slice(&raw).unwrap())
    }
}

fn count<G: StoreGateway>(server: &Server<G>) -> u64 {
    let (status, body) = call(server, "GET", "/count", None);
    assert_eq!(status, 200);
    body["count"].as_u64().unwrap()
}

fn check_read_endpoints<G: StoreGateway>(store: G) {
    let server = server(store, DuplicateCheck::Seed);

    assert_eq!(
        call(&server, "GET", "/health", None),
        (200, json!({"status": "OK"}))
    );
    assert_eq!(count(&server), 3);

    let (status, body) = call(&server, "GET", "/song", None);
    assert_eq!(status, 200);
    assert_eq!(body["songs"].as_array().unwrap().len(), 3);

    assert_eq!(
        call(&server, "GET", "/song/2", None),
        (200, json!({"id": 2, "title": "B", "artist": "Y"}))
    );
    assert_eq!(
        call(&server, "GET", "/song/42", None),
        (404, json!({"message": "Song with id not found"}))
    );
}

fn check_create<G: StoreGateway>(store: G) {
    let server = server(store, DuplicateCheck::Seed);

    let (status, body) = call(&server, "POST", "/song", Some(r#"{"id": 1, "title": "A2"}"#));
    assert_eq!(status, 302);
    assert_eq!(body, json!({"Message": "Song with id 1 already present"}));
    assert_eq!(count(&server), 3);

    let created = json!({"id": 7, "title": "New", "tags": ["a", "b"]});
    assert_eq!(
        call(&server, "POST", "/song", Some(&created.to_string())),
        (201, created.clone())
    );
    assert_eq!(call(&server, "GET", "/song/7", None), (200, created));
    assert_eq!(count(&server), 4);

    let (status, _) = call(&server, "POST", "/song", Some(r#"{"id": 7, "title": "Again"}"#));
    assert_eq!(status, 302);
    assert_eq!(count(&server), 4);
}

fn check_update<G: StoreGateway>(store: G) {
    let server = server(store, DuplicateCheck::Seed);

    assert_eq!(
        call(&server, "PUT", "/song/42", Some(r#"{"title": "Nope"}"#)),
        (404, json!({"message": "Song not found"}))
    );
    assert_eq!(count(&server), 3);
    assert_eq!(call(&server, "GET", "/song/42", None).0, 404);

    assert_eq!(
        call(&server, "PUT", "/song/1", Some(r#"{"title": "A"}"#)),
        (200, json!({"message": "Song found, but nothing updated"}))
    );
    assert_eq!(
        call(&server, "PUT", "/song/1", Some(r#"{"title": "A", "year": 2001}"#)),
        (201, json!({"message": "Song updated"}))
    );
    assert_eq!(
        call(&server, "GET", "/song/1", None),
        (200, json!({"id": 1, "title": "A", "artist": "X", "year": 2001}))
    );
}

fn check_delete<G: StoreGateway>(store: G) {
    let server = server(store, DuplicateCheck::Seed);

    assert_eq!(call(&server, "DELETE", "/song/3", None), (204, Value::Null));
    assert_eq!(call(&server, "GET", "/song/3", None).0, 404);
    assert_eq!(count(&server), 2);

    assert_eq!(
        call(&server, "DELETE", "/song/3", None),
        (404, json!({"message": "Song not found"}))
    );
    assert_eq!(count(&server), 2);
}

fn check_count_matches_list<G: StoreGateway>(store: G) {
    let server = server(store, DuplicateCheck::Seed);

    call(&server, "POST", "/song", Some(r#"{"id": 10}"#));
    call(&server, "POST", "/song", Some(r#"{"id": 11}"#));
    call(&server, "DELETE", "/song/1", None);

    let (_, body) = call(&server, "GET", "/song", None);
    assert_eq!(body["songs"].as_array().unwrap().len() as u64, count(&server));
}

#[test]
fn memory_read_endpoints() {
    check_read_endpoints(MemoryGateway::new());
}

#[test]
fn memory_create() {
    check_create(MemoryGateway::new());
}

#[test]
fn memory_update() {
    check_update(MemoryGateway::new());
}

#[test]
fn memory_delete() {
    check_delete(MemoryGateway::new());
}

#[test]
fn memory_count_matches_list() {
    check_count_matches_list(MemoryGateway::new());
}

#[test]
fn sled_read_endpoints() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    check_read_endpoints(SledGateway::open(temp_dir.path()).unwrap());
}

#[test]
fn sled_create() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    check_create(SledGateway::open(temp_dir.path()).unwrap());
}

#[test]
fn sled_update() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    check_update(SledGateway::open(temp_dir.path()).unwrap());
}

#[test]
fn sled_delete() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    check_delete(SledGateway::open(temp_dir.path()).unwrap());
}

#[test]
fn sled_count_matches_list() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    check_count_matches_list(SledGateway::open(temp_dir.path()).unwrap());
}

#[test]
fn create_after_seed_extends_collection() {
    let store = MemoryGateway::new();
    store
        .seed(serde_json::from_value(json!([{"id": 1, "title": "A"}])).unwrap())
        .unwrap();
    let known_ids = KnownIds::from_seed(&store.list_all().unwrap());
    let server = Server::new(Handlers::new(store, known_ids, DuplicateCheck::Seed), 1);

    assert_eq!(
        call(&server, "POST", "/song", Some(r#"{"id": 1, "title": "A"}"#)).0,
        302
    );
    assert_eq!(
        call(&server, "POST", "/song", Some(r#"{"id": 2, "title": "B"}"#)),
        (201, json!({"id": 2, "title": "B"}))
    );
    assert_eq!(call(&server, "GET", "/count", None), (200, json!({"count": 2})));
}

#[test]
fn absent_ids_are_not_found() {
    let server = server(MemoryGateway::new(), DuplicateCheck::Seed);
    let mut rng = rand::thread_rng();

    for _ in 0..100 {
        let id: i64 = rng.gen_range(4, i64::max_value());
        assert_eq!(call(&server, "GET", &format!("/song/{}", id), None).0, 404);
        assert_eq!(call(&server, "DELETE", &format!("/song/{}", id), None).0, 404);
    }
    assert_eq!(call(&server, "GET", "/song/-5", None).0, 404);
    assert_eq!(count(&server), 3);
}

#[test]
fn unknown_routes_are_not_found() {
    let server = server(MemoryGateway::new(), DuplicateCheck::Seed);

    assert_eq!(call(&server, "GET", "/song/abc", None), (404, Value::Null));
    assert_eq!(call(&server, "GET", "/songs", None), (404, Value::Null));
    assert_eq!(call(&server, "PATCH", "/song/1", Some("{}")), (404, Value::Null));
}

#[test]
fn bad_bodies_are_rejected() {
    let server = server(MemoryGateway::new(), DuplicateCheck::Seed);
    let no_data = json!({"message": "No data provided"});

    assert_eq!(call(&server, "POST", "/song", None), (400, no_data.clone()));
    assert_eq!(call(&server, "POST", "/song", Some("  ")), (400, no_data.clone()));
    assert_eq!(call(&server, "POST", "/song", Some("{}")), (400, no_data.clone()));
    assert_eq!(call(&server, "POST", "/song", Some("null")), (400, no_data.clone()));
    assert_eq!(call(&server, "PUT", "/song/1", None), (400, no_data.clone()));
    assert_eq!(call(&server, "PUT", "/song/1", Some("{}")), (400, no_data));

    assert_eq!(
        call(&server, "POST", "/song", Some("{\"id\": ")),
        (400, json!({"message": "Invalid JSON body"}))
    );
    assert_eq!(
        call(&server, "PUT", "/song/1", Some("[1, 2]")),
        (400, json!({"message": "Request body must be a JSON object"}))
    );
    assert_eq!(
        call(&server, "POST", "/song", Some(r#"{"title": "no id"}"#)),
        (400, json!({"message": "Song id missing or not an integer"}))
    );
    assert_eq!(
        call(&server, "POST", "/song", Some(r#"{"id": "8"}"#)).0,
        400
    );
    assert_eq!(count(&server), 3);
}

#[test]
fn seed_check_keeps_deleted_ids() {
    let server = server(MemoryGateway::new(), DuplicateCheck::Seed);

    assert_eq!(call(&server, "DELETE", "/song/2", None).0, 204);
    assert_eq!(call(&server, "POST", "/song", Some(r#"{"id": 2}"#)).0, 302);
    assert_eq!(call(&server, "GET", "/song/2", None).0, 404);
}

#[test]
fn store_check_follows_live_store() {
    let server = server(MemoryGateway::new(), DuplicateCheck::Store);

    assert_eq!(call(&server, "POST", "/song", Some(r#"{"id": 2}"#)).0, 302);
    assert_eq!(call(&server, "DELETE", "/song/2", None).0, 204);
    assert_eq!(
        call(&server, "POST", "/song", Some(r#"{"id": 2, "title": "B2"}"#)),
        (201, json!({"id": 2, "title": "B2"}))
    );
    assert_eq!(call(&server, "POST", "/song", Some(r#"{"id": 2}"#)).0, 302);
    assert_eq!(count(&server), 3);
}

#[test]
fn concurrent_creates_of_one_id_store_it_once() {
    let server = server(MemoryGateway::new(), DuplicateCheck::Seed);
    let created = std::sync::atomic::AtomicUsize::new(0);

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|_| {
                let (status, _) = call(&server, "POST", "/song", Some(r#"{"id": 99}"#));
                if status == 201 {
                    created.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                } else {
                    assert_eq!(status, 302);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(created.into_inner(), 1);
    assert_eq!(count(&server), 4);
}

#[test]
fn concurrent_creates_of_distinct_ids() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let server = server(
        SledGateway::open(temp_dir.path()).unwrap(),
        DuplicateCheck::Seed,
    );

    crossbeam_utils::thread::scope(|s| {
        for t in 0..4 {
            let server = &server;
            s.spawn(move |_| {
                for i in 0..10 {
                    let body = json!({"id": 100 + t * 10 + i}).to_string();
                    assert_eq!(call(server, "POST", "/song", Some(&body)).0, 201);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(count(&server), 43);
}

/// Gateway whose store can never be reached.
#[derive(Clone)]
struct UnreachableGateway;

impl StoreGateway for UnreachableGateway {
    fn seed(&self, _songs: Vec<Song>) -> Result<()> {
        Ok(())
    }
    fn count(&self) -> Result<usize> {
        Err(SongStoreError::LockPoisoned)
    }
    fn list_all(&self) -> Result<Vec<Song>> {
        Err(SongStoreError::LockPoisoned)
    }
    fn find_by_id(&self, _id: i64) -> Result<Option<Song>> {
        Err(SongStoreError::LockPoisoned)
    }
    fn insert(&self, _song: Song) -> Result<()> {
        Err(SongStoreError::LockPoisoned)
    }
    fn update_fields(&self, _id: i64, _fields: &Fields) -> Result<UpdateOutcome> {
        Err(SongStoreError::LockPoisoned)
    }
    fn delete_by_id(&self, _id: i64) -> Result<bool> {
        Err(SongStoreError::LockPoisoned)
    }
}

#[test]
fn store_failures_become_500() {
    let server = server(UnreachableGateway, DuplicateCheck::Seed);

    let (status, body) = call(&server, "GET", "/count", None);
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Error accessing database");
    assert_eq!(body["message"], "store lock poisoned");

    for (method, url, body) in &[
        ("GET", "/song", None),
        ("GET", "/song/1", None),
        ("POST", "/song", Some(r#"{"id": 50}"#)),
        ("PUT", "/song/1", Some(r#"{"title": "x"}"#)),
        ("DELETE", "/song/1", None),
    ] {
        let (status, body) = call(&server, method, url, *body);
        assert_eq!(status, 500, "{} {}", method, url);
        assert!(body["error"].is_string());
        assert!(body["message"].is_string());
    }

    assert_eq!(call(&server, "GET", "/health", None).0, 200);
}

#[test]
fn failed_insert_releases_claimed_id() {
    let known_ids = KnownIds::default();
    let server = Server::new(
        Handlers::new(UnreachableGateway, known_ids.clone(), DuplicateCheck::Seed),
        1,
    );

    assert_eq!(call(&server, "POST", "/song", Some(r#"{"id": 5}"#)).0, 500);

    // The id is free again once a reachable store is behind the same cache.
    let server = Server::new(
        Handlers::new(MemoryGateway::new(), known_ids, DuplicateCheck::Seed),
        1,
    );
    assert_eq!(
        call(&server, "POST", "/song", Some(r#"{"id": 5}"#)),
        (201, json!({"id": 5}))
    );
    assert_eq!(call(&server, "POST", "/song", Some(r#"{"id": 5}"#)).0, 302);
}

/// Gateway that panics while counting.
#[derive(Clone)]
struct PanickingGateway;

impl StoreGateway for PanickingGateway {
    fn seed(&self, _songs: Vec<Song>) -> Result<()> {
        Ok(())
    }
    fn count(&self) -> Result<usize> {
        panic!("count exploded");
    }
    fn list_all(&self) -> Result<Vec<Song>> {
        Ok(vec![])
    }
    fn find_by_id(&self, _id: i64) -> Result<Option<Song>> {
        Ok(None)
    }
    fn insert(&self, _song: Song) -> Result<()> {
        Ok(())
    }
    fn update_fields(&self, _id: i64, _fields: &Fields) -> Result<UpdateOutcome> {
        Ok(UpdateOutcome {
            matched: false,
            modified: false,
        })
    }
    fn delete_by_id(&self, _id: i64) -> Result<bool> {
        Ok(false)
    }
}

#[test]
fn panicking_handler_is_logged_and_propagated() {
    let server = server(PanickingGateway, DuplicateCheck::Seed);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        call(&server, "GET", "/count", None)
    }));
    assert!(outcome.is_err());

    // The server keeps serving after a request panicked.
    assert_eq!(call(&server, "GET", "/song", None), (200, json!({"songs": []})));
}
