use crate::config::DuplicateCheck;
use crate::error::{Result, SongStoreError};
use crate::network::{self, Conflict, Count, Health, Message, SongList};
use crate::{Fields, KnownIds, Song, StoreGateway};
use log::{debug, error};
use rouille::{Request, Response};
use serde_json::Value;
use std::io::Read;

const NO_DATA: &str = "No data provided";
const INVALID_JSON: &str = "Invalid JSON body";
const NOT_AN_OBJECT: &str = "Request body must be a JSON object";
const MISSING_ID: &str = "Song id missing or not an integer";

/// Request handlers, one per endpoint.
///
/// Each handler reads its input, makes a single call into the store and maps
/// the outcome to a status code and JSON body. Store failures never escape a
/// handler, they become 500 responses.
#[derive(Clone)]
pub struct Handlers<G: StoreGateway> {
    store: G,
    known_ids: KnownIds,
    duplicate_check: DuplicateCheck,
}

enum Created {
    Stored(Song),
    Duplicate,
}

impl<G: StoreGateway> Handlers<G> {
    /// Construct handlers on top of the given store.
    pub fn new(store: G, known_ids: KnownIds, duplicate_check: DuplicateCheck) -> Handlers<G> {
        Handlers {
            store,
            known_ids,
            duplicate_check,
        }
    }

    /// `GET /health`
    pub fn health(&self) -> Response {
        Response::json(&Health {
            status: "OK".to_string(),
        })
    }

    /// `GET /count`
    pub fn count(&self) -> Response {
        match self.store.count() {
            Ok(count) => Response::json(&Count { count }),
            Err(e) => store_failure("Error accessing database", e),
        }
    }

    /// `GET /song`
    pub fn list(&self) -> Response {
        match self.store.list_all() {
            Ok(songs) => Response::json(&SongList { songs }),
            Err(e) => store_failure("Unable to access database", e),
        }
    }

    /// `GET /song/{id}`
    pub fn get(&self, id: i64) -> Response {
        match self.store.find_by_id(id) {
            Ok(Some(song)) => Response::json(&song),
            Ok(None) => message(404, "Song with id not found"),
            Err(e) => store_failure("Database access error", e),
        }
    }

    /// `POST /song`
    pub fn create(&self, request: &Request) -> Response {
        let song = match json_object(request) {
            Ok(fields) => Song::new(fields),
            Err(response) => return response,
        };

        let id = match song.id() {
            Some(id) => id,
            None => return message(400, MISSING_ID),
        };

        match self.try_create(id, song) {
            Ok(Created::Stored(song)) => Response::json(&song).with_status_code(201),
            Ok(Created::Duplicate) => {
                debug!("rejecting duplicate song {}", id);
                Response::json(&Conflict {
                    message: format!("Song with id {} already present", id),
                })
                .with_status_code(302)
            }
            Err(e) => store_failure("Database access error", e),
        }
    }

    fn try_create(&self, id: i64, song: Song) -> Result<Created> {
        match self.duplicate_check {
            DuplicateCheck::Seed => {
                if !self.known_ids.claim(id)? {
                    return Ok(Created::Duplicate);
                }
                if let Err(e) = self.store.insert(song.clone()) {
                    self.known_ids.release(id)?;
                    return Err(e);
                }
            }
            DuplicateCheck::Store => {
                if self.store.find_by_id(id)?.is_some() {
                    return Ok(Created::Duplicate);
                }
                self.store.insert(song.clone())?;
            }
        }

        Ok(Created::Stored(song))
    }

    /// `PUT /song/{id}`
    pub fn update(&self, request: &Request, id: i64) -> Response {
        let fields = match json_object(request) {
            Ok(fields) => fields,
            Err(response) => return response,
        };

        match self.store.update_fields(id, &fields) {
            Ok(outcome) if !outcome.matched => message(404, "Song not found"),
            Ok(outcome) if outcome.modified => message(201, "Song updated"),
            Ok(_) => message(200, "Song found, but nothing updated"),
            Err(e) => store_failure("Database access error", e),
        }
    }

    /// `DELETE /song/{id}`
    pub fn delete(&self, id: i64) -> Response {
        match self.store.delete_by_id(id) {
            Ok(true) => Response::empty_204(),
            Ok(false) => message(404, "Song not found"),
            Err(e) => store_failure("Database access error", e),
        }
    }
}

fn message(status: u16, text: &str) -> Response {
    Response::json(&Message::new(text)).with_status_code(status)
}

fn store_failure(what: &str, e: SongStoreError) -> Response {
    error!("{}: {}", what, e);

    Response::json(&network::Error {
        error: what.to_string(),
        message: e.to_string(),
    })
    .with_status_code(500)
}

/// Read the request body as a non-empty JSON object.
fn json_object(request: &Request) -> std::result::Result<Fields, Response> {
    let mut raw = Vec::new();
    if let Some(mut data) = request.data() {
        data.read_to_end(&mut raw)
            .map_err(|_| message(400, INVALID_JSON))?;
    }

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(message(400, NO_DATA));
    }

    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Null) => Err(message(400, NO_DATA)),
        Ok(Value::Object(ref fields)) if fields.is_empty() => Err(message(400, NO_DATA)),
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(message(400, NOT_AN_OBJECT)),
        Err(_) => Err(message(400, INVALID_JSON)),
    }
}
