use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the field identifying a song within the collection.
pub const ID_FIELD: &str = "id";

/// Field set passed to `StoreGateway::update_fields`.
pub type Fields = Map<String, Value>;

/// A song document.
///
/// Apart from `id` every field is opaque payload and is stored and returned
/// unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Song(Map<String, Value>);

impl Song {
    /// Wrap a JSON object.
    pub fn new(fields: Map<String, Value>) -> Song {
        Song(fields)
    }

    /// The caller supplied integer id, if present.
    pub fn id(&self) -> Option<i64> {
        self.0.get(ID_FIELD).and_then(Value::as_i64)
    }

    /// Read access to all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Set every given field, leaving the others untouched. Returns whether
    /// any stored value actually changed.
    pub fn merge(&mut self, fields: &Fields) -> bool {
        let mut modified = false;
        for (name, value) in fields {
            if self.0.get(name) != Some(value) {
                self.0.insert(name.clone(), value.clone());
                modified = true;
            }
        }
        modified
    }
}
