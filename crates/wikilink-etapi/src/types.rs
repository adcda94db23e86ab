//! ETAPI wire types.

use serde::{Deserialize, Serialize};

use wikilink_core::{parse_utc_timestamp, Note};

/// A note as returned by `GET /notes/{id}` and search.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtapiNote {
    pub note_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub note_type: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub is_protected: bool,
    #[serde(default)]
    pub attributes: Vec<EtapiAttribute>,
    #[serde(default)]
    pub parent_note_ids: Vec<String>,
    #[serde(default)]
    pub child_note_ids: Vec<String>,
    #[serde(default)]
    pub utc_date_created: Option<String>,
    #[serde(default)]
    pub utc_date_modified: Option<String>,
}

impl EtapiNote {
    pub fn label(&self, name: &str) -> Option<&EtapiAttribute> {
        self.attributes
            .iter()
            .find(|a| a.attribute_type == "label" && a.name == name)
    }
}

impl From<EtapiNote> for Note {
    fn from(n: EtapiNote) -> Self {
        Note {
            date_modified: n.utc_date_modified.as_deref().and_then(parse_utc_timestamp),
            note_id: n.note_id,
            title: n.title,
            note_type: n.note_type,
            // ETAPI never serves deleted notes.
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtapiAttribute {
    pub attribute_id: String,
    pub note_id: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_inheritable: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EtapiBranch {
    pub branch_id: String,
    pub note_id: String,
    pub parent_note_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<EtapiNote>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest<'a> {
    pub parent_note_id: &'a str,
    pub title: &'a str,
    #[serde(rename = "type")]
    pub note_type: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteResponse {
    pub note: EtapiNote,
    pub branch: EtapiBranch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttributeRequest<'a> {
    pub note_id: &'a str,
    #[serde(rename = "type")]
    pub attribute_type: &'a str,
    pub name: &'a str,
    pub value: &'a str,
    pub is_inheritable: bool,
}

#[derive(Debug, Serialize)]
pub struct PatchAttributeRequest<'a> {
    pub value: &'a str,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct EtapiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Quote a value for Trilium's search language.
pub fn quote_search_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_deserializes_from_etapi_json() {
        let json = serde_json::json!({
            "noteId": "abc123",
            "title": "Research Notes",
            "type": "text",
            "mime": "text/html",
            "isProtected": false,
            "attributes": [{
                "attributeId": "at1",
                "noteId": "abc123",
                "type": "label",
                "name": "demoWikilink",
                "value": "true",
                "position": 10,
                "isInheritable": false
            }],
            "parentNoteIds": ["root"],
            "childNoteIds": [],
            "utcDateModified": "2024-03-01 10:15:00.123Z"
        });
        let note: EtapiNote = serde_json::from_value(json).unwrap();
        assert_eq!(note.label("demoWikilink").unwrap().value, "true");
        assert!(note.label("other").is_none());

        let note: Note = note.into();
        assert_eq!(note.note_id, "abc123");
        assert!(note.date_modified.is_some());
    }

    #[test]
    fn test_quote_search_value() {
        assert_eq!(quote_search_value("Timeline"), "\"Timeline\"");
        assert_eq!(quote_search_value("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_create_request_uses_camel_case() {
        let body = serde_json::to_value(CreateNoteRequest {
            parent_note_id: "root",
            title: "T",
            note_type: "text",
            content: "",
        })
        .unwrap();
        assert_eq!(body["parentNoteId"], "root");
        assert_eq!(body["type"], "text");
    }
}
