//! Typed message protocol
//!
//! Requests from UI surfaces and page integrations arrive as a tagged
//! [`Message`] and are answered with a tagged [`Response`]:
//!
//! ```json
//! {"type": "DELETE_VARIABLE", "payload": {"id": "..."}}
//! {"kind": "deleted", "data": true}
//! ```
//!
//! Failures never escape as transport errors. They are folded into
//! [`Response::Error`] with the validation code when there is one.

use hostvar_domain::{ErrorCode, Origin, Settings, Variable, VariableDraft};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::resolver::HostResolver;
use crate::store::ImportSummary;
use crate::substitution::Substitution;

/// A request to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// List every variable.
    GetVariables,
    /// Create a variable.
    AddVariable(VariableDraft),
    /// Update the variable named by the draft's id.
    UpdateVariable(VariableDraft),
    /// Delete a variable by id.
    DeleteVariable {
        /// Id of the variable to remove.
        id: String,
    },
    /// Read the settings.
    GetSettings,
    /// Replace the settings.
    UpdateSettings(Settings),
    /// Flip the global on/off switch.
    ToggleExtension,
    /// Produce a full backup.
    ExportData,
    /// Restore a full backup.
    ImportData {
        /// Backup text.
        json: String,
    },
    /// Export the variables.
    ExportVariables,
    /// Import variables from an export.
    ImportVariables {
        /// Export text.
        json: String,
        /// Merge by key instead of replacing the list.
        #[serde(default)]
        merge: bool,
    },
    /// Search variables.
    SearchVariables {
        /// Case-insensitive substring.
        query: String,
    },
    /// Substitute placeholders for a page.
    ResolveText {
        /// Text to transform.
        text: String,
        /// Where the text is being edited.
        origin: Origin,
    },
    /// Count the enabled variables available on a page.
    CountAvailable {
        /// Page being edited.
        origin: Origin,
    },
}

impl Message {
    /// Returns the wire name of this message.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetVariables => "GET_VARIABLES",
            Self::AddVariable(_) => "ADD_VARIABLE",
            Self::UpdateVariable(_) => "UPDATE_VARIABLE",
            Self::DeleteVariable { .. } => "DELETE_VARIABLE",
            Self::GetSettings => "GET_SETTINGS",
            Self::UpdateSettings(_) => "UPDATE_SETTINGS",
            Self::ToggleExtension => "TOGGLE_EXTENSION",
            Self::ExportData => "EXPORT_DATA",
            Self::ImportData { .. } => "IMPORT_DATA",
            Self::ExportVariables => "EXPORT_VARIABLES",
            Self::ImportVariables { .. } => "IMPORT_VARIABLES",
            Self::SearchVariables { .. } => "SEARCH_VARIABLES",
            Self::ResolveText { .. } => "RESOLVE_TEXT",
            Self::CountAvailable { .. } => "COUNT_AVAILABLE",
        }
    }
}

/// The answer to a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum Response {
    /// A list of variables.
    Variables(Vec<Variable>),
    /// A single saved variable.
    Variable(Variable),
    /// The current settings.
    Settings(Settings),
    /// Whether a delete removed something.
    Deleted(bool),
    /// The global switch after a toggle.
    Enabled(bool),
    /// Exported JSON text.
    Exported(String),
    /// Result of a variable import.
    Imported(ImportSummary),
    /// Number of variables restored from a backup.
    Restored(usize),
    /// Result of a substitution.
    Resolved(Substitution),
    /// Number of available variables.
    Count(usize),
    /// The request failed.
    Error {
        /// Validation code, absent for backend failures.
        code: Option<ErrorCode>,
        /// Human-readable message.
        message: String,
        /// True when the user can fix the input and retry.
        recoverable: bool,
    },
}

impl Response {
    /// Builds an error response.
    #[must_use]
    pub fn from_error(error: &StoreError) -> Self {
        Self::Error {
            code: error.code(),
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        }
    }

    /// Returns true for [`Response::Error`].
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Dispatches messages to the store.
#[derive(Clone)]
pub struct MessageHandler {
    resolver: HostResolver,
}

impl MessageHandler {
    /// Creates a handler.
    #[must_use]
    pub const fn new(resolver: HostResolver) -> Self {
        Self { resolver }
    }

    /// Handles one message. Errors become [`Response::Error`].
    pub async fn handle(&self, message: Message) -> Response {
        let name = message.name();
        debug!(message = name, "Handling message");

        match self.dispatch(message).await {
            Ok(response) => response,
            Err(error) => {
                warn!(message = name, error = %error, "Message failed");
                Response::from_error(&error)
            }
        }
    }

    /// Decodes a JSON message, handles it and encodes the response.
    ///
    /// Undecodable input is answered with an `INVALID_JSON` error.
    pub async fn handle_json(&self, text: &str) -> String {
        let response = match serde_json::from_str::<Message>(text) {
            Ok(message) => self.handle(message).await,
            Err(e) => Response::Error {
                code: Some(ErrorCode::InvalidJson),
                message: format!("invalid message: {e}"),
                recoverable: true,
            },
        };

        serde_json::to_string(&response).unwrap_or_else(|e| encoding_failure(&e))
    }

    async fn dispatch(&self, message: Message) -> StoreResult<Response> {
        let store = self.resolver.store();

        Ok(match message {
            Message::GetVariables => Response::Variables(store.get_variables().await?),
            Message::AddVariable(draft) => {
                let draft = VariableDraft { id: None, ..draft };
                Response::Variable(store.save_variable(draft).await?)
            }
            Message::UpdateVariable(draft) => Response::Variable(self.update(draft).await?),
            Message::DeleteVariable { id } => {
                Response::Deleted(store.delete_variable_by_id(&id).await?)
            }
            Message::GetSettings => Response::Settings(store.get_settings().await?),
            Message::UpdateSettings(settings) => {
                store.set_settings(settings.clone()).await?;
                Response::Settings(settings)
            }
            Message::ToggleExtension => Response::Enabled(store.toggle_enabled().await?),
            Message::ExportData => Response::Exported(store.export_data().await?),
            Message::ImportData { json } => Response::Restored(store.import_data(&json).await?),
            Message::ExportVariables => Response::Exported(store.export_variables().await?),
            Message::ImportVariables { json, merge } => {
                Response::Imported(store.import_variables(&json, merge).await?)
            }
            Message::SearchVariables { query } => {
                Response::Variables(store.search_variables(&query).await?)
            }
            Message::ResolveText { text, origin } => Response::Resolved(
                self.resolver
                    .substitute(&text, &origin.hostname, origin.port())
                    .await?,
            ),
            Message::CountAvailable { origin } => Response::Count(
                self.resolver
                    .available_count(&origin.hostname, origin.port())
                    .await?,
            ),
        })
    }

    /// Updates an existing record; unlike `save_variable`, an unknown id is
    /// an error. A draft without a key keeps the stored key.
    async fn update(&self, mut draft: VariableDraft) -> StoreResult<Variable> {
        let store = self.resolver.store();
        let id = draft
            .id
            .clone()
            .ok_or_else(|| StoreError::NotFound("variable without id".into()))?;

        let existing = store
            .get_variables()
            .await?
            .into_iter()
            .find(|v| v.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("variable {id}")))?;

        if draft.key.is_none() {
            draft.key = Some(existing.key);
        }
        store.save_variable(draft).await
    }
}

/// Error reply used when a response cannot be serialized.
fn encoding_failure(error: &serde_json::Error) -> String {
    serde_json::json!({
        "kind": "error",
        "data": {"code": null, "message": error.to_string(), "recoverable": false}
    })
    .to_string()
}
