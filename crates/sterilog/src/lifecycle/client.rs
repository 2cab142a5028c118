use serde::{Deserialize, Serialize};

/// A client whose instruments were processed in a cycle.
///
/// A client is either registered (known by id) or entered by hand with a
/// free-text identifier and optional display name, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientRef {
    Registered {
        client_id: String,
    },
    Manual {
        identifier: String,
        name: Option<String>,
    },
}

impl ClientRef {
    pub fn registered(client_id: impl Into<String>) -> Self {
        Self::Registered {
            client_id: client_id.into(),
        }
    }

    pub fn manual(identifier: impl Into<String>, name: Option<String>) -> Self {
        Self::Manual {
            identifier: identifier.into(),
            name,
        }
    }

    /// The identifier shown to operators: client id or manual identifier.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Registered { client_id } => client_id,
            Self::Manual { identifier, .. } => identifier,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual { .. })
    }
}
