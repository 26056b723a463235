//! Turns transaction actions into embedded HTTP sub-requests.
//!
//! Each action goes through the same fixed steps:
//!
//! 1. [`SubRequestSerializer::serialize`] builds the request a standalone
//!    entity call would have made.
//! 2. [`filter_headers`] drops headers that are not valid inside a changeset.
//! 3. [`apply_cosmos_patch`] rewrites `PATCH` for Cosmos-backed endpoints.
//! 4. [`assemble_body_part`] renders the request as a changeset part.

use super::actions::TransactionAction;
use super::errors::TransactionError;
use crate::model::UpdateMode;
use url::{Position, Url};

pub const TRANSACTION_LINE_ENDING: &str = "\r\n";
pub const HTTP_VERSION_1_1: &str = "HTTP/1.1";
pub const STORAGE_API_VERSION: &str = "2019-02-02";
pub const STORAGE_EMULATOR_PORT: u16 = 10002;

/// Headers that belong to the outer batch request only.
const FILTERED_SUB_REQUEST_HEADERS: [&str; 4] = [
    "x-ms-version",
    "authorization",
    "x-ms-date",
    "x-ms-client-request-id",
];

/// A would-be entity request, captured instead of being sent.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl SubRequest {
    fn new(method: &str, url: String) -> Self {
        Self {
            method: method.to_string(),
            url,
            headers: vec![
                ("x-ms-version".to_string(), STORAGE_API_VERSION.to_string()),
                ("DataServiceVersion".to_string(), "3.0".to_string()),
                (
                    "Accept".to_string(),
                    "application/json;odata=minimalmetadata".to_string(),
                ),
            ],
            body: None,
        }
    }

    fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    fn with_json_body(mut self, body: String) -> Self {
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }
}

/// Which dialect of the table service the endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFlavor {
    Storage,
    /// Cosmos DB table API, which rejects `PATCH` inside a changeset.
    Cosmos,
}

/// Serializes actions against one table of one account.
#[derive(Debug, Clone)]
pub struct SubRequestSerializer {
    table_url: String,
    flavor: ServiceFlavor,
}

impl SubRequestSerializer {
    pub fn new(account_url: &str, table_name: &str) -> Result<Self, TransactionError> {
        let parsed = Url::parse(account_url).map_err(|e| TransactionError::InvalidUrl {
            url: account_url.to_string(),
            reason: e.to_string(),
        })?;

        let flavor = if is_cosmos_endpoint(&parsed) {
            ServiceFlavor::Cosmos
        } else {
            ServiceFlavor::Storage
        };

        // Sub-request URLs must not carry the query string (SAS) of the account URL
        let base = parsed[..Position::AfterPath].trim_end_matches('/');
        let table_url = format!("{base}/{table_name}");

        Ok(Self { table_url, flavor })
    }

    pub fn flavor(&self) -> ServiceFlavor {
        self.flavor
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    /// Builds the request a standalone call for `action` would send.
    pub fn serialize(&self, action: &TransactionAction) -> Result<SubRequest, TransactionError> {
        let request = match action {
            TransactionAction::Create(entity) => {
                let body = entity_body(action, entity)?;
                SubRequest::new("POST", self.table_url.clone())
                    .with_header("Prefer", "return-no-content")
                    .with_json_body(body)
            }
            TransactionAction::Delete {
                partition_key,
                row_key,
                options,
            } => SubRequest::new("DELETE", self.entity_url(partition_key, row_key))
                .with_header("If-Match", options.etag.as_deref().unwrap_or("*")),
            TransactionAction::Update {
                entity,
                mode,
                options,
            } => {
                let body = entity_body(action, entity)?;
                SubRequest::new(
                    update_method(*mode),
                    self.entity_url(&entity.partition_key, &entity.row_key),
                )
                .with_header("If-Match", options.etag.as_deref().unwrap_or("*"))
                .with_json_body(body)
            }
            TransactionAction::Upsert { entity, mode } => {
                let body = entity_body(action, entity)?;
                SubRequest::new(
                    update_method(*mode),
                    self.entity_url(&entity.partition_key, &entity.row_key),
                )
                .with_json_body(body)
            }
        };

        Ok(request)
    }

    /// Runs every step for one action and returns the rendered body part.
    pub fn to_body_part(
        &self,
        action: &TransactionAction,
        changeset_id: &str,
    ) -> Result<String, TransactionError> {
        let mut request = self.serialize(action)?;
        filter_headers(&mut request);
        if self.flavor == ServiceFlavor::Cosmos {
            apply_cosmos_patch(&mut request);
        }
        Ok(assemble_body_part(&request, changeset_id))
    }

    fn entity_url(&self, partition_key: &str, row_key: &str) -> String {
        format!(
            "{}(PartitionKey='{}',RowKey='{}')",
            self.table_url,
            escape_key(partition_key),
            escape_key(row_key)
        )
    }
}

fn update_method(mode: UpdateMode) -> &'static str {
    match mode {
        UpdateMode::Merge => "PATCH",
        UpdateMode::Replace => "PUT",
    }
}

fn entity_body(
    action: &TransactionAction,
    entity: &crate::model::TableEntity,
) -> Result<String, TransactionError> {
    serde_json::to_string(&entity.to_odata_json()).map_err(|e| TransactionError::Serialization {
        operation: action.kind().to_string(),
        reason: e.to_string(),
    })
}

/// OData string literal for a key: quotes doubled, then percent-encoded.
pub fn escape_key(value: &str) -> String {
    urlencoding::encode(&value.replace('\'', "''")).into_owned()
}

/// Removes headers that only make sense on the outer batch request.
pub fn filter_headers(request: &mut SubRequest) {
    request.headers.retain(|(name, _)| {
        !FILTERED_SUB_REQUEST_HEADERS
            .iter()
            .any(|filtered| name.eq_ignore_ascii_case(filtered))
    });
}

/// Cosmos endpoints take merges as `POST` with an `X-HTTP-Method` override.
pub fn apply_cosmos_patch(request: &mut SubRequest) {
    if request.method == "PATCH" {
        request.method = "POST".to_string();
        request.set_header("X-HTTP-Method", "MERGE");
    }
}

/// Renders a sub-request as one part of the changeset.
pub fn assemble_body_part(request: &SubRequest, changeset_id: &str) -> String {
    let mut lines = vec![
        format!("--changeset_{changeset_id}"),
        "Content-Type: application/http".to_string(),
        "Content-Transfer-Encoding: binary".to_string(),
        String::new(),
        format!("{} {} {}", request.method, request.url, HTTP_VERSION_1_1),
    ];
    lines.extend(
        request
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}")),
    );
    lines.push(String::new());
    lines.push(request.body.clone().unwrap_or_default());

    lines.join(TRANSACTION_LINE_ENDING)
}

pub fn is_cosmos_endpoint(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default();

    if host.contains(".table.cosmosdb.") || host.contains(".table.cosmos.") {
        return true;
    }

    // The Cosmos emulator also serves from localhost, on any port but the storage emulator's
    host == "localhost" && url.port_or_known_default() != Some(STORAGE_EMULATOR_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeleteEntityOptions, TableEntity, UpdateEntityOptions};

    const ACCOUNT: &str = "https://myaccount.table.core.windows.net/?sv=2019-02-02&sig=secret";

    fn serializer() -> SubRequestSerializer {
        SubRequestSerializer::new(ACCOUNT, "orders").unwrap()
    }

    #[test]
    fn test_table_url_drops_query_string() {
        assert_eq!(
            serializer().table_url(),
            "https://myaccount.table.core.windows.net/orders"
        );
    }

    #[test]
    fn test_key_escaping() {
        assert_eq!(escape_key("O'Brien"), "O%27%27Brien");
        assert_eq!(escape_key("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn test_create_serialization() {
        let action = TransactionAction::Create(TableEntity::new("p", "r").with_property("n", 1));
        let request = serializer().serialize(&action).unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "https://myaccount.table.core.windows.net/orders");
        assert_eq!(request.header("Prefer"), Some("return-no-content"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"PartitionKey":"p","RowKey":"r","n":1}"#)
        );
    }

    #[test]
    fn test_delete_uses_etag_or_wildcard() {
        let with_etag = TransactionAction::Delete {
            partition_key: "p".to_string(),
            row_key: "r".to_string(),
            options: DeleteEntityOptions::with_etag("W/\"1\""),
        };
        let without_etag = TransactionAction::Delete {
            partition_key: "p".to_string(),
            row_key: "r".to_string(),
            options: DeleteEntityOptions::default(),
        };

        let first = serializer().serialize(&with_etag).unwrap();
        let second = serializer().serialize(&without_etag).unwrap();

        assert_eq!(first.method, "DELETE");
        assert_eq!(
            first.url,
            "https://myaccount.table.core.windows.net/orders(PartitionKey='p',RowKey='r')"
        );
        assert_eq!(first.header("If-Match"), Some("W/\"1\""));
        assert!(first.body.is_none());
        assert_eq!(second.header("If-Match"), Some("*"));
    }

    #[test]
    fn test_update_and_upsert_methods() {
        let update = TransactionAction::Update {
            entity: TableEntity::new("p", "r"),
            mode: UpdateMode::Replace,
            options: UpdateEntityOptions::default(),
        };
        let upsert = TransactionAction::Upsert {
            entity: TableEntity::new("p", "r"),
            mode: UpdateMode::Merge,
        };

        let update = serializer().serialize(&update).unwrap();
        let upsert = serializer().serialize(&upsert).unwrap();

        assert_eq!(update.method, "PUT");
        assert_eq!(update.header("If-Match"), Some("*"));
        assert_eq!(upsert.method, "PATCH");
        assert_eq!(upsert.header("If-Match"), None);
    }

    #[test]
    fn test_filter_drops_batch_only_headers() {
        let action = TransactionAction::Create(TableEntity::new("p", "r"));
        let mut request = serializer().serialize(&action).unwrap();
        request
            .headers
            .push(("Authorization".to_string(), "SharedKey x".to_string()));

        filter_headers(&mut request);

        assert_eq!(request.header("x-ms-version"), None);
        assert_eq!(request.header("authorization"), None);
        assert_eq!(request.header("DataServiceVersion"), Some("3.0"));
    }

    #[test]
    fn test_cosmos_detection() {
        let cosmos = Url::parse("https://acct.table.cosmos.azure.com/").unwrap();
        let cosmos_db = Url::parse("https://acct.table.cosmosdb.azure.com:443/").unwrap();
        let storage = Url::parse("https://acct.table.core.windows.net/").unwrap();
        let storage_emulator = Url::parse("http://localhost:10002/devstoreaccount1").unwrap();
        let cosmos_emulator = Url::parse("http://localhost:8902/").unwrap();

        assert!(is_cosmos_endpoint(&cosmos));
        assert!(is_cosmos_endpoint(&cosmos_db));
        assert!(!is_cosmos_endpoint(&storage));
        assert!(!is_cosmos_endpoint(&storage_emulator));
        assert!(is_cosmos_endpoint(&cosmos_emulator));
    }

    #[test]
    fn test_cosmos_flavor_rewrites_patch() {
        let serializer =
            SubRequestSerializer::new("https://acct.table.cosmos.azure.com/", "orders").unwrap();
        let action = TransactionAction::Upsert {
            entity: TableEntity::new("p", "r"),
            mode: UpdateMode::Merge,
        };

        let part = serializer.to_body_part(&action, "cs1").unwrap();

        assert_eq!(serializer.flavor(), ServiceFlavor::Cosmos);
        assert!(part.contains(
            "POST https://acct.table.cosmos.azure.com/orders(PartitionKey='p',RowKey='r') HTTP/1.1"
        ));
        assert!(part.contains("X-HTTP-Method: MERGE"));
    }

    #[test]
    fn test_body_part_layout() {
        let action = TransactionAction::Delete {
            partition_key: "p".to_string(),
            row_key: "r".to_string(),
            options: DeleteEntityOptions::default(),
        };

        let part = serializer().to_body_part(&action, "cs1").unwrap();
        let expected = [
            "--changeset_cs1",
            "Content-Type: application/http",
            "Content-Transfer-Encoding: binary",
            "",
            "DELETE https://myaccount.table.core.windows.net/orders(PartitionKey='p',RowKey='r') HTTP/1.1",
            "DataServiceVersion: 3.0",
            "Accept: application/json;odata=minimalmetadata",
            "If-Match: *",
            "",
            "",
        ]
        .join("\r\n");

        assert_eq!(part, expected);
    }

    #[test]
    fn test_invalid_account_url() {
        let result = SubRequestSerializer::new("not a url", "orders");
        assert!(matches!(result, Err(TransactionError::InvalidUrl { .. })));
    }
}
