//! Decoding of multipart batch responses.

use super::errors::TransactionError;
use crate::http::HttpResponse;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Literal that starts every embedded response part.
pub const SUB_RESPONSE_PREFIX: &str = "--changesetresponse_";

const REQUEST_ID_HEADER: &str = "x-ms-request-id";

// Patterns never match across a line break.
static STATUS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"HTTP/1\.1 ([0-9]*)").expect("status pattern is valid"));
static BODY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^\r\n]*)\}").expect("body pattern is valid"));
static ETAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ETag: ([^\r\n]*)").expect("etag pattern is valid"));
static ROW_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"RowKey='([^\r\n]*)'").expect("row key pattern is valid"));

/// Outcome of one operation inside a successful transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntityResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Result of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Status of the batch request itself.
    pub status: u16,
    /// One entry per operation, in submission order.
    pub sub_responses: Vec<TransactionEntityResponse>,
}

impl TransactionResponse {
    /// First sub-response reporting `row_key`.
    ///
    /// Row keys repeated across actions are not told apart.
    pub fn get_response_for_entity(&self, row_key: &str) -> Option<&TransactionEntityResponse> {
        self.sub_responses
            .iter()
            .find(|r| r.row_key.as_deref() == Some(row_key))
    }

    pub fn len(&self) -> usize {
        self.sub_responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_responses.is_empty()
    }
}

/// Decodes a raw batch response.
///
/// A non-2xx status fails the whole transaction without looking at the parts.
/// Otherwise the body is split on [`SUB_RESPONSE_PREFIX`]; the text before the
/// first part and after the last one is discarded. The first part carrying a
/// JSON body aborts decoding with that part's error.
pub fn parse_transaction_response(
    response: &HttpResponse,
) -> Result<TransactionResponse, TransactionError> {
    let status = response.status;
    let request_id = response.header(REQUEST_ID_HEADER).map(str::to_string);

    if !response.is_success() {
        log::debug!("Transaction rejected with HTTP {status}");
        return Err(TransactionError::transaction_failed(
            status,
            response.body.clone(),
            request_id,
        ));
    }

    let split: Vec<&str> = response.body.split(SUB_RESPONSE_PREFIX).collect();
    let parts = if split.len() > 2 {
        &split[1..split.len() - 1]
    } else {
        &[][..]
    };

    let mut sub_responses = Vec::with_capacity(parts.len());
    for (index, part) in parts.iter().enumerate() {
        sub_responses.push(parse_sub_response(index, part, request_id.as_ref())?);
    }

    Ok(TransactionResponse {
        status,
        sub_responses,
    })
}

fn parse_sub_response(
    index: usize,
    part: &str,
    request_id: Option<&String>,
) -> Result<TransactionEntityResponse, TransactionError> {
    let digits = STATUS_PATTERN
        .captures(part)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            TransactionError::malformed("Couldn't extract status from sub-response", part)
        })?;

    let status = digits.parse::<u16>().map_err(|_| {
        TransactionError::malformed(
            format!("Expected sub-response status to be an integer, got '{digits}'"),
            part,
        )
    })?;

    if let Some(body) = BODY_PATTERN.find(part) {
        log::debug!("Sub-response {index} failed with HTTP {status}");
        return Err(TransactionError::sub_operation_failed(
            index,
            status,
            body.as_str(),
            request_id.cloned(),
        ));
    }

    let etag = ETAG_PATTERN
        .captures(part)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let row_key = ROW_KEY_PATTERN
        .captures(part)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Ok(TransactionEntityResponse {
        status,
        row_key,
        etag,
    })
}
