#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tables::common::HttpError;
use tables::config::TableServiceConfig;
use tables::http::{HttpRequest, HttpResponse, HttpSender};

pub const ACCOUNT_URL: &str = "https://myaccount.table.core.windows.net/?sv=2019-02-02&sig=secret";
pub const TABLE: &str = "orders";

pub fn test_config() -> TableServiceConfig {
    TableServiceConfig::new(ACCOUNT_URL, TABLE)
}

/// Sender that records every request and replies with a canned result.
pub struct RecordingSender {
    requests: Mutex<Vec<HttpRequest>>,
    reply: Result<HttpResponse, HttpError>,
}

impl RecordingSender {
    pub fn responding(response: HttpResponse) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Ok(response),
        })
    }

    pub fn failing(error: HttpError) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Err(error),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpSender for RecordingSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone()
    }
}

/// Wraps embedded responses in a batch/changeset response envelope.
pub fn batch_response_body(parts: &[String]) -> String {
    let mut body = String::from(
        "--batchresponse_b1\r\nContent-Type: multipart/mixed; boundary=changesetresponse_c1\r\n\r\n",
    );
    for part in parts {
        body.push_str("--changesetresponse_c1\r\n");
        body.push_str("Content-Type: application/http\r\n");
        body.push_str("Content-Transfer-Encoding: binary\r\n\r\n");
        body.push_str(part);
        body.push_str("\r\n");
    }
    body.push_str("--changesetresponse_c1--\r\n--batchresponse_b1--\r\n");
    body
}

pub fn accepted(parts: &[String]) -> HttpResponse {
    HttpResponse::new(202, batch_response_body(parts))
}

pub fn created_part(row_key: &str, etag: &str) -> String {
    format!(
        "HTTP/1.1 204 No Content\r\n\
         X-Content-Type-Options: nosniff\r\n\
         Cache-Control: no-cache\r\n\
         Preference-Applied: return-no-content\r\n\
         DataServiceVersion: 3.0;\r\n\
         Location: https://myaccount.table.core.windows.net/orders(PartitionKey='p1',RowKey='{row_key}')\r\n\
         DataServiceId: https://myaccount.table.core.windows.net/orders(PartitionKey='p1',RowKey='{row_key}')\r\n\
         ETag: {etag}\r\n"
    )
}

pub fn updated_part(etag: &str) -> String {
    format!(
        "HTTP/1.1 204 No Content\r\n\
         X-Content-Type-Options: nosniff\r\n\
         Cache-Control: no-cache\r\n\
         DataServiceVersion: 1.0;\r\n\
         ETag: {etag}\r\n"
    )
}

pub fn deleted_part() -> String {
    "HTTP/1.1 204 No Content\r\n\
     X-Content-Type-Options: nosniff\r\n\
     Cache-Control: no-cache\r\n\
     DataServiceVersion: 1.0;\r\n"
        .to_string()
}

pub fn error_part(status_line: &str, code: &str, message: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\n\
         X-Content-Type-Options: nosniff\r\n\
         DataServiceVersion: 3.0;\r\n\
         Content-Type: application/json;odata=minimalmetadata;streaming=true;charset=utf-8\r\n\
         \r\n\
         {{\"odata.error\":{{\"code\":\"{code}\",\"message\":{{\"lang\":\"en-US\",\"value\":\"{message}\"}}}}}}\r\n"
    )
}
