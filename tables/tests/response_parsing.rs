mod common;

use claims::assert_err;
use common::*;
use tables::http::HttpResponse;
use tables::transaction::{TransactionEntityResponse, TransactionError, parse_transaction_response};

#[cfg(test)]
mod sub_response_tests {
    use super::*;

    #[test]
    fn test_row_key_and_etag_are_extracted() {
        let response = accepted(&[created_part("abc", "W/\"etag1\"")]);

        let parsed = parse_transaction_response(&response).unwrap();

        assert_eq!(
            parsed.sub_responses,
            vec![TransactionEntityResponse {
                status: 204,
                row_key: Some("abc".to_string()),
                etag: Some("W/\"etag1\"".to_string()),
            }]
        );
    }

    #[test]
    fn test_delete_part_has_status_only() {
        let response = accepted(&["HTTP/1.1 204 No Content\r\n".to_string()]);

        let parsed = parse_transaction_response(&response).unwrap();

        assert_eq!(
            parsed.sub_responses,
            vec![TransactionEntityResponse {
                status: 204,
                row_key: None,
                etag: None,
            }]
        );
    }

    #[test]
    fn test_lookup_by_row_key() {
        let response = accepted(&[
            created_part("abc", "W/\"etag1\""),
            deleted_part(),
            created_part("xyz", "W/\"etag2\""),
        ]);

        let parsed = parse_transaction_response(&response).unwrap();

        let found = parsed.get_response_for_entity("abc").unwrap();
        assert_eq!(found.etag.as_deref(), Some("W/\"etag1\""));
        assert_eq!(
            parsed.get_response_for_entity("xyz"),
            Some(&parsed.sub_responses[2])
        );
        assert!(parsed.get_response_for_entity("nope").is_none());
    }

    #[test]
    fn test_etag_with_embedded_quotes() {
        let etag = "W/\"datetime'2024-03-01T12%3A30%3A00.1234567Z'\"";
        let response = accepted(&[created_part("r1", etag)]);

        let parsed = parse_transaction_response(&response).unwrap();

        assert_eq!(parsed.sub_responses[0].etag.as_deref(), Some(etag));
        assert_eq!(parsed.sub_responses[0].row_key.as_deref(), Some("r1"));
    }

    #[test]
    fn test_missing_status_line_is_malformed() {
        let response = accepted(&["Content-Length: 0\r\n".to_string()]);

        let error = assert_err!(parse_transaction_response(&response));

        assert!(matches!(error, TransactionError::MalformedResponse { .. }));
        assert!(!error.is_service_error());
        assert!(!error.is_local());
    }

    #[test]
    fn test_status_out_of_range_is_malformed() {
        let response = accepted(&["HTTP/1.1 99999 Huge\r\n".to_string()]);

        let error = assert_err!(parse_transaction_response(&response));

        assert!(matches!(error, TransactionError::MalformedResponse { .. }));
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[test]
    fn test_failed_batch_is_not_split() {
        // A failing status wins even if the body looks like a multipart response.
        let body = format!(
            "{{\"odata.error\":{{\"code\":\"InvalidInput\",\"message\":{{\"value\":\"Bad\"}}}}}}{}",
            batch_response_body(&["HTTP/1.1 204 No Content\r\n".to_string()])
        );
        let response = HttpResponse::new(400, body);

        let error = assert_err!(parse_transaction_response(&response));

        assert!(matches!(
            error,
            TransactionError::TransactionFailed {
                status_code: 400,
                ..
            }
        ));
    }

    #[test]
    fn test_failed_batch_with_json_body() {
        let response = HttpResponse::new(
            400,
            r#"{"odata.error":{"code":"InvalidDuplicateRow","message":{"lang":"en-US","value":"The batch request contains multiple changes with same row key."}}}"#,
        );

        let error = assert_err!(parse_transaction_response(&response));

        assert_eq!(error.status_code(), Some(400));
        assert_eq!(error.error_code(), Some("InvalidDuplicateRow"));
        assert_eq!(
            error.to_string(),
            "The batch request contains multiple changes with same row key. (HTTP 400, code InvalidDuplicateRow)"
        );
    }

    #[test]
    fn test_sub_operation_error_exposes_code() {
        let response = accepted(&[
            created_part("r1", "W/\"e1\""),
            error_part("409 Conflict", "EntityAlreadyExists", "x"),
            "no status here".to_string(),
        ]);

        let error = assert_err!(parse_transaction_response(&response));

        assert_eq!(
            error,
            TransactionError::SubOperationFailed {
                index: 1,
                status_code: 409,
                code: Some("EntityAlreadyExists".to_string()),
                message: "x".to_string(),
                request_id: None,
            }
        );
    }

    #[test]
    fn test_sub_operation_error_without_odata_shape() {
        let response = accepted(&["HTTP/1.1 400 Bad Request\r\n\r\n{\"unexpected\":true}\r\n".to_string()]);

        let error = assert_err!(parse_transaction_response(&response));

        assert_eq!(error.error_code(), None);
        assert_eq!(error.status_code(), Some(400));
        assert!(error.to_string().contains("Transaction Failed"));
    }
}
