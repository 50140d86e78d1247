//! Request validation
//!
//! Structural checks (fields present, JSON types) run first and stop at the
//! first failure. Domain checks run only on well-formed input and report
//! every failing field at once.

use crate::api::error::{ErrorReport, GatewayError};
use crate::ledger::{parse_amount, Address, AddressFormat, Transfer};
use axum::extract::rejection::{
    BytesRejection, FailedToBufferBody, JsonRejection, QueryRejection,
};
use axum::extract::Query;
use axum::Json;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct SendBody {
    pub from: String,
    pub to: String,
    /// Signed so that negative amounts fail domain validation, not parsing
    pub amount: i64,
    /// Absent or `null` means queue
    #[serde(default, deserialize_with = "null_as_false")]
    pub mine: bool,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

pub fn bind_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ErrorReport> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| GatewayError::Validation(rejection.body_text()).into())
}

/// Unwrap a JSON body; an unreadable body is a transport artifact
pub fn bind_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ErrorReport> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(
            rejection @ JsonRejection::BytesRejection(BytesRejection::FailedToBufferBody(
                FailedToBufferBody::UnknownBodyError(_),
            )),
        ) => Err(GatewayError::TransportArtifact(rejection.body_text()).into()),
        Err(rejection) => Err(GatewayError::Validation(rejection.body_text()).into()),
    }
}

/// The `address` query parameter, validated
pub fn address_param(
    query: Result<Query<AddressQuery>, QueryRejection>,
    format: &dyn AddressFormat,
) -> Result<Address, ErrorReport> {
    let AddressQuery { address } = bind_query(query)?;
    Address::parse(&address, format).map_err(|e| GatewayError::Validation(e.to_string()).into())
}

/// Turn a `/send` body into a transfer
pub fn send_command(
    body: Result<Json<SendBody>, JsonRejection>,
    format: &dyn AddressFormat,
) -> Result<Transfer, ErrorReport> {
    let SendBody {
        from,
        to,
        amount,
        mine,
    } = bind_json(body)?;
    transfer(&from, &to, amount, mine, format)
}

/// Domain checks for a transfer, collecting every failing field
pub fn transfer(
    from: &str,
    to: &str,
    amount: i64,
    mine: bool,
    format: &dyn AddressFormat,
) -> Result<Transfer, ErrorReport> {
    let mut errors = Vec::new();

    let from = Address::parse(from, format)
        .map_err(|e| errors.push(GatewayError::Validation(format!("from: {e}"))))
        .ok();
    let to = Address::parse(to, format)
        .map_err(|e| errors.push(GatewayError::Validation(format!("to: {e}"))))
        .ok();
    let amount = parse_amount(amount)
        .map_err(|e| errors.push(GatewayError::Validation(format!("amount: {e}"))))
        .ok();

    match (from, to, amount) {
        (Some(from), Some(to), Some(amount)) => Ok(Transfer {
            from,
            to,
            amount,
            mine,
        }),
        _ => Err(ErrorReport::new(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::ledger::Base58Check;
    use axum::body::{Body, Bytes};
    use axum::extract::FromRequest;
    use axum::http::{header, Request};

    async fn extract(body: Body) -> Result<Json<SendBody>, JsonRejection> {
        let request = Request::builder()
            .method("POST")
            .uri("/send")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();
        Json::<SendBody>::from_request(request, &()).await
    }

    fn messages(report: &ErrorReport) -> Vec<String> {
        report.errors().iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_valid_send() {
        let from = KeyPair::generate().address();
        let to = KeyPair::generate().address();
        let json = serde_json::json!({ "from": from, "to": to, "amount": 10 });

        let transfer = send_command(extract(Body::from(json.to_string())).await, &Base58Check)
            .unwrap();

        assert_eq!(transfer.from.as_str(), from);
        assert_eq!(transfer.to.as_str(), to);
        assert_eq!(transfer.amount, 10);
        assert!(!transfer.mine);
    }

    #[tokio::test]
    async fn test_null_mine_queues() {
        let from = KeyPair::generate().address();
        let to = KeyPair::generate().address();
        let json = serde_json::json!({ "from": from, "to": to, "amount": 3, "mine": null });

        let transfer = send_command(extract(Body::from(json.to_string())).await, &Base58Check)
            .unwrap();

        assert!(!transfer.mine);
    }

    #[tokio::test]
    async fn test_domain_errors_collected_in_order() {
        let json = serde_json::json!({ "from": "AAAAA", "to": "B", "amount": -5, "mine": true });

        let report = send_command(extract(Body::from(json.to_string())).await, &Base58Check)
            .unwrap_err();

        assert_eq!(
            messages(&report),
            vec![
                "from: address is not valid",
                "to: address is not valid",
                "amount: must be a positive integer",
            ]
        );
    }

    #[tokio::test]
    async fn test_structural_error_stops_pipeline() {
        // `to` is missing and `from` is invalid: only the structural error is reported
        let json = serde_json::json!({ "from": "A", "amount": 10 });

        let report = send_command(extract(Body::from(json.to_string())).await, &Base58Check)
            .unwrap_err();

        assert_eq!(report.errors().len(), 1);
        assert!(matches!(&report.errors()[0], GatewayError::Validation(m) if m.contains("to")));
    }

    #[tokio::test]
    async fn test_wrong_amount_type() {
        let json = r#"{"from":"AAAAA","to":"BBBBB","amount":"ten"}"#;

        let report = send_command(extract(Body::from(json)).await, &Base58Check).unwrap_err();

        assert!(matches!(&report.errors()[0], GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_transport_artifact() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"from\":")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection closed",
            )),
        ];
        let body = Body::from_stream(futures::stream::iter(chunks));

        let report = send_command(extract(body).await, &Base58Check).unwrap_err();

        assert_eq!(report.errors().len(), 1);
        assert!(!report.errors()[0].is_actionable());
    }
}
