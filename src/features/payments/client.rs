//! Payment hand-off to the backend. The backend owns the checkout session and
//! the application record; this client only passes identifiers along.

use crate::api::{ApiClient, ApiError};
use crate::features::payments::types::{
    CheckoutRequest, CheckoutSession, ConfirmRequest, PaymentConfirmation,
};
use secrecy::SecretString;
use serde_json::Value;
use tracing::instrument;

fn require(value: &str, what: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Config(format!("{what} is required.")));
    }
    Ok(())
}

/// Opens a checkout session for an application.
///
/// # Errors
/// Returns `ApiError::Config` for an empty scholarship id, otherwise an
/// `ApiError` from the request. A response without `sessionId` is a `Parse`
/// error.
#[instrument(skip(api, bearer, application_data))]
pub async fn create_checkout(
    api: &ApiClient,
    bearer: &SecretString,
    scholarship_id: &str,
    application_data: &Value,
) -> Result<CheckoutSession, ApiError> {
    require(scholarship_id, "Scholarship id")?;
    let request = CheckoutRequest {
        scholarship_id: scholarship_id.trim(),
        application_data,
    };
    api.post_json(&["payment", "create-checkout"], &request, Some(bearer))
        .await
}

/// Confirms a completed checkout session and saves the application.
///
/// # Errors
/// Returns `ApiError::Config` for an empty session id, otherwise an `ApiError`
/// from the request.
#[instrument(skip_all)]
pub async fn confirm_payment(
    api: &ApiClient,
    bearer: Option<&SecretString>,
    session_id: &str,
    application_data: &Value,
) -> Result<PaymentConfirmation, ApiError> {
    require(session_id, "Session id")?;
    let request = ConfirmRequest {
        session_id: session_id.trim(),
        application_data,
    };
    api.post_json(&["payment", "confirm-payment"], &request, bearer)
        .await
}

/// Stores the application as unpaid after the user abandons checkout.
///
/// # Errors
/// Returns `ApiError::Config` for an empty scholarship id, otherwise an
/// `ApiError` from the request.
#[instrument(skip(api, bearer, application_data))]
pub async fn save_unpaid(
    api: &ApiClient,
    bearer: &SecretString,
    scholarship_id: &str,
    application_data: &Value,
) -> Result<Value, ApiError> {
    require(scholarship_id, "Scholarship id")?;
    let request = CheckoutRequest {
        scholarship_id: scholarship_id.trim(),
        application_data,
    };
    api.post_json(&["payment", "save-unpaid"], &request, Some(bearer))
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn token() -> SecretString {
        SecretString::from("tok".to_string())
    }

    #[tokio::test]
    async fn empty_ids_are_rejected_locally() {
        let api = ApiClient::new("http://localhost:3000", Duration::from_secs(1)).unwrap();
        let data = json!({});
        assert!(matches!(
            create_checkout(&api, &token(), "  ", &data).await,
            Err(ApiError::Config(_))
        ));
        assert!(matches!(
            confirm_payment(&api, None, "", &data).await,
            Err(ApiError::Config(_))
        ));
        assert!(matches!(
            save_unpaid(&api, &token(), "", &data).await,
            Err(ApiError::Config(_))
        ));
    }

    #[tokio::test]
    async fn checkout_returns_session_id() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        let data = json!({ "degree": "Masters", "applicationFees": 25 });
        Mock::given(method("POST"))
            .and(path("/payment/create-checkout"))
            .and(header("Authorization", "Bearer tok"))
            .and(body_json(json!({ "scholarshipId": "sch-1", "applicationData": data })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "sessionId": "cs_test_123",
                "publishableKey": "pk_test"
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let session = create_checkout(&api, &token(), "sch-1", &data).await.unwrap();
        assert!(session.success);
        assert_eq!(session.session_id, "cs_test_123");
        assert_eq!(session.url, None);
    }

    #[tokio::test]
    async fn checkout_without_session_id_is_parse_error() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment/create-checkout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let result = create_checkout(&api, &token(), "sch-1", &json!({})).await;
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }

    #[tokio::test]
    async fn confirm_returns_application() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment/confirm-payment"))
            .and(body_json(json!({ "sessionId": "cs_test_123", "applicationData": {} })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "application": { "scholarshipId": "sch-1", "paymentStatus": "paid" }
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let confirmation = confirm_payment(&api, None, "cs_test_123", &json!({}))
            .await
            .unwrap();
        assert_eq!(
            confirmation.confirmed_application(),
            Some(&json!({ "scholarshipId": "sch-1", "paymentStatus": "paid" }))
        );
    }

    #[tokio::test]
    async fn save_unpaid_posts_application() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment/save-unpaid"))
            .and(body_json(json!({ "scholarshipId": "sch-1", "applicationData": { "degree": "PhD" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let response = save_unpaid(&api, &token(), "sch-1", &json!({ "degree": "PhD" }))
            .await
            .unwrap();
        assert_eq!(response, json!({ "success": true }));
    }
}
