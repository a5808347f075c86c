use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest<'a> {
    pub scholarship_id: &'a str,
    pub application_data: &'a Value,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest<'a> {
    pub session_id: &'a str,
    pub application_data: &'a Value,
}

/// Hosted checkout session. Only the id is handed to the payment page.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[serde(default)]
    pub success: bool,
    pub session_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub application: Option<Value>,
}

impl PaymentConfirmation {
    /// The saved application, present only when the backend confirmed payment.
    #[must_use]
    pub fn confirmed_application(&self) -> Option<&Value> {
        if self.success {
            self.application.as_ref()
        } else {
            None
        }
    }
}
