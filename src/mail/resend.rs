use async_trait::async_trait;
use reqwest::header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE };
use serde::Deserialize;
use log::{ info, debug };

use super::{ MailError, MailProvider, OutboundEmail };

#[derive(Deserialize)]
struct ResendAccepted {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct ResendErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: String,
}

/// Client for the Resend transactional email API.
#[derive(Debug, Clone)]
pub struct ResendClient {
    client: reqwest::Client,
    base_url: String,
}

impl ResendClient {
    pub fn new(api_key: &str, base_url: String) -> Result<Self, MailError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
            MailError::Config(format!("invalid API key header value: {}", e))
        )?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl MailProvider for ResendClient {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let url = format!("{}/emails", self.base_url.trim_end_matches('/'));
        let response = self.client.post(&url).json(email).send().await?;

        let status = response.status();
        debug!("Resend response status: {}", status);
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            let id = serde_json::from_str::<ResendAccepted>(&body).ok().and_then(|a| a.id);
            info!("Contact notification accepted by Resend (id: {:?})", id);
            return Ok(());
        }

        Err(match serde_json::from_str::<ResendErrorBody>(&body) {
            Ok(err) =>
                MailError::Rejected {
                    status: status.as_u16(),
                    name: err.name,
                    message: err.message,
                },
            Err(_) =>
                MailError::Rejected {
                    status: status.as_u16(),
                    name: None,
                    message: body,
                },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{ body_json, header, method, path };
    use wiremock::{ Mock, MockServer, ResponseTemplate };

    fn email() -> OutboundEmail {
        OutboundEmail {
            from: "Portfolio Contact <onboarding@resend.dev>".into(),
            to: vec!["owner@example.com".into()],
            reply_to: "visitor@example.com".into(),
            subject: "[Portfolio] Hello".into(),
            html: "<p>Hello</p>".into(),
            text: "Hello".into(),
        }
    }

    #[tokio::test]
    async fn sends_message_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(
                body_json(
                    json!({
                        "from": "Portfolio Contact <onboarding@resend.dev>",
                        "to": ["owner@example.com"],
                        "reply_to": "visitor@example.com",
                        "subject": "[Portfolio] Hello",
                        "html": "<p>Hello</p>",
                        "text": "Hello"
                    })
                )
            )
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "abc-123" })))
            .expect(1)
            .mount(&server).await;

        let client = ResendClient::new("re_test", server.uri()).unwrap();
        client.send(&email()).await.unwrap();
    }

    #[tokio::test]
    async fn provider_error_is_surfaced_with_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(
                    json!({
                        "statusCode": 422,
                        "name": "validation_error",
                        "message": "Invalid `to` field."
                    })
                )
            )
            .mount(&server).await;

        let client = ResendClient::new("re_test", server.uri()).unwrap();
        match client.send(&email()).await {
            Err(MailError::Rejected { status, name, message }) => {
                assert_eq!(status, 422);
                assert_eq!(name.as_deref(), Some("validation_error"));
                assert_eq!(message, "Invalid `to` field.");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
