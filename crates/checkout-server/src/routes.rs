//! Router

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    chat, create_checkout_session, create_payment_intent, currency_quote, get_selection, health_check,
    stripe_webhook,
};
use crate::state::AppState;

/// Prefix older clients still post to
const LEGACY_PREFIX: &str = "/.netlify/functions";

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let origin = match allowed_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            tracing::warn!("Ignoring invalid CORS_ALLOWED_ORIGIN: {}", e);
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let mut app = Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/currency", get(currency_quote))
        .route("/api/selections/{session_id}", get(get_selection));

    // Checkout, webhook, assistant
    for prefix in ["/api", LEGACY_PREFIX] {
        app = app
            .route(&format!("{prefix}/create-checkout-session"), post(create_checkout_session))
            .route(&format!("{prefix}/create-payment-intent"), post(create_payment_intent))
            .route(&format!("{prefix}/webhook"), post(stripe_webhook))
            .route(&format!("{prefix}/gemini"), post(chat));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use assistant_core::{
        Assistant, AssistantConfig, AssistantError, Completion, GenerationOptions, LlmProvider, Message,
    };
    use checkout_currency::StaticRates;
    use checkout_payments::{
        CheckoutFlow, CheckoutRequest, CheckoutSession, MemorySelectionStore, PaymentGateway,
        PaymentIntentRequest, PaymentIntentSession, PlanCatalog, SelectionStore, sign_payload,
    };

    use super::*;
    use crate::config::ServerConfig;

    const WEBHOOK_SECRET: &str = "whsec_router_test";

    #[derive(Default)]
    struct FakeGateway {
        sessions: Mutex<Vec<CheckoutRequest>>,
        intents: Mutex<Vec<PaymentIntentRequest>>,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_checkout_session(
            &self,
            request: CheckoutRequest,
        ) -> checkout_payments::Result<CheckoutSession> {
            let flow = request.flow;
            self.sessions.lock().unwrap().push(request);
            Ok(CheckoutSession {
                id: "cs_test_123".into(),
                url: Some("https://checkout.stripe.com/c/pay/cs_test_123".into()),
                client_secret: (flow == CheckoutFlow::Embedded).then(|| "cs_test_123_secret_abc".into()),
                flow,
            })
        }

        async fn create_payment_intent(
            &self,
            request: PaymentIntentRequest,
        ) -> checkout_payments::Result<PaymentIntentSession> {
            self.intents.lock().unwrap().push(request);
            Ok(PaymentIntentSession {
                id: "pi_test_456".into(),
                client_secret: "pi_test_456_secret_def".into(),
            })
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// Answers with a fixed text or fails with a fixed error
    struct FakeProvider {
        fail_with: Option<&'static str>,
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> assistant_core::Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            options: &GenerationOptions,
        ) -> assistant_core::Result<Completion> {
            match self.fail_with {
                Some(detail) if detail.starts_with("429") => Err(AssistantError::RateLimited(detail.into())),
                Some(detail) => Err(AssistantError::Provider(detail.into())),
                None => Ok(Completion {
                    content: "The lifetime plan is a single payment.".into(),
                    model: options.model.clone(),
                    finish_reason: Some("STOP".into()),
                }),
            }
        }
    }

    struct Harness {
        gateway: Arc<FakeGateway>,
        selections: Arc<MemorySelectionStore>,
        app: Router,
    }

    fn harness_with(payments: bool, provider: Option<FakeProvider>) -> Harness {
        let gateway = Arc::new(FakeGateway::default());
        let selections = Arc::new(MemorySelectionStore::default());
        let state = AppState {
            catalog: Arc::new(PlanCatalog::default()),
            gateway: payments.then(|| gateway.clone() as Arc<dyn PaymentGateway>),
            rates: Arc::new(StaticRates::new()),
            selections: selections.clone(),
            assistant: provider.map(|p| Arc::new(Assistant::new(Arc::new(p), AssistantConfig::default()))),
            config: Arc::new(ServerConfig {
                site_url: "https://plans.example.com".into(),
                webhook_secret: Some(WEBHOOK_SECRET.into()),
                ..Default::default()
            }),
        };
        Harness {
            gateway,
            selections,
            app: router(state),
        }
    }

    fn harness() -> Harness {
        harness_with(true, Some(FakeProvider { fail_with: None }))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn webhook_request(payload: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .header("stripe-signature", signature)
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_redirect_checkout_returns_url() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            post_json(
                "/api/create-checkout-session",
                &json!({"planType": "monthly", "userCurrency": "eur", "convertedAmount": 9.99, "email": "ana@example.com"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_123");
        assert_eq!(body["sessionId"], "cs_test_123");
        assert!(body.get("clientSecret").is_none());

        let sessions = h.gateway.sessions.lock().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].currency, "EUR");
        assert_eq!(sessions[0].unit_amount, 999);
        assert_eq!(sessions[0].flow, CheckoutFlow::Redirect);
        assert_eq!(sessions[0].customer_email.as_deref(), Some("ana@example.com"));
        assert!(sessions[0].success_url.starts_with("https://plans.example.com/success"));
    }

    #[tokio::test]
    async fn test_embedded_header_returns_client_secret_only() {
        let h = harness();
        let mut request = post_json(
            "/api/create-checkout-session",
            &json!({"planType": "yearly", "userCurrency": "USD"}),
        );
        request
            .headers_mut()
            .insert("x-requested-from", HeaderValue::from_static("embedded-checkout"));

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["clientSecret"], "cs_test_123_secret_abc");
        assert_eq!(body["sessionId"], "cs_test_123");
        assert!(body.get("url").is_none());

        let sessions = h.gateway.sessions.lock().unwrap();
        assert_eq!(sessions[0].flow, CheckoutFlow::Embedded);
        assert_eq!(sessions[0].unit_amount, 9900);
        assert!(sessions[0].return_url.contains("{CHECKOUT_SESSION_ID}"));
    }

    #[tokio::test]
    async fn test_unknown_plan_or_currency_is_rejected() {
        let h = harness();
        let cases = [
            ("/api/create-checkout-session", json!({"planType": "weekly", "userCurrency": "USD"})),
            ("/api/create-checkout-session", json!({"planType": "monthly", "userCurrency": "XYZ"})),
            ("/api/create-payment-intent", json!({"planType": "forever", "userCurrency": "USD", "amount": 999})),
            ("/api/create-payment-intent", json!({"planType": "lifetime", "userCurrency": "DOGE"})),
            ("/.netlify/functions/create-checkout-session", json!({"planType": "", "userCurrency": "USD"})),
        ];

        for (uri, body) in cases {
            let (status, response) = send(&h.app, post_json(uri, &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
            assert!(response["error"].is_string());
        }
        assert!(h.gateway.sessions.lock().unwrap().is_empty());
        assert!(h.gateway.intents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_amount_is_rejected() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            post_json(
                "/api/create-checkout-session",
                &json!({"planType": "lifetime", "userCurrency": "USD", "convertedAmount": 1.0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Amount does not match the selected plan.");

        for amount in [json!(150.0), json!(198.99), json!("199.01")] {
            let (status, _) = send(
                &h.app,
                post_json(
                    "/api/create-checkout-session",
                    &json!({"planType": "lifetime", "userCurrency": "USD", "convertedAmount": amount}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}");
        }

        let (status, _) = send(
            &h.app,
            post_json(
                "/api/create-checkout-session",
                &json!({"planType": "lifetime", "userCurrency": "USD", "convertedAmount": "NaN"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.gateway.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_usd_amount_must_match_catalog() {
        let h = harness();
        let (status, _) = send(
            &h.app,
            post_json(
                "/api/create-payment-intent",
                &json!({"planType": "monthly", "userCurrency": "USD", "amount": 800}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &h.app,
            post_json(
                "/api/create-checkout-session",
                &json!({"planType": "lifetime", "userCurrency": "USD", "convertedAmount": 199.0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.gateway.sessions.lock().unwrap()[0].unit_amount, 19900);
        assert!(h.gateway.intents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_converted_amount_below_quote_is_rejected() {
        let h = harness();
        let (status, _) = send(
            &h.app,
            post_json(
                "/api/create-checkout-session",
                &json!({"planType": "yearly", "userCurrency": "JPY", "convertedAmount": 12000}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &h.app,
            post_json(
                "/api/create-checkout-session",
                &json!({"planType": "yearly", "userCurrency": "JPY", "convertedAmount": 15000}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.gateway.sessions.lock().unwrap()[0].unit_amount, 15000);
    }

    #[tokio::test]
    async fn test_zero_decimal_currency_is_charged_in_whole_units() {
        let h = harness();
        let (status, _) = send(
            &h.app,
            post_json(
                "/.netlify/functions/create-checkout-session",
                &json!({"planType": "yearly", "userCurrency": "JPY", "convertedAmount": "14850"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.gateway.sessions.lock().unwrap()[0].unit_amount, 14850);
    }

    #[tokio::test]
    async fn test_payment_intent_uses_usd_amount() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            post_json(
                "/api/create-payment-intent",
                &json!({"planType": "monthly", "userCurrency": "USD", "amount": 999}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["clientSecret"], "pi_test_456_secret_def");
        assert_eq!(body["id"], "pi_test_456");

        let intents = h.gateway.intents.lock().unwrap();
        assert_eq!(intents[0].amount, 999);
        assert_eq!(intents[0].currency, "USD");
    }

    #[tokio::test]
    async fn test_payments_disabled_returns_503() {
        let h = harness_with(false, None);
        let (status, body) = send(
            &h.app,
            post_json("/api/create-checkout-session", &json!({"planType": "monthly"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/api/create-payment-intent")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body.");
    }

    #[tokio::test]
    async fn test_invalid_webhook_signature_never_records() {
        let h = harness();
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_forged", "metadata": {"plan": "lifetime"}}}
        })
        .to_string();
        let now = chrono::Utc::now().timestamp();
        let forged = format!("t={now},v1={}", sign_payload(&payload, "whsec_wrong", now).unwrap());

        let (status, body) = send(&h.app, webhook_request(&payload, &forged)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Webhook Error"));
        assert!(h.selections.get("cs_forged").unwrap().is_none());

        let (status, _) = send(&h.app, webhook_request(&payload, "garbage")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signed_webhook_records_selection() {
        let h = harness();
        let payload = json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_live_1",
                "currency": "eur",
                "amount_total": 9100,
                "payment_status": "paid",
                "customer_details": {"email": "ana@example.com"},
                "metadata": {"plan": "yearly", "currency": "EUR"}
            }}
        })
        .to_string();
        let now = chrono::Utc::now().timestamp();
        let header = format!("t={now},v1={}", sign_payload(&payload, WEBHOOK_SECRET, now).unwrap());

        let (status, body) = send(&h.app, webhook_request(&payload, &header)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true}));

        let request = Request::builder()
            .uri("/api/selections/cs_live_1")
            .body(Body::empty())
            .unwrap();
        let (status, selection) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(selection["plan"], "yearly");
        assert_eq!(selection["amountTotal"], 9100);

        let request = Request::builder()
            .uri("/api/selections/cs_unknown")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_reply() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            post_json(
                "/api/gemini",
                &json!({
                    "message": "What is lifetime?",
                    "history": [{"role": "user", "parts": [{"text": "hi"}]}],
                    "modelName": "gemini-1.5-flash"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "The lifetime plan is a single payment.");
    }

    #[tokio::test]
    async fn test_chat_errors_are_brand_masked() {
        for detail in ["429 Too Many Requests: quota exhausted", "400: API key not valid"] {
            let h = harness_with(true, Some(FakeProvider { fail_with: Some(detail) }));
            let (status, body) = send(&h.app, post_json("/api/gemini", &json!({"message": "hello"}))).await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            let text = body.to_string();
            assert!(!text.contains("429"), "{text}");
            assert!(!text.contains("API key"), "{text}");
            assert!(body["message"].is_string());
        }
    }

    #[tokio::test]
    async fn test_chat_validation_and_availability() {
        let h = harness();
        let (status, _) = send(&h.app, post_json("/api/gemini", &json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let h = harness_with(true, None);
        let (status, _) = send(&h.app, post_json("/api/gemini", &json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = send(&h.app, post_json("/api/gemini", &json!({"message": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");
    }

    #[tokio::test]
    async fn test_currency_detection_and_quotes() {
        let h = harness();
        let request = Request::builder()
            .uri("/api/currency")
            .header("cf-ipcountry", "JP")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currency"]["code"], "JPY");
        assert_eq!(body["detected"], true);
        let plans = body["plans"].as_array().unwrap();
        assert_eq!(plans.len(), 4);
        for plan in plans {
            assert!(!plan["formatted"].as_str().unwrap().contains('.'), "{plan}");
        }

        let request = Request::builder()
            .uri("/api/currency?currency=XYZ")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness_with(false, None);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paymentsConfigured"], false);
        assert_eq!(body["webhookConfigured"], true);
        assert_eq!(body["rateSource"], "static");
        assert!(body["assistantProvider"].is_null());
        assert_eq!(body["assistantConnected"], false);

        let h = harness();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (_, body) = send(&h.app, request).await;
        assert_eq!(body["paymentsConfigured"], true);
        assert_eq!(body["assistantProvider"], "fake");
        assert_eq!(body["assistantConnected"], true);
    }
}
