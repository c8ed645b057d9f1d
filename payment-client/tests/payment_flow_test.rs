//! Integration tests for the payment, lookup and history services.
//!
//! A scripted transport stands in for the backend so that refused
//! connections, timeouts and error statuses can be replayed exactly.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Datelike;
use payment_client::{
    ApiClient, ClientConfig, ErrorCode, PaymentClient,
    domain::{APPROVED_MESSAGE, DECLINED_MESSAGE},
    models::{CurrencyCode, PaymentRequest},
    notify::{NotificationLevel, RecordingNotifier},
    store::TransactionCache,
    transport::{HttpRequest, HttpResponse, Method, Transport, TransportError},
};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::Notify;

type Answer = Result<HttpResponse, TransportError>;

#[derive(Debug, Default)]
struct ScriptedBackend {
    answers: Mutex<VecDeque<Answer>>,
    seen: Mutex<Vec<HttpRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self { answers: Mutex::new(answers.into_iter().collect()), ..Self::default() }
    }

    fn gated(answers: impl IntoIterator<Item = Answer>, gate: Arc<Notify>) -> Self {
        Self { gate: Some(gate), ..Self::new(answers) }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Transport for ScriptedBackend {
    async fn send(&self, request: HttpRequest) -> Answer {
        self.seen.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new(ErrorCode::Network, "script exhausted")))
    }
}

fn refused() -> Answer {
    Err(TransportError::new(ErrorCode::ConnectionRefused, "connect ECONNREFUSED 127.0.0.1:5000"))
}

fn json_answer(status: u16, body: &serde_json::Value) -> Answer {
    Ok(HttpResponse::new(status, serde_json::to_vec(body).unwrap()))
}

fn payment_answer(id: &str, status: &str) -> Answer {
    json_answer(201, &json!({ "transactionId": id, "status": status }))
}

fn transaction_json(id: &str) -> serde_json::Value {
    json!({
        "transactionId": id,
        "maskedCardNumber": "**** **** **** 1112",
        "status": "Success",
        "amount": 100.0,
        "currencyCode": "USD",
        "bankMessage": "Approved",
        "processedAt": "2026-01-15T10:30:00.000Z"
    })
}

fn valid_request() -> PaymentRequest {
    PaymentRequest {
        card_number: "4111111111111112".to_owned(),
        expiry_month: 12,
        expiry_year: chrono::Utc::now().year() + 5,
        cvv: "123".to_owned(),
        amount: Decimal::new(10000, 2),
        currency_code: CurrencyCode::Usd,
    }
}

fn client_for(
    backend: ScriptedBackend,
) -> (PaymentClient<Arc<ScriptedBackend>>, Arc<ScriptedBackend>, RecordingNotifier) {
    let backend = Arc::new(backend);
    let notifier = RecordingNotifier::new();
    let api = ApiClient::with_transport(Arc::clone(&backend), &ClientConfig::default()).unwrap();
    let client = PaymentClient::new(api, Arc::new(notifier.clone()))
        .with_cache(TransactionCache::in_memory());
    (client, backend, notifier)
}

#[tokio::test(start_paused = true)]
async fn test_payment_recovers_after_two_refused_connections() {
    let (client, backend, notifier) =
        client_for(ScriptedBackend::new([refused(), refused(), payment_answer("txn-1", "Success")]));
    let service = client.payments();

    let started = tokio::time::Instant::now();
    let response = service.process_payment(&valid_request()).await.unwrap();

    assert_eq!(response.transaction_id, "txn-1");
    assert_eq!(backend.calls(), 3);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(
        notifier.messages(),
        vec![
            "Connection failed. Retrying... (1/2)".to_owned(),
            "Connection failed. Retrying... (2/2)".to_owned(),
            APPROVED_MESSAGE.to_owned(),
        ]
    );
    assert_eq!(service.retry_count(), 0);
    assert!(service.error().is_none());
    assert!(!service.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_payment_fails_after_retries_exhausted() {
    let (client, backend, notifier) = client_for(ScriptedBackend::new([refused(), refused(), refused()]));
    let service = client.payments();

    let error = service.process_payment(&valid_request()).await.unwrap_err();

    assert_eq!(backend.calls(), 3);
    assert_eq!(error.code, Some(ErrorCode::ConnectionRefused));
    assert!(error.is_network_error());
    assert_eq!(service.error(), Some(error.clone()));

    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 3);
    assert_eq!(notifications[2].level, NotificationLevel::Error);
    assert_eq!(notifications[2].message, error.message);
    assert!(client.cache().unwrap().get().is_none());
}

#[tokio::test]
async fn test_http_error_is_not_retried() {
    let (client, backend, notifier) =
        client_for(ScriptedBackend::new([json_answer(500, &json!({ "message": "Processor down" }))]));
    let service = client.payments();

    let error = service.process_payment(&valid_request()).await.unwrap_err();

    assert_eq!(backend.calls(), 1);
    assert_eq!(error.status, Some(500));
    assert_eq!(notifier.messages(), vec!["Processor down".to_owned()]);
}

#[tokio::test]
async fn test_declined_payment_is_not_an_error() {
    let (client, _backend, notifier) = client_for(ScriptedBackend::new([payment_answer("txn-2", "Failed")]));
    let service = client.payments();

    let response = service.process_payment(&valid_request()).await.unwrap();

    assert!(!response.is_success());
    assert!(service.error().is_none());
    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
    assert_eq!(notifications[0].message, DECLINED_MESSAGE);

    let cached = client.cache().unwrap().get().unwrap();
    assert_eq!(cached.transaction_id, "txn-2");
    assert_eq!(cached.status, "Failed");
}

#[tokio::test]
async fn test_status_match_is_exact() {
    let (client, _backend, notifier) = client_for(ScriptedBackend::new([payment_answer("txn-3", "success")]));

    client.payments().process_payment(&valid_request()).await.unwrap();

    assert_eq!(notifier.messages(), vec![DECLINED_MESSAGE.to_owned()]);
}

#[tokio::test]
async fn test_each_submission_replaces_cached_transaction() {
    let (client, _backend, _notifier) = client_for(ScriptedBackend::new([
        payment_answer("txn-a", "Success"),
        payment_answer("txn-b", "Success"),
    ]));
    let service = client.payments();

    service.process_payment(&valid_request()).await.unwrap();
    assert_eq!(client.cache().unwrap().get().unwrap().transaction_id, "txn-a");

    service.process_payment(&valid_request()).await.unwrap();
    let cached = client.cache().unwrap().get().unwrap();
    assert_eq!(cached.transaction_id, "txn-b");
    assert_eq!(cached.masked_card_number, "**** **** **** 1112");
    assert_eq!(cached.currency_code, "USD");
    assert_eq!(cached.amount, Decimal::new(10000, 2));
    assert!(cached.processed_at_utc().is_some());
}

#[tokio::test]
async fn test_invalid_request_is_never_sent() {
    let (client, backend, notifier) = client_for(ScriptedBackend::new([]));
    let service = client.payments();
    let request = PaymentRequest { card_number: "4111".to_owned(), ..valid_request() };

    let error = service.process_payment(&request).await.unwrap_err();

    assert!(error.is_validation());
    assert_eq!(backend.calls(), 0);
    assert_eq!(notifier.messages(), vec!["Card number must be 16 digits".to_owned()]);
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_payment_request_wire_format() {
    let (client, backend, _notifier) = client_for(ScriptedBackend::new([payment_answer("txn-4", "Success")]));

    client.payments().process_payment(&valid_request()).await.unwrap();

    let seen = backend.seen.lock().unwrap();
    assert_eq!(seen[0].method, Method::Post);
    assert_eq!(seen[0].url, "http://localhost:5000/api/payments");
    let body: serde_json::Value = serde_json::from_slice(seen[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(body["cardNumber"], "4111111111111112");
    assert_eq!(body["currencyCode"], "USD");
    assert_eq!(body["amount"], 100.0);
}

#[tokio::test]
async fn test_loading_flag_tracks_in_flight_payment() {
    let gate = Arc::new(Notify::new());
    let (client, _backend, _notifier) = client_for(ScriptedBackend::gated(
        [payment_answer("txn-5", "Success")],
        Arc::clone(&gate),
    ));
    let service = client.payments();
    let mut state = service.state().subscribe();

    let task = tokio::spawn({
        let service = service.clone();
        async move { service.process_payment(&valid_request()).await }
    });

    state.wait_for(|s| s.is_loading).await.unwrap();
    assert!(service.is_loading());

    gate.notify_one();
    task.await.unwrap().unwrap();
    assert!(!service.is_loading());
}

#[tokio::test]
async fn test_loading_flag_tracks_in_flight_lookup() {
    let gate = Arc::new(Notify::new());
    let (client, _backend, _notifier) =
        client_for(ScriptedBackend::gated([json_answer(404, &json!({}))], Arc::clone(&gate)));
    let lookup = client.transaction_lookup();
    let mut state = lookup.state().subscribe();
    assert!(!lookup.is_loading());

    let (result, ()) = tokio::join!(lookup.get_transaction("txn-missing"), async {
        state.wait_for(|s| s.is_loading).await.unwrap();
        assert!(lookup.is_loading());
        gate.notify_one();
    });

    assert!(result.unwrap_err().is_not_found());
    assert!(!lookup.is_loading());
}

#[tokio::test]
async fn test_loading_flag_tracks_in_flight_history_fetch() {
    let gate = Arc::new(Notify::new());
    let (client, _backend, _notifier) = client_for(ScriptedBackend::gated(
        [json_answer(200, &json!([transaction_json("txn-11")]))],
        Arc::clone(&gate),
    ));
    let history = client.transaction_history();
    let mut state = history.state().subscribe();
    assert!(!history.is_loading());

    let (result, ()) = tokio::join!(history.fetch_transactions(), async {
        state.wait_for(|s| s.is_loading).await.unwrap();
        assert!(history.is_loading());
        gate.notify_one();
    });

    assert_eq!(result.unwrap().len(), 1);
    assert!(!history.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_retry_payment_clears_failure() {
    let (client, _backend, _notifier) = client_for(ScriptedBackend::new([refused(), refused(), refused()]));
    let service = client.payments();

    service.retry_payment();
    assert!(service.error().is_none());

    assert!(service.process_payment(&valid_request()).await.is_err());
    assert!(service.error().is_some());

    service.retry_payment();
    assert!(service.error().is_none());
    assert_eq!(service.retry_count(), 0);
}

#[tokio::test]
async fn test_toasts_can_be_disabled() {
    let (client, _backend, notifier) = client_for(ScriptedBackend::new([payment_answer("txn-6", "Success")]));

    client.with_toasts(false).payments().process_payment(&valid_request()).await.unwrap();

    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn test_lookup_unknown_transaction() {
    let (client, backend, notifier) =
        client_for(ScriptedBackend::new([json_answer(404, &json!({ "message": "No such transaction" }))]));
    let lookup = client.transaction_lookup();

    let error = lookup.get_transaction("txn-missing").await.unwrap_err();

    assert!(error.is_not_found());
    assert_eq!(lookup.error(), Some(error));
    assert_eq!(notifier.messages(), vec!["Transaction not found".to_owned()]);
    assert_eq!(backend.seen.lock().unwrap()[0].url, "http://localhost:5000/api/payments/txn-missing");
}

#[tokio::test]
async fn test_lookup_returns_transaction() {
    let (client, _backend, notifier) =
        client_for(ScriptedBackend::new([json_answer(200, &transaction_json("txn-7"))]));

    let transaction = client.transaction_lookup().get_transaction("txn-7").await.unwrap();

    assert_eq!(transaction.transaction_id, "txn-7");
    assert_eq!(transaction.bank_message.as_deref(), Some("Approved"));
    assert!(transaction.is_success());
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn test_history_handles_empty_and_null_bodies() {
    let (client, _backend, _notifier) = client_for(ScriptedBackend::new([
        json_answer(200, &json!([])),
        Ok(HttpResponse::new(200, b"null".to_vec())),
    ]));
    let history = client.transaction_history();

    assert!(history.fetch_transactions().await.unwrap().is_empty());
    assert!(history.fetch_transactions().await.unwrap().is_empty());
    assert!(history.error().is_none());
}

#[tokio::test]
async fn test_history_keeps_list_on_failure() {
    let (client, _backend, notifier) = client_for(ScriptedBackend::new([
        json_answer(200, &json!([transaction_json("txn-8"), transaction_json("txn-9")])),
        json_answer(503, &json!({})),
    ]));
    let history = client.transaction_history();

    assert_eq!(history.fetch_transactions().await.unwrap().len(), 2);

    let error = history.fetch_transactions().await.unwrap_err();
    assert_eq!(error.status, Some(503));
    assert_eq!(history.transactions().len(), 2);
    assert_eq!(history.error(), Some(error));
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ClientConfig::default();
    config.cache.dir = Some(dir.path().to_path_buf());

    let backend = Arc::new(ScriptedBackend::new([payment_answer("txn-10", "Success")]));
    let api = ApiClient::with_transport(Arc::clone(&backend), &config).unwrap();
    let client = PaymentClient::new(api, Arc::new(RecordingNotifier::new()))
        .with_cache(TransactionCache::from_config(&config.cache).unwrap());
    client.payments().process_payment(&valid_request()).await.unwrap();

    let reopened = TransactionCache::from_config(&config.cache).unwrap();
    assert_eq!(reopened.get().unwrap().transaction_id, "txn-10");

    reopened.clear().unwrap();
    assert!(TransactionCache::from_config(&config.cache).unwrap().get().is_none());
}
