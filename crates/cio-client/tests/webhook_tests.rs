//! Webhook signature validation against a recorded delivery

#![cfg(feature = "webhook")]

use cio_client::webhook::{WebhookHeaders, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use cio_client::{validate_signature, WebhookValidator};
use std::collections::HashMap;

const SIGNING_KEY: &str = "755781b5e03a973f3405a85474d5a032a60fd56fabaad66039b12eadd83955fa";
const SIGNATURE: &str = "c097b83a7d57a0810625180a61213eab7e0389a54b33dd11c3a6f17790c8427a";
const TIMESTAMP: &str = "1692633432";
const BODY: &[u8] = br#"{"data":{"action_id":42,"campaign_id":23,"content":"Welcome to the club, we are with you.","customer_id":"user-123","delivery_id":"RAECAAFwnUSneIa0ZXkmq8EdkAM==","headers":{"Custom-Header":["custom-value"]},"identifiers":{"id":"user-123"},"recipient":"test@example.com","subject":"Thanks for signing up"},"event_id":"01E2EMRMM6TZ12TF9WGZN0WJQT","metric":"sent","object_type":"email","timestamp":1692633432}"#;

#[test]
fn test_recorded_delivery_is_valid() {
    assert!(validate_signature(SIGNING_KEY, TIMESTAMP, BODY, SIGNATURE).unwrap());
}

#[test]
fn test_tampered_delivery_is_rejected() {
    let mut body = BODY.to_vec();
    // "sent" -> "Sent"
    let at = body.windows(4).position(|w| w == b"sent").unwrap();
    body[at] = b'S';

    assert!(!validate_signature(SIGNING_KEY, TIMESTAMP, &body, SIGNATURE).unwrap());
    assert!(!validate_signature(SIGNING_KEY, "1692633431", BODY, SIGNATURE).unwrap());
    assert!(!validate_signature(&SIGNING_KEY[1..], TIMESTAMP, BODY, SIGNATURE).unwrap());
}

#[test]
fn test_validate_from_request_headers() {
    let mut headers = HashMap::new();
    headers.insert(SIGNATURE_HEADER.to_string(), SIGNATURE.to_string());
    headers.insert(TIMESTAMP_HEADER.to_string(), TIMESTAMP.to_string());

    let webhook_headers = WebhookHeaders::from_headers(|name| headers.get(name).cloned()).unwrap();
    let validator = WebhookValidator::new(SIGNING_KEY);

    assert!(validator.validate_request(&webhook_headers, BODY).unwrap());
}
