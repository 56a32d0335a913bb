use super::{echoed_token_limit, extract_text, has_choices, incomplete_reason, is_truncated};
use serde_json::json;

#[test]
fn completion_plain_string_content() {
    let payload = json!({
        "choices": [
            {"message": {"content": "  Acme builds rockets.  "}, "finish_reason": "stop"}
        ]
    });
    assert_eq!(extract_text(&payload), "Acme builds rockets.");
    assert!(!is_truncated(&payload));
}

#[test]
fn completion_returns_only_choice_with_text() {
    let payload = json!({
        "choices": [
            {"message": {"content": "first"}},
            {"message": {"content": "   "}}
        ]
    });
    assert_eq!(extract_text(&payload), "first");
}

#[test]
fn completion_parts_and_nested_types() {
    let payload = json!({
        "choices": [{
            "message": {
                "content": [
                    {"type": "text", "text": "alpha"},
                    {"type": "tool_result", "content": [{"type": "output_text", "text": "beta"}]},
                    {"wrapper": {"value": "gamma"}},
                    42,
                    null
                ]
            }
        }]
    });
    assert_eq!(extract_text(&payload), "alpha\nbeta\ngamma");
}

#[test]
fn text_typed_object_ignores_sibling_fields() {
    let payload = json!({
        "choices": [{
            "message": {"content": [{"type": "text", "text": "kept", "annotations": ["dropped"]}]}
        }]
    });
    assert_eq!(extract_text(&payload), "kept");
}

#[test]
fn completion_falls_back_to_refusal() {
    let payload = json!({
        "choices": [{"message": {"content": null, "refusal": "  I can't help with that. "}}]
    });
    assert_eq!(extract_text(&payload), "I can't help with that.");
}

#[test]
fn completion_length_finish_reason_is_truncation() {
    let payload = json!({
        "choices": [
            {"message": {"content": "partial"}, "finish_reason": "stop"},
            {"message": {"content": "cut"}, "finish_reason": "LENGTH"}
        ]
    });
    assert!(is_truncated(&payload));
    assert!(has_choices(&payload));
}

#[test]
fn tool_response_prefers_output_text() {
    let payload = json!({
        "output_text": " aggregated ",
        "output": [{"type": "message", "content": [{"type": "output_text", "text": "ignored"}]}],
        "status": "completed"
    });
    assert_eq!(extract_text(&payload), "aggregated");
    assert!(!is_truncated(&payload));
}

#[test]
fn tool_response_unwraps_output_items() {
    let payload = json!({
        "output_text": "",
        "output": [
            {"type": "web_search_call", "id": "ws_1", "status": "completed"},
            {"type": "message", "role": "assistant", "content": [
                {"type": "output_text", "text": "Acme is a rocket maker.", "annotations": []}
            ]}
        ],
        "status": "completed"
    });
    assert_eq!(extract_text(&payload), "Acme is a rocket maker.");
}

#[test]
fn tool_response_without_output_text_joins_message_parts() {
    let payload = json!({
        "id": "resp_1",
        "status": "completed",
        "output": [
            {"type": "web_search_call", "id": "ws_1", "status": "completed",
             "action": {"type": "search", "query": "acme"}},
            {"type": "message", "id": "msg_1", "role": "assistant", "status": "completed",
             "content": [
                {"type": "output_text", "text": "Acme makes rockets.", "annotations": [
                    {"type": "url_citation", "url": "https://acme.example", "title": "Acme"}
                ]},
                {"type": "output_text", "text": " Founded in 1949."}
             ]}
        ]
    });
    assert_eq!(extract_text(&payload), "Acme makes rockets. Founded in 1949.");
    assert!(!is_truncated(&payload));
}

#[test]
fn tool_response_with_only_tool_calls_has_no_message_text() {
    let payload = json!({
        "status": "incomplete",
        "incomplete_details": {"reason": "max_output_tokens"},
        "output": [
            {"type": "web_search_call", "id": "ws_1", "status": "completed"},
            {"type": "message", "id": "msg_1", "role": "assistant", "content": []}
        ]
    });
    assert_eq!(extract_text(&payload), "");
    assert!(is_truncated(&payload));
}

#[test]
fn incomplete_tool_response_with_empty_output_text() {
    let payload = json!({
        "output_text": "",
        "output": [],
        "status": "incomplete",
        "incomplete_details": {"reason": "max_output_tokens"},
        "max_output_tokens": 2048
    });
    assert_eq!(extract_text(&payload), "");
    assert!(is_truncated(&payload));
    assert_eq!(incomplete_reason(&payload), Some("max_output_tokens"));
    assert_eq!(echoed_token_limit(&payload), Some(2048));
}

#[test]
fn incomplete_for_other_reason_is_not_truncation() {
    let payload = json!({
        "status": "incomplete",
        "incomplete_details": {"reason": "content_filter"}
    });
    assert!(!is_truncated(&payload));
}

#[test]
fn incomplete_reason_falls_back_to_type() {
    let payload = json!({
        "status": "Incomplete",
        "incomplete_details": {"type": "max_output_tokens"}
    });
    assert!(is_truncated(&payload));
}

#[test]
fn choices_rule_wins_over_status() {
    let payload = json!({
        "status": "incomplete",
        "incomplete_details": {"reason": "max_output_tokens"},
        "choices": [{"message": {"content": "done"}, "finish_reason": "stop"}]
    });
    assert!(!is_truncated(&payload));
    assert_eq!(extract_text(&payload), "done");
}

#[test]
fn message_shape_content_blocks() {
    let payload = json!({
        "content": [
            {"type": "text", "text": "Dear Acme,"},
            {"type": "text", "text": "Best regards."}
        ],
        "stop_reason": "end_turn"
    });
    assert_eq!(extract_text(&payload), "Dear Acme,\nBest regards.");
    assert!(!is_truncated(&payload));

    let cut = json!({"content": [{"type": "text", "text": "Dear"}], "stop_reason": "max_tokens"});
    assert!(is_truncated(&cut));
}

#[test]
fn empty_payload_yields_nothing() {
    assert_eq!(extract_text(&json!({})), "");
    assert_eq!(extract_text(&json!({"choices": []})), "");
    assert!(!is_truncated(&json!({})));
}
