// Prompt used when no keyword rule matches a chat message.

pub const INTENT_PROMPT_TEMPLATE: &str = r#"You are routing messages for the recruitment bots.

Message: "{message}"
Bot: {bot}

Decide which intent best describes the user's request.
Valid intents:
- GREETING
- HELP
- L1_EVAL_SINGLE
- L1_EVAL_BATCH_STATUS
- L2_EVAL_SINGLE
- L2_COMPARE
- PIPELINE_STATUS
- DEBUG
- SMALL_TALK
- WORK_QUERY
- UNKNOWN

Respond ONLY as JSON with fields: intent, confidence (0-1), notes.
Example: {"intent": "WORK_QUERY", "confidence": 0.7, "notes": "asks about a candidate"}"#;
