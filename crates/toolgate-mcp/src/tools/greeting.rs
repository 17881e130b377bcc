//! Greeting tool, handy for checking the routing path end to end

use serde_json::{json, Value};
use toolgate_core::{ParamKind, ParamSpec, ToolArgs, ToolDescriptor, ToolError};

/// Substring -> reply, checked in order
const GREETINGS: &[(&str, &str)] = &[
    ("こんにちは", "こんにちは！元気ですか？ 😊"),
    ("こんにちわ", "こんにちは！元気ですか？ 😊"),
    ("hello", "Hello! How can I help you today? 👋"),
    ("hi", "Hi there! 👋"),
    ("おはよう", "おはようございます！ ☀️"),
    ("こんばんは", "こんばんは！ 🌙"),
];

pub fn greet(message: &str) -> Value {
    let lowered = message.trim().to_lowercase();

    let reply = GREETINGS
        .iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(_, reply)| reply.to_string())
        .unwrap_or_else(|| format!("Hello, {}! 👋", message));

    json!({
        "message": reply,
        "input": message,
    })
}

pub fn hello_tool() -> ToolDescriptor {
    ToolDescriptor::from_fn(
        "hello",
        "Respond to greetings",
        vec![ParamSpec::optional(
            "message",
            ParamKind::String,
            "world",
            "Message to respond to",
        )],
        |args: ToolArgs| async move { Ok::<_, ToolError>(greet(args.require_str("message")?)) },
    )
}
