//! Prompts sent to the model and conversion of stored messages.
//!
//! Stored conversation content is never rewritten; the weather nudge is only
//! applied to the copy sent to the model.

use concierge_types::conversation::{Message as StoredMessage, Role};
use concierge_types::llm::Message;

/// System instruction for reply generation.
pub const REPLY_SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant with access to specialized tools.

WEATHER - TOOL USE
1) Always call **get_weather** for weather/temperature/forecast/climate questions. Never invent weather.
2) Args for get_weather:
   - **location**: extract from the user message (city, "City,Country", or "lat,lon").
   - **forecast_days**:
     - If the user asks for a specific **weekday or date** (e.g., "Friday", "Sep 5"), first call **get_today_date**, compute the day difference from today, then set **forecast_days = diff + 1** (clamp 1-10). After receiving data, answer **only for that target day** (not the whole range).
     - Otherwise, default to a **short forecast** (1-3 days). Do NOT request 7+ days unless explicitly asked.
   - If the location is missing or ambiguous, ask one brief clarifying question.

RESPONSE STYLE (IMPORTANT)
3) Write a concise, readable answer tailored to the user's request. Do **not** just echo tool output.
   - Start with a single line header: **<City, Country> - <Day label>** (e.g., **Barcelona, Spain - Friday**).
   - Then 3-5 short bullet points covering:
     - Conditions (e.g., Sunny / Light rain).
     - Temperatures: High/Low in °C (add °F only if the user used °F).
     - Rain chance/precip if available; otherwise omit.
     - Wind (speed + direction if available).
   - Keep numbers clean (no excessive decimals). Avoid long paragraphs.
   - If the user specifies part of day (e.g., "morning"), focus the summary on that period; if hourly detail isn't available, state what's most likely and include the day's range.

OTHER TOOLS
4) Use **get_today_date** for current date/time questions.
5) Use **get_holidays** for holiday/calendar questions.
6) For non-tool queries, answer normally."#;

/// System instruction for title generation.
pub const TITLE_SYSTEM_PROMPT: &str = r#"You are a title generator.

TASK
- Return ONLY a short, descriptive title for the conversation/topic.

FORMAT
- Output exactly one line with the title text. No quotes, no code blocks, no extra words.
- Maximum 80 characters.
- No emojis or unusual symbols.
- Do NOT answer the question or explain anything.

SPECIAL CASE
- If the conversation is empty, return: An empty conversation

EXAMPLES
User: What is the weather like in Barcelona?
You: Weather in Barcelona

User: How do I add items to a list in Python?
You: Python list methods

User: Tell me the steps to set up a Postgres replica
You: Setting up a PostgreSQL replica"#;

const WEATHER_NUDGE: &str = "IMPORTANT: You MUST use the get_weather function to answer this \
question. Do NOT generate weather information from your training data. Extract the location \
and forecast_days (if any) from the user's text. Question: ";

const WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "temperature",
    "forecast",
    "climate",
    "hot",
    "cold",
    "rain",
    "snow",
    "sunny",
    "cloudy",
    "wind",
    "humidity",
    "°c",
    "°f",
    "celsius",
    "fahrenheit",
];

/// Whether a user message looks like a weather question (case-insensitive substring match).
pub fn is_weather_query(content: &str) -> bool {
    let lower = content.to_lowercase();
    WEATHER_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Convert stored messages into the model history for reply generation.
///
/// User messages that look like weather questions are prefixed with an
/// instruction to use the weather tool. Stored system messages are skipped:
/// the system instruction is supplied separately.
pub fn reply_history(messages: &[StoredMessage]) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|m| match m.role {
            Role::User if is_weather_query(&m.content) => {
                Some(Message::user(format!("{WEATHER_NUDGE}{}", m.content)))
            }
            Role::User => Some(Message::user(m.content.clone())),
            Role::Assistant => Some(Message::assistant(m.content.clone())),
            Role::System => None,
        })
        .collect()
}

/// Convert stored messages into the model history for title generation, unmodified.
pub fn title_history(messages: &[StoredMessage]) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|m| match m.role {
            Role::User => Some(Message::user(m.content.clone())),
            Role::Assistant => Some(Message::assistant(m.content.clone())),
            Role::System => None,
        })
        .collect()
}
