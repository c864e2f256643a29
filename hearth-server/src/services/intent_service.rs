use std::collections::BTreeMap;
use std::sync::Arc;

use hearth_api::models::{DeviceKind, Room, ValidatedCommand};
use regex::Regex;
use serde_json::Value;

use crate::services::command_validator;
use crate::services::oracle::{Completion, Oracle};

const GREETINGS: [&str; 5] = ["hello", "hi", "thanks", "thank you", "goodbye"];

const EXTRACTION_SYSTEM: &str = "You are a precise IoT command extraction system. \
Analyze user intent step by step. Extract all implied commands. Output only valid JSON arrays.";

/// Turns an utterance into validated device commands with the help of the
/// language model. Never fails: every problem yields an empty list.
pub struct IntentService {
    oracle: Arc<dyn Oracle>,
    temperature: f32,
    max_tokens: u32,
    system_question: Regex,
}

impl IntentService {
    pub fn new(oracle: Arc<dyn Oracle>, temperature: f32, max_tokens: u32) -> Result<Self, regex::Error> {
        Ok(Self {
            oracle,
            temperature,
            max_tokens,
            system_question: Regex::new(r"\b(how|what|why|who|when) .*(system|work|created|made)")?,
        })
    }

    /// Cheap local check for utterances that never carry a command.
    pub fn is_small_talk(&self, text: &str) -> bool {
        let lowered = text.trim().to_lowercase();

        GREETINGS.contains(&lowered.as_str()) || self.system_question.is_match(&lowered)
    }

    pub async fn extract(&self, text: &str, default_location: Room) -> Vec<ValidatedCommand> {
        if self.is_small_talk(text) {
            tracing::info!("Skipping extraction for conversational input");
            return Vec::new();
        }

        let prompt = build_prompt(text, default_location);
        let completion = Completion {
            system: Some(EXTRACTION_SYSTEM),
            prompt: &prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let reply = match self.oracle.complete(completion).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Intent extraction failed: {}", e);
                return Vec::new();
            }
        };

        let candidates = match parse_command_array(&reply) {
            Some(candidates) => candidates,
            None => {
                tracing::warn!("Could not find a command array in model output");
                tracing::debug!("Raw model output: {}", reply);
                return Vec::new();
            }
        };

        let commands = command_validator::validate_all(&candidates, default_location);
        tracing::info!(
            "Extracted {} of {} candidate commands",
            commands.len(),
            candidates.len()
        );

        commands
    }
}

/// Pull the first top-level JSON array out of free model output, tolerating
/// code fences and surrounding prose.
pub fn parse_command_array(reply: &str) -> Option<Vec<Value>> {
    let mut text = reply.trim();
    if let Some((_, rest)) = text.split_once("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        text = rest.split("```").next().unwrap_or(rest);
    }

    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('[') {
        let start = search_from + offset;
        if let Some(end) = matching_bracket(&bytes[start..]) {
            if let Ok(Value::Array(items)) = serde_json::from_str(&text[start..=start + end]) {
                return Some(items);
            }
        }
        search_from = start + 1;
    }

    None
}

/// Index of the bracket closing the one at position 0, skipping string contents.
fn matching_bracket(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, &byte) in bytes.iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }

    None
}

fn topology_json() -> String {
    let topology: BTreeMap<&str, Vec<&str>> = Room::ALL
        .iter()
        .map(|room| {
            let devices = room.devices().iter().map(DeviceKind::as_str).collect();
            (room.as_str(), devices)
        })
        .collect();

    serde_json::to_string_pretty(&topology).unwrap_or_default()
}

fn build_prompt(text: &str, default_location: Room) -> String {
    let topology = topology_json();

    format!(
        r#"You are an advanced IoT command extraction system. Extract device control commands from natural language.

USER INPUT: "{text}"
DEFAULT LOCATION: {default_location}

EXTRACTION PROCESS:
1. Analyze the user's intent - what do they want to happen?
2. Identify target devices (explicit or implied)
3. Determine the action requested
4. Identify locations (explicit, implied, or all)
5. Extract any parameters (brightness, temperature, etc.)

UNDERSTANDING CONTEXT:
- Past tense ("turned on") should be treated as commands
- "Dim" means reduce brightness (action: "dim"), NOT turn on
- "Brighten" means increase brightness (action: "brighten")
- "All" or "whole home" or "everywhere" means every applicable room

DEVICE MAPPING:
- "lights" (plural) -> both ceiling_light AND desk_lamp where available
- "light" (singular) -> typically ceiling_light
- "fan" -> regular fan in bedrooms/living room/study, exhaust_fan in kitchen/bathroom
- Common synonyms: lamp -> desk_lamp, AC -> ac, blinds -> curtain

ROOM COVERAGE:
{topology}

SCOPE INTERPRETATION:
- Specific room mentioned -> use that room only
- "here" or no room -> use default location ({default_location})
- "all", "every", "whole house", "everywhere" -> one command per applicable room
- Multiple rooms mentioned -> extract commands for each

ACTION MAPPING:
- Turn on/off -> "on"/"off"
- Dim/brighten -> "dim"/"brighten"
- Set to X% -> "set_brightness" with {{"brightness": X}}
- Temperature -> "set_temperature" with {{"temperature": X}}
- Fan speed -> "set_speed" with {{"speed": 1-5}}
- Open/close curtains -> "open"/"close" or "set_position" with {{"position": X}}
- Exhaust fan for N minutes -> "set_timer" with {{"timer": N}}

EXAMPLES:

Input: "Dim bedroom lights"
Output: [{{"device": "ceiling_light", "action": "dim", "location": "bedroom", "parameters": {{}}}}]

Input: "Turn on all lights in the house"
Output: [
  {{"device": "ceiling_light", "action": "on", "location": "living_room", "parameters": {{}}}},
  {{"device": "ceiling_light", "action": "on", "location": "bedroom", "parameters": {{}}}},
  {{"device": "desk_lamp", "action": "on", "location": "bedroom", "parameters": {{}}}},
  {{"device": "ceiling_light", "action": "on", "location": "kitchen", "parameters": {{}}}},
  {{"device": "ceiling_light", "action": "on", "location": "study", "parameters": {{}}}},
  {{"device": "desk_lamp", "action": "on", "location": "study", "parameters": {{}}}},
  {{"device": "ceiling_light", "action": "on", "location": "bathroom", "parameters": {{}}}}
]

Input: "Kitchen is smoky, fan please"
Output: [{{"device": "exhaust_fan", "action": "on", "location": "kitchen", "parameters": {{}}}}]

Input: "Too bright here"
Output: [{{"device": "ceiling_light", "action": "dim", "location": "{default_location}", "parameters": {{}}}}]

Input: "Set bedroom lightness to 40%"
Output: [{{"device": "ceiling_light", "action": "set_brightness", "location": "bedroom", "parameters": {{"brightness": 40}}}}]

DO NOT extract commands from questions about how things work, system inquiries,
general conversation, or weather, time and news requests.

OUTPUT: Only a JSON array of commands. Empty array [] if no commands found."#
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hearth_api::models::{DeviceCommand, LightAction};
    use serde_json::json;

    use super::*;
    use crate::errors::OracleError;

    struct Canned(&'static str);

    #[async_trait]
    impl Oracle for Canned {
        async fn complete(&self, _: Completion<'_>) -> Result<String, OracleError> {
            Ok(self.0.to_string())
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    struct Offline;

    #[async_trait]
    impl Oracle for Offline {
        async fn complete(&self, _: Completion<'_>) -> Result<String, OracleError> {
            Err(OracleError::Timeout(30))
        }

        fn model(&self) -> &str {
            "offline"
        }
    }

    fn service(oracle: impl Oracle + 'static) -> IntentService {
        IntentService::new(Arc::new(oracle), 0.2, 1000).unwrap()
    }

    #[test]
    fn test_parse_fenced_array() {
        let reply = "Sure!\n```json\n[{\"device\": \"fan\", \"action\": \"on\", \"location\": \"study\"}]\n```";

        assert_eq!(
            parse_command_array(reply),
            Some(vec![json!({"device": "fan", "action": "on", "location": "study"})])
        );
    }

    #[test]
    fn test_parse_skips_brackets_in_prose() {
        let reply = r#"Reasoning [step 1]: the user says "dim]". Output: [{"device": "ceiling_light", "action": "dim", "location": "bedroom", "parameters": {}}] done"#;

        let commands = parse_command_array(reply).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["action"], json!("dim"));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_command_array("I cannot help with that."), None);
        assert_eq!(parse_command_array("[{\"device\": "), None);
    }

    #[test]
    fn test_small_talk() {
        let intents = service(Canned("[]"));

        assert!(intents.is_small_talk("  Thank you "));
        assert!(intents.is_small_talk("How does this system work?"));
        assert!(!intents.is_small_talk("Turn on the bedroom fan"));
    }

    #[tokio::test]
    async fn test_extract_validates_candidates() {
        let intents = service(Canned(
            r#"[
                {"device": "ceiling_light", "action": "on", "location": "living_room", "parameters": {}},
                {"device": "desk_lamp", "action": "on", "location": "kitchen"},
                {"device": "ceiling_light", "action": "off", "location": "Mars"}
            ]"#,
        ));

        let commands = intents.extract("Turn on the living room lights", Room::Study).await;

        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].location, Room::LivingRoom);
        assert_eq!(commands[0].command, DeviceCommand::CeilingLight(LightAction::On));
        assert_eq!(commands[1].location, Room::Study);
    }

    #[tokio::test]
    async fn test_oracle_failure_yields_nothing() {
        let intents = service(Offline);

        assert!(intents.extract("Turn on the fan", Room::Bedroom).await.is_empty());
    }
}
