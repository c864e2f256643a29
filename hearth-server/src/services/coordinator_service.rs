use std::fmt::Write;
use std::sync::Arc;

use hearth_api::models::*;

use crate::services::IntentService;
use crate::services::device_control::DeviceControl;
use crate::services::oracle::{Completion, Oracle};

pub const FALLBACK_REPLY: &str = "I apologize, I couldn't process your request.";

const NEGATIVE: [&str; 6] = ["bad", "terrible", "wrong", "error", "fail", "problem"];
const POSITIVE: [&str; 6] = ["good", "great", "nice", "perfect", "excellent", "wonderful"];
const QUESTION: [&str; 6] = ["what", "how", "why", "when", "where", "who"];

const RESPONSE_PROMPT: &str = "You are an intelligent AI assistant for a smart home system.

You are in the RESPONSE GENERATION phase. The user's intents have ALREADY been extracted \
and executed by the system. Respond to the user naturally and briefly, acknowledging any \
actions taken. Do not output commands or JSON.";

/// Text in, reply and device actions out.
pub struct CoordinatorService {
    intents: Arc<IntentService>,
    control: Arc<dyn DeviceControl>,
    oracle: Arc<dyn Oracle>,
    default_location: Room,
    temperature: f32,
    max_tokens: u32,
}

impl CoordinatorService {
    pub fn new(
        intents: Arc<IntentService>,
        control: Arc<dyn DeviceControl>,
        oracle: Arc<dyn Oracle>,
        default_location: Room,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            intents,
            control,
            oracle,
            default_location,
            temperature,
            max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        self.oracle.model()
    }

    pub async fn process(&self, request: ProcessTextRequest) -> ProcessTextResponse {
        let location = request
            .location
            .as_deref()
            .and_then(|location| location.parse::<Room>().ok())
            .unwrap_or(self.default_location);

        let commands = self.intents.extract(&request.text, location).await;
        let results = self.control.execute(&commands).await;

        let sensors = match self.control.sensors().await {
            Ok(sensors) => sensors,
            Err(e) => {
                tracing::warn!("Could not fetch sensor data: {}", e);
                SensorMap::new()
            }
        };

        let system = response_prompt(&sensors, location, &commands, &results);
        let completion = Completion {
            system: Some(&system),
            prompt: &request.text,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let reply = match self.oracle.complete(completion).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Response generation failed: {}", e);
                FALLBACK_REPLY.to_string()
            }
        };
        let reply = strip_emphasis(&reply);
        let expression = expression_for(&request.text, !commands.is_empty());

        ProcessTextResponse {
            input_text: request.text,
            ai_response: reply,
            expression,
            iot_commands: commands.iter().map(ValidatedCommand::to_raw).collect(),
            iot_results: results,
            location,
            model_used: self.oracle.model().to_string(),
            device_id: request.device_id,
        }
    }
}

pub fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace('*', "").trim().to_string()
}

pub fn expression_for(text: &str, acted: bool) -> Expression {
    let lowered = text.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|keyword| lowered.contains(keyword));

    if mentions(&NEGATIVE[..]) {
        Expression::Sad
    } else if mentions(&POSITIVE[..]) {
        Expression::Happy
    } else if mentions(&QUESTION[..]) {
        Expression::Thinking
    } else if acted {
        Expression::Happy
    } else {
        Expression::Neutral
    }
}

fn response_prompt(
    sensors: &SensorMap,
    location: Room,
    commands: &[ValidatedCommand],
    results: &[ExecutionResult],
) -> String {
    let mut prompt = String::from(RESPONSE_PROMPT);

    prompt.push_str("\n\nCurrent environment:\n");
    for (room, reading) in sensors {
        let _ = writeln!(
            prompt,
            "- {}: {:.1}°C, {:.0}% humidity, CO2 {} ppm, VOC {}, light {} lux, motion {}",
            room.display_name(),
            reading.temperature,
            reading.humidity,
            reading.co2,
            reading.voc,
            reading.light_level,
            if reading.motion { "detected" } else { "none" },
        );
    }

    let _ = write!(prompt, "\nThe user is in the {}.\n", location.display_name());

    if !commands.is_empty() {
        prompt.push_str("\nActions executed:\n");
        for (command, result) in commands.iter().zip(results.iter().map(Some).chain(std::iter::repeat(None))) {
            let outcome = match result {
                Some(result) if result.is_success() => "Success",
                _ => "Failed",
            };
            let _ = writeln!(
                prompt,
                "- {} {} in {}: {}",
                command.kind(),
                command.command.action_name(),
                command.location.display_name(),
                outcome
            );
        }
    }

    prompt
}
