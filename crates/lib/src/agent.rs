//! Agent turn: detect scheduling intent, ask the model (with clinic tools), run at most one
//! tool round trip, and send the reply back through the messenger.
//!
//! Each turn is stateless: the conversation is rebuilt from the persona and the inbound text.
//! Only the first tool call of a response is executed; any others are ignored.

use crate::appointments::{AppointmentRecorder, RecordOutcome};
use crate::channels::{InboundMessage, Messenger};
use crate::llm::{ChatMessage, ChatResponse, LlmBackend, LlmError, ToolDefinition};
use crate::tools::{ClinicToolbox, UNAVAILABLE_TOOL_REPLY};
use serde::Serialize;
use std::sync::Arc;

/// Lower-case substrings that mark a message as an appointment request.
pub const SCHEDULING_KEYWORDS: &[&str] = &[
    "agendar",
    "reservar",
    "hora",
    "cita",
    "turno",
    "peluquería",
];

/// Prepended (followed by a blank line) to the reply when an appointment was recorded.
pub const BOOKING_CONFIRMATION: &str = "✅ Tu cita ha sido registrada. ¡Te esperamos!";

/// Executes a tool by name and raw JSON arguments. Returns the tool's value or an error string.
pub trait ToolExecutor: Send + Sync {
    fn execute(&self, name: &str, args: &str) -> Result<serde_json::Value, String>;
}

/// Reply produced for one inbound message, as returned by the webhook endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReply {
    pub reply: String,
    pub to: String,
}

/// Case-insensitive substring match against [`SCHEDULING_KEYWORDS`].
pub fn detects_scheduling_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    SCHEDULING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Everything a turn needs. Cheap to clone; shared by all requests.
#[derive(Clone)]
pub struct Agent {
    backend: Arc<dyn LlmBackend>,
    model: String,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
    tool_executor: Arc<dyn ToolExecutor>,
    recorder: Arc<dyn AppointmentRecorder>,
    messenger: Arc<dyn Messenger>,
}

impl Agent {
    /// Agent offering the clinic toolbox.
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        recorder: Arc<dyn AppointmentRecorder>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let toolbox = Arc::new(ClinicToolbox::new());
        Self {
            backend,
            model: model.into(),
            system_prompt: system_prompt.into(),
            tools: toolbox.definitions(),
            tool_executor: toolbox,
            recorder,
            messenger,
        }
    }

    /// Compute the reply and deliver it. Delivery failures are logged by the messenger and
    /// do not change the result; model failures propagate.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<AgentReply, LlmError> {
        let reply = self.reply_to(msg).await?;
        log::info!("agent: reply for {}: {}", msg.phone, reply);
        let outcome = self.messenger.send(&msg.phone, &reply).await;
        if !outcome.is_delivered() {
            log::warn!("agent: reply to {} not delivered via {}", msg.phone, self.messenger.id());
        }
        Ok(AgentReply {
            reply,
            to: msg.phone.clone(),
        })
    }

    /// Steps of one turn without delivery: record appointment if asked, query the model,
    /// run the first tool call if any, prepend the booking banner.
    pub async fn reply_to(&self, msg: &InboundMessage) -> Result<String, LlmError> {
        let mut banner = None;
        if detects_scheduling_intent(&msg.text) {
            match self.recorder.record(&msg.phone, &msg.text).await {
                RecordOutcome::Saved => {
                    log::info!("agent: scheduling intent detected, appointment recorded");
                    banner = Some(BOOKING_CONFIRMATION);
                }
                RecordOutcome::Failed(reason) => {
                    log::debug!("agent: no booking banner ({})", reason);
                }
            }
        }

        let mut messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(msg.text.as_str()),
        ];
        let first = self
            .backend
            .chat(&self.model, messages.clone(), Some(self.tools.clone()))
            .await?;

        let reply = match first.tool_calls().first() {
            None => final_content(&first)?,
            Some(call) => {
                if first.tool_calls().len() > 1 {
                    log::debug!(
                        "agent: model requested {} tool calls, running only {}",
                        first.tool_calls().len(),
                        call.function.name
                    );
                }
                let name = call.function.name.as_str();
                let value = match self.tool_executor.execute(name, &call.function.arguments) {
                    Ok(v) => {
                        log::info!("agent: tool {} executed", name);
                        v
                    }
                    Err(e) => {
                        log::warn!("agent: tool {} not available: {}", name, e);
                        serde_json::Value::String(UNAVAILABLE_TOOL_REPLY.to_string())
                    }
                };
                messages.push(ChatMessage::assistant_tool_calls(vec![call.clone()]));
                messages.push(ChatMessage::tool_result(call, value.to_string()));
                let second = self.backend.chat(&self.model, messages, None).await?;
                final_content(&second)?
            }
        };

        Ok(match banner {
            Some(b) => format!("{}\n\n{}", b, reply),
            None => reply,
        })
    }
}

fn final_content(res: &ChatResponse) -> Result<String, LlmError> {
    res.content()
        .map(str::to_string)
        .ok_or(LlmError::MissingContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::DeliveryOutcome;
    use crate::llm::{ToolCall, ToolCallFunction};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Events = Arc<Mutex<Vec<String>>>;

    struct ScriptedBackend {
        events: Events,
        responses: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
        calls: Mutex<Vec<(Vec<ChatMessage>, Option<Vec<ToolDefinition>>)>>,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn chat(
            &self,
            _model: &str,
            messages: Vec<ChatMessage>,
            tools: Option<Vec<ToolDefinition>>,
        ) -> Result<ChatResponse, LlmError> {
            self.events.lock().unwrap().push("chat".to_string());
            self.calls.lock().unwrap().push((messages, tools));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Api("no scripted response".to_string())))
        }
    }

    struct FakeRecorder {
        events: Events,
        outcome: RecordOutcome,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl AppointmentRecorder for FakeRecorder {
        async fn record(&self, phone: &str, message: &str) -> RecordOutcome {
            self.events.lock().unwrap().push("record".to_string());
            self.calls
                .lock()
                .unwrap()
                .push((phone.to_string(), message.to_string()));
            self.outcome.clone()
        }
    }

    struct FakeMessenger {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Messenger for FakeMessenger {
        fn id(&self) -> &str {
            "fake"
        }

        async fn send(&self, recipient: &str, text: &str) -> DeliveryOutcome {
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), text.to_string()));
            DeliveryOutcome::Delivered {
                status: 200,
                body: "{}".to_string(),
            }
        }
    }

    struct Harness {
        events: Events,
        backend: Arc<ScriptedBackend>,
        recorder: Arc<FakeRecorder>,
        messenger: Arc<FakeMessenger>,
        agent: Agent,
    }

    fn harness(responses: Vec<Result<ChatResponse, LlmError>>, outcome: RecordOutcome) -> Harness {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let backend = Arc::new(ScriptedBackend {
            events: events.clone(),
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        });
        let recorder = Arc::new(FakeRecorder {
            events: events.clone(),
            outcome,
            calls: Mutex::new(Vec::new()),
        });
        let messenger = Arc::new(FakeMessenger {
            sent: Mutex::new(Vec::new()),
        });
        let agent = Agent::new(
            backend.clone(),
            "gpt-test",
            "Eres VetBot, un asistente de una clínica veterinaria.",
            recorder.clone(),
            messenger.clone(),
        );
        Harness {
            events,
            backend,
            recorder,
            messenger,
            agent,
        }
    }

    fn text_response(content: &str) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse {
            message: ChatMessage {
                role: "assistant".to_string(),
                content: Some(content.to_string()),
                tool_calls: None,
                tool_call_id: None,
                name: None,
            },
        })
    }

    fn tool_call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            typ: "function".to_string(),
            function: ToolCallFunction {
                name: name.to_string(),
                arguments: "{}".to_string(),
            },
        }
    }

    fn tool_response(calls: Vec<ToolCall>) -> Result<ChatResponse, LlmError> {
        Ok(ChatResponse {
            message: ChatMessage::assistant_tool_calls(calls),
        })
    }

    #[test]
    fn keyword_detection_is_case_insensitive_substring() {
        assert!(detects_scheduling_intent("Necesito una Cita"));
        assert!(detects_scheduling_intent("quiero AGENDAR"));
        assert!(detects_scheduling_intent("Turno para mañana"));
        assert!(detects_scheduling_intent("PELUQUERÍA canina"));
        // substring match: "ahora" contains "hora"
        assert!(detects_scheduling_intent("ahora no puedo"));
        assert!(!detects_scheduling_intent("¿Cuánto cuesta una vacuna?"));
        assert!(!detects_scheduling_intent(""));
    }

    #[tokio::test]
    async fn recorder_runs_before_model_even_when_model_fails() {
        let h = harness(
            vec![Err(LlmError::Api("500 upstream".to_string()))],
            RecordOutcome::Saved,
        );
        let msg = InboundMessage::new("56911111111", "Necesito una Cita");
        let err = h.agent.handle(&msg).await.unwrap_err();
        assert!(matches!(err, LlmError::Api(_)));
        assert_eq!(*h.events.lock().unwrap(), vec!["record", "chat"]);
        assert_eq!(
            *h.recorder.calls.lock().unwrap(),
            vec![("56911111111".to_string(), "Necesito una Cita".to_string())]
        );
        assert!(h.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_keyword_never_records() {
        let h = harness(vec![text_response("Hola! ¿En qué te ayudo?")], RecordOutcome::Saved);
        let reply = h
            .agent
            .reply_to(&InboundMessage::new("1", "Hola buenas"))
            .await
            .unwrap();
        assert_eq!(reply, "Hola! ¿En qué te ayudo?");
        assert!(h.recorder.calls.lock().unwrap().is_empty());
        assert_eq!(*h.events.lock().unwrap(), vec!["chat"]);
    }

    #[tokio::test]
    async fn first_query_offers_tools_with_persona_and_user_message() {
        let h = harness(vec![text_response("ok")], RecordOutcome::Saved);
        h.agent
            .reply_to(&InboundMessage::new("1", "¿Dónde están?"))
            .await
            .unwrap();
        let calls = h.backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (messages, tools) = &calls[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(
            messages[0].content.as_deref(),
            Some("Eres VetBot, un asistente de una clínica veterinaria.")
        );
        assert_eq!(messages[1], ChatMessage::user("¿Dónde están?"));
        let names: Vec<String> = tools
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.function.name.clone())
            .collect();
        assert_eq!(names, vec!["get_precios", "get_ubicacion", "get_horarios"]);
    }

    #[tokio::test]
    async fn precios_tool_round_trip_uses_second_response() {
        let h = harness(
            vec![
                tool_response(vec![tool_call("call_1", "get_precios")]),
                text_response("La consulta general cuesta $15.000."),
            ],
            RecordOutcome::Saved,
        );
        let reply = h
            .agent
            .reply_to(&InboundMessage::new("1", "¿Cuánto cuesta la consulta?"))
            .await
            .unwrap();
        assert_eq!(reply, "La consulta general cuesta $15.000.");

        let calls = h.backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let (messages, tools) = &calls[1];
        assert!(tools.is_none());
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[2],
            ChatMessage::assistant_tool_calls(vec![tool_call("call_1", "get_precios")])
        );
        assert_eq!(messages[3].role, "tool");
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[3].name.as_deref(), Some("get_precios"));
        let sent: serde_json::Value =
            serde_json::from_str(messages[3].content.as_deref().unwrap()).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({"consulta_general": "$15.000", "vacunación": "$10.000", "urgencia": "$25.000"})
        );
    }

    #[tokio::test]
    async fn unknown_tool_feeds_fallback_string() {
        let h = harness(
            vec![
                tool_response(vec![tool_call("call_x", "get_clima")]),
                text_response("No tengo esa información."),
            ],
            RecordOutcome::Saved,
        );
        let reply = h
            .agent
            .reply_to(&InboundMessage::new("1", "¿Va a llover?"))
            .await
            .unwrap();
        assert_eq!(reply, "No tengo esa información.");
        let calls = h.backend.calls.lock().unwrap();
        let tool_msg = &calls[1].0[3];
        let sent: serde_json::Value =
            serde_json::from_str(tool_msg.content.as_deref().unwrap()).unwrap();
        assert_eq!(sent, serde_json::Value::String("Función no disponible".to_string()));
    }

    #[tokio::test]
    async fn only_first_of_several_tool_calls_runs() {
        let h = harness(
            vec![
                tool_response(vec![
                    tool_call("call_a", "get_ubicacion"),
                    tool_call("call_b", "get_horarios"),
                ]),
                text_response("Estamos en Av. Los Leones 1234."),
            ],
            RecordOutcome::Saved,
        );
        h.agent
            .reply_to(&InboundMessage::new("1", "¿Dónde y cuándo?"))
            .await
            .unwrap();
        let calls = h.backend.calls.lock().unwrap();
        let messages = &calls[1].0;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].tool_calls.as_ref().unwrap().len(), 1);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(
            messages[3].content.as_deref(),
            Some("\"Av. Los Leones 1234, Providencia, Santiago.\"")
        );
    }

    #[tokio::test]
    async fn missing_content_is_an_error() {
        let h = harness(
            vec![Ok(ChatResponse {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: None,
                    tool_call_id: None,
                    name: None,
                },
            })],
            RecordOutcome::Saved,
        );
        let err = h
            .agent
            .handle(&InboundMessage::new("1", "hola"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingContent));
        assert!(h.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn booking_banner_prefixes_reply_and_reply_is_sent() {
        let h = harness(
            vec![text_response("¡Perfecto! ¿Para qué día?")],
            RecordOutcome::Saved,
        );
        let msg = InboundMessage::new("56912345678", "quiero agendar hora");
        let out = h.agent.handle(&msg).await.unwrap();
        let expected = "✅ Tu cita ha sido registrada. ¡Te esperamos!\n\n¡Perfecto! ¿Para qué día?";
        assert_eq!(
            out,
            AgentReply {
                reply: expected.to_string(),
                to: "56912345678".to_string(),
            }
        );
        assert_eq!(
            *h.recorder.calls.lock().unwrap(),
            vec![("56912345678".to_string(), "quiero agendar hora".to_string())]
        );
        assert_eq!(
            *h.messenger.sent.lock().unwrap(),
            vec![("56912345678".to_string(), expected.to_string())]
        );
    }

    #[tokio::test]
    async fn failed_recording_omits_banner_but_still_replies() {
        let h = harness(
            vec![text_response("Claro, te ayudo a reservar.")],
            RecordOutcome::Failed("403 PERMISSION_DENIED".to_string()),
        );
        let out = h
            .agent
            .handle(&InboundMessage::new("2", "quiero reservar"))
            .await
            .unwrap();
        assert_eq!(out.reply, "Claro, te ayudo a reservar.");
        assert_eq!(h.messenger.sent.lock().unwrap().len(), 1);
    }
}
