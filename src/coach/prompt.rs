use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One turn of the recent chat shown to the coach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
        }
    }
}

/// JSON body accepted by the coach proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    #[serde(default)]
    pub user_text: String,

    #[serde(default = "default_stats")]
    pub stats: Value,

    #[serde(default = "default_user_name")]
    pub user_name: String,
}

fn default_stats() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_user_name() -> String {
    "usuario".to_string()
}

impl Default for CoachRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            user_text: String::new(),
            stats: default_stats(),
            user_name: default_user_name(),
        }
    }
}

impl CoachRequest {
    /// Full prompt sent to the model
    pub fn build_prompt(&self) -> String {
        let stats = self.stats.to_string();

        let system_instruction = format!(
            "Eres \"Vitality Coach\", una IA experta en salud y fitness. El usuario se llama {}. \
             Sus estadísticas actuales: {}. Sé motivadora, concisa (máximo 3 líneas) y usa \
             emojis ocasionalmente. Habla en español.",
            self.user_name, stats
        );

        let conversation = self
            .messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.text))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{system_instruction}\n\nContexto:\n{stats}\n\nConversación reciente:\n{conversation}\n\nUsuario: {}",
            self.user_text
        )
    }
}
