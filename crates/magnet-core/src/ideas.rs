//! Content Idea Generator: OpenRouter bridge with a templated fallback.
//!
//! The bridge asks the hosted model for 10 structured ideas (hook, key
//! teaching, CTA). Any failure (missing key, transport error, bad status,
//! unparseable payload) degrades to the static fallback set, so the caller
//! always receives ideas. API key: `OPENROUTER_API_KEY` in `.env`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::leads::PrimaryGoal;

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// The onboarding profile content generation works from.
#[derive(Debug, Clone)]
pub struct CreatorProfile {
    pub niche: String,
    pub target_audience: String,
    pub offer: String,
    pub primary_goal: PrimaryGoal,
}

/// One generated content idea, not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaDraft {
    pub hook: String,
    pub key_teaching: String,
    pub cta: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("idea bridge request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("idea bridge API error {0}: {1}")]
    Api(u16, String),
    #[error("idea bridge response parse: {0}")]
    Parse(String),
}

/// Bridge to the hosted model. Holds the API key, model id, and a pooled
/// client with a request timeout.
pub struct IdeaBridge {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl IdeaBridge {
    /// Create a bridge from `OPENROUTER_API_KEY`. Returns `None` when unset
    /// or empty, in which case callers should use [`fallback_ideas`].
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("OPENROUTER_API_KEY").ok()?.trim().to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    /// Create a bridge with an explicit API key.
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    /// Set the model (e.g. `openai/gpt-4o-mini`, `anthropic/claude-3.5-sonnet`).
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Ask the hosted model for 10 content ideas for this profile.
    pub async fn generate_ideas(
        &self,
        profile: &CreatorProfile,
    ) -> Result<Vec<IdeaDraft>, BridgeError> {
        let system = "You are an expert Instagram content strategist who specializes in creating educational content that converts.";
        let prompt = build_prompt(profile);

        let url = format!("{}/chat/completions", OPENROUTER_API_BASE);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            temperature: Some(0.8),
            max_tokens: Some(2048),
        };

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(BridgeError::Api(status.as_u16(), body));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| BridgeError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| BridgeError::Parse("no choices in response".to_string()))?;

        parse_ideas(content)
    }
}

fn build_prompt(profile: &CreatorProfile) -> String {
    let goal = profile.primary_goal.as_str();
    format!(
        "You are a content strategist for Instagram. Generate 10 short-form educational content ideas for a {niche} expert targeting {audience}. \n\n\
Their offer is: {offer}\n\
Their primary goal is: {goal}\n\n\
For each content idea, provide:\n\
- Hook: A compelling opening line (under 15 words)\n\
- Key Teaching: 1-2 clear educational points\n\
- CTA: A call-to-action that drives {goal}\n\n\
Format your response as a JSON array with this exact structure:\n\
[\n  {{\n    \"hook\": \"Your hook here\",\n    \"keyTeaching\": \"Your teaching points here\",\n    \"cta\": \"Your CTA here\"\n  }}\n]\n\n\
Make the hooks scroll-stopping and educational. Make the teachings actionable and specific. Make the CTAs clear and compelling.",
        niche = profile.niche,
        audience = profile.target_audience,
        offer = profile.offer,
        goal = goal,
    )
}

/// Parse model output: either a bare JSON array of ideas or an object with an
/// `ideas` array.
fn parse_ideas(content: &str) -> Result<Vec<IdeaDraft>, BridgeError> {
    let value: serde_json::Value =
        serde_json::from_str(content.trim()).map_err(|e| BridgeError::Parse(e.to_string()))?;
    let items = match &value {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::Object(map) => map
            .get("ideas")
            .and_then(|v| v.as_array())
            .cloned()
            .ok_or_else(|| BridgeError::Parse("no ideas array in response".to_string()))?,
        _ => return Err(BridgeError::Parse("unexpected response shape".to_string())),
    };
    let ideas = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<IdeaDraft>(item).ok())
        .collect::<Vec<_>>();
    if ideas.is_empty() {
        return Err(BridgeError::Parse("no usable ideas in response".to_string()));
    }
    Ok(ideas)
}

/// Generate ideas through the bridge when available, falling back to the
/// templated set on any failure. The caller cannot tell the difference.
pub async fn generate_content_ideas(
    bridge: Option<&IdeaBridge>,
    profile: &CreatorProfile,
) -> Vec<IdeaDraft> {
    match bridge {
        Some(bridge) => match bridge.generate_ideas(profile).await {
            Ok(ideas) => ideas,
            Err(e) => {
                tracing::warn!("idea bridge failed, using fallback templates: {}", e);
                fallback_ideas(profile)
            }
        },
        None => fallback_ideas(profile),
    }
}

/// Static fallback: 10 templated ideas parameterized by the profile.
pub fn fallback_ideas(profile: &CreatorProfile) -> Vec<IdeaDraft> {
    let niche = profile.niche.to_lowercase();
    let audience = profile.target_audience.to_lowercase();
    let offer = &profile.offer;

    vec![
        IdeaDraft {
            hook: format!("The #1 mistake {} make with {}", audience, niche),
            key_teaching: format!(
                "Most {} focus on the wrong metrics. Instead, prioritize these 3 elements: 1) Strategy, 2) Execution, 3) Measurement. This shifts focus from vanity to value.",
                audience
            ),
            cta: "Want to master this? DM me \"STRATEGY\" and I'll show you how.".to_string(),
        },
        IdeaDraft {
            hook: format!("I wasted 2 years before learning this about {}", niche),
            key_teaching: format!(
                "The traditional approach to {} is outdated. Here's what works now: Start with outcomes, not activities. Build systems, not just goals. Measure what matters.",
                niche
            ),
            cta: "Ready to fast-track your results? Comment \"FAST\" below.".to_string(),
        },
        IdeaDraft {
            hook: format!("Why {} keep failing at {}", audience, niche),
            key_teaching: "It's not lack of effort. It's lack of clarity. The key is understanding your ideal outcome first, then reverse-engineering the path. Most skip this crucial step.".to_string(),
            cta: "Book a call with me and I'll help you get clear. Link in bio.".to_string(),
        },
        IdeaDraft {
            hook: format!("3 things I wish I knew about {} starting out", niche),
            key_teaching: "1) It's not about the tools, it's about the system. 2) Consistency beats intensity every time. 3) Your network is your biggest asset. These principles never change.".to_string(),
            cta: format!("Follow for more {} tips!", niche),
        },
        IdeaDraft {
            hook: format!("Stop doing this if you want to grow in {}", niche),
            key_teaching: format!(
                "Most {} unknowingly sabotage their progress by: 1) Chasing trends, 2) Comparing to others, 3) Skipping fundamentals. Focus on mastery instead.",
                audience
            ),
            cta: "DM me \"FOCUS\" and I'll send you my foundation checklist.".to_string(),
        },
        IdeaDraft {
            hook: format!("The {} secret nobody talks about", niche),
            key_teaching: format!(
                "Success isn't about knowing more. It's about doing more with what you know. The gap between information and implementation is where {} get stuck.",
                audience
            ),
            cta: "Want help bridging that gap? Click the link in my bio.".to_string(),
        },
        IdeaDraft {
            hook: format!("{}: You're overcomplicating this", audience),
            key_teaching: format!(
                "Simpler approach to {}: 1) Define your outcome, 2) Identify the critical path, 3) Execute daily. Complexity is the enemy of progress.",
                niche
            ),
            cta: "Save this post for later and share it with someone who needs it!".to_string(),
        },
        IdeaDraft {
            hook: format!("This changed everything for my {} journey", niche),
            key_teaching: format!(
                "I stopped asking \"what should I do?\" and started asking \"who do I need to become?\" The shift in identity drove all my {} progress.",
                niche
            ),
            cta: "DM me \"IDENTITY\" to learn more about this mindset shift.".to_string(),
        },
        IdeaDraft {
            hook: format!("The truth about {} {} won't tell you", niche, audience),
            key_teaching: format!(
                "Most overnight successes are 10 years in the making. The {} results you want come from: 1) Showing up daily, 2) Learning from failure, 3) Adapting quickly.",
                offer
            ),
            cta: "Book a call and I'll show you the exact roadmap.".to_string(),
        },
        IdeaDraft {
            hook: format!("My {} framework in 60 seconds", niche),
            key_teaching: "Step 1: Research deeply. Step 2: Test small. Step 3: Scale what works. Step 4: Document everything. Step 5: Repeat and refine. Simple but not easy.".to_string(),
            cta: "Want the detailed version? Comment \"FRAMEWORK\" and I'll send it to you.".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CreatorProfile {
        CreatorProfile {
            niche: "Fitness".to_string(),
            target_audience: "Busy Professionals".to_string(),
            offer: "12-week coaching program".to_string(),
            primary_goal: PrimaryGoal::Calls,
        }
    }

    #[test]
    fn fallback_yields_ten_complete_ideas() {
        let ideas = fallback_ideas(&profile());
        assert_eq!(ideas.len(), 10);
        for idea in &ideas {
            assert!(!idea.hook.is_empty());
            assert!(!idea.key_teaching.is_empty());
            assert!(!idea.cta.is_empty());
        }
    }

    #[test]
    fn fallback_is_parameterized_by_profile() {
        let ideas = fallback_ideas(&profile());
        assert!(ideas.iter().any(|i| i.hook.contains("fitness")));
        assert!(ideas.iter().any(|i| i.key_teaching.contains("busy professionals")));
    }

    #[test]
    fn parse_accepts_bare_array() {
        let content = r#"[{"hook": "h", "keyTeaching": "k", "cta": "c"}]"#;
        let ideas = parse_ideas(content).unwrap();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].key_teaching, "k");
    }

    #[test]
    fn parse_accepts_ideas_object() {
        let content = r#"{"ideas": [{"hook": "h", "keyTeaching": "k", "cta": "c"}]}"#;
        let ideas = parse_ideas(content).unwrap();
        assert_eq!(ideas.len(), 1);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_ideas("not json").is_err());
        assert!(parse_ideas(r#"{"foo": 1}"#).is_err());
        assert!(parse_ideas("[]").is_err());
    }
}
