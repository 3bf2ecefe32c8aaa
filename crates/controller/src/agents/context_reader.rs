use porter_core::config::StageSettings;
use porter_core::policy;
use porter_core::traits::UserContent;
use porter_core::{
    AgentContext, ContextReaderOutput, Result, StageName, Urgency, UserIntentExtraction,
    VisualContext,
};

/// Reads the dashboard snapshot (and screenshot, if any) and extracts the
/// user's intent.
pub struct ContextReaderAgent {
    settings: StageSettings,
}

impl ContextReaderAgent {
    pub fn new(settings: StageSettings) -> Self {
        Self { settings }
    }
}

impl super::StageAgent for ContextReaderAgent {
    type Output = ContextReaderOutput;

    fn stage(&self) -> StageName {
        StageName::ContextReader
    }

    fn settings(&self) -> StageSettings {
        self.settings
    }

    fn system_prompt(&self, ctx: &AgentContext) -> Result<String> {
        policy::context_reader_prompt(ctx.user_role, ctx.language)
    }

    // The only stage that sees the screenshot.
    fn user_content(&self, ctx: &AgentContext) -> Result<UserContent> {
        Ok(UserContent::text(policy::context_reader_user_text(ctx)?).with_image(ctx.image.clone()))
    }

    fn fallback(&self, ctx: &AgentContext) -> ContextReaderOutput {
        ContextReaderOutput {
            visual_context: VisualContext {
                timeframe: "current".to_string(),
                ..Default::default()
            },
            user_intent: UserIntentExtraction {
                primary_question: ctx.user_query.clone(),
                specific_metrics: Vec::new(),
                terminals: Vec::new(),
                timeframe: "current".to_string(),
                urgency_level: Urgency::Medium,
            },
            context_summary: format!("User asked: {}", ctx.user_query),
        }
    }
}
