use porter_core::config::StageSettings;
use porter_core::policy;
use porter_core::traits::UserContent;
use porter_core::{
    AgentContext, AnalyzerOutput, ConsolidatorOutput, ContextReaderOutput, FrontendIntent,
    NextStep, NextStepCategory, Result, StageName,
};
use serde_json::Value;

use crate::parser;

/// Writes the spoken answer, follow-ups and the frontend intent.
pub struct ConsolidatorAgent<'a> {
    reader: &'a ContextReaderOutput,
    analyzer: &'a AnalyzerOutput,
    settings: StageSettings,
    word_limit: usize,
}

impl<'a> ConsolidatorAgent<'a> {
    pub fn new(
        reader: &'a ContextReaderOutput,
        analyzer: &'a AnalyzerOutput,
        settings: StageSettings,
        word_limit: usize,
    ) -> Self {
        Self {
            reader,
            analyzer,
            settings,
            word_limit,
        }
    }
}

impl super::StageAgent for ConsolidatorAgent<'_> {
    type Output = ConsolidatorOutput;

    fn stage(&self) -> StageName {
        StageName::Consolidator
    }

    fn settings(&self) -> StageSettings {
        self.settings
    }

    fn system_prompt(&self, ctx: &AgentContext) -> Result<String> {
        policy::consolidator_prompt(ctx.user_role, ctx.language, self.word_limit)
    }

    fn user_content(&self, ctx: &AgentContext) -> Result<UserContent> {
        Ok(UserContent::text(policy::consolidator_user_text(
            ctx,
            self.reader,
            self.analyzer,
        )?))
    }

    fn parse(&self, ctx: &AgentContext, mut value: Value) -> std::result::Result<ConsolidatorOutput, String> {
        parser::stringify_ids(&mut value, "nextSteps");
        // The answer is always in the requested language, whatever the model echoes.
        if let Some(obj) = value.as_object_mut() {
            obj.insert("language".to_string(), Value::String(ctx.language.code().to_string()));
        }

        let mut output: ConsolidatorOutput = parser::parse_output(value)?;
        if output.chat_response.trim().is_empty() {
            return Err("chatResponse is empty".to_string());
        }
        output.frontend_intent = output.frontend_intent.normalized();
        Ok(output)
    }

    fn fallback(&self, ctx: &AgentContext) -> ConsolidatorOutput {
        ConsolidatorOutput {
            chat_response: format!(
                "I understand you're asking about: {}. Let me help you with that.",
                ctx.user_query
            ),
            key_insights: Vec::new(),
            next_steps: vec![NextStep {
                id: "1".to_string(),
                action: "Get more information".to_string(),
                detail: "I can provide additional details about your query".to_string(),
                category: NextStepCategory::Analysis,
            }],
            frontend_intent: FrontendIntent::none(),
            language: ctx.language,
        }
    }
}
