use porter_core::config::StageSettings;
use porter_core::policy;
use porter_core::traits::UserContent;
use porter_core::{
    AgentContext, Analysis, AnalyzerOutput, ContextReaderOutput, Recommendations, Result,
    StageName, SuggestedAction,
};

/// Turns the reader's extraction into findings, issues and recommendations.
pub struct AnalyzerAgent<'a> {
    reader: &'a ContextReaderOutput,
    settings: StageSettings,
    history_window: usize,
}

impl<'a> AnalyzerAgent<'a> {
    pub fn new(reader: &'a ContextReaderOutput, settings: StageSettings, history_window: usize) -> Self {
        Self {
            reader,
            settings,
            history_window,
        }
    }
}

impl super::StageAgent for AnalyzerAgent<'_> {
    type Output = AnalyzerOutput;

    fn stage(&self) -> StageName {
        StageName::Analyzer
    }

    fn settings(&self) -> StageSettings {
        self.settings
    }

    fn system_prompt(&self, ctx: &AgentContext) -> Result<String> {
        policy::analyzer_prompt(ctx.user_role, ctx.language)
    }

    fn user_content(&self, ctx: &AgentContext) -> Result<UserContent> {
        Ok(UserContent::text(policy::analyzer_user_text(
            ctx,
            self.reader,
            self.history_window,
        )?))
    }

    fn fallback(&self, _ctx: &AgentContext) -> AnalyzerOutput {
        AnalyzerOutput {
            analysis: Analysis::default(),
            recommendations: Recommendations::default(),
            suggested_next_steps: vec![SuggestedAction {
                action: "Show more details".to_string(),
                description: "Get additional information about this query".to_string(),
                benefit: "Better understanding of the situation".to_string(),
            }],
        }
    }
}
