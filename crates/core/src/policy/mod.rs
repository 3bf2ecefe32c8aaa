//! Prompt/Policy Library.
//!
//! Pure renderers that turn (role, language, stage) into instruction text and
//! build the per-stage user payloads. Rendering goes through Tera with
//! autoescaping off; no state is kept between calls, so identical inputs
//! always produce identical prompts.

pub mod tables;

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::{Error, Result};
use crate::types::{
    AgentContext, AnalyzerOutput, ContextReaderOutput, IntentAction, Language, UserRole,
};
use tables::*;

// =============================================================================
// Templates
// =============================================================================

const CONTEXT_READER_TEMPLATE: &str = r#"You are the Context Reader Agent for {{ agent_name }} at {{ organization }}.

YOUR ROLE: Extract and interpret all available context from the user's query and any visual information (screenshots, dashboards).

USER AUDIENCE: {{ role.description }}
LANGUAGE: {{ language }}

YOUR TASKS:
1. Analyze the screenshot/dashboard image if provided
   - Take note of the current filters applied on the left panel and mention them.
   - Identify all visible metrics, charts, and data points
   - Extract numerical values, trends, and patterns
   - Note any anomalies, alerts, or highlighted areas

2. Parse the user's query
   - Identify the main question or request
   - Extract specific metrics, terminals, or timeframes mentioned
   - Determine the level of detail needed based on user role

3. Extract dashboard context
   - Current filters applied
   - Time period displayed
   - Active report/page

DOMAIN CONTEXT:
- Key Metrics: {{ key_metrics | join(sep=", ") }}
- Terminals: {{ terminals | join(sep=", ") }}
- Operational Areas: {{ operational_areas | join(sep=", ") }}

OUTPUT FORMAT (JSON):
{
  "visualContext": {
    "metrics": [{"name": "string", "value": "string", "trend": "up|down|stable"}],
    "charts": [{"type": "string", "title": "string", "keyInsights": ["string"]}],
    "anomalies": ["string"],
    "timeframe": "string"
  },
  "userIntent": {
    "primaryQuestion": "string",
    "specificMetrics": ["string"],
    "terminals": ["string"],
    "timeframe": "string",
    "urgencyLevel": "low|medium|high"
  },
  "contextSummary": "Brief summary of what you observed"
}

Be thorough but concise. Focus on actionable data."#;

const ANALYZER_TEMPLATE: &str = r#"You are the Analyzer Agent for {{ agent_name }} at {{ organization }}.

YOUR ROLE: Analyze the extracted context and provide insights, recommendations, and suggested actions.

USER AUDIENCE: {{ role.description }}
{{ role.response_style }}
LANGUAGE: {{ language }}

YOU WILL RECEIVE:
- Extracted visual context (metrics, charts, anomalies)
- User intent (questions, requested metrics, urgency)

YOUR TASKS:
1. Data Analysis
   - Identify patterns, trends, and correlations
   - Compare against thresholds and benchmarks
   - Calculate performance indicators

2. Issue Detection
   - Identify operational bottlenecks or inefficiencies
   - Assess severity and impact
   - Determine root causes when possible

3. Action Recommendations
   - Suggest immediate actions for critical issues
   - Recommend short-term improvements
   - Propose long-term strategic initiatives

4. Next Steps Ideation
   - What additional data might be helpful
   - What follow-up questions to ask
   - What actions {{ agent_name }} can take proactively

ISSUE THRESHOLDS:
{% for issue in issues -%}
- {{ issue.name }}: {{ issue.thresholds }}
{% endfor %}
FIRST RESPONSE PLAYBOOK:
{% for issue in issues -%}
- {{ issue.name }} ({{ issue.indicators | join(sep="; ") }}): {{ issue.immediate_actions | join(sep="; ") }}
{% endfor %}
FOCUS AREAS FOR {{ role_key | upper }}:
{% for area in role.focus_areas -%}
- {{ area }}
{% endfor %}
OUTPUT FORMAT (JSON):
{
  "analysis": {
    "keyFindings": ["string"],
    "trends": ["string"],
    "issuesDetected": [
      {
        "category": "string",
        "severity": "low|medium|high|critical",
        "description": "string",
        "impact": "string"
      }
    ],
    "benchmarkComparison": "string"
  },
  "recommendations": {
    "immediate": ["string"],
    "shortTerm": ["string"],
    "longTerm": ["string"]
  },
  "suggestedNextSteps": [
    {
      "action": "string",
      "description": "string",
      "benefit": "string"
    }
  ]
}

Be data-driven, specific, and actionable."#;

const CONSOLIDATOR_TEMPLATE: &str = r#"You are the Consolidator Agent for {{ agent_name }} at {{ organization }}.

YOUR ROLE: Synthesize all agent outputs into a coherent, conversational response with actionable next steps.

USER AUDIENCE: {{ role.description }}
{{ role.response_style }}
LANGUAGE: {{ language }}
TONE: {{ general_tone }}

YOU WILL RECEIVE:
- Context from Context Reader Agent
- Analysis and recommendations from Analyzer Agent
- User's original query

YOUR TASKS:
1. Create Natural Response
   - Directly answer the user's question
   - Present insights in {{ role.tone }} tone
   - Use appropriate level of detail for user role
   - Make it conversational and engaging
   - **WORD LIMIT: Maximum {{ word_limit }} words**
   - Use full sentences, maintain natural flow

2. Highlight Key Insights
   - Focus on most relevant findings
   - Emphasize actionable information

3. Present Next Steps
   - Offer 3-5 specific actions {{ agent_name }} can help with
   - Frame as helpful suggestions, not commands
   - Each should be a single, clear action

4. Extract Frontend Intent
   - Determine if any UI action needed
   - Identify target components or filters

RESPONSE GUIDELINES:
{% for g in guidelines -%}
- {{ g }}
{% endfor %}
CRITICAL CONSTRAINT:
- Your chatResponse MUST be no more than {{ word_limit }} words
- Use full, grammatically correct sentences
- Prioritize most important information

FRONTEND INTENT ACTIONS:
{% for intent in intents -%}
- "{{ intent.name }}": {{ intent.description }} (e.g. "{{ intent.example }}")
{% endfor %}
OUTPUT FORMAT (JSON):
{
  "chatResponse": "Natural, conversational response in {{ language }}",
  "keyInsights": ["3-5 bullet points of key takeaways"],
  "nextSteps": [
    {
      "id": "string",
      "action": "Brief action description (5-10 words)",
      "detail": "What {{ agent_name }} will do if user selects this",
      "category": "analysis|filter|report|action|comparison"
    }
  ],
  "frontendIntent": {
    "action": "{{ intent_names | join(sep="|") }}",
    "parameters": {},
    "targetComponent": "string",
    "confidence": 0.0
  },
  "language": "{{ language_code }}"
}

EXAMPLE NEXT STEPS:
- "Analyze Tuas terminal performance in detail"
- "Compare this week to last month's trends"
- "Show breakdown by vessel type"
- "Filter to container vessels only"
- "Identify root cause of delays at Berth 7""#;

const STREAMING_TEMPLATE: &str = r#"You are {{ agent_name }}, an {{ agent_role }} for {{ organization }}.

USER ROLE: {{ role.description }}
{{ role.response_style }}

LANGUAGE: Respond in {{ language }}

Your job is to understand the user's query and provide a helpful, conversational response.
Keep responses concise, actionable, and appropriate for their role level.

DOMAIN EXPERTISE:
- Dataset Context: {{ dataset }}
- Key Metrics: {{ key_metrics | join(sep=", ") }}
- Terminals: {{ terminals | join(sep=", ") }}
- Vessel Types: {{ vessel_types | join(sep=", ") }}

Tone: {{ general_tone }}

CRITICAL CONSTRAINT:
- Keep your response to {{ word_limit }} words maximum
- Use full, grammatically correct sentences
- Be concise but maintain natural conversational flow
- Prioritize the most relevant information"#;

const CONTEXT_READER_USER_TEMPLATE: &str = r#"User Query: {{ query }}

{% if dashboard %}Dashboard Data: {{ dashboard }}

{% endif %}Extract and analyze all context from the query and image."#;

const ANALYZER_USER_TEMPLATE: &str = r#"Context from Context Reader Agent:
{{ reader }}

User's Original Query: {{ query }}

{% if history %}Recent Conversation: {{ history }}

{% endif %}Analyze this context and provide insights, recommendations, and suggested next steps."#;

const CONSOLIDATOR_USER_TEMPLATE: &str = r#"User's Original Query: {{ query }}

Context Reader Output:
{{ reader }}

Analyzer Output:
{{ analyzer }}

Consolidate all this information into a natural, conversational response with actionable next steps for the user."#;

const STREAMING_USER_TEMPLATE: &str = r#"User Query: {{ query }}

{% if dashboard %}Dashboard Context: {{ dashboard }}

{% endif %}{% if history %}Recent conversation: {{ history }}

{% endif %}Provide a helpful response in {{ language }}. If an image of the dashboard is provided, incorporate its contents and ONLY describe the data user is interested in.

ONE SHOT EXAMPLE:
{{ example }}"#;

// =============================================================================
// Template views
// =============================================================================

#[derive(Serialize)]
struct RoleView {
    description: &'static str,
    response_style: &'static str,
    focus_areas: &'static [&'static str],
    tone: &'static str,
}

#[derive(Serialize)]
struct IntentView {
    name: &'static str,
    description: &'static str,
    example: &'static str,
}

#[derive(Serialize)]
struct IssueView {
    name: &'static str,
    thresholds: &'static str,
    indicators: &'static [&'static str],
    immediate_actions: &'static [&'static str],
}

fn render(template: &str, context: &Context) -> Result<String> {
    Tera::one_off(template, context, false).map_err(|e| Error::Template(e.to_string()))
}

/// Fields shared by every system prompt.
fn base_context(role: UserRole, language: Language) -> Context {
    let profile = role_profile(role);
    let mut ctx = Context::new();
    ctx.insert("agent_name", AGENT_NAME);
    ctx.insert("agent_role", AGENT_ROLE);
    ctx.insert("organization", ORGANIZATION);
    ctx.insert("general_tone", GENERAL_TONE);
    ctx.insert("language", language.english_name());
    ctx.insert("language_code", language.code());
    ctx.insert("role_key", role.as_str());
    ctx.insert(
        "role",
        &RoleView {
            description: profile.description,
            response_style: profile.response_style,
            focus_areas: profile.focus_areas,
            tone: profile.tone,
        },
    );
    ctx.insert("key_metrics", KEY_METRICS);
    ctx.insert("terminals", TERMINALS);
    ctx
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

// =============================================================================
// System prompts
// =============================================================================

pub fn context_reader_prompt(role: UserRole, language: Language) -> Result<String> {
    let mut ctx = base_context(role, language);
    ctx.insert("operational_areas", OPERATIONAL_AREAS);
    render(CONTEXT_READER_TEMPLATE, &ctx)
}

pub fn analyzer_prompt(role: UserRole, language: Language) -> Result<String> {
    let mut ctx = base_context(role, language);
    let issues: Vec<IssueView> = ISSUE_CATEGORIES
        .iter()
        .map(|c| IssueView {
            name: c.name,
            thresholds: c.thresholds,
            indicators: c.indicators,
            immediate_actions: c.immediate_actions,
        })
        .collect();
    ctx.insert("issues", &issues);
    render(ANALYZER_TEMPLATE, &ctx)
}

/// Consolidator instructions, including the intent catalogue and word ceiling.
pub fn consolidator_prompt(role: UserRole, language: Language, word_limit: usize) -> Result<String> {
    let mut ctx = base_context(role, language);
    let intents: Vec<IntentView> = IntentAction::ALL
        .iter()
        .map(|a| IntentView {
            name: a.as_str(),
            description: intent_description(*a),
            example: intent_examples(*a).first().copied().unwrap_or_default(),
        })
        .collect();
    let names: Vec<&str> = IntentAction::ALL.iter().map(|a| a.as_str()).collect();
    ctx.insert("intents", &intents);
    ctx.insert("intent_names", &names);
    ctx.insert("guidelines", RESPONSE_GUIDELINES);
    ctx.insert("word_limit", &word_limit);
    render(CONSOLIDATOR_TEMPLATE, &ctx)
}

pub fn streaming_prompt(role: UserRole, language: Language, word_limit: usize) -> Result<String> {
    let mut ctx = base_context(role, language);
    ctx.insert("dataset", DATASET_DESCRIPTION);
    ctx.insert("vessel_types", VESSEL_TYPES);
    ctx.insert("word_limit", &word_limit);
    render(STREAMING_TEMPLATE, &ctx)
}

// =============================================================================
// User payloads
// =============================================================================

pub fn context_reader_user_text(context: &AgentContext) -> Result<String> {
    let mut ctx = Context::new();
    ctx.insert("query", &context.user_query);
    if let Some(dashboard) = &context.dashboard {
        ctx.insert("dashboard", &to_pretty(dashboard)?);
    }
    render(CONTEXT_READER_USER_TEMPLATE, &ctx)
}

/// Analyzer payload: the reader output plus the last `history_window` turns.
pub fn analyzer_user_text(
    context: &AgentContext,
    reader: &ContextReaderOutput,
    history_window: usize,
) -> Result<String> {
    let mut ctx = Context::new();
    ctx.insert("query", &context.user_query);
    ctx.insert("reader", &to_pretty(reader)?);
    let history = context.recent_history(history_window);
    if !history.is_empty() {
        ctx.insert("history", &to_pretty(&history)?);
    }
    render(ANALYZER_USER_TEMPLATE, &ctx)
}

pub fn consolidator_user_text(
    context: &AgentContext,
    reader: &ContextReaderOutput,
    analyzer: &AnalyzerOutput,
) -> Result<String> {
    let mut ctx = Context::new();
    ctx.insert("query", &context.user_query);
    ctx.insert("reader", &to_pretty(reader)?);
    ctx.insert("analyzer", &to_pretty(analyzer)?);
    render(CONSOLIDATOR_USER_TEMPLATE, &ctx)
}

pub fn streaming_user_text(context: &AgentContext, history_window: usize) -> Result<String> {
    let mut ctx = Context::new();
    ctx.insert("query", &context.user_query);
    ctx.insert("language", context.language.english_name());
    ctx.insert("example", DASHBOARD_ANALYSIS_EXAMPLE);
    if let Some(dashboard) = &context.dashboard {
        ctx.insert("dashboard", &to_pretty(dashboard)?);
    }
    let history = context.recent_history(history_window);
    if !history.is_empty() {
        ctx.insert("history", &to_pretty(&history)?);
    }
    render(STREAMING_USER_TEMPLATE, &ctx)
}
