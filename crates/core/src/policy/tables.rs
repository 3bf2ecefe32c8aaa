//! Domain tables for the port-operations assistant.

use crate::types::{IntentAction, Language, UserRole};

// =============================================================================
// Identity & personality
// =============================================================================

pub const AGENT_NAME: &str = "Porter AI";
pub const ORGANIZATION: &str = "Port of Singapore Authority (PSA)";
pub const AGENT_ROLE: &str = "Intelligent assistant for port operations and analytics";

pub const GENERAL_TONE: &str = "Professional, helpful, and friendly";

pub const RESPONSE_GUIDELINES: &[&str] = &[
    "Keep responses concise and actionable",
    "Use relevant port operations terminology",
    "Prioritize operational efficiency insights",
    "Highlight patterns and anomalies in data",
    "Suggest proactive remediation when issues detected",
];

// =============================================================================
// Roles
// =============================================================================

/// How answers are shaped for one audience tier.
#[derive(Debug, Clone, Copy)]
pub struct RoleProfile {
    pub description: &'static str,
    pub response_style: &'static str,
    pub focus_areas: &'static [&'static str],
    pub tone: &'static str,
}

pub fn role_profile(role: UserRole) -> RoleProfile {
    match role {
        UserRole::TopManagement => RoleProfile {
            description: "Executive-level leadership",
            response_style: "Respond with executive-level insights, strategic implications, and high-level KPIs. Use formal, boardroom-appropriate language.",
            focus_areas: &[
                "Strategic KPIs and overall performance",
                "Trend analysis and forecasting",
                "Risk assessment and mitigation",
                "Competitive positioning",
                "Investment and resource allocation",
            ],
            tone: "Formal and strategic",
        },
        UserRole::MiddleManagement => RoleProfile {
            description: "Operational management",
            response_style: "Respond with operational insights, performance metrics, and tactical action items. Use clear, action-oriented language.",
            focus_areas: &[
                "Operational efficiency metrics",
                "Team performance tracking",
                "Resource optimization",
                "Process improvements",
                "Tactical problem-solving",
            ],
            tone: "Clear and action-oriented",
        },
        UserRole::FrontlineOperations => RoleProfile {
            description: "Operational staff and ground personnel",
            response_style: "Respond with practical information, immediate actions, and hands-on guidance. Use simple, direct language.",
            focus_areas: &[
                "Real-time operational status",
                "Immediate task guidance",
                "Equipment and resource availability",
                "Safety protocols",
                "Quick troubleshooting",
            ],
            tone: "Simple and direct",
        },
    }
}

// =============================================================================
// Port operations vocabulary
// =============================================================================

pub const KEY_METRICS: &[&str] = &[
    "Container throughput (TEUs)",
    "Berth utilization rate (%)",
    "Average vessel turnaround time",
    "Port time savings",
    "Crane productivity",
    "Yard occupancy",
    "Gate turnaround time",
    "Vessel waiting time",
];

pub const TERMINALS: &[&str] = &["Tuas", "Pasir Panjang", "Keppel", "Brani", "Antwerp", "Busan"];

pub const VESSEL_TYPES: &[&str] = &[
    "Container vessels",
    "Bulk carriers",
    "Oil tankers",
    "LNG carriers",
    "Feeder vessels",
    "Ultra-large container vessels (ULCV)",
];

pub const OPERATIONAL_AREAS: &[&str] = &[
    "Berth allocation",
    "Crane scheduling",
    "Yard management",
    "Gate operations",
    "Vessel traffic management",
    "Container handling",
];

/// What the vessel-call dataset behind the dashboard contains.
pub const DATASET_DESCRIPTION: &str = "The dataset contains both categorical and numerical variables. \
Categorical variables include Operator, Service, Direction, Business Unit, Vessel, Status, Arrival Variance, Arrival Accuracy, From, and To. \
These represent codes, port names, vessel names, directions, or binary indicators. \
Numerical variables include Wait Times, Berth Time, Assured Port Time Achieved, Bunker Saved, and Carbon Abatement, representing durations, percentages, monetary values, and environmental impact metrics. \
Temporal variables such as BTR, ABT, ATB, and ATU are timestamps for key port events. \
Identifiers include IMO and Rotation Number, which uniquely identify vessels and voyages.";

// =============================================================================
// Frontend intents
// =============================================================================

pub fn intent_description(action: IntentAction) -> &'static str {
    match action {
        IntentAction::ShowReport => "Display or navigate to a specific report",
        IntentAction::FilterData => "Apply filters to dashboard data",
        IntentAction::HighlightMetric => "Highlight specific metrics or KPIs",
        IntentAction::ShowChart => "Focus on a specific chart or visualization",
        IntentAction::Navigate => "Navigate to a different view or page",
        IntentAction::None => "No specific UI action needed (conversational only)",
    }
}

pub fn intent_examples(action: IntentAction) -> &'static [&'static str] {
    match action {
        IntentAction::ShowReport => &[
            "Show me the monthly performance report",
            "Display berth utilization report",
        ],
        IntentAction::FilterData => &[
            "Filter by this month",
            "Show only Tuas terminal",
            "Filter by container vessels",
        ],
        IntentAction::HighlightMetric => &[
            "What's the current berth utilization?",
            "Show me vessel turnaround time",
        ],
        IntentAction::ShowChart => &[
            "Show me container throughput chart",
            "Display crane productivity graph",
        ],
        IntentAction::Navigate => &["Go to operations dashboard", "Switch to terminal view"],
        IntentAction::None => &["Hello", "Thank you", "What can you do?"],
    }
}

// =============================================================================
// Issue detection
// =============================================================================

/// Thresholds the analyzer compares metrics against.
#[derive(Debug, Clone, Copy)]
pub struct IssueCategory {
    pub key: &'static str,
    pub name: &'static str,
    /// Human-readable threshold summary.
    pub thresholds: &'static str,
    pub indicators: &'static [&'static str],
    pub immediate_actions: &'static [&'static str],
}

pub const ISSUE_CATEGORIES: &[IssueCategory] = &[
    IssueCategory {
        key: "berth_utilization",
        name: "Berth Utilization Issues",
        thresholds: "over-utilization above 90%, under-utilization below 60%, optimal 70-85%",
        indicators: &[
            "Prolonged high utilization (>90%)",
            "Vessel queue building up",
            "Extended waiting times",
        ],
        immediate_actions: &[
            "Activate overflow berth capacity",
            "Coordinate with vessel operators for schedule adjustment",
            "Prioritize faster turnaround vessels",
        ],
    },
    IssueCategory {
        key: "vessel_turnaround",
        name: "Vessel Turnaround Time Issues",
        thresholds: "critical above 30 hours, warning above 24 hours, target 18 hours",
        indicators: &[
            "Turnaround time exceeding 24 hours",
            "Consistent delays across berths",
            "Equipment breakdown delays",
        ],
        immediate_actions: &[
            "Deploy additional crane resources",
            "Expedite yard container retrieval",
            "Coordinate with customs for faster clearance",
        ],
    },
    IssueCategory {
        key: "crane_productivity",
        name: "Crane Productivity Issues",
        thresholds: "critical below 20 moves/hour, warning below 25 moves/hour, target 30 moves/hour",
        indicators: &[
            "Productivity below 25 moves/hour",
            "Frequent crane idle time",
            "Maintenance backlog",
        ],
        immediate_actions: &[
            "Check for equipment faults and initiate repairs",
            "Verify operator availability and training",
            "Review container positioning for accessibility",
        ],
    },
    IssueCategory {
        key: "yard_congestion",
        name: "Yard Congestion",
        thresholds: "critical above 95% occupancy, warning above 85%, optimal 75%",
        indicators: &[
            "Yard occupancy above 85%",
            "Container restacking frequency increasing",
            "Retrieval time delays",
        ],
        immediate_actions: &[
            "Expedite export container gate-out",
            "Coordinate early vessel arrival for import clearance",
            "Activate auxiliary yard space",
        ],
    },
];

// =============================================================================
// Examples & templates
// =============================================================================

/// One-shot answer shown to the streaming model.
pub const DASHBOARD_ANALYSIS_EXAMPLE: &str = "I see that we handled around 30 services this week, and average port time savings are about 15%. That's pretty solid, slightly above last month's baseline.

It looks like most of the gains came from Tuas and Antwerp, especially during midweek scheduling windows. The pattern suggests our automated berth allocation is starting to pay off.

If we push similar scheduling parameters to Busan, we could probably shave another 2-3% off waiting time next month. Want me to break down the data by terminal or vessel type?";

pub fn greeting(language: Language) -> &'static str {
    match language {
        Language::English => {
            "Hello! I'm Porter AI. How can I assist you with port operations today?"
        }
        Language::SimplifiedChinese => "您好！我是 Porter AI。今天我能如何协助您处理港口运营事务？",
        Language::Spanish => {
            "¡Hola! Soy Porter AI. ¿Cómo puedo ayudarle hoy con las operaciones portuarias?"
        }
        Language::Arabic => "مرحباً! أنا Porter AI. كيف يمكنني مساعدتك في عمليات الميناء اليوم؟",
        Language::French => {
            "Bonjour ! Je suis Porter AI. Comment puis-je vous aider avec les opérations portuaires aujourd'hui ?"
        }
        Language::Hindi => "नमस्ते! मैं Porter AI हूँ। आज मैं बंदरगाह संचालन में आपकी कैसे सहायता कर सकता हूँ?",
    }
}
