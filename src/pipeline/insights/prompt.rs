//! Per-type instruction templates for annual-report analysis.
//!
//! Every template asks for the same JSON object
//! (`title`, `content`, `summary`, `keyMetrics`, `confidenceScore`) and
//! differs in task, focus areas and the keys expected inside `keyMetrics`.
//! Building a prompt is pure; callers bound the document text beforehand.

use crate::models::InsightType;

/// Static description of one insight type's prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub title: &'static str,
    pub task: &'static str,
    pub focus_areas: &'static [&'static str],
    pub content_hint: &'static str,
    pub summary_hint: &'static str,
    /// `(key, expected value shape)` pairs requested inside `keyMetrics`.
    pub key_metrics: &'static [(&'static str, &'static str)],
    pub confidence_hint: f64,
}

const FINANCIAL_ANALYSIS: PromptTemplate = PromptTemplate {
    title: "Financial Performance Analysis",
    task: "Analyze the financial performance of this company based on their annual report.",
    focus_areas: &[
        "Revenue trends and growth rates",
        "Profitability metrics (margins, ROE, ROA)",
        "Balance sheet strength and liquidity",
        "Cash flow analysis",
        "Key financial ratios",
        "Year-over-year comparisons",
        "Financial outlook and guidance",
    ],
    content_hint: "Detailed financial analysis (600-1000 words covering revenue growth, profitability, balance sheet strength, cash flows, and key financial ratios with specific numbers and percentages where available)",
    summary_hint: "2-3 sentence summary highlighting the most important financial insights",
    key_metrics: &[
        ("revenue_growth", "percentage or amount"),
        ("profit_margin", "percentage"),
        ("debt_to_equity", "ratio"),
        ("current_ratio", "ratio"),
        ("roe", "percentage"),
        ("total_revenue", "amount with currency"),
    ],
    confidence_hint: 0.85,
};

const BUSINESS_INSIGHTS: PromptTemplate = PromptTemplate {
    title: "Strategic Business Insights",
    task: "Provide strategic business insights based on this annual report.",
    focus_areas: &[
        "Business model and strategic direction",
        "Market position and competitive advantages",
        "Operational efficiency and performance",
        "Management effectiveness and leadership",
        "Growth opportunities and expansion plans",
        "Strategic initiatives and major investments",
        "Innovation and technology adoption",
    ],
    content_hint: "Detailed strategic analysis (600-1000 words covering business strategy, competitive position, operational performance, and growth opportunities)",
    summary_hint: "2-3 sentence summary of key strategic insights",
    key_metrics: &[
        ("market_position", "description"),
        ("employee_count", "number"),
        ("geographic_reach", "description"),
        ("key_initiatives", "number or description"),
    ],
    confidence_hint: 0.80,
};

const EXECUTIVE_SUMMARY: PromptTemplate = PromptTemplate {
    title: "Executive Summary",
    task: "Create an executive summary of this annual report suitable for busy investors and stakeholders.",
    focus_areas: &[
        "Company overview and business highlights",
        "Financial performance summary",
        "Major achievements and milestones",
        "Key challenges and risks",
        "Future outlook and strategic direction",
        "Investment thesis and value proposition",
    ],
    content_hint: "Comprehensive executive summary (500-800 words covering all key aspects an executive would need to know)",
    summary_hint: "Top 3 most important points for investors and stakeholders",
    key_metrics: &[
        ("total_revenue", "amount with currency"),
        ("net_income", "amount with currency"),
        ("employee_count", "number"),
        ("year_highlights", "brief description"),
    ],
    confidence_hint: 0.90,
};

const RISK_ASSESSMENT: PromptTemplate = PromptTemplate {
    title: "Risk Assessment",
    task: "Assess the key risks facing this company based on their annual report.",
    focus_areas: &[
        "Market and industry-specific risks",
        "Operational and business risks",
        "Financial and credit risks",
        "Regulatory and compliance risks",
        "Strategic and competitive risks",
        "Risk mitigation strategies and controls",
        "Management's risk assessment",
    ],
    content_hint: "Detailed risk analysis (600-1000 words identifying, categorizing, and evaluating key risks with mitigation strategies)",
    summary_hint: "Top 3 most significant risks investors should monitor",
    key_metrics: &[
        ("overall_risk_level", "High/Medium/Low"),
        ("financial_risk", "High/Medium/Low"),
        ("operational_risk", "High/Medium/Low"),
        ("market_risk", "High/Medium/Low"),
    ],
    confidence_hint: 0.75,
};

const ENTREPRENEURIAL_RECOMMENDATIONS: PromptTemplate = PromptTemplate {
    title: "Entrepreneurial Insights & Recommendations",
    task: "Provide entrepreneurial insights and actionable recommendations based on this annual report.",
    focus_areas: &[
        "Lessons for entrepreneurs and business builders",
        "Strategic decision-making insights",
        "Innovation and growth strategies",
        "Leadership and management lessons",
        "Market opportunity identification",
        "Operational excellence practices",
        "Scaling and expansion strategies",
    ],
    content_hint: "Detailed entrepreneurial analysis (600-1000 words with actionable insights and lessons for business leaders)",
    summary_hint: "Top 3 entrepreneurial lessons and recommendations",
    key_metrics: &[
        ("innovation_score", "rating 1-10"),
        ("growth_strategy", "description"),
        ("leadership_effectiveness", "rating 1-10"),
        ("scalability", "High/Medium/Low"),
    ],
    confidence_hint: 0.80,
};

const MARKET_ANALYSIS: PromptTemplate = PromptTemplate {
    title: "Market & Industry Analysis",
    task: "Analyze the market context and competitive landscape based on this annual report.",
    focus_areas: &[
        "Market size, growth trends, and dynamics",
        "Competitive positioning and market share",
        "Industry trends and disruptions",
        "Customer segments and market penetration",
        "Pricing strategies and market positioning",
        "Emerging opportunities and threats",
    ],
    content_hint: "Detailed market analysis (600-1000 words covering market dynamics, competitive landscape, and industry trends)",
    summary_hint: "Key market insights and competitive positioning",
    key_metrics: &[
        ("market_size", "estimated size"),
        ("market_growth_rate", "percentage"),
        ("market_share", "percentage or position"),
        ("competitive_advantage", "description"),
    ],
    confidence_hint: 0.75,
};

const COMPETITIVE_ANALYSIS: PromptTemplate = PromptTemplate {
    title: "Competitive Strategy Analysis",
    task: "Analyze the competitive positioning and competitive strategy based on this annual report.",
    focus_areas: &[
        "Competitive advantages and differentiation",
        "Competitor analysis and benchmarking",
        "Competitive threats and market position",
        "Strategic responses to competition",
        "Competitive moats and barriers to entry",
        "Market share dynamics",
    ],
    content_hint: "Detailed competitive analysis (600-1000 words covering competitive positioning, advantages, and strategic responses)",
    summary_hint: "Key competitive insights and strategic positioning",
    key_metrics: &[
        ("competitive_strength", "Strong/Medium/Weak"),
        ("market_position", "description"),
        ("differentiation", "High/Medium/Low"),
        ("competitive_moat", "description"),
    ],
    confidence_hint: 0.80,
};

const ESG_ANALYSIS: PromptTemplate = PromptTemplate {
    title: "ESG Performance Analysis",
    task: "Analyze the ESG (Environmental, Social, Governance) performance and commitments based on this annual report.",
    focus_areas: &[
        "Environmental impact and sustainability initiatives",
        "Social responsibility and community engagement",
        "Governance structure and board effectiveness",
        "ESG risks and opportunities",
        "Sustainability goals and progress",
        "Stakeholder engagement and value creation",
    ],
    content_hint: "Detailed ESG analysis (600-1000 words covering environmental, social, and governance aspects with specific initiatives and metrics)",
    summary_hint: "Key ESG highlights and sustainability commitments",
    key_metrics: &[
        ("esg_maturity", "Advanced/Developing/Basic"),
        ("sustainability_goals", "description"),
        ("governance_rating", "Strong/Medium/Weak"),
        ("social_impact", "description"),
    ],
    confidence_hint: 0.70,
};

pub fn template_for(insight_type: InsightType) -> &'static PromptTemplate {
    match insight_type {
        InsightType::FinancialAnalysis => &FINANCIAL_ANALYSIS,
        InsightType::RiskAssessment => &RISK_ASSESSMENT,
        InsightType::BusinessInsights => &BUSINESS_INSIGHTS,
        InsightType::EntrepreneurialRecommendations => &ENTREPRENEURIAL_RECOMMENDATIONS,
        InsightType::ExecutiveSummary => &EXECUTIVE_SUMMARY,
        InsightType::MarketAnalysis => &MARKET_ANALYSIS,
        InsightType::CompetitiveAnalysis => &COMPETITIVE_ANALYSIS,
        InsightType::EsgAnalysis => &ESG_ANALYSIS,
    }
}

/// Build the analysis prompt for one insight type.
pub fn build_prompt(
    insight_type: InsightType,
    text: &str,
    company_name: &str,
    industry: &str,
    year: i32,
) -> String {
    let template = template_for(insight_type);

    let focus = template
        .focus_areas
        .iter()
        .map(|area| format!("- {area}"))
        .collect::<Vec<_>>()
        .join("\n");

    let metrics = template
        .key_metrics
        .iter()
        .map(|(key, shape)| format!("    \"{key}\": \"{shape}\""))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "I need you to analyze an annual report for {company_name} ({industry} industry) from {year}. \
Please provide a thorough analysis and respond in the specified JSON format.

**Task:** {task}

**Focus Areas:**
{focus}

**Required JSON Response Format:**
```json
{{
  \"title\": \"{title}\",
  \"content\": \"{content_hint}\",
  \"summary\": \"{summary_hint}\",
  \"keyMetrics\": {{
{metrics}
  }},
  \"confidenceScore\": {confidence:.2}
}}
```

**Annual Report Content:**
{text}",
        task = template.task,
        title = template.title,
        content_hint = template.content_hint,
        summary_hint = template.summary_hint,
        confidence = template.confidence_hint,
    )
}

/// Same as [`build_prompt`] for a type given by name. Names this build does
/// not know use the `business_insights` template.
pub fn build_prompt_for_name(
    insight_type: &str,
    text: &str,
    company_name: &str,
    industry: &str,
    year: i32,
) -> String {
    build_prompt(InsightType::parse_lenient(insight_type), text, company_name, industry, year)
}
