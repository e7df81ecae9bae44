use crate::core::recommendations::parse_recommendations;
use crate::core::report::{format_grouped, format_percentage};
use crate::core::vector_store::{PortfolioVectorStore, VectorStoreStats};
use crate::domain::model::{
    ChatMessage, ChatRole, PortfolioAnalysis, ProcessedPortfolio, Recommendation,
};
use crate::domain::ports::TextGenerator;
use crate::utils::error::Result;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// History entries included in a chat prompt (the current question counts as one).
const CHAT_HISTORY_WINDOW: usize = 4;

const ANALYSIS_INSTRUCTION: &str = "You are a senior portfolio manager and investment advisor specializing in sovereign fund management.
Analyze the provided portfolio data and provide insights on:
1. Overall portfolio health and performance
2. Risk assessment and management
3. Sector allocation and diversification
4. Performance vs benchmarks
5. Key strengths and areas for improvement

Be precise, data-driven, and provide actionable insights.";

const RECOMMENDATION_INSTRUCTION: &str = "You are an expert investment advisor for sovereign wealth funds.
Generate specific, actionable investment recommendations based on the portfolio analysis.
Focus on: optimization opportunities, risk management, diversification improvements,
and performance enhancement strategies.";

const CHAT_INSTRUCTION: &str = "You are a knowledgeable portfolio advisor with access to detailed portfolio data.
Answer questions about the portfolio using the specific data provided. Be detailed, specific, and use actual numbers
from the data. Do not give generic responses - always reference the actual portfolio holdings, performance metrics,
and risk data provided in the context.";

/// Prompt assembly and conversation state on top of a [`TextGenerator`].
pub struct PortfolioAiEngine<G: TextGenerator> {
    generator: G,
    vector_store: PortfolioVectorStore,
    chat_history: Vec<ChatMessage>,
    temperature: f32,
}

impl<G: TextGenerator> PortfolioAiEngine<G> {
    pub fn new(generator: G, vector_store: PortfolioVectorStore) -> Self {
        Self {
            generator,
            vector_store,
            chat_history: Vec::new(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn vector_store(&self) -> &PortfolioVectorStore {
        &self.vector_store
    }

    pub async fn analyze_portfolio(
        &mut self,
        portfolio: &ProcessedPortfolio,
    ) -> Result<PortfolioAnalysis> {
        self.vector_store.add_snapshot(portfolio, None)?;

        let data_summary = prepare_portfolio_summary(portfolio);
        let prompt = format!(
            "Please analyze this sovereign fund portfolio:\n\n{}\n\nProvide a comprehensive analysis covering performance, risk, diversification, and overall portfolio health.",
            data_summary
        );

        let analysis = self
            .generator
            .generate(&prompt, ANALYSIS_INSTRUCTION, self.temperature)
            .await
            .inspect_err(|e| tracing::error!("Error in portfolio analysis: {}", e))?;

        Ok(PortfolioAnalysis {
            analysis,
            timestamp: chrono::Local::now().to_rfc3339(),
            data_summary,
        })
    }

    pub async fn generate_recommendations(
        &self,
        portfolio: &ProcessedPortfolio,
    ) -> Result<Vec<Recommendation>> {
        let summary = prepare_portfolio_summary(portfolio);
        let context = self
            .vector_store
            .context_for_query("investment recommendations", portfolio);

        let prompt = format!(
            "Based on this portfolio data and context:

{}

Context from similar periods:
{}

Generate 5-7 specific investment recommendations with:
- Clear rationale for each recommendation
- Expected impact on portfolio
- Implementation priority (High/Medium/Low)
- Risk considerations

Format as numbered recommendations.",
            summary, context
        );

        let text = self
            .generator
            .generate(&prompt, RECOMMENDATION_INSTRUCTION, self.temperature)
            .await
            .inspect_err(|e| tracing::error!("Error generating recommendations: {}", e))?;

        let recommendations = parse_recommendations(&text);
        tracing::info!("Parsed {} recommendations", recommendations.len());
        Ok(recommendations)
    }

    /// Answer a question about the portfolio. The question stays in history even if the
    /// model call fails; the answer is recorded only on success.
    pub async fn chat(&mut self, message: &str, portfolio: &ProcessedPortfolio) -> Result<String> {
        let context = self.vector_store.context_for_query(message, portfolio);

        self.chat_history.push(ChatMessage {
            role: ChatRole::User,
            message: message.to_string(),
            timestamp: chrono::Local::now().to_rfc3339(),
        });

        let start = self.chat_history.len().saturating_sub(CHAT_HISTORY_WINDOW);
        let history_text = self.chat_history[start..]
            .iter()
            .map(|m| format!("{}: {}", m.role, m.message))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "COMPLETE PORTFOLIO CONTEXT:
{}

RECENT CONVERSATION:
{}

CURRENT USER QUESTION: {}

Please provide a detailed, specific answer using the actual portfolio data above. Include specific company names,
exact percentages, and real numbers from the data. Do not give generic responses.",
            context, history_text, message
        );

        let preview: String = message.chars().take(50).collect();
        tracing::info!("Calling {} for chat query: {}...", self.generator.provider(), preview);

        let response = self
            .generator
            .generate(&prompt, CHAT_INSTRUCTION, self.temperature)
            .await
            .inspect_err(|e| tracing::error!("Error in chat: {}", e))?;

        self.chat_history.push(ChatMessage {
            role: ChatRole::Assistant,
            message: response.clone(),
            timestamp: chrono::Local::now().to_rfc3339(),
        });

        Ok(response)
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn clear_chat_history(&mut self) {
        self.chat_history.clear();
        tracing::info!("Chat history cleared");
    }

    pub fn vector_stats(&self) -> VectorStoreStats {
        self.vector_store.stats()
    }
}

/// Full portfolio description used in analysis and recommendation prompts.
pub fn prepare_portfolio_summary(portfolio: &ProcessedPortfolio) -> String {
    let p = &portfolio.portfolio_summary;
    let perf = &portfolio.performance_summary;
    let risk = &portfolio.risk_summary;
    let mut parts = Vec::new();

    parts.push("PORTFOLIO OVERVIEW:".to_string());
    parts.push(format!("Fund: {}", p.fund_name));
    parts.push(format!("AUM: {} {}", format_grouped(p.total_aum, 0), p.base_currency));
    parts.push(format!("Holdings: {}", p.total_holdings));
    parts.push(format!("Target Return: {}", format_percentage(p.target_return, 1)));
    parts.push(format!("Risk Level: {}", p.risk_level));
    parts.push(String::new());

    parts.push("PERFORMANCE METRICS:".to_string());
    parts.push(format!("Current Value: {}", format_grouped(perf.current_value, 0)));
    parts.push(format!("Total Return: {}", format_percentage(perf.total_return, 2)));
    parts.push(format!("Daily Return: {}", format_percentage(perf.daily_return, 2)));
    parts.push(format!("Volatility: {}", format_percentage(perf.volatility, 2)));
    parts.push(format!("Sharpe Ratio: {:.2}", perf.sharpe_ratio));
    parts.push(format!("Max Drawdown: {}", format_percentage(perf.max_drawdown, 2)));
    parts.push(format!("Active Return: {}", format_percentage(perf.active_return, 2)));
    parts.push(String::new());

    parts.push("RISK METRICS:".to_string());
    parts.push(format!("Portfolio Beta: {:.2}", risk.portfolio_beta));
    parts.push(format!("VaR (95%): {}", format_grouped(risk.var_95, 0)));
    parts.push(format!("CVaR (95%): {}", format_grouped(risk.cvar_95, 0)));
    parts.push(format!("Tracking Error: {:.3}", risk.tracking_error));
    parts.push(format!(
        "Correlation with Benchmark: {:.3}",
        risk.correlation_benchmark
    ));
    parts.push(format!("Concentration Risk: {:.3}", risk.concentration_risk));
    parts.push(format!("Liquidity Score: {:.1}", risk.liquidity_score));
    parts.push(String::new());

    if !portfolio.holdings.is_empty() {
        let mut holdings: Vec<_> = portfolio.holdings.iter().collect();
        holdings.sort_by(|a, b| {
            b.market_value
                .unwrap_or(0.0)
                .partial_cmp(&a.market_value.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        parts.push("COMPLETE HOLDINGS DETAILS:".to_string());
        parts.push(format!("Total Holdings: {}", holdings.len()));
        parts.push("All Holdings with Full Details:".to_string());
        for (i, h) in holdings.iter().enumerate() {
            parts.push(format!(
                "{:2}. {:<35} | Ticker: {:<15} | Sector: {:<20} | Weight: {:>6} | Market Value: ₹{:>15} | Price: ₹{:>8.2} | ESG: {:<4} | Dividend: {:>5}",
                i + 1,
                h.asset_name,
                h.ticker_symbol,
                h.sector,
                format_percentage(h.weight_percent.unwrap_or(0.0), 2),
                format_grouped(h.market_value.unwrap_or(0.0), 0),
                h.current_price.unwrap_or(0.0),
                h.esg_rating.as_deref().unwrap_or("N/A"),
                format_percentage(h.dividend_yield.unwrap_or(0.0), 2)
            ));
        }
        parts.push(String::new());
    } else if !portfolio.top_holdings.is_empty() {
        parts.push("TOP HOLDINGS:".to_string());
        parts.push(format!(
            "Showing Top {} Holdings:",
            portfolio.top_holdings.len()
        ));
        for (i, h) in portfolio.top_holdings.iter().enumerate() {
            parts.push(format!(
                "{:2}. {:<30} ({:<12}) Sector: {:<20} Weight: {} Value: ₹{} ESG: {}",
                i + 1,
                h.asset_name,
                h.ticker_symbol,
                h.sector,
                format_percentage(h.weight_percent, 2),
                format_grouped(h.market_value, 0),
                h.esg_rating.as_deref().unwrap_or("N/A")
            ));
        }
        parts.push(String::new());
    }

    if !portfolio.sector_allocation.is_empty() {
        parts.push("SECTOR ALLOCATION:".to_string());
        let total: f64 = portfolio.sector_allocation.iter().map(|s| s.market_value).sum();
        for slice in &portfolio.sector_allocation {
            let weight = if total > 0.0 {
                slice.market_value / total
            } else {
                0.0
            };
            parts.push(format!(
                "- {:<25}: {} ({} {})",
                slice.name,
                format_percentage(weight, 1),
                format_grouped(slice.market_value, 0),
                p.base_currency
            ));
        }
        parts.push(String::new());
    }

    if !portfolio.geographic_allocation.is_empty() {
        parts.push("GEOGRAPHIC ALLOCATION:".to_string());
        for slice in &portfolio.geographic_allocation {
            parts.push(format!(
                "- {}: {}",
                slice.name,
                format_grouped(slice.market_value, 0)
            ));
        }
        parts.push(String::new());
    }

    parts.join("\n")
}
