use clap::Parser;
use fund_insight::config::cli::{Cli, Command};
use fund_insight::core::report::{
    calculate_portfolio_metrics, format_currency, format_number, format_percentage,
    generate_alerts, performance_summary_line, validate_data_completeness,
};
use fund_insight::domain::model::{AlertLevel, PortfolioInsights, TimeSeries};
use fund_insight::domain::ports::TextGenerator;
use fund_insight::utils::error::ErrorSeverity;
use fund_insight::utils::{logger, validation::Validate};
use fund_insight::{
    ExportConfig, GeminiClient, InsightConfig, InsightEngine, LocalStorage,
    PortfolioAiEngine, PortfolioDataProcessor, PortfolioVectorStore, ReportPipeline, Result,
};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => InsightConfig::from_file(path),
        None => Ok(InsightConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if cli.log_json || config.monitoring.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting fund-insight CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: &Cli, config: &InsightConfig) -> Result<()> {
    match &cli.command {
        Command::Summary { workbook, json } => summary(config, workbook, *json),
        Command::Series {
            workbook,
            sheet,
            columns,
            output,
        } => series(workbook, sheet, columns, output.as_deref()),
        Command::Analyze { workbook } => analyze(cli, config, workbook).await,
        Command::Chat { workbook, message } => {
            chat(cli, config, workbook, message.as_deref()).await
        }
        Command::Export {
            workbook,
            output,
            with_ai,
        } => export(cli, config, workbook, output.clone(), *with_ai).await,
        Command::IndexStats => index_stats(config),
        Command::Check => check(cli, config).await,
    }
}

fn insights_without_ai(
    processor: &PortfolioDataProcessor,
    config: &InsightConfig,
) -> PortfolioInsights {
    let portfolio = processor.processed().clone();
    PortfolioInsights {
        metrics: calculate_portfolio_metrics(&portfolio),
        alerts: generate_alerts(&portfolio, &config.alerts, &config.report.currency_symbol),
        completeness: validate_data_completeness(&portfolio),
        portfolio,
        analysis: None,
        recommendations: Vec::new(),
    }
}

fn summary(config: &InsightConfig, workbook: &Path, json: bool) -> Result<()> {
    let processor = PortfolioDataProcessor::load(workbook)?;
    let insights = insights_without_ai(&processor, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
        return Ok(());
    }

    let currency = config.report.currency_symbol.as_str();
    let portfolio = &insights.portfolio;
    let p = &portfolio.portfolio_summary;
    let perf = &portfolio.performance_summary;
    let risk = &portfolio.risk_summary;

    println!("{}", performance_summary_line(portfolio, currency));
    println!();
    println!("== {} ==", p.fund_name);
    println!("Total AUM:        {}", format_currency(p.total_aum, currency));
    println!("Base Currency:    {}", p.base_currency);
    println!("Benchmark:        {}", p.benchmark);
    println!("Risk Level:       {}", p.risk_level);
    println!("Target Return:    {}", format_percentage(p.target_return, 2));
    println!("Holdings:         {}", p.total_holdings);
    println!("Inception:        {}", p.inception_date.format("%Y-%m-%d"));
    println!();

    println!("-- Performance --");
    println!("Current Value:    {}", format_currency(perf.current_value, currency));
    println!("Total Return:     {}", format_percentage(perf.total_return, 2));
    println!("Daily Return:     {}", format_percentage(perf.daily_return, 2));
    println!("Volatility:       {}", format_percentage(perf.volatility, 2));
    println!("Sharpe Ratio:     {}", format_number(perf.sharpe_ratio, 2));
    println!("Max Drawdown:     {}", format_percentage(perf.max_drawdown, 2));
    println!("Active Return:    {}", format_percentage(perf.active_return, 2));
    println!();

    println!("-- Risk --");
    println!("Beta:             {}", format_number(risk.portfolio_beta, 2));
    println!("VaR (95%):        {}", format_currency(risk.var_95, currency));
    println!("CVaR (95%):       {}", format_currency(risk.cvar_95, currency));
    println!("Tracking Error:   {}", format_percentage(risk.tracking_error, 2));
    println!("Correlation:      {}", format_number(risk.correlation_benchmark, 3));
    println!("Concentration:    {}", format_percentage(risk.concentration_risk, 1));
    println!("Liquidity Score:  {}", format_number(risk.liquidity_score, 1));
    println!();

    if !portfolio.top_holdings.is_empty() {
        println!("-- Top Holdings --");
        for (i, h) in portfolio.top_holdings.iter().enumerate() {
            println!(
                "{:2}. {:<30} {:<12} {:<20} {:>8} {:>12}",
                i + 1,
                h.asset_name,
                h.ticker_symbol,
                h.sector,
                format_percentage(h.weight_percent, 2),
                format_currency(h.market_value, currency)
            );
        }
        println!();
    }

    if !portfolio.sector_allocation.is_empty() {
        println!("-- Sector Allocation --");
        for slice in &portfolio.sector_allocation {
            println!(
                "{:<25} {:>12}",
                slice.name,
                format_currency(slice.market_value, currency)
            );
        }
        println!();
    }

    let m = &insights.metrics;
    println!("-- Derived Metrics --");
    println!("Return/Volatility: {}", format_number(m.return_volatility_ratio, 2));
    println!("Recovery Factor:   {}", format_number(m.recovery_factor, 2));
    println!("Top 5 Weight:      {}", format_percentage(m.top_5_concentration, 1));
    println!("Top 10 Weight:     {}", format_percentage(m.top_10_concentration, 1));
    if let Some(hhi) = m.sector_herfindahl {
        println!("Sector HHI:        {}", format_number(hhi, 3));
    }
    println!();

    if insights.alerts.is_empty() {
        println!("✅ No alerts");
    } else {
        println!("-- Alerts --");
        for alert in &insights.alerts {
            let icon = match alert.level {
                AlertLevel::Info => "ℹ️",
                AlertLevel::Warning => "⚠️",
                AlertLevel::Error => "🚨",
            };
            println!("{} {}: {}", icon, alert.title, alert.message);
        }
    }

    let c = &insights.completeness;
    let missing: Vec<&str> = [
        ("overview", c.portfolio_overview),
        ("holdings", c.holdings_data),
        ("performance", c.performance_data),
        ("risk", c.risk_data),
        ("history", c.historical_data),
    ]
    .iter()
    .filter(|(_, present)| !present)
    .map(|(name, _)| *name)
    .collect();
    if !missing.is_empty() {
        println!("⚠️ Incomplete data: {}", missing.join(", "));
    }

    Ok(())
}

fn series(workbook: &Path, sheet: &str, columns: &[String], output: Option<&Path>) -> Result<()> {
    let processor = PortfolioDataProcessor::load(workbook)?;
    let series = processor.time_series(sheet, columns)?;
    tracing::info!("{}: {} rows, {} columns", sheet, series.points.len(), series.columns.len());

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_series_csv(&series, file)?;
            println!("📁 Output saved to: {}", path.display());
        }
        None => write_series_csv(&series, std::io::stdout().lock())?,
    }
    Ok(())
}

fn write_series_csv<W: std::io::Write>(series: &TimeSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["Date".to_string()];
    header.extend(series.columns.iter().cloned());
    wtr.write_record(&header)?;

    for point in &series.points {
        let mut record = vec![point.date.format("%Y-%m-%d").to_string()];
        record.extend(
            point
                .values
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn load_vector_store(config: &InsightConfig) -> Result<PortfolioVectorStore> {
    let mut store = PortfolioVectorStore::new(config.index.dimension);
    if let Some(path) = &config.index.path {
        if store.load(path)? {
            tracing::info!("Loaded {} snapshots from {}", store.stats().total_vectors, path);
        }
    }
    Ok(store)
}

fn save_vector_store(config: &InsightConfig, store: &PortfolioVectorStore) -> Result<()> {
    if let Some(path) = &config.index.path {
        store.save(path)?;
        tracing::info!("Saved {} snapshots to {}", store.stats().total_vectors, path);
    }
    Ok(())
}

fn gemini_client(cli: &Cli, config: &InsightConfig) -> Result<GeminiClient> {
    let api_key = config.resolve_api_key(cli.api_key.as_deref())?;
    GeminiClient::new(api_key, config.llm.clone())
}

fn ai_engine<G: TextGenerator>(
    config: &InsightConfig,
    generator: G,
) -> Result<PortfolioAiEngine<G>> {
    Ok(PortfolioAiEngine::new(generator, load_vector_store(config)?)
        .with_temperature(config.llm.temperature))
}

async fn analyze(cli: &Cli, config: &InsightConfig, workbook: &Path) -> Result<()> {
    let processor = PortfolioDataProcessor::load(workbook)?;
    let portfolio = processor.processed();
    let mut engine = ai_engine(config, gemini_client(cli, config)?)?;

    let analysis = engine.analyze_portfolio(portfolio).await?;
    println!("# AI Portfolio Analysis\n");
    println!("{}\n", analysis.analysis.trim());

    let recommendations = engine.generate_recommendations(portfolio).await?;
    println!("# Recommendations\n");
    for (i, rec) in recommendations.iter().enumerate() {
        println!("{}. {} [{}]", i + 1, rec.title, rec.priority);
        if rec.description != rec.title {
            println!("   {}", rec.description);
        }
        if !rec.impact.is_empty() {
            println!("   Impact: {}", rec.impact);
        }
    }

    save_vector_store(config, engine.vector_store())
}

async fn chat(
    cli: &Cli,
    config: &InsightConfig,
    workbook: &Path,
    message: Option<&str>,
) -> Result<()> {
    let processor = PortfolioDataProcessor::load(workbook)?;
    let portfolio = processor.processed();
    let mut engine = ai_engine(config, gemini_client(cli, config)?)?;

    if let Some(message) = message {
        let answer = engine.chat(message, portfolio).await?;
        println!("{}", answer.trim());
        return Ok(());
    }

    println!(
        "💬 Ask about {} (/history, /clear, /exit)",
        portfolio.portfolio_summary.fund_name
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                engine.clear_chat_history();
                println!("🧹 History cleared");
            }
            "/history" => {
                for entry in engine.chat_history() {
                    println!("[{}] {}: {}", entry.timestamp, entry.role, entry.message);
                }
            }
            question => match engine.chat(question, portfolio).await {
                Ok(answer) => println!("\n{}\n", answer.trim()),
                // 單次失敗不中斷對話
                Err(e) => eprintln!("❌ {}", e.user_friendly_message()),
            },
        }
    }

    Ok(())
}

async fn export(
    cli: &Cli,
    config: &InsightConfig,
    workbook: &Path,
    output: Option<String>,
    with_ai: bool,
) -> Result<()> {
    let export_config = ExportConfig {
        workbook_path: workbook.display().to_string(),
        output_path: output.unwrap_or_else(|| config.report.output_path.clone()),
        bundle_name: config.report.bundle_name.clone(),
        currency_symbol: config.report.currency_symbol.clone(),
    };
    export_config.validate()?;

    let monitor_enabled = cli.monitor || config.monitoring.enabled;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(".".to_string());
    let mut pipeline = ReportPipeline::new(storage, export_config, config.alerts.clone());
    if with_ai {
        let generator: Box<dyn TextGenerator> = Box::new(gemini_client(cli, config)?);
        pipeline = pipeline.with_ai(ai_engine(config, generator)?);
    }

    let engine = InsightEngine::new_with_monitoring(pipeline, monitor_enabled);
    let output_path = engine.run().await?;

    if let Some(ai) = engine.into_pipeline().into_ai_engine() {
        save_vector_store(config, ai.vector_store())?;
    }

    tracing::info!("✅ Export completed successfully!");
    println!("✅ Export completed successfully!");
    println!("📁 Output saved to: {}", output_path);
    Ok(())
}

fn index_stats(config: &InsightConfig) -> Result<()> {
    let Some(path) = &config.index.path else {
        println!("No index path configured ([index].path); snapshots are not persisted.");
        return Ok(());
    };

    let store = load_vector_store(config)?;
    let stats = store.stats();
    println!("Index:        {}", path);
    println!("Snapshots:    {}", stats.total_vectors);
    println!("Dimension:    {}", stats.dimension);
    println!("Index size:   {}", stats.index_size);
    Ok(())
}

async fn check(cli: &Cli, config: &InsightConfig) -> Result<()> {
    let client = gemini_client(cli, config)?;
    let reply = client.verify().await?;
    let preview: String = reply.chars().take(80).collect();
    println!("✅ {} ({}) is reachable: {}", client.provider(), client.model(), preview.trim());
    Ok(())
}
