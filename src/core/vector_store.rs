use crate::core::report::{format_grouped, format_percentage, herfindahl};
use crate::domain::model::ProcessedPortfolio;
use crate::utils::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DIMENSION: usize = 384;
const TOP_SECTOR_FEATURES: usize = 5;

/// Brute-force inner-product index. Ids are insertion positions.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector)?;
        self.vectors.push(vector.to_vec());
        Ok(self.vectors.len() - 1)
    }

    /// Returns up to `k` (id, score) pairs, best first. Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        self.check_dimension(query)?;

        let mut scores: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (id, inner_product(query, v)))
            .collect();
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(k);

        Ok(scores)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(InsightError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub timestamp: String,
    pub data_summary: String,
    pub portfolio_name: String,
    pub total_return: f64,
    pub volatility: f64,
    pub risk_level: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarSnapshot {
    pub similarity_score: f32,
    pub metadata: SnapshotMetadata,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorStoreStats {
    pub total_vectors: usize,
    pub dimension: usize,
    pub is_trained: bool,
    pub index_size: usize,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    embedding: Vec<f32>,
    metadata: SnapshotMetadata,
}

#[derive(Serialize, Deserialize)]
struct StoredIndex {
    dimension: usize,
    entries: Vec<StoredEntry>,
}

/// Portfolio snapshots embedded as hand-crafted feature vectors.
#[derive(Debug, Clone)]
pub struct PortfolioVectorStore {
    index: FlatIndex,
    embeddings: Vec<Vec<f32>>,
    metadata: Vec<SnapshotMetadata>,
}

impl Default for PortfolioVectorStore {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl PortfolioVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            embeddings: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Feature vector: portfolio, performance, risk, top sector weights and sector
    /// Herfindahl index, zero-padded (or truncated) to the store dimension.
    ///
    /// Exactly five sector-weight slots are always emitted (missing sectors are 0.0),
    /// so the Herfindahl index sits at a fixed position regardless of how many
    /// sectors the portfolio holds.
    pub fn embed(&self, portfolio: &ProcessedPortfolio) -> Vec<f32> {
        let p = &portfolio.portfolio_summary;
        let perf = &portfolio.performance_summary;
        let risk = &portfolio.risk_summary;

        let mut features: Vec<f64> = vec![
            p.total_aum / 1e9,
            p.target_return,
            p.total_holdings as f64 / 100.0,
            perf.total_return,
            perf.daily_return,
            perf.volatility,
            perf.sharpe_ratio,
            perf.max_drawdown,
            perf.active_return,
            risk.portfolio_beta,
            risk.var_95 / 1e6,
            risk.tracking_error,
            risk.correlation_benchmark,
            risk.concentration_risk,
            risk.liquidity_score / 10.0,
        ];

        let sectors = &portfolio.sector_allocation;
        let total: f64 = sectors.iter().map(|s| s.market_value).sum();
        // sector_allocation is already sorted descending
        for i in 0..TOP_SECTOR_FEATURES {
            let weight = match sectors.get(i) {
                Some(s) if total > 0.0 => s.market_value / total,
                _ => 0.0,
            };
            features.push(weight);
        }
        features.push(herfindahl(sectors.iter().map(|s| s.market_value)).unwrap_or(0.0));

        let mut vector: Vec<f32> = features
            .into_iter()
            .map(|f| if f.is_finite() { f as f32 } else { 0.0 })
            .collect();
        vector.resize(self.dimension(), 0.0);
        vector
    }

    pub fn add_snapshot(
        &mut self,
        portfolio: &ProcessedPortfolio,
        timestamp: Option<String>,
    ) -> Result<usize> {
        let embedding = self.embed(portfolio);
        let metadata = SnapshotMetadata {
            timestamp: timestamp.unwrap_or_else(|| chrono::Local::now().to_rfc3339()),
            data_summary: data_summary(portfolio),
            portfolio_name: portfolio.portfolio_summary.fund_name.clone(),
            total_return: portfolio.performance_summary.total_return,
            volatility: portfolio.performance_summary.volatility,
            risk_level: portfolio.portfolio_summary.risk_level.clone(),
        };

        let id = self.index.add(&embedding)?;
        self.embeddings.push(embedding);
        self.metadata.push(metadata);

        tracing::info!("Added portfolio snapshot with ID: {}", id);
        Ok(id)
    }

    pub fn search_similar(
        &self,
        portfolio: &ProcessedPortfolio,
        k: usize,
    ) -> Result<Vec<SimilarSnapshot>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embed(portfolio);
        let hits = self.index.search(&query, k.min(self.index.len()))?;

        Ok(hits
            .into_iter()
            .enumerate()
            .filter_map(|(i, (id, score))| {
                self.metadata.get(id).map(|m| SimilarSnapshot {
                    similarity_score: score,
                    metadata: m.clone(),
                    rank: i + 1,
                })
            })
            .collect())
    }

    /// Context block for a prompt: current summary, similar periods and a topic section
    /// picked from keywords in the query.
    pub fn context_for_query(&self, query: &str, portfolio: &ProcessedPortfolio) -> String {
        let similar = match self.search_similar(portfolio, 2) {
            Ok(similar) => similar,
            Err(e) => {
                tracing::error!("Error searching similar portfolios: {}", e);
                Vec::new()
            }
        };

        let mut parts = vec!["CURRENT PORTFOLIO:".to_string(), data_summary(portfolio)];

        if !similar.is_empty() {
            parts.push("\nSIMILAR HISTORICAL PERIODS:".to_string());
            for result in &similar {
                parts.push(format!(
                    "- {} (Similarity: {:.3})",
                    result.metadata.data_summary, result.similarity_score
                ));
            }
        }

        let query_lower = query.to_lowercase();
        if query_lower.contains("risk") {
            let risk = &portfolio.risk_summary;
            parts.push("\nRISK CONTEXT:".to_string());
            parts.push(format!(
                "Beta: {:.2}, VaR: {}",
                risk.portfolio_beta,
                format_grouped(risk.var_95, 0)
            ));
            parts.push(format!("Tracking Error: {:.3}", risk.tracking_error));
        } else if query_lower.contains("performance") || query_lower.contains("return") {
            let perf = &portfolio.performance_summary;
            parts.push("\nPERFORMANCE CONTEXT:".to_string());
            parts.push(format!("Total Return: {}", format_percentage(perf.total_return, 2)));
            parts.push(format!("Volatility: {}", format_percentage(perf.volatility, 2)));
            parts.push(format!("Sharpe Ratio: {:.2}", perf.sharpe_ratio));
        } else if query_lower.contains("holding") || query_lower.contains("sector") {
            parts.push("\nHOLDINGS CONTEXT:".to_string());
            for h in portfolio.top_holdings.iter().take(3) {
                parts.push(format!(
                    "- {}: {}",
                    h.asset_name,
                    format_percentage(h.weight_percent, 1)
                ));
            }
        }

        parts.join("\n")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let stored = StoredIndex {
            dimension: self.dimension(),
            entries: self
                .embeddings
                .iter()
                .zip(&self.metadata)
                .map(|(embedding, metadata)| StoredEntry {
                    embedding: embedding.clone(),
                    metadata: metadata.clone(),
                })
                .collect(),
        };

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, serde_json::to_vec_pretty(&stored)?)?;

        tracing::info!("Saved vector store to {}", path.as_ref().display());
        Ok(())
    }

    /// Replace the contents with a saved index. Returns `false` when no file exists.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }

        let stored: StoredIndex = serde_json::from_slice(&std::fs::read(path)?)?;
        let mut index = FlatIndex::new(stored.dimension);
        let mut embeddings = Vec::with_capacity(stored.entries.len());
        let mut metadata = Vec::with_capacity(stored.entries.len());

        for entry in stored.entries {
            index.add(&entry.embedding)?;
            embeddings.push(entry.embedding);
            metadata.push(entry.metadata);
        }

        self.index = index;
        self.embeddings = embeddings;
        self.metadata = metadata;

        tracing::info!(
            "Loaded vector store from {} ({} vectors)",
            path.display(),
            self.embeddings.len()
        );
        Ok(true)
    }

    pub fn stats(&self) -> VectorStoreStats {
        VectorStoreStats {
            total_vectors: self.embeddings.len(),
            dimension: self.dimension(),
            is_trained: !self.embeddings.is_empty(),
            index_size: self.index.len(),
        }
    }
}

/// One-line snapshot description stored alongside each vector.
pub fn data_summary(portfolio: &ProcessedPortfolio) -> String {
    let p = &portfolio.portfolio_summary;
    let perf = &portfolio.performance_summary;
    let risk = &portfolio.risk_summary;

    [
        format!("Portfolio: {}", p.fund_name),
        format!("AUM: {}", format_grouped(p.total_aum, 0)),
        format!("Risk Level: {}", p.risk_level),
        format!("Return: {}", format_percentage(perf.total_return, 2)),
        format!("Volatility: {}", format_percentage(perf.volatility, 2)),
        format!("Sharpe: {:.2}", perf.sharpe_ratio),
        format!("Beta: {:.2}", risk.portfolio_beta),
        format!("VaR: {}", format_grouped(risk.var_95, 0)),
    ]
    .join(" | ")
}
