use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use vrd_rag::{ChunkStrategy, RagConfig};

#[derive(Debug, Parser)]
#[command(
    name = "vrd",
    about = "Check planned roads and utilities changes against ICPE regulatory documents",
    version
)]
pub struct Cli {
    /// JSON configuration file (fields left out keep their defaults)
    #[arg(long, global = true, env = "VRD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Analysis backend
    #[arg(long, global = true, value_enum, default_value_t = Mode::Offline, env = "VRD_MODE")]
    pub mode: Mode,

    #[command(flatten)]
    pub api: ApiArgs,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Local hashing embedder and a canned demo answer; no network access
    Offline,
    /// OpenAI embeddings and chat completions (needs OPENAI_API_KEY)
    Openai,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer one question about a document
    Analyze(AnalyzeArgs),
    /// Ask successive questions about the same document
    Chat(ChatArgs),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Regulatory document (plain text)
    pub document: PathBuf,

    /// Description of the planned change
    #[arg(short, long)]
    pub query: String,

    /// Write a Markdown report of the answer to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print the beginning of the document before analyzing it
    #[arg(long)]
    pub preview: bool,

    #[command(flatten)]
    pub tuning: Tuning,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Regulatory document (plain text)
    pub document: PathBuf,

    #[command(flatten)]
    pub tuning: Tuning,
}

/// Hosted-API settings, only read in `openai` mode.
#[derive(Debug, Args)]
pub struct ApiArgs {
    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub api_base: Option<String>,

    /// Embedding model
    #[arg(long, global = true, env = "VRD_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Chat model
    #[arg(long, global = true, env = "VRD_CHAT_MODEL")]
    pub chat_model: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Fixed,
    Recursive,
}

impl From<StrategyArg> for ChunkStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Fixed => ChunkStrategy::Fixed,
            StrategyArg::Recursive => ChunkStrategy::Recursive,
        }
    }
}

/// Flag overrides applied on top of the configuration file.
#[derive(Debug, Default, Args)]
pub struct Tuning {
    /// Chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Overlap between consecutive chunks in characters
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Chunking strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Number of passages retrieved per question
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum similarity for a passage to be kept
    #[arg(long, allow_negative_numbers = true)]
    pub min_score: Option<f32>,

    /// Upper bound on generated tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Generator timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Tuning {
    pub fn apply(&self, config: &mut RagConfig) {
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunk_overlap = overlap;
        }
        if let Some(strategy) = self.strategy {
            config.chunk_strategy = strategy.into();
        }
        if let Some(k) = self.top_k {
            config.top_k = k;
        }
        if let Some(threshold) = self.min_score {
            config.min_score = threshold;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.generation.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.generation.temperature = temperature;
        }
        if let Some(secs) = self.timeout {
            config.generation_timeout_secs = secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let cli = Cli::parse_from([
            "vrd",
            "analyze",
            "arrete.txt",
            "--query",
            "nouveau parking",
            "--chunk-size",
            "512",
            "--strategy",
            "recursive",
            "-k",
            "3",
            "--min-score",
            "0.3",
        ]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let mut config = RagConfig::default();
        args.tuning.apply(&mut config);
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 80);
        assert_eq!(config.chunk_strategy, ChunkStrategy::Recursive);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.min_score, 0.3);
        assert_eq!(cli.mode, Mode::Offline);
    }
}
