use clap::Parser;
use std::path::PathBuf;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "ollama-archivist")]
#[command(about = "Ollama front end that archives every generated answer to disk")]
pub struct Args {
    /// Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Ollama servers, comma-separated (e.g. "localhost:11434,localhost:11435")
    #[arg(short, long, default_value = "localhost:11434")]
    pub backends: String,

    /// Model used for every request
    #[arg(short, long, env = "OLLAMA_MODEL", default_value = "deepseek-r1")]
    pub model: String,

    /// Where generated responses are written
    #[arg(short, long, env = "AI_CONTENT_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Backend health check interval in seconds
    #[arg(long, default_value_t = 30)]
    pub health_interval: u64,
}

impl Args {
    pub fn storage_root(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(default_storage_root)
    }
}

#[cfg(windows)]
pub fn default_storage_root() -> PathBuf {
    PathBuf::from(r"D:\AI-Generate-Content")
}

#[cfg(not(windows))]
pub fn default_storage_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ai-generate-content")
}
