//! Init command implementation
//!
//! Writes a starter `quire.toml`, a `.env.example` and the `data/` directory
//! the default paths point at.

use super::output::{Output, Tone};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// quire.toml already exists and `force` was not given
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.heading(&format!("Initializing {}", config.path.display()));

    let base_path = &config.path;
    let config_path = base_path.join("quire.toml");
    if config_path.exists() && !config.force {
        output.line(Tone::Warn, "quire.toml already exists; pass --force to overwrite");
        return InitResult::AlreadyExists;
    }

    let data_dir = base_path.join("data");
    if let Err(e) = fs::create_dir_all(&data_dir) {
        output.line(Tone::Fail, &format!("cannot create data/: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.line(Tone::Ok, "data/");

    for (name, contents) in [("quire.toml", QUIRE_TOML), (".env.example", ENV_EXAMPLE)] {
        if let Err(e) = write_file(&base_path.join(name), contents, config.force) {
            output.line(Tone::Fail, &format!("cannot write {}: {}", name, e));
            return InitResult::Error(e.to_string());
        }
        output.line(Tone::Ok, name);
    }

    output.heading("Next steps");
    output.line(Tone::Note, "copy the credentials template and fill it in");
    output.shell("cp .env.example .env");
    output.line(Tone::Note, "place the document at data/document.txt (form feeds split pages)");
    output.line(Tone::Note, "build the index, then serve it");
    output.shell("quire-server index");
    output.shell("quire-server");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

const QUIRE_TOML: &str = r#"# quire configuration
# Generated by: quire-server init
#
# Credentials are read from the environment variables named below
# (a .env file in the working directory is loaded automatically).

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"
log_format = "pretty"          # or "json"
request_timeout_secs = 60      # time box for each embedding/generation call
max_body_bytes = 65536

[llm]
type = "openai"                # "openai" | "ollama"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
model = "gpt-3.5-turbo"
temperature = 0.7

# [llm]
# type = "ollama"
# base_url = "http://localhost:11434"
# model = "llama3.2"

[embeddings]
type = "openai"                # "openai" | "ollama" | "fastembed"
api_key_env = "OPENAI_API_KEY"
model = "text-embedding-ada-002"
dimensions = 1536
batch_size = 64
concurrency = 2

[rag]
document_path = "data/document.txt"
index_path = "data/index"
chunk_size = 1000
chunk_overlap = 200
top_k = 4
metric = "cosine"              # "cosine" | "euclidean" | "dot_product"

[answer]
max_history_turns = 20         # 0 = send the whole conversation
history_policy = "lenient"     # "lenient" drops malformed turns, "strict" rejects them
"#;

const ENV_EXAMPLE: &str = "# Copy to .env and fill in\nOPENAI_API_KEY=\n";
