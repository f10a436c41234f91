//! CLI wiring for strata-simple.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use strata_abi::{Token, Tokenizer};
use strata_core::format::{
    PromptKind, PromptStrategy, passkey_prompt, random_passkey, select_prompt,
};
use strata_core::reference::{ByteTokenizer, ReferenceEngine};
use strata_core::{
    GenerateError, GenerationConfig, GenerationLoop, GenerationOutput, Utf8Stream, load_token_file,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "strata-simple",
    about = "Generate from one prompt against the built-in reference engine"
)]
pub struct Cli {
    /// Prompt text (wrapped by --template before tokenization).
    #[arg(long, conflicts_with_all = ["tokens_file", "passkey_junk"])]
    pub prompt: Option<String>,

    /// Pre-tokenized prompt: one token id per line.
    #[arg(long, conflicts_with = "passkey_junk")]
    pub tokens_file: Option<PathBuf>,

    /// Build a pass-key retrieval prompt with this many filler blocks.
    #[arg(long)]
    pub passkey_junk: Option<usize>,

    /// Filler block in front of which the pass key is inserted.
    #[arg(long, default_value_t = 333)]
    pub passkey_pos: usize,

    #[arg(long, value_enum, default_value = "phi3")]
    pub template: TemplateArg,

    #[arg(long)]
    pub system: Option<String>,

    /// JSON file with a `GenerationConfig`; flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Total length of the sequence including the prompt.
    #[arg(long)]
    pub n_len: Option<usize>,

    /// KV cache capacity.
    #[arg(long)]
    pub n_ctx: Option<usize>,

    #[arg(long)]
    pub n_threads: Option<usize>,

    #[arg(long)]
    pub batch_capacity: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub greedy: bool,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub top_k: Option<u32>,

    #[arg(long)]
    pub top_p: Option<f32>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the prompt piece by piece before generating.
    #[arg(long, default_value_t = false)]
    pub echo_prompt: bool,

    /// Reference engine step between consecutive token ids.
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    pub stride: i32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateArg {
    Phi3,
    Chatml,
    Plain,
}

impl Cli {
    /// Base config (file or defaults) with command-line overrides applied.
    pub fn build_config(&self) -> Result<GenerationConfig> {
        let mut cfg = match &self.config {
            Some(path) => GenerationConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => GenerationConfig::default(),
        };

        if let Some(n) = self.n_len {
            cfg.n_len = n;
        }
        if let Some(n) = self.n_ctx {
            cfg.n_ctx = n;
        }
        if let Some(n) = self.n_threads {
            cfg.n_threads = n;
        }
        if let Some(n) = self.batch_capacity {
            cfg.batch_capacity = Some(n);
        }

        let s = &mut cfg.sampling;
        if self.temperature.is_some() {
            s.greedy = false;
            s.temperature = self.temperature;
        }
        if self.top_k.is_some() {
            s.top_k = self.top_k;
        }
        if self.top_p.is_some() {
            s.top_p = self.top_p;
        }
        if let Some(seed) = self.seed {
            s.seed = seed;
        }
        if self.greedy {
            s.greedy = true;
        }

        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }

    fn prompt_kind(&self) -> PromptKind {
        let system = self.system.clone();
        match self.template {
            TemplateArg::Phi3 => PromptKind::Phi3 { system },
            TemplateArg::Chatml => PromptKind::ChatMl { system },
            TemplateArg::Plain => PromptKind::Plain,
        }
    }

    /// Raw user text: explicit prompt, or a pass-key prompt (10 filler blocks by default).
    fn user_text(&self, seed: u64) -> String {
        if let Some(p) = &self.prompt {
            return p.clone();
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let key = random_passkey(&mut rng);
        let pk = passkey_prompt(self.passkey_junk.unwrap_or(10), self.passkey_pos, key);
        info!(
            "🔑 passkey = {} (inserted: {}, {} chars)",
            pk.passkey,
            pk.contains_key,
            pk.text.len()
        );
        pk.text
    }
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = cli.build_config()?;
    let tokenizer = ByteTokenizer::default();
    let mut engine = ReferenceEngine::new(config.n_ctx)
        .with_threads(config.n_threads)
        .with_stride(cli.stride);
    info!(
        "⚙️ reference engine: n_ctx = {}, n_vocab = {}, n_threads = {}",
        config.n_ctx,
        ByteTokenizer::N_VOCAB,
        engine.n_threads()
    );

    let out = match &cli.tokens_file {
        Some(path) => {
            let prompt = load_token_file(path)
                .with_context(|| format!("reading tokens from {}", path.display()))?;
            if cli.echo_prompt {
                echo_prompt(&tokenizer, &prompt, &mut io::stderr().lock())?;
            }
            generate_from_tokens(&mut engine, &config, &tokenizer, &prompt)?
        }
        None => {
            let user_text = cli.user_text(config.sampling.seed);
            let formatted = select_prompt(cli.prompt_kind()).format(&user_text);
            if cli.echo_prompt {
                let prompt = tokenizer.tokenize(&formatted)?;
                echo_prompt(&tokenizer, &prompt, &mut io::stderr().lock())?;
            }
            let mut stdout = io::stdout().lock();
            GenerationLoop::new(&mut engine, &config)
                .run_text(&tokenizer, &formatted, |delta| {
                    stdout.write_all(delta.as_bytes())?;
                    stdout.flush()?;
                    Ok(())
                })
                .context("generation failed")?
        }
    };

    println!();
    report(&out);
    Ok(())
}

fn generate_from_tokens(
    engine: &mut ReferenceEngine,
    config: &GenerationConfig,
    tokenizer: &ByteTokenizer,
    prompt: &[Token],
) -> Result<GenerationOutput> {
    if prompt.is_empty() {
        bail!("token file is empty");
    }
    let mut stream = Utf8Stream::new();
    let mut stdout = io::stdout().lock();
    let out = GenerationLoop::new(engine, config)
        .run_streaming(prompt, |token| {
            let bytes = tokenizer
                .token_to_bytes(token)
                .map_err(GenerateError::Detokenize)?;
            if let Some(delta) = stream.push(&bytes) {
                stdout.write_all(delta.as_bytes())?;
                stdout.flush()?;
            }
            Ok(())
        })
        .context("generation failed")?;
    if let Some(rest) = stream.finish() {
        stdout.write_all(rest.as_bytes())?;
        stdout.flush()?;
    }
    Ok(out)
}

/// Print the prompt piece by piece. Ids the tokenizer cannot render are
/// shown as `[id]`.
fn echo_prompt<T, W>(tokenizer: &T, prompt: &[Token], out: &mut W) -> Result<()>
where
    T: Tokenizer,
    W: Write,
{
    writeln!(out)?;
    for &token in prompt {
        match tokenizer.token_to_piece(token) {
            Ok(piece) => write!(out, "{piece}")?,
            Err(_) => write!(out, "[{token}]")?,
        }
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn report(out: &GenerationOutput) {
    eprintln!(
        "decoded {} tokens in {:.2} s, speed: {:.2} t/s (prompt {} tokens, total {}, stop: {:?})",
        out.n_decode,
        out.elapsed.as_secs_f64(),
        out.tokens_per_second(),
        out.n_prompt(),
        out.sequence.len(),
        out.stop_reason
    );
}
