//! `vrd` - command-line front-end for the ICPE / VRD regulatory analyzer.
//!
//! # Commands
//!
//! ```bash
//! # Answer one question, offline demo backends
//! vrd analyze arrete.txt --query "Création d'un parking de 40 places"
//!
//! # Hosted backends, with a Markdown report
//! OPENAI_API_KEY=... vrd --mode openai analyze arrete.txt -q "..." --report rapport.md
//!
//! # Several questions against the same indexed document
//! vrd chat arrete.txt
//! ```

mod cli;
mod output;

use std::future::Future;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vrd_rag::{
    AnswerPipeline, CannedGenerator, Embedder, Generator, HashingEmbedder, RagConfig, Session,
};

use crate::cli::{AnalyzeArgs, ApiArgs, ChatArgs, Cli, Command, Mode, Tuning};

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn,vrd=info,vrd_rag=info",
        1 => "info,vrd=debug,vrd_rag=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_config(path: Option<&Path>, tuning: &Tuning) -> Result<RagConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => RagConfig::default(),
    };
    tuning.apply(&mut config);
    config.validate()?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// The embedder and generator for one analysis mode.
struct Backends {
    embedder: Arc<dyn Embedder>,
    generator: Box<dyn Generator>,
}

fn backends(mode: Mode, api: &ApiArgs) -> Result<Backends> {
    match mode {
        Mode::Offline => Ok(Backends {
            embedder: Arc::new(HashingEmbedder::default()),
            generator: Box::new(CannedGenerator::demo()),
        }),
        Mode::Openai => openai_backends(api),
    }
}

#[cfg(feature = "openai")]
fn openai_backends(api: &ApiArgs) -> Result<Backends> {
    use vrd_rag::{OpenAIChatGenerator, OpenAIEmbedder};

    let mut embedder = OpenAIEmbedder::from_env()?;
    let mut generator = OpenAIChatGenerator::from_env()?;
    if let Some(base) = &api.api_base {
        embedder = embedder.with_base_url(base.as_str());
        generator = generator.with_base_url(base.as_str());
    }
    if let Some(model) = &api.embedding_model {
        embedder = embedder.with_model(model.as_str());
    }
    if let Some(model) = &api.chat_model {
        generator = generator.with_model(model.as_str());
    }
    Ok(Backends { embedder: Arc::new(embedder), generator: Box::new(generator) })
}

#[cfg(not(feature = "openai"))]
fn openai_backends(_api: &ApiArgs) -> Result<Backends> {
    bail!("this build of vrd has no hosted-API support; rebuild with the `openai` feature")
}

fn read_document(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("{} contains no text to analyze", path.display());
    }
    Ok(text)
}

/// Await `task`, ticking an elapsed-time line on stderr while it runs.
async fn with_progress<F: Future>(label: &str, task: F) -> F::Output {
    if !std::io::stderr().is_terminal() {
        return task.await;
    }

    tokio::pin!(task);
    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    ticker.tick().await;
    let mut ticked = false;
    loop {
        tokio::select! {
            output = &mut task => {
                if ticked {
                    eprint!("\r\x1b[2K");
                }
                return output;
            }
            _ = ticker.tick() => {
                ticked = true;
                eprint!("\r{label}... {:.1}s", started.elapsed().as_secs_f32());
            }
        }
    }
}

async fn analyze(
    pipeline: &AnswerPipeline,
    generator: &dyn Generator,
    args: AnalyzeArgs,
) -> Result<()> {
    if args.query.trim().is_empty() {
        bail!("describe the planned change with --query");
    }
    let text = read_document(&args.document)?;
    if args.preview {
        println!("{}\n", output::preview(&text, output::PREVIEW_CHARS));
    }

    let session = Session::new();
    let answer =
        with_progress("Analyzing", pipeline.answer(&session, &text, &args.query, generator))
            .await?;
    print!("{}", output::render_answer(&answer));

    if let Some(path) = &args.report {
        output::write_report(path, &answer)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

async fn chat(pipeline: &AnswerPipeline, generator: &dyn Generator, args: ChatArgs) -> Result<()> {
    let text = read_document(&args.document)?;
    let session = Session::new();
    let document = with_progress("Indexing", pipeline.ingest(&session, &text)).await?;
    println!(
        "Indexed {} ({} passages). Describe a planned change, `/report <file>` to export \
         the last answer, Ctrl-D to quit.",
        args.document.display(),
        document.chunks().len()
    );

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("vrd> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        if let Some(path) = line.strip_prefix("/report") {
            let last = session.last_answer().await;
            match output::export_last_answer(path.trim(), last.as_ref()) {
                Ok(message) => println!("{message}"),
                Err(e) => eprintln!("error: {e:#}"),
            }
            continue;
        }

        match with_progress("Analyzing", pipeline.ask(&session, line, generator)).await {
            Ok(answer) => println!("{}", output::render_answer(&answer)),
            Err(e) if e.is_recoverable() => eprintln!("error: {e}"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let tuning = match &cli.command {
        Command::Analyze(args) => &args.tuning,
        Command::Chat(args) => &args.tuning,
    };
    let config = load_config(cli.config.as_deref(), tuning)?;
    let Backends { embedder, generator } = backends(cli.mode, &cli.api)?;
    info!(
        mode = ?cli.mode,
        embedder = embedder.name(),
        generator = generator.name(),
        "backends ready"
    );

    let pipeline = AnswerPipeline::builder().config(config).embedder(embedder).build()?;

    match cli.command {
        Command::Analyze(args) => analyze(&pipeline, generator.as_ref(), args).await,
        Command::Chat(args) => chat(&pipeline, generator.as_ref(), args).await,
    }
}
