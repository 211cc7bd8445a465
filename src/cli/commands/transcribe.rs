//! Transcribe, summarize and ask commands.

use std::path::Path;

use console::style;

use crate::cli::icons::{arrow, success};
use crate::config::Config;
use crate::services::TranscriberService;

/// Print the session's token and cost totals to stderr.
async fn print_cost(service: &TranscriberService, session_id: &str) {
    if let Some(summary) = service.costs().summary(session_id).await {
        eprintln!(
            "  {} {} tokens, ${:.6}",
            style("→").dim(),
            summary.total_tokens,
            summary.total_cost
        );
    }
}

async fn read_transcript(file: &Path) -> anyhow::Result<String> {
    let transcript = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;
    if transcript.trim().is_empty() {
        anyhow::bail!("Transcript {} is empty", file.display());
    }
    Ok(transcript)
}

/// Transcribe an audio file.
pub async fn cmd_transcribe(
    config: &Config,
    file: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let service = TranscriberService::from_config(config)?;
    let session_id = uuid::Uuid::new_v4().to_string();

    eprintln!("{} Transcribing {}", arrow(), file.display());
    let transcript = service.transcribe_file(file, Some(&session_id)).await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &transcript).await?;
            eprintln!("{} Transcript written to {}", success(), path.display());
        }
        None => println!("{}", transcript),
    }
    print_cost(&service, &session_id).await;

    Ok(())
}

/// Summarize a transcript file.
pub async fn cmd_summarize(config: &Config, file: &Path) -> anyhow::Result<()> {
    let transcript = read_transcript(file).await?;
    let service = TranscriberService::from_config(config)?;
    let session_id = uuid::Uuid::new_v4().to_string();

    eprintln!("{} Summarizing {}", arrow(), file.display());
    let summary = service.summarize(&transcript, Some(&session_id)).await?;
    println!("{}", summary);
    print_cost(&service, &session_id).await;

    Ok(())
}

/// Answer a question about a transcript file.
pub async fn cmd_ask(config: &Config, file: &Path, question: &str) -> anyhow::Result<()> {
    let transcript = read_transcript(file).await?;
    let service = TranscriberService::from_config(config)?;
    let session_id = uuid::Uuid::new_v4().to_string();

    let answer = service
        .ask(&transcript, question, Some(&session_id))
        .await?;
    println!("{}", answer);
    print_cost(&service, &session_id).await;

    Ok(())
}
