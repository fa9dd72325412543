//! Ask command

use crate::app::{AskArgs, OutputFormat};
use crate::output::{json, terminal};
use anyhow::Result;
use citerag_core::error::status_kind;
use citerag_core::protocol::{DecodeEvent, StreamDecoder};
use citerag_core::query::{AnswerBody, Citation, ConversationTurn, Delivery, QueryPipeline};
use citerag_core::{CiteRagError, Config, ProviderError};
use futures::StreamExt;
use serde::Deserialize;
use std::io::Write;
use termcolor::{ColorChoice, StandardStream};

const SERVER: &str = "server";

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let question = args.question_text();
    if question.trim().is_empty() {
        return Err(CiteRagError::Validation("The question is empty".to_string()).into());
    }

    // JSON output needs the whole answer before anything is printed
    let stream = !args.no_stream && format == OutputFormat::Cli;

    match args.remote.as_deref() {
        Some(url) => ask_remote(url, &question, stream, format).await,
        None => ask_local(config, &question, stream, format).await,
    }
}

async fn ask_local(config: &Config, question: &str, stream: bool, format: OutputFormat) -> Result<()> {
    let pipeline = QueryPipeline::from_config(config)?;
    let delivery = if stream {
        Delivery::Streaming
    } else {
        Delivery::Blocking
    };

    let answer = pipeline
        .answer_query(&[ConversationTurn::user(question)], delivery)
        .await?;

    match answer.body {
        AnswerBody::Text(text) => print_answer(&text, &answer.citations, format),
        AnswerBody::Stream(mut deltas) => {
            let mut out = StandardStream::stdout(ColorChoice::Auto);
            terminal::write_citations(&mut out, &answer.citations)?;
            while let Some(delta) = deltas.next().await {
                match delta {
                    Ok(text) => {
                        write!(out, "{}", text)?;
                        out.flush()?;
                    }
                    Err(e) => {
                        writeln!(out)?;
                        return Err(CiteRagError::Generation(e).into());
                    }
                }
            }
            writeln!(out)?;
            Ok(())
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteAnswer {
    answer: String,
    #[serde(default)]
    citations: Vec<Citation>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    error: String,
}

async fn ask_remote(base_url: &str, question: &str, stream: bool, format: OutputFormat) -> Result<()> {
    let url = format!("{}/api/query", base_url.trim_end_matches('/'));
    tracing::debug!("Asking {} (stream: {})", url, stream);

    let response = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "query": question, "stream": stream }))
        .send()
        .await
        .map_err(|e| CiteRagError::Provider(ProviderError::from_reqwest(SERVER, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RemoteError>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        let err = ProviderError::new(SERVER, status_kind(status.as_u16()), message);
        return Err(CiteRagError::Provider(err).into());
    }

    if !stream {
        let answer: RemoteAnswer = response
            .json()
            .await
            .map_err(|e| CiteRagError::Provider(ProviderError::from_reqwest(SERVER, e)))?;
        return print_answer(&answer.answer, &answer.citations, format);
    }

    let mut out = StandardStream::stdout(ColorChoice::Auto);
    let mut decoder = StreamDecoder::new();
    let mut chunks = response.bytes_stream();

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!("Response stream ended early: {}", e);
                if decoder.has_citations() {
                    writeln!(out)?;
                    eprintln!("warning: connection closed early, the answer may be incomplete");
                }
                break;
            }
        };
        for event in decoder.feed(&chunk)? {
            write_event(&mut out, event)?;
        }
    }

    if let Some(event) = decoder.finish()? {
        write_event(&mut out, event)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_event(out: &mut StandardStream, event: DecodeEvent) -> Result<()> {
    match event {
        DecodeEvent::Citations { citations, .. } => terminal::write_citations(out, &citations)?,
        DecodeEvent::Text(text) => {
            write!(out, "{}", text)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn print_answer(answer: &str, citations: &[Citation], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print!("{}", json::format_answer(answer, citations)),
        OutputFormat::Cli => {
            let mut out = StandardStream::stdout(ColorChoice::Auto);
            terminal::write_citations(&mut out, citations)?;
            writeln!(out, "{}", answer)?;
        }
    }
    Ok(())
}
