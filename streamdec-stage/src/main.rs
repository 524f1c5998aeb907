use anyhow::Context;
use bytes::{Bytes, BytesMut};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use streamdec_stage::config::{AppConfig, STDIO_PATH};
use streamdec_stage::{StageEvent, StreamStage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,streamdec_stage=debug", env!("CARGO_BIN_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::parse()?;
    tracing::debug!(?config, "Loaded config");

    let input = open_input(&config.input.path)?;
    let output = open_output(&config.output.path)?;
    let caps = config.input.caps();

    let mut stage: StreamStage<_> = StreamStage::new(
        output,
        config.stage.policy()?,
        Box::new(|event: StageEvent| match event {
            StageEvent::Eos => tracing::info!("End of stream"),
            StageEvent::Error(message) => tracing::error!(?message, "Stream error"),
        }),
    );

    tracing::info!(%caps, chunk_bytes = config.input.chunk_bytes, "Streaming input");
    pump(input, config.input.chunk_bytes, |chunk| {
        stage
            .handle_buffer(Some(&caps), &chunk)
            .context("Failed to process buffer")
    })?;

    let stats = stage.stats();
    let target_rate = stage.target_rate();
    stage.end_of_stream().context("Failed to finish stream")?;
    tracing::info!(bytes = stats, ?target_rate, "Finished streaming");
    Ok(())
}

/// Reads `input` to its end in chunks of at most `chunk_bytes`.
fn pump(
    mut input: impl Read,
    chunk_bytes: usize,
    mut handle: impl FnMut(Bytes) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    loop {
        let mut chunk = BytesMut::zeroed(chunk_bytes);
        let read = match input.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("Failed to read input"),
        };
        chunk.truncate(read);
        handle(chunk.freeze())?;
    }
}

fn open_input(path: &str) -> anyhow::Result<Box<dyn Read>> {
    if path == STDIO_PATH {
        return Ok(Box::new(std::io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Failed to open input {path}"))?;
    Ok(Box::new(file))
}

fn open_output(path: &str) -> anyhow::Result<BufWriter<Box<dyn Write>>> {
    let sink: Box<dyn Write> = if path == STDIO_PATH {
        Box::new(std::io::stdout().lock())
    } else {
        Box::new(File::create(path).with_context(|| format!("Failed to create output {path}"))?)
    };
    Ok(BufWriter::new(sink))
}
