use crate::config::AppConfig;
use amf0::{Amf0Heap, Amf0Marker};
use anyhow::{Context, Result, bail};
use bytearray::{ByteStream, CompressionAlgorithm, StreamConfig};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

const PREVIEW_LEN: usize = 16;

pub struct CommandExecutor {
    config: AppConfig,
    stream_config: StreamConfig,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Result<Self> {
        let stream_config = config.stream_config()?;
        Ok(Self {
            config,
            stream_config,
        })
    }

    fn load(&self, path: &Path) -> Result<ByteStream> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        debug!(path = %path.display(), len = bytes.len(), "loaded input");
        Ok(ByteStream::from_bytes_with_config(bytes, &self.stream_config))
    }

    /// Decode AMF0 values starting at `offset` and render them as JSON.
    pub fn decode(
        &self,
        input: &Path,
        offset: usize,
        uncompress: Option<CompressionAlgorithm>,
        count: Option<usize>,
        pretty: bool,
    ) -> Result<String> {
        let mut stream = self.load(input)?;

        if let Some(algorithm) = uncompress {
            stream
                .uncompress(algorithm)
                .with_context(|| format!("Failed to uncompress input with {algorithm}"))?;
        }

        stream
            .set_position(offset)
            .with_context(|| format!("Offset {offset} is past the end of the input"))?;

        let mut heap = Amf0Heap::new();
        let mut values = Vec::new();
        let limit = count.unwrap_or(usize::MAX);

        while stream.bytes_available() > 0 && values.len() < limit {
            let position = stream.position();
            let value = stream.read_object(&mut heap).with_context(|| {
                format!("Failed to decode value #{} at offset {position}", values.len())
            })?;
            let json = amf0::json::to_json(&heap, &value)
                .with_context(|| format!("Failed to render value #{} as JSON", values.len()))?;
            values.push(json);
        }

        info!(values = values.len(), containers = heap.len(), "decoded input");

        let json = Value::Array(values);
        let rendered = if pretty || self.config.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        Ok(rendered + "\n")
    }

    /// Encode a JSON document as one AMF0 value and save it.
    pub fn encode(
        &self,
        input: &Path,
        output: &Path,
        compress: Option<CompressionAlgorithm>,
        strict_arrays: bool,
    ) -> Result<usize> {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let json: Value = serde_json::from_str(&text).context("Failed to parse JSON input")?;

        let mut heap = Amf0Heap::new();
        let value = amf0::json::from_json(
            &mut heap,
            &json,
            strict_arrays || self.config.strict_arrays,
        );

        let mut stream = ByteStream::with_config(&self.stream_config);
        let written = stream
            .write_object(&heap, &value)
            .context("Failed to encode value")?;
        stream.resize(None);

        if let Some(algorithm) = compress {
            stream
                .compress(algorithm)
                .with_context(|| format!("Failed to compress output with {algorithm}"))?;
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, stream.to_vec())
            .with_context(|| format!("Failed to write {}", output.display()))?;

        info!(encoded = written, saved = stream.len(), path = %output.display(), "encoded input");
        Ok(stream.len())
    }

    /// Describe a file: size, leading bytes and what the first byte looks like.
    pub fn info(&self, input: &Path) -> Result<String> {
        let stream = self.load(input)?;
        let bytes = stream.to_vec();
        if bytes.is_empty() {
            bail!("{} is empty", input.display());
        }

        let preview = &bytes[..bytes.len().min(PREVIEW_LEN)];
        let mut out = String::new();
        writeln!(out, "File:   {}", input.display())?;
        writeln!(out, "Length: {} bytes", bytes.len())?;
        writeln!(out, "Head:   {}", hex::encode(preview))?;

        let first = match Amf0Marker::from_byte(bytes[0]) {
            Some(marker) if marker.is_supported() => format!("{marker:?} (0x{:02x})", bytes[0]),
            Some(marker) => format!("{marker:?} (0x{:02x}, unsupported)", bytes[0]),
            None => match compression_hint(&bytes) {
                Some(algorithm) => format!("none, looks like {algorithm} data"),
                None => format!("none (0x{:02x})", bytes[0]),
            },
        };
        writeln!(out, "Marker: {first}")?;

        Ok(out)
    }
}

/// Guess a compression format from the leading bytes.
fn compression_hint(bytes: &[u8]) -> Option<CompressionAlgorithm> {
    match bytes {
        [0x78, flags, ..] if (u16::from(bytes[0]) << 8 | u16::from(*flags)) % 31 == 0 => {
            Some(CompressionAlgorithm::Zlib)
        }
        [0x5d, 0x00, 0x00, ..] => Some(CompressionAlgorithm::Lzma),
        _ => None,
    }
}
