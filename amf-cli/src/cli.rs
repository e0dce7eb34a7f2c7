use bytearray::CompressionAlgorithm;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "amfkit",
    about = "Amfkit - CLI tool for inspecting, decoding and encoding AMF0 payloads",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode AMF0 values from a file and print them as JSON
    Decode {
        /// File holding the AMF0 payload
        input: PathBuf,

        /// Byte offset of the first value
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Uncompress the whole file before decoding
        #[arg(long)]
        uncompress: Option<Algorithm>,

        /// Stop after this many values
        #[arg(long)]
        count: Option<usize>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Encode a JSON document as one AMF0 value
    Encode {
        /// JSON input file
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Compress the encoded buffer
        #[arg(long)]
        compress: Option<Algorithm>,

        /// Encode JSON arrays as strict arrays instead of ECMA arrays
        #[arg(long)]
        strict_arrays: bool,
    },

    /// Show size, leading bytes and the first marker of a file
    Info {
        /// File to inspect
        input: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    /// Raw deflate
    Deflate,
    /// Zlib wrapped deflate
    Zlib,
    /// LZMA
    Lzma,
}

impl From<Algorithm> for CompressionAlgorithm {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::Deflate => CompressionAlgorithm::Deflate,
            Algorithm::Zlib => CompressionAlgorithm::Zlib,
            Algorithm::Lzma => CompressionAlgorithm::Lzma,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        CompressionAlgorithm::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decode() {
        let args = Args::parse_from([
            "amfkit",
            "-v",
            "decode",
            "meta.bin",
            "--offset",
            "13",
            "--uncompress",
            "zlib",
            "--count",
            "2",
        ]);

        assert!(args.verbose);
        match args.command {
            Commands::Decode {
                input,
                offset,
                uncompress,
                count,
                pretty,
                output_file,
            } => {
                assert_eq!(input, PathBuf::from("meta.bin"));
                assert_eq!(offset, 13);
                assert_eq!(uncompress, Some(Algorithm::Zlib));
                assert_eq!(count, Some(2));
                assert!(!pretty);
                assert!(output_file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["amfkit", "-v", "-q", "info", "x"]).is_err());
    }

    #[test]
    fn test_algorithm_mapping() {
        assert_eq!(
            CompressionAlgorithm::from(Algorithm::Lzma),
            CompressionAlgorithm::Lzma
        );
        assert_eq!(Algorithm::Deflate.to_string(), "deflate");
    }
}
