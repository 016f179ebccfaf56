//! Example: Detect the tempo of a single audio file
//!
//! Usage:
//!   cargo run --release --example detect_file -- <file> [--low-pass HZ]
//!
//! Decodes the first audio track with symphonia and streams every decoded
//! packet into an `AnalysisPipeline` as one planar block.

use std::env;
use std::fs::File;
use symphonia::core::audio::SampleBuffer as DecodedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tempo_tree::io::PcmBlock;
use tempo_tree::{AnalysisConfig, AnalysisPipeline};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut path: Option<String> = None;
    let mut config = AnalysisConfig::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--low-pass" => {
                let hz = args.next().ok_or("--low-pass requires a value")?.parse::<f32>()?;
                config.low_pass_hz = Some(hz);
            }
            "--help" | "-h" => {
                eprintln!("Usage: detect_file <file> [--low-pass HZ]");
                return Ok(());
            }
            _ => path = Some(arg),
        }
    }
    let path = path.ok_or("Provide an audio file path. Use --help for usage.")?;

    let src = File::open(&path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(&path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or("No supported audio tracks found")?;
    let track_id = track.id;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut pipeline = AnalysisPipeline::new(config)?;
    let mut decoded_buf: Option<DecodedBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupted packets are skipped
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(Box::new(e)),
        };

        let spec = *decoded.spec();
        if decoded_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * spec.channels.count())
        {
            decoded_buf = Some(DecodedBuffer::new(decoded.capacity() as u64, spec));
        }
        let Some(buf) = decoded_buf.as_mut() else {
            continue;
        };
        buf.copy_planar_ref(decoded);

        let channels = spec.channels.count();
        let frames = buf.samples().len() / channels.max(1);
        if frames == 0 {
            continue;
        }
        let planes: Vec<&[f32]> = buf.samples().chunks(frames).take(channels).collect();
        pipeline.push_block(&PcmBlock::new(&planes, frames, spec.rate)?)?;
    }

    let analysis = pipeline.finish_with_details()?;
    let estimate = &analysis.estimate;

    println!("Analysis Results: {}", path);
    println!("  BPM: {:.2} (confidence: {:.2})", estimate.bpm, estimate.confidence);
    println!(
        "  Period: {:.4}s (raw BPM {:.2})",
        estimate.period_seconds, estimate.raw_bpm
    );
    println!(
        "  Onsets: {}  Intervals: {}  Trees: {}",
        estimate.onset_count, estimate.interval_count, estimate.tree_count
    );
    println!("  Flags: {:?}", estimate.metadata.flags);
    println!("  Processing time: {:.2} ms", estimate.metadata.processing_time_ms);

    if let Some(tree) = analysis.best_tree() {
        println!("\nStrongest tempo family:");
        println!("{}", tree.describe());
    }

    Ok(())
}
