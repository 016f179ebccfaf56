//! Example: Detect tempo for multiple audio files in parallel
//!
//! Usage:
//!   cargo run --release --example detect_batch -- [--jobs N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files. Each file is analysed on one thread.
//! - Default workers: one fewer than the available CPU threads.
//! - With --json each line holds the file name and either the serialized
//!   `TempoEstimate` or an `error` string.

use rayon::prelude::*;
use serde::Serialize;
use std::env;
use std::fs::File;
use std::time::Instant;
use symphonia::core::audio::SampleBuffer as DecodedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tempo_tree::io::SampleBuffer;
use tempo_tree::{AnalysisConfig, AnalysisError, AnalysisFlag, AnalysisPipeline, TempoEstimate};

/// Decode the first audio track into planar channels
fn decode_audio_file(path: &str) -> Result<SampleBuffer, Box<dyn std::error::Error + Send + Sync>> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
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

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut planes: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count();
                sample_rate = spec.rate;
                if planes.is_empty() {
                    planes = vec![Vec::new(); channels];
                } else if planes.len() != channels {
                    return Err("Channel count changed mid-stream".into());
                }

                let mut buf = DecodedBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_planar_ref(decoded);
                let frames = buf.samples().len() / channels.max(1);
                if frames == 0 {
                    continue;
                }
                for (plane, chunk) in planes.iter_mut().zip(buf.samples().chunks(frames)) {
                    plane.extend_from_slice(chunk);
                }
            }
            Err(SymphoniaError::DecodeError(_)) => {
                // Skip decode errors (can happen with corrupted packets).
                continue;
            }
            Err(e) => return Err(Box::new(e)),
        }
    }

    Ok(SampleBuffer::from_planar(planes, sample_rate)?)
}

fn analyze_file(path: &str, config: &AnalysisConfig) -> Result<TempoEstimate, String> {
    let buffer = decode_audio_file(path).map_err(|e| format!("decode failed: {e}"))?;
    let run = || -> Result<TempoEstimate, AnalysisError> {
        let mut pipeline = AnalysisPipeline::new(config.clone())?;
        buffer.for_each_block(config.max_block_frames, |block| pipeline.push_block(block))?;
        pipeline.finish()
    };
    run().map_err(|e| format!("analysis failed: {e}"))
}

fn default_jobs() -> usize {
    // Leave one core for the system
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
}

/// Nearest-rank value at `q` of an ascending slice
fn quantile(sorted: &[f32], q: f32) -> f32 {
    let rank = ((sorted.len() - 1) as f32 * q).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[derive(Serialize)]
struct ItemOut {
    file: String,
    #[serde(flatten)]
    estimate: Option<TempoEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.next() {
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args.next().ok_or("--jobs requires a value")?.parse::<usize>()?;
                jobs = Some(std::cmp::max(1, v));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: detect_batch [--jobs N] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Worker threads (default: available CPUs - 1)\n\
                     --json     Print one JSON object per file\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: no input files (see --help)");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    log::info!("Analysing {} files on {} workers", paths.len(), jobs);

    let config = AnalysisConfig::default();

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<ItemOut> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| match analyze_file(path, &config) {
                Ok(estimate) => ItemOut {
                    file: path.clone(),
                    estimate: Some(estimate),
                    error: None,
                },
                Err(error) => ItemOut {
                    file: path.clone(),
                    estimate: None,
                    error: Some(error),
                },
            })
            .collect()
    });

    for (idx, o) in outs.iter().enumerate() {
        if json {
            println!("{}", serde_json::to_string(o)?);
            continue;
        }
        match (&o.estimate, &o.error) {
            (Some(e), _) => println!(
                "[{}/{}] {}: BPM={:.2} (conf={:.3}) period={:.4}s trees={} time={:.2}ms",
                idx + 1,
                outs.len(),
                o.file,
                e.bpm,
                e.confidence,
                e.period_seconds,
                e.tree_count,
                e.metadata.processing_time_ms
            ),
            (None, error) => println!(
                "[{}/{}] {}: ERROR: {}",
                idx + 1,
                outs.len(),
                o.file,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    let estimates: Vec<&TempoEstimate> = outs.iter().filter_map(|o| o.estimate.as_ref()).collect();
    eprintln!(
        "Finished {} of {} files in {:.0}ms",
        estimates.len(),
        outs.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );
    if estimates.is_empty() {
        return Ok(());
    }

    let mut times: Vec<f32> = estimates.iter().map(|e| e.metadata.processing_time_ms).collect();
    times.sort_by(f32::total_cmp);
    eprintln!(
        "per-file time: median={:.2}ms p90={:.2}ms worst={:.2}ms",
        quantile(&times, 0.5),
        quantile(&times, 0.9),
        times[times.len() - 1]
    );

    let folded = estimates
        .iter()
        .filter(|e| e.metadata.flags.contains(&AnalysisFlag::OctaveFolded))
        .count();
    let ambiguous = estimates
        .iter()
        .filter(|e| e.metadata.flags.contains(&AnalysisFlag::MultipleTempoFamilies))
        .count();
    let mut bpms: Vec<f32> = estimates.iter().map(|e| e.bpm).collect();
    bpms.sort_by(f32::total_cmp);
    eprintln!(
        "tempo: {:.1}-{:.1} BPM (median {:.1}), octave-folded={} multiple-families={}",
        bpms[0],
        bpms[bpms.len() - 1],
        quantile(&bpms, 0.5),
        folded,
        ambiguous
    );

    Ok(())
}
