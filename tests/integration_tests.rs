//! Integration tests for the tempo detection pipeline

use std::io::Cursor;
use tempo_tree::features::interval::{combine_beat_intervals, merge_beat_intervals};
use tempo_tree::features::onset::debounce_onsets;
use tempo_tree::features::tempo_tree::best_tree_for_nodes;
use tempo_tree::io::SampleBuffer;
use tempo_tree::spectral::{FrameStatus, FramerConfig, PassThrough, SpectralBufferList, SpectralFramer};
use tempo_tree::{
    detect_tempo, AnalysisConfig, AnalysisError, AnalysisPipeline, BeatInterval, Onset,
    TempoDetectionNode,
};

/// Generate a synthetic kick pattern at the given BPM
fn generate_kick_pattern(duration_seconds: f32, bpm: f32, sample_rate: f32) -> Vec<f32> {
    let num_samples = (duration_seconds * sample_rate) as usize;
    let mut samples = vec![0.0f32; num_samples];
    let beat_interval = (60.0 / bpm * sample_rate) as usize;
    let kick_samples = (0.1 * sample_rate) as usize;

    let mut pos = 0;
    while pos < num_samples {
        let end = (pos + kick_samples).min(num_samples);
        for i in 0..end - pos {
            let t = i as f32 / kick_samples as f32;
            let phase = 2.0 * std::f32::consts::PI * 60.0 * i as f32 / sample_rate;
            samples[pos + i] = 0.8 * (-t * 5.0).exp() * phase.sin();
        }
        pos += beat_interval;
    }
    samples
}

/// Encode interleaved samples as a 16-bit WAV in memory
fn encode_wav(interleaved: &[f32], channels: u16, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in interleaved {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Decode a WAV into a planar sample buffer
fn decode_wav(bytes: Vec<u8>) -> Result<SampleBuffer, Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(SampleBuffer::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    )?)
}

fn window_aligned_config() -> AnalysisConfig {
    AnalysisConfig {
        rms_window_size: 441,
        ..Default::default()
    }
}

#[test]
fn test_stereo_wav_round_trip_120bpm() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mono = generate_kick_pattern(8.0, 120.0, 44100.0);
    let interleaved: Vec<f32> = mono.iter().flat_map(|&s| [s, s * 0.5]).collect();
    let buffer = decode_wav(encode_wav(&interleaved, 2, 44100)).expect("WAV should decode");
    assert_eq!(buffer.num_channels(), 2);
    assert_eq!(buffer.len(), mono.len());

    let mut pipeline = AnalysisPipeline::new(window_aligned_config()).unwrap();
    buffer
        .for_each_block(2048, |block| pipeline.push_block(block))
        .unwrap();
    let estimate = pipeline.finish().unwrap();

    assert!(
        (estimate.bpm - 120.0).abs() < 1.0,
        "BPM should be close to 120, got {:.2}",
        estimate.bpm
    );
    assert_eq!(estimate.metadata.sample_rate, 44100);
    assert_eq!(estimate.metadata.num_channels, 2);
    assert!(estimate.confidence > 0.5);
}

#[test]
fn test_detect_tempo_90bpm() {
    // 90 BPM at 44.1 kHz: 29400 samples per beat = 60 windows of 490
    let samples = generate_kick_pattern(12.0, 90.0, 44100.0);
    let config = AnalysisConfig {
        rms_window_size: 490,
        ..Default::default()
    };
    let estimate = detect_tempo(&samples, 44100, config).unwrap();
    assert!(
        (estimate.bpm - 90.0).abs() < 1.0,
        "BPM should be close to 90, got {:.2}",
        estimate.bpm
    );
    assert!((estimate.period_seconds - 60.0 / 90.0).abs() < 0.01);
}

#[test]
fn test_detect_tempo_rejects_degenerate_input() {
    assert!(matches!(
        detect_tempo(&[], 44100, AnalysisConfig::default()),
        Err(AnalysisError::ProcessingError(_))
    ));
    assert!(matches!(
        detect_tempo(&vec![0.0; 44100 * 4], 44100, AnalysisConfig::default()),
        Err(AnalysisError::ProcessingError(_))
    ));
    assert!(matches!(
        detect_tempo(&[0.1; 16], 0, AnalysisConfig::default()),
        Err(AnalysisError::InvalidInput(_))
    ));

    let bad = AnalysisConfig {
        fft_size: 1000,
        ..Default::default()
    };
    assert!(matches!(
        detect_tempo(&[0.1; 16], 44100, bad),
        Err(AnalysisError::ConfigurationError(_))
    ));
}

#[test]
fn test_onset_scenario_builds_half_second_tree() {
    let onsets: Vec<Onset> = [0.5, 1.0, 1.5, 2.0, 2.003, 3.0]
        .iter()
        .map(|&time_seconds| Onset {
            time_seconds,
            peak_rms: 0.5,
            is_peak: true,
        })
        .collect();
    let onsets = debounce_onsets(&onsets, 0.05);

    let candidates = BeatInterval::candidates_from_onsets(&onsets, 0.25, 2.0, 0.04);
    let merged = merge_beat_intervals(&candidates, 0.99);
    assert!((merged[0].length_seconds() - 0.5).abs() < 0.01);
    assert_eq!(merged[0].explained().len(), onsets.len() - 1);

    let reduced = combine_beat_intervals(merged, 0.05, 0.05);
    let nodes: Vec<TempoDetectionNode> = reduced
        .iter()
        .map(|interval| TempoDetectionNode::from_beat_interval(interval, 0.05))
        .collect();
    let tree = best_tree_for_nodes(&nodes).unwrap();

    assert!((tree.root().interval() - 0.5).abs() < 0.01);
    assert!(tree.descendant_counts(tree.root_id()) >= 5);
}

#[test]
fn test_framer_zero_input_fires_eight_hops() {
    let mut framer = SpectralFramer::new(FramerConfig {
        fft_size: 1024,
        hop_size: 256,
        num_channels: 1,
        max_frames: 512,
    })
    .unwrap();

    let zeros = vec![0.0f32; 2048];
    let mut silent = true;
    let mut frames = 0;
    for chunk in zeros.chunks(300) {
        framer.process(&[chunk], chunk.len(), &mut |spectra: &mut SpectralBufferList, fft_size: usize| {
            assert_eq!(fft_size, 1024);
            silent &= spectra.is_silent();
            frames += 1;
            FrameStatus::Continue
        });
    }

    assert_eq!(frames, 8);
    assert_eq!(framer.hops_fired(), 8);
    assert!(silent);
}

#[test]
fn test_framer_resynthesis_round_trip() {
    let fft_size = 1024;
    let mut framer = SpectralFramer::new(FramerConfig {
        fft_size,
        hop_size: 256,
        num_channels: 1,
        max_frames: 512,
    })
    .unwrap();

    let input: Vec<f32> = (0..16384)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
        .collect();
    let mut output = vec![0.0f32; input.len()];

    for (inp, out) in input.chunks(700).zip(output.chunks_mut(700)) {
        let n = inp.len();
        framer.process_resynthesize(&[inp], &mut [out], n, &mut PassThrough);
    }

    let latency = framer.latency();
    let (mut err, mut energy) = (0.0f64, 0.0f64);
    for t in 0..input.len() - latency {
        let diff = (output[t + latency] - input[t]) as f64;
        err += diff * diff;
        energy += (input[t] as f64).powi(2);
    }
    assert!((err / energy).sqrt() < 1e-4, "normalized error {}", (err / energy).sqrt());
}
