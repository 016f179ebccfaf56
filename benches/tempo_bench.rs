//! Performance benchmarks for tempo detection

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempo_tree::features::interval::{combine_beat_intervals, merge_beat_intervals};
use tempo_tree::features::tempo_tree::build_trees;
use tempo_tree::spectral::{FrameStatus, FramerConfig, SpectralBufferList, SpectralFramer};
use tempo_tree::{detect_tempo, AnalysisConfig, BeatInterval, Onset, TempoDetectionNode};

fn kick_pattern(duration_seconds: f32, bpm: f32, sample_rate: f32) -> Vec<f32> {
    let num_samples = (duration_seconds * sample_rate) as usize;
    let beat = (60.0 / bpm * sample_rate) as usize;
    let kick = (0.1 * sample_rate) as usize;
    (0..num_samples)
        .map(|i| {
            let offset = i % beat;
            if offset < kick {
                let t = offset as f32 / kick as f32;
                0.8 * (-t * 5.0).exp()
                    * (2.0 * std::f32::consts::PI * 60.0 * offset as f32 / sample_rate).sin()
            } else {
                0.0
            }
        })
        .collect()
}

fn bench_detect_tempo(c: &mut Criterion) {
    // 30 seconds at 44.1kHz
    let samples = kick_pattern(30.0, 128.0, 44100.0);
    let config = AnalysisConfig::default();

    c.bench_function("detect_tempo_30s", |b| {
        b.iter(|| {
            let _ = detect_tempo(black_box(&samples), black_box(44100), black_box(config.clone()));
        });
    });

    let filtered = AnalysisConfig {
        low_pass_hz: Some(300.0),
        ..Default::default()
    };
    c.bench_function("detect_tempo_30s_low_pass", |b| {
        b.iter(|| {
            let _ = detect_tempo(black_box(&samples), black_box(44100), black_box(filtered.clone()));
        });
    });
}

fn bench_framer(c: &mut Criterion) {
    let samples = kick_pattern(10.0, 120.0, 44100.0);

    c.bench_function("framer_10s_1024_256", |b| {
        b.iter(|| {
            let mut framer = SpectralFramer::new(FramerConfig {
                fft_size: 1024,
                hop_size: 256,
                num_channels: 1,
                max_frames: 4096,
            })
            .unwrap();
            let mut energy = 0.0f32;
            for block in samples.chunks(4096) {
                framer.process(
                    &[block],
                    block.len(),
                    &mut |spectra: &mut SpectralBufferList, _fft_size: usize| {
                        energy += spectra.spectrum(0)[1].norm();
                        FrameStatus::Continue
                    },
                );
            }
            black_box(energy)
        });
    });
}

fn bench_interval_reduction(c: &mut Criterion) {
    // Slightly jittered 120 BPM onsets with an off-beat every bar
    let onsets: Vec<Onset> = (0..240)
        .flat_map(|beat| {
            let t = beat as f64 * 0.5 + if beat % 3 == 0 { 0.004 } else { 0.0 };
            let mut out = vec![Onset {
                time_seconds: t,
                peak_rms: 0.5,
                is_peak: true,
            }];
            if beat % 4 == 1 {
                out.push(Onset {
                    time_seconds: t + 0.25,
                    peak_rms: 0.2,
                    is_peak: true,
                });
            }
            out
        })
        .collect();

    c.bench_function("candidates_merge_combine_trees", |b| {
        b.iter(|| {
            let candidates = BeatInterval::candidates_from_onsets(black_box(&onsets), 0.25, 2.0, 0.04);
            let merged = merge_beat_intervals(&candidates, 0.95);
            let reduced = combine_beat_intervals(merged, 0.05, 0.05);
            let nodes: Vec<TempoDetectionNode> = reduced
                .iter()
                .map(|interval| TempoDetectionNode::from_beat_interval(interval, 0.05))
                .collect();
            black_box(build_trees(&nodes))
        });
    });
}

criterion_group!(benches, bench_detect_tempo, bench_framer, bench_interval_reduction);
criterion_main!(benches);
