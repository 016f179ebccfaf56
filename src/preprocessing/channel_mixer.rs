//! Channel mixing utilities (multichannel to mono conversion)

/// Average all channels into one mono signal
///
/// # Arguments
///
/// * `channels` - Planar channel slices, each at least `frame_count` long
/// * `frame_count` - Frames to mix
///
/// # Returns
///
/// Mono samples of length `frame_count`; a single channel is copied through.
pub fn mix_to_mono<'a, I>(channels: I, frame_count: usize) -> Vec<f32>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut mono = vec![0.0f32; frame_count];
    let mut num_channels = 0usize;

    for channel in channels {
        for (out, &s) in mono.iter_mut().zip(&channel[..frame_count]) {
            *out += s;
        }
        num_channels += 1;
    }

    if num_channels > 1 {
        let scale = 1.0 / num_channels as f32;
        for out in mono.iter_mut() {
            *out *= scale;
        }
    }

    mono
}
