//! Integration Tests
//!
//! End-to-end tests for the multi-effect chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;
use multifx::dsp::{
    DistortionEngine, DistortionType, EffectChain, RingBuffer, SmoothedParameter, StageType,
};
use multifx::engine::{channel_rms, generate_test_tone, AudioBuffer};
use multifx::{ChainConfig, ParameterStore};
use multifx::dsp::PannerMode;
use test_case::test_case;

fn chain_with_mode(mode: PannerMode) -> EffectChain {
    EffectChain::with_config(&ChainConfig {
        panner_mode: mode,
        ..Default::default()
    })
}

fn impulse(channels: &[usize], num_channels: usize, len: usize, sample_rate: u32) -> AudioBuffer {
    let mut buffer = AudioBuffer::new(num_channels, len, sample_rate);
    for &ch in channels {
        buffer.samples[ch][0] = 1.0;
    }
    buffer
}

fn distortion(shaper: DistortionType, drive: f32, mix: f32, output: f32) -> DistortionEngine {
    let mut engine = DistortionEngine::new();
    engine.set_ramp_time(0.0);
    engine.set_type(shaper);
    engine.set_drive(drive);
    engine.set_mix(mix);
    engine.set_output(output);
    engine
}

// === Distortion Transfer Functions ===

#[test_case(DistortionType::HardClip ; "hard clip")]
#[test_case(DistortionType::SoftClip ; "soft clip")]
#[test_case(DistortionType::Saturation ; "saturation")]
fn test_distortion_output_always_finite(shaper: DistortionType) {
    for drive in [0.0, 6.0, 12.0, 24.0] {
        for mix in [0.0, 0.5, 1.0] {
            for output in [-24.0, 0.0, 24.0] {
                let mut engine = distortion(shaper, drive, mix, output);
                for step in 0..=400 {
                    let x = -10.0 + step as f32 * 0.05;
                    let y = engine.process_sample(x);
                    assert!(
                        y.is_finite(),
                        "{:?} drive={} mix={} output={} x={} gave {}",
                        shaper,
                        drive,
                        mix,
                        output,
                        x,
                        y
                    );
                }
            }
        }
    }
}

#[test]
fn test_hard_clip_bounded_by_output_gain() {
    for output_db in [-12.0, 0.0, 6.0] {
        let mut engine = distortion(DistortionType::HardClip, 24.0, 1.0, output_db);
        let output_gain = 10f32.powf(output_db / 20.0);
        for x in [0.1, 0.5, 1.0, 3.0, -0.7, -10.0] {
            let y = engine.process_sample(x);
            assert!(y.abs() <= 0.99 * output_gain + 1e-5, "x={} y={}", x, y);
        }
    }
}

#[test]
fn test_soft_clip_is_odd() {
    let mut engine = distortion(DistortionType::SoftClip, 9.0, 0.6, -3.0);
    for step in 1..100 {
        let x = step as f32 * 0.1;
        let pos = engine.process_sample(x);
        let neg = engine.process_sample(-x);
        assert_abs_diff_eq!(neg, -pos, epsilon = 1e-6);
    }
}

// === Delay ===

#[test]
fn test_delay_impulse_lands_on_expected_sample() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("delayTimeLeft", 10.0);
    chain.set_parameter("delayTimeRight", 10.0);
    chain.set_parameter("feedback", 0.0);
    chain.set_parameter("delayMix", 1.0);
    chain.set_parameter("pannerBypass", 1.0);
    chain.set_parameter("eqBypass", 1.0);
    chain.prepare(44100.0, 1024, 2).unwrap();

    let mut buffer = impulse(&[0, 1], 2, 1024, 44100);
    chain.process(&mut buffer);

    for ch in 0..2 {
        let out = buffer.channel(ch);
        assert_abs_diff_eq!(out[441], 1.0, epsilon = 1e-6);
        for (i, &s) in out.iter().enumerate() {
            if i != 441 {
                assert_eq!(s, 0.0, "channel {} sample {}", ch, i);
            }
        }
    }
}

#[test]
fn test_ping_pong_alternates_channels() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("delayTimeLeft", 1.0);
    chain.set_parameter("delayTimeRight", 1.0);
    chain.set_parameter("feedback", 0.5);
    chain.set_parameter("delayMix", 1.0);
    chain.set_parameter("delaytype", 1.0);
    chain.set_parameter("pannerBypass", 1.0);
    chain.set_parameter("eqBypass", 1.0);
    chain.prepare(1000.0, 16, 2).unwrap();

    // Impulse on the left only; 1 ms at 1 kHz is one sample
    let mut buffer = impulse(&[0], 2, 4, 1000);
    chain.process(&mut buffer);

    assert_abs_diff_eq!(buffer.channel(0)[1], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(buffer.channel(1)[1], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(buffer.channel(1)[2], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(buffer.channel(0)[2], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(buffer.channel(0)[3], 0.25, epsilon = 1e-6);
}

// === Panner ===

#[test]
fn test_mono_panner_constant_power_gains() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("pan", -0.5);
    chain.set_parameter("lfoDepth", 0.0);
    chain.set_parameter("eqBypass", 1.0);
    chain.prepare(48000.0, 64, 2).unwrap();

    let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 64]; 2], 48000).unwrap();
    chain.process(&mut buffer);

    assert_abs_diff_eq!(buffer.channel(0)[0], 0.9239, epsilon = 0.01);
    assert_abs_diff_eq!(buffer.channel(1)[0], 0.3827, epsilon = 0.01);
    assert_abs_diff_eq!(buffer.channel(0)[63], 0.9239, epsilon = 0.01);
}

#[test]
fn test_stereo_panner_full_reposition() {
    let mut chain = chain_with_mode(PannerMode::Stereo);
    chain.set_parameter("leftPan", 1.0);
    chain.set_parameter("rightPan", -1.0);
    chain.set_parameter("leftLfoDepth", 0.0);
    chain.set_parameter("rightLfoDepth", 0.0);
    chain.set_parameter("eqBypass", 1.0);
    chain.prepare(48000.0, 64, 2).unwrap();

    let mut buffer = impulse(&[0], 2, 64, 48000);
    chain.process(&mut buffer);

    assert_abs_diff_eq!(buffer.channel(0)[0], 0.0, epsilon = 0.1);
    assert_abs_diff_eq!(buffer.channel(1)[0], 1.0, epsilon = 0.1);
}

#[test]
fn test_lfo_moves_pan() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("lfoEnabled", 1.0);
    chain.set_parameter("lfoFreq", 10.0);
    chain.set_parameter("lfoDepth", 1.0);
    chain.set_parameter("eqBypass", 1.0);
    chain.prepare(1000.0, 100, 2).unwrap();

    let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 100]; 2], 1000).unwrap();
    chain.process(&mut buffer);

    let left = buffer.channel(0);
    let right = buffer.channel(1);
    // Quarter period: LFO at +1 pushes fully right
    assert_abs_diff_eq!(left[25], 0.0, epsilon = 1e-3);
    assert_abs_diff_eq!(right[25], 1.0, epsilon = 1e-3);
    for i in 0..100 {
        assert_abs_diff_eq!(left[i] * left[i] + right[i] * right[i], 1.0, epsilon = 1e-4);
    }
}

// === Equalizer ===

#[test]
fn test_disabled_bands_are_identity() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("pannerBypass", 1.0);
    for band in 0..4 {
        chain.set_parameter(&format!("band{}_gain", band), 12.0);
        chain.set_parameter(&format!("band{}_enabled", band), 0.0);
    }
    chain.prepare(48000.0, 256, 2).unwrap();

    let input: Vec<f32> = (0..256)
        .map(|i| ((i * 7919) % 200) as f32 / 100.0 - 1.0)
        .collect();
    let mut buffer = AudioBuffer::from_channels(vec![input.clone(), input.clone()], 48000).unwrap();
    chain.process(&mut buffer);

    for ch in 0..2 {
        for (a, b) in buffer.channel(ch).iter().zip(&input) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_eq_boost_raises_level() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("pannerBypass", 1.0);
    chain.set_parameter("band1_frequency", 1000.0);
    chain.set_parameter("band1_gain", 12.0);
    chain.set_parameter("band1_q", 1.0);
    chain.prepare(48000.0, 4800, 1).unwrap();

    let mut buffer = generate_test_tone(1000.0, 0.1, 1, 48000);
    let before = channel_rms(buffer.channel(0));
    chain.process(&mut buffer);
    let after = channel_rms(&buffer.channel(0)[2400..]);

    let gain_db = 20.0 * (after / before).log10();
    assert_abs_diff_eq!(gain_db, 12.0, epsilon = 0.5);
}

#[test]
fn test_eq_band_returning_from_flat_has_no_stale_ring() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("pannerBypass", 1.0);
    chain.set_parameter("band1_frequency", 200.0);
    chain.set_parameter("band1_gain", 24.0);
    chain.set_parameter("band1_q", 10.0);
    chain.prepare(48000.0, 4800, 1).unwrap();

    let mut tone = generate_test_tone(200.0, 0.1, 1, 48000);
    chain.process(&mut tone);

    chain.set_parameter("band1_gain", 0.0);
    let mut tail = generate_test_tone(200.0, 0.1, 1, 48000);
    chain.process(&mut tail);

    chain.set_parameter("band1_gain", 24.0);
    let mut silence = AudioBuffer::new(1, 4800, 48000);
    chain.process(&mut silence);
    assert!(silence.channel(0).iter().all(|&s| s == 0.0));
}

#[test]
fn test_reprepare_at_higher_rate_keeps_band_frequency() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.prepare(32000.0, 256, 2).unwrap();
    chain.set_parameter("band3_frequency", 20000.0);
    let mut buffer = AudioBuffer::new(2, 256, 32000);
    chain.process(&mut buffer);
    assert_abs_diff_eq!(chain.equalizer().band_frequency(3), 15680.0, epsilon = 1e-2);

    chain.prepare(48000.0, 256, 2).unwrap();
    assert_eq!(chain.get_parameter("band3_frequency"), 20000.0);
    assert_eq!(chain.equalizer().band_frequency(3), 20000.0);
}

// === Chain ===

#[test]
fn test_stage_order_gain_before_distortion_before_output() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("input", 12.0);
    chain.set_parameter("distortiontype", 0.0);
    chain.set_parameter("mix", 1.0);
    chain.set_parameter("output", -6.0);
    chain.set_parameter("pannerBypass", 1.0);
    chain.set_parameter("eqBypass", 1.0);
    chain.prepare(48000.0, 8, 1).unwrap();

    let mut buffer = AudioBuffer::from_channels(vec![vec![0.5; 8]], 48000).unwrap();
    chain.process(&mut buffer);

    // 0.5 * +12 dB clips at 0.99 before the -6 dB output trim
    assert_abs_diff_eq!(buffer.channel(0)[0], 0.99 * 0.501_187, epsilon = 1e-4);
}

#[test]
fn test_ragged_buffer_does_not_panic() {
    let mut chain = chain_with_mode(PannerMode::Stereo);
    chain.set_parameter("input", 6.0);
    chain.set_parameter("mix", 1.0);
    chain.set_parameter("drive", 12.0);
    chain.set_parameter("delayMix", 0.5);
    chain.set_parameter("delayTimeLeft", 1.0);
    chain.set_parameter("band2_gain", 6.0);
    chain.prepare(48000.0, 64, 2).unwrap();
    // Start a glide so the per-sample paths run too
    chain.set_parameter("output", -6.0);

    for (left, right) in [(64, 32), (16, 64)] {
        let mut buffer = AudioBuffer {
            samples: vec![vec![0.25; left], vec![-0.25; right]],
            sample_rate: 48000,
        };
        chain.process(&mut buffer);
        assert!(buffer.is_finite());
        assert_eq!(buffer.samples[0].len(), left);
        assert_eq!(buffer.samples[1].len(), right);
    }
}

#[test]
fn test_parameter_change_is_smoothed() {
    let mut chain = chain_with_mode(PannerMode::Mono);
    chain.set_parameter("pannerBypass", 1.0);
    chain.set_parameter("eqBypass", 1.0);
    chain.prepare(48000.0, 2048, 1).unwrap();

    let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 2048]], 48000).unwrap();
    chain.process(&mut buffer);
    chain.set_parameter("output", -24.0);
    let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 2048]], 48000).unwrap();
    chain.process(&mut buffer);

    let out = buffer.channel(0);
    // 20 ms ramp at 48 kHz
    for w in out[..960].windows(2) {
        assert!(w[1] <= w[0]);
        assert!((w[0] - w[1]) < 0.01, "step too large: {} -> {}", w[0], w[1]);
    }
    assert_abs_diff_eq!(out[959], 0.063_095_7, epsilon = 1e-5);
    assert_abs_diff_eq!(out[2047], 0.063_095_7, epsilon = 1e-5);
}

#[test]
fn test_bypassed_stage_reports_bypass() {
    let mut chain = EffectChain::new();
    chain.set_parameter("distortionBypass", 1.0);
    chain.prepare(48000.0, 64, 2).unwrap();
    assert!(chain.stage(StageType::Distortion).is_bypassed());
    assert!(!chain.stage(StageType::Delay).is_bypassed());
}

#[test]
fn test_full_chain_stays_finite_under_heavy_settings() {
    let mut chain = EffectChain::new();
    let store = chain.parameters();
    for (name, value) in [
        ("input", 24.0),
        ("drive", 24.0),
        ("mix", 1.0),
        ("distortiontype", 2.0),
        ("delayTimeLeft", 3.0),
        ("delayTimeRight", 5.0),
        ("feedback", 1.0),
        ("delayMix", 0.5),
        ("delaytype", 1.0),
        ("lfoEnabled", 1.0),
        ("leftLfoFreq", 20.0),
        ("leftLfoDepth", 1.0),
        ("band0_gain", 24.0),
        ("band3_gain", 24.0),
        ("band2_q", 20.0),
        ("output", 24.0),
    ] {
        assert!(store.set(name, value), "{}", name);
    }
    chain.prepare(48000.0, 256, 2).unwrap();

    let mut buffer = generate_test_tone(100.0, 1.0, 2, 48000);
    for block in 0..(48000 / 256) {
        let mut chunk = AudioBuffer::from_channels(
            (0..2)
                .map(|ch| buffer.channel(ch)[block * 256..(block + 1) * 256].to_vec())
                .collect(),
            48000,
        )
        .unwrap();
        chain.process(&mut chunk);
        assert!(chunk.is_finite(), "non-finite output in block {}", block);
        for ch in 0..2 {
            buffer.channel_mut(ch)[block * 256..(block + 1) * 256]
                .copy_from_slice(chunk.channel(ch));
        }
    }
}

#[test]
fn test_parameters_written_from_another_thread() {
    let mut chain = EffectChain::new();
    chain.prepare(48000.0, 128, 2).unwrap();

    let store: Arc<ParameterStore> = chain.parameters();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut i = 0u32;
            while !done.load(Ordering::Relaxed) {
                let x = (i % 100) as f32 / 100.0;
                store.set("drive", x * 24.0);
                store.set("mix", x);
                store.set("leftPan", x * 2.0 - 1.0);
                store.set("band1_frequency", 200.0 + x * 1500.0);
                i = i.wrapping_add(1);
            }
        })
    };

    for _ in 0..200 {
        let mut buffer = generate_test_tone(440.0, 128.0 / 48000.0, 2, 48000);
        chain.process(&mut buffer);
        assert!(buffer.is_finite());
    }

    done.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "before prepare")]
fn test_process_before_prepare_panics_in_debug() {
    let mut chain = EffectChain::new();
    let mut buffer = AudioBuffer::new(2, 16, 48000);
    chain.process(&mut buffer);
}

// === Building Blocks ===

#[test]
fn test_smoothed_parameter_lands_exactly() {
    let mut param = SmoothedParameter::new(0.0);
    param.reset(44100.0, 0.05);
    param.set_target(0.8);
    for _ in 0..param.ramp_samples() {
        param.advance();
    }
    assert_eq!(param.current_value(), 0.8);
    assert!(!param.is_smoothing());
}

#[test]
fn test_ring_buffer_reads_last_write() {
    let mut ring = RingBuffer::new();
    ring.prepare(48000.0, 64, 2, 0.01).unwrap();
    for i in 0..1000 {
        let x = i as f32 * 0.25;
        ring.write_and_advance(1, x);
        assert_eq!(ring.read_at(1, 0), x);
    }
}
