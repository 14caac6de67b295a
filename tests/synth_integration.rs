//! End-to-end wiring: raw MIDI bytes through the decoder and router, into
//! the parameter states and the note queue, then a render pass on the pool.

use std::sync::Arc;

use polyvox::control::{ParamDecl, ParamRange, ParameterState};
use polyvox::dsp::{AdsrEnvelope, ClipFilter, EnvelopeData, LowPassFilter};
use polyvox::midi::{
    CommandRouter, MidiControllerId, MidiControllerIdCriteria, MidiIngress,
};
use polyvox::osc::{DetunedOscillator, OscillatorFactory, Waveform};
use polyvox::synth::{note_queue, NoteSender, Voice, VoicePool};

const SAMPLE_RATE: f32 = 48_000.0;

const CC_WAVE: u8 = 20;
const CC_DETUNE: u8 = 21;
const CC_CUTOFF: u8 = 22;
const CC_ATTACK: u8 = 23;
const CC_DECAY: u8 = 24;
const CC_SUSTAIN: u8 = 25;
const CC_RELEASE: u8 = 26;

fn cc(controller: u8) -> MidiControllerIdCriteria {
    MidiControllerIdCriteria::exact(MidiControllerId {
        channel: 0,
        controller,
    })
}

/// Everything a caller needs to keep alive: the router only holds weak
/// references to its subscribers.
struct Patch {
    ingress: MidiIngress,
    pool: VoicePool,
    wave_select: Arc<ParameterState<usize>>,
    detune: Arc<ParameterState<f32>>,
    cutoff: Arc<ParameterState<f32>>,
    envelope: Arc<ParameterState<EnvelopeData>>,
    _note_sender: Arc<NoteSender>,
}

fn build_patch(voice_count: usize, queue_capacity: usize) -> Patch {
    let router = Arc::new(CommandRouter::new());
    let (note_sender, note_receiver) = note_queue(queue_capacity);
    router.register_notes(&note_sender, MidiControllerIdCriteria::channel(0));

    let wave_select = Arc::new(
        ParameterState::enumerated("wave", cc(CC_WAVE), Waveform::ALL.len(), 0).unwrap(),
    );
    let detune = Arc::new(ParameterState::numeric(
        "detune",
        cc(CC_DETUNE),
        ParamRange::new(-24.0, 24.0).unwrap(),
        0.0,
    ));
    let cutoff = Arc::new(ParameterState::numeric(
        "cutoff",
        cc(CC_CUTOFF),
        ParamRange::new(20.0, 18_000.0).unwrap(),
        18_000.0,
    ));

    // Four physical knobs folded into one EnvelopeData value; controllers
    // outside the four are declined by the mapping.
    let attack = ParamRange::new(0.001, 1.0).unwrap();
    let decay = ParamRange::new(0.001, 1.0).unwrap();
    let sustain = ParamRange::new(0.0, 1.0).unwrap();
    let release = ParamRange::new(0.001, 2.0).unwrap();
    let envelope = Arc::new(ParameterState::new(
        ParamDecl::numeric(
            "envelope",
            MidiControllerIdCriteria::channel(0),
            ParamRange::new(0.0, 1.0).unwrap(),
        ),
        EnvelopeData::default(),
        move |id, raw, current: &EnvelopeData| {
            let mut next = *current;
            match id.controller {
                CC_ATTACK => next.attack_time = attack.value_from_midi(raw),
                CC_DECAY => next.decay_time = decay.value_from_midi(raw),
                CC_SUSTAIN => next.sustain_level = sustain.value_from_midi(raw),
                CC_RELEASE => next.release_time = release.value_from_midi(raw),
                _ => return None,
            }
            Some(next)
        },
    ));

    let mut factory = OscillatorFactory::wave(SAMPLE_RATE, 7);
    let mut voices = Vec::with_capacity(voice_count);
    for _ in 0..voice_count {
        let selectable = factory.all_waveforms().unwrap();
        wave_select.attach(selectable.index_writer());
        let detuned = DetunedOscillator::new(selectable, 0.0);
        detune.attach(detuned.cents_writer());
        let env = AdsrEnvelope::new(SAMPLE_RATE, EnvelopeData::default());
        envelope.attach(env.data_writer());
        let lpf = LowPassFilter::new(SAMPLE_RATE, 18_000.0);
        cutoff.attach(lpf.cutoff_writer());
        voices.push(
            Voice::new(SAMPLE_RATE, Box::new(detuned))
                .with_envelope(env)
                .with_note_processor(Box::new(lpf))
                .with_processor(Box::new(ClipFilter::unit())),
        );
    }
    let pool = VoicePool::new(voices).unwrap().with_events(note_receiver);

    router.register_controls(&wave_select, cc(CC_WAVE));
    router.register_controls(&detune, cc(CC_DETUNE));
    router.register_controls(&cutoff, cc(CC_CUTOFF));
    router.register_controls(&envelope, MidiControllerIdCriteria::channel(0));

    Patch {
        ingress: MidiIngress::new(router),
        pool,
        wave_select,
        detune,
        cutoff,
        envelope,
        _note_sender: note_sender,
    }
}

fn render(patch: &mut Patch, samples: usize) -> Vec<f32> {
    let mut buf = vec![0.0f32; samples];
    patch.pool.render(&mut buf);
    buf
}

#[test]
fn note_bytes_become_audio_and_fade_after_note_off() {
    let mut patch = build_patch(4, 64);

    patch.ingress.handle_packet(&[0x90, 69, 127]);
    let buf = render(&mut patch, 256);
    assert!(buf.iter().any(|&s| s.abs() > 1e-4), "note on produced silence");
    assert!(buf.iter().all(|&s| s.abs() <= 1.0), "clip stage breached");

    patch.ingress.handle_packet(&[0x80, 69, 0]);
    // Default release is 0.2 s; render well past it.
    let tail = render(&mut patch, 12_000);
    assert_eq!(*tail.last().unwrap(), 0.0, "voice did not return to idle");
}

#[test]
fn velocity_zero_note_on_acts_as_note_off() {
    let mut patch = build_patch(1, 8);
    patch.ingress.handle_packet(&[0x90, 60, 100]);
    render(&mut patch, 64);
    patch.ingress.handle_packet(&[0x90, 60, 0]);
    let tail = render(&mut patch, 12_000);
    assert_eq!(*tail.last().unwrap(), 0.0);
}

#[test]
fn control_changes_update_every_parameter_state() {
    let mut patch = build_patch(2, 16);

    patch.ingress.handle_packet(&[0xB0, CC_WAVE, 1]);
    assert_eq!(patch.wave_select.current(), 1);

    patch.ingress.handle_packet(&[0xB0, CC_DETUNE, 127]);
    assert!((patch.detune.current() - 24.0).abs() < 1e-4);

    patch.ingress.handle_packet(&[0xB0, CC_ATTACK, 127]);
    assert!((patch.envelope.current().attack_time - 1.0).abs() < 1e-4);
    patch.ingress.handle_packet(&[0xB0, CC_SUSTAIN, 0]);
    assert_eq!(patch.envelope.current().sustain_level, 0.0);

    // An unmapped controller on the shared channel leaves the composite
    // value untouched.
    let before = patch.envelope.current();
    patch.ingress.handle_packet(&[0xB0, 99, 64]);
    assert_eq!(patch.envelope.current(), before);
}

#[test]
fn observers_see_mapped_values() {
    let mut patch = build_patch(1, 8);
    let rx = patch.cutoff.subscribe();
    patch.ingress.handle_packet(&[0xB0, CC_CUTOFF, 0]);
    let value = rx.try_recv().expect("observer missed the update");
    assert!((value - 20.0).abs() < 1e-3);
}

#[test]
fn overflowing_the_pool_drops_notes_without_failing() {
    let mut patch = build_patch(2, 16);
    patch
        .ingress
        .handle_packet(&[0x90, 60, 100, 0x90, 64, 100, 0x90, 67, 100]);
    let buf = render(&mut patch, 64);
    assert_eq!(patch.pool.dropped_notes(), 1);
    assert!(buf.iter().any(|&s| s.abs() > 1e-4));
}

#[test]
fn garbage_bytes_do_not_derail_a_following_note() {
    let mut patch = build_patch(1, 8);
    patch
        .ingress
        .handle_packet(&[0x07, 0x33, 0xF0, 0x01, 0x02, 0xF7, 0x90, 69, 127]);
    let buf = render(&mut patch, 256);
    assert!(buf.iter().any(|&s| s.abs() > 1e-4));
}
