use crate::dsp::delay::{Delay, LocationUnit, Resolution};
use crate::dsp::envelope::{Ad, RisingEdge};
use crate::dsp::generator::WhiteNoise;
use crate::dsp::processor::Amplifier;
use crate::graph::StepCtx;
use crate::patch::VoicePatch;

/// A Karplus-Strong string: a burst of enveloped noise recirculating in a
/// waveguide tuned to the note period, with a low-pass in the feedback path
/// whose cutoff opens with a short brightness envelope. A second, longer
/// delay bounces the string output back in like a sympathetic resonance.
///
/// This voice drives the dsp primitives directly; the per-sample feedback
/// closure has no graph equivalent.
struct HammeredStrings {
    time_step: f32,
    frequency: f32,
    noise: WhiteNoise,
    amp: Amplifier,
    env: Ad,
    brightness: Ad,
    wave_guide: Delay,
    bounce: Delay,
    attack: RisingEdge,
    last_value: f32,
}

pub fn voice(time_step: f32) -> Box<dyn VoicePatch> {
    Box::new(HammeredStrings {
        time_step,
        frequency: 0.0,
        noise: WhiteNoise::new(),
        amp: Amplifier::new(0.0),
        env: Ad::new(0.0, 0.01),
        brightness: Ad::new(0.0, 0.15),
        wave_guide: Delay::with_length(0.01, LocationUnit::Seconds, time_step),
        bounce: Delay::with_length(0.1, LocationUnit::Seconds, time_step),
        attack: RisingEdge::new(),
        last_value: 0.0,
    })
}

impl VoicePatch for HammeredStrings {
    fn step(&mut self, ctx: &StepCtx) -> f32 {
        if self.attack.step(ctx.velocity) {
            // harder hits excite louder and bounce longer and later
            let v = ctx.velocity;
            self.env.set_range(0.0, 0.1 + (v * 0.9));
            self.bounce.feedback = 0.25 + (v * 0.25);
            self.bounce.set_length(
                0.05 + (v * 0.05),
                LocationUnit::Seconds,
                Resolution::Interpolated,
                self.time_step,
            );
        }
        if ctx.frequency > 0.0 && ctx.frequency != self.frequency {
            self.frequency = ctx.frequency;
            self.wave_guide.set_length(
                1.0 / ctx.frequency,
                LocationUnit::Seconds,
                Resolution::Interpolated,
                self.time_step,
            );
        }
        self.amp.ratio = self.env.step(ctx.velocity, self.time_step);
        let brightness = self.brightness.step(ctx.velocity, self.time_step);
        let excitation = self.amp.process(self.noise.step());

        let Self {
            wave_guide,
            last_value,
            ..
        } = self;
        let string = wave_guide.step_with(excitation, |v| {
            // one-pole low-pass in the feedback path, darker as the
            // brightness envelope falls off
            let mix = 1.0 - (brightness * 0.5);
            let out = (v * mix) + (*last_value * (1.0 - mix));
            *last_value = v;
            out * 0.99
        });
        (string + self.bounce.step(string)) * 0.25
    }
}
