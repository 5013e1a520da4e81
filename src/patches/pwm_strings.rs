use crate::dsp::envelope::Adsr;
use crate::dsp::oscillator::Sine;
use crate::dsp::OutputRange;
use crate::graph::{Input, NodeId, SignalGraph, StepCtx};
use crate::patch::VoicePatch;

/// Two detuned pulses, each with its own width LFO, blended 2:1. The
/// pulse pair lives in a graph; the tremolos and amplitude envelope run
/// alongside it, with controller 1 deepening the tremolo.
struct PwmStrings {
    graph: SignalGraph,
    pulses: [NodeId; 2],
    tremolo: [Sine; 2],
    envelope: Adsr,
    time_step: f32,
}

pub fn voice(time_step: f32) -> Box<dyn VoicePatch> {
    let mut graph = SignalGraph::new(time_step);
    let mut pulses = [NodeId(0); 2];
    for slot in &mut pulses {
        let lfo = graph.triangle(Input::None);
        graph.set_frequency(lfo, 5.0);
        graph.set_range(lfo, 0.05, 0.5);
        *slot = graph.pulse(Input::None, Input::Node(lfo));
    }
    let out = graph.mix(Input::Node(pulses[0]), Input::Node(pulses[1]), 0.33);
    graph.set_output(out);

    let mut tremolo = [Sine::new(8.0), Sine::new(9.5)];
    for sine in &mut tremolo {
        sine.range = OutputRange::new(1.0, 1.0);
    }
    Box::new(PwmStrings {
        graph,
        pulses,
        tremolo,
        envelope: Adsr::new(0.25, 0.0, 1.0, 0.5),
        time_step,
    })
}

impl VoicePatch for PwmStrings {
    fn step(&mut self, ctx: &StepCtx) -> f32 {
        let amp = self.envelope.step(ctx.velocity, self.time_step) * 0.25;
        if amp == 0.0 {
            return 0.0;
        }
        let mut frequency = ctx.frequency;
        for (pulse, tremolo) in self.pulses.iter().zip(&mut self.tremolo) {
            self.graph.set_frequency(*pulse, frequency);
            tremolo.range.min = 1.0 - (ctx.cv[1] * 0.1);
            let trem = tremolo.step(self.time_step);
            self.graph.set_range(*pulse, -trem, trem);
            // detune the second pulse for a chorus effect
            frequency *= 1.01;
        }
        self.graph.step(ctx) * amp
    }
}
