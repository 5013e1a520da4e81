use crate::graph::{Input, NodeId, SignalGraph, StepCtx};
use crate::patch::VoicePatch;

/// Two-operator FM with the modulator a quarter of the carrier frequency.
/// Controller 1 raises the modulation index from 2.5 to 12.5.
struct RoughFmBass {
    graph: SignalGraph,
    modulator: NodeId,
}

pub fn voice(time_step: f32) -> Box<dyn VoicePatch> {
    let mut graph = SignalGraph::new(time_step);
    let carrier = graph.sine(Input::Frequency);
    graph.set_range(carrier, -0.5, 0.5);
    let modulator = graph.sine(Input::None);
    let fm = graph.fm(carrier, Input::Node(modulator));
    let out = graph.amplify(Input::Node(fm), Input::Velocity);
    graph.set_output(out);
    Box::new(RoughFmBass { graph, modulator })
}

impl VoicePatch for RoughFmBass {
    fn step(&mut self, ctx: &StepCtx) -> f32 {
        let mod_index = 2.5 + (ctx.cv[1] * 10.0);
        let mod_frequency = ctx.frequency * 0.25;
        let mod_delta = mod_frequency * mod_index;
        self.graph.set_frequency(self.modulator, mod_frequency);
        self.graph.set_range(self.modulator, -mod_delta, mod_delta);
        self.graph.step(ctx)
    }
}
