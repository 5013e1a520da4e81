use crate::graph::{Input, SignalGraph, StepCtx};
use crate::patch::VoicePatch;

/// A bare sine at the note frequency, scaled by velocity.
struct Beep {
    graph: SignalGraph,
}

pub fn voice(time_step: f32) -> Box<dyn VoicePatch> {
    let mut graph = SignalGraph::new(time_step);
    let osc = graph.sine(Input::Frequency);
    let scaled = graph.amplify(Input::Node(osc), Input::Velocity);
    let out = graph.amplify(Input::Node(scaled), Input::Const(0.25));
    graph.set_output(out);
    Box::new(Beep { graph })
}

impl VoicePatch for Beep {
    fn step(&mut self, ctx: &StepCtx) -> f32 {
        self.graph.step(ctx)
    }
}
