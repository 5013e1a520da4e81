use crate::graph::{Input, NodeId, SignalGraph, StepCtx};
use crate::patch::VoicePatch;

/// A perfect fifth above the fundamental.
const FIFTH: f32 = 1.334_840_0;

/// Root and fifth sines, each clipped against a ceiling that controller 1
/// raises from hard (0.5) to clean (1.0), then recentered.
struct DistortedFifths {
    graph: SignalGraph,
    fifth: NodeId,
    root_clip: NodeId,
    fifth_clip: NodeId,
}

pub fn voice(time_step: f32) -> Box<dyn VoicePatch> {
    let mut graph = SignalGraph::new(time_step);
    let root = graph.sine(Input::Frequency);
    let fifth = graph.sine(Input::None);
    let root_clip = graph.limit(Input::Node(root), 0.0, 0.5);
    let fifth_clip = graph.limit(Input::Node(fifth), 0.0, 0.5);
    let out = graph.mix(Input::Node(root_clip), Input::Node(fifth_clip), 0.5);
    graph.set_output(out);
    Box::new(DistortedFifths {
        graph,
        fifth,
        root_clip,
        fifth_clip,
    })
}

impl VoicePatch for DistortedFifths {
    fn step(&mut self, ctx: &StepCtx) -> f32 {
        let ceiling = 0.5 + (ctx.cv[1] * 0.5);
        self.graph.set_range(self.root_clip, 0.0, ceiling);
        self.graph.set_range(self.fifth_clip, 0.0, ceiling);
        self.graph.set_frequency(self.fifth, ctx.frequency * FIFTH);
        // normalize against the ceiling and recenter around zero
        let amp = 1.0 / ceiling;
        ((self.graph.step(ctx) * amp) - 0.5) * ctx.velocity
    }
}
