use crate::dsp::oscillator::ShapePoint;
use crate::graph::{Input, NodeId, SignalGraph, StepCtx};
use crate::patch::VoicePatch;

/// A break-point wave morphed between a triangle and a square by
/// controller 1, with a soft ADSR amplitude.
struct Squiangle {
    graph: SignalGraph,
    wave: NodeId,
    timbre: f32,
}

pub fn voice(time_step: f32) -> Box<dyn VoicePatch> {
    let mut graph = SignalGraph::new(time_step);
    let wave = graph.interpolated(Input::Frequency, &[]);
    let env = graph.adsr(0.10, 0.05, 0.5, 0.40, Input::Velocity);
    let out = graph.amplify(Input::Node(wave), Input::Node(env));
    graph.set_output(out);
    Box::new(Squiangle {
        graph,
        wave,
        // off-scale so the first step always applies the controller
        timbre: -1.0,
    })
}

impl VoicePatch for Squiangle {
    fn step(&mut self, ctx: &StepCtx) -> f32 {
        let timbre = ctx.cv[1];
        if timbre != self.timbre {
            self.timbre = timbre;
            // widen the flat tops from a triangle's points toward a square's
            let x = 0.25 * timbre;
            self.graph.set_shape(
                self.wave,
                &[
                    ShapePoint::new(0.25 - x, 1.0),
                    ShapePoint::new(0.25 + x, 1.0),
                    ShapePoint::new(0.75 - x, -1.0),
                    ShapePoint::new(0.75 + x, -1.0),
                ],
            );
        }
        self.graph.step(ctx)
    }
}
