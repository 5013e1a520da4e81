use crate::graph::{Input, SignalGraph, StepCtx};
use crate::patch::VoicePatch;

/// Pink noise scaled by velocity; frequency is ignored.
struct Noise {
    graph: SignalGraph,
}

pub fn voice(time_step: f32) -> Box<dyn VoicePatch> {
    let mut graph = SignalGraph::new(time_step);
    let noise = graph.pink_noise();
    let out = graph.amplify(Input::Node(noise), Input::Velocity);
    graph.set_output(out);
    Box::new(Noise { graph })
}

impl VoicePatch for Noise {
    fn step(&mut self, ctx: &StepCtx) -> f32 {
        self.graph.step(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CV_COUNT;

    #[test]
    fn stays_in_range_and_moves() {
        let mut voice = voice(1.0 / 64.0);
        let cv = [0.0; CV_COUNT];
        let ctx = StepCtx {
            frequency: 440.0,
            velocity: 1.0,
            cv: &cv,
        };
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for _ in 0..512 {
            let sample = voice.step(&ctx);
            assert!((-1.0..=1.0).contains(&sample));
            min = min.min(sample);
            max = max.max(sample);
        }
        assert!(max > min);
    }
}
