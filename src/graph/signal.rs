use std::mem;

use super::node::{Input, Node, NodeId, StepCtx};
use crate::dsp::delay::{Delay, LocationUnit, Resolution, WriteOp};
use crate::dsp::envelope::{Ad, Adsr};
use crate::dsp::generator::{BrownNoise, Dc, PinkNoise, WhiteNoise};
use crate::dsp::oscillator::{
    Additive, Interpolated, Pulse, Saw, ShapePoint, Sine, Triangle,
};
use crate::dsp::processor::{
    Amplifier, Limiter, Mixer, Quantizer, Rectifier, SampleAndHold, SlewRateLimiter,
};

/*
 * Evaluation model
 * ================
 *
 * The graph is an arena of nodes addressed by index. Each sample, the
 * output node is pulled; pulling a node takes it out of the arena
 * (leaving `Detached` in its slot), resolves its inputs (which may pull
 * further nodes), steps it, and puts it back. A pull that lands on a
 * `Detached` slot has found a cycle and yields silence, so a mispatched
 * graph degrades instead of overflowing the stack.
 *
 * Splitters let one node feed several consumers without being stepped
 * once per consumer. The splitter caches a value; each output leg hands
 * that value over once. Pulling a leg that has already delivered
 * re-steps the source, refreshes the cache, and rearms every leg, so
 * consumers that pull once per sample all see the same sample.
 */

/// A per-voice signal graph.
///
/// Built once by a patch, then stepped once per sample with the voice's
/// frequency, velocity, and the shared controller values.
pub struct SignalGraph {
    nodes: Vec<Node>,
    time_step: f32,
    output: Option<NodeId>,
}

impl SignalGraph {
    pub fn new(time_step: f32) -> Self {
        Self {
            nodes: Vec::new(),
            time_step,
            output: None,
        }
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    /// Designate the node whose output is the graph's output.
    pub fn set_output(&mut self, id: NodeId) {
        self.output = Some(id);
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /* Builders. Each adds one node and returns its id. */

    pub fn dc(&mut self, min: f32, max: f32) -> NodeId {
        self.push(Node::Dc(Dc::new(min, max)))
    }

    pub fn white_noise(&mut self) -> NodeId {
        self.push(Node::WhiteNoise(WhiteNoise::new()))
    }

    pub fn pink_noise(&mut self) -> NodeId {
        self.push(Node::PinkNoise(PinkNoise::new()))
    }

    pub fn brown_noise(&mut self) -> NodeId {
        self.push(Node::BrownNoise(BrownNoise::new()))
    }

    pub fn sine(&mut self, frequency: Input) -> NodeId {
        self.push(Node::Sine {
            osc: Sine::new(0.0),
            frequency,
            sync: None,
        })
    }

    pub fn pulse(&mut self, frequency: Input, width: Input) -> NodeId {
        self.push(Node::Pulse {
            osc: Pulse::new(0.0),
            frequency,
            width,
            sync: None,
        })
    }

    pub fn saw(&mut self, frequency: Input) -> NodeId {
        self.push(Node::Saw {
            osc: Saw::new(0.0),
            frequency,
            sync: None,
        })
    }

    pub fn triangle(&mut self, frequency: Input) -> NodeId {
        self.push(Node::Triangle {
            osc: Triangle::new(0.0),
            frequency,
            sync: None,
        })
    }

    pub fn interpolated(&mut self, frequency: Input, points: &[ShapePoint]) -> NodeId {
        let mut osc = Interpolated::new(0.0);
        osc.shape(points);
        self.push(Node::Interpolated {
            osc,
            frequency,
            sync: None,
        })
    }

    pub fn additive(&mut self, frequency: Input, partial_count: usize) -> NodeId {
        self.push(Node::Additive {
            osc: Additive::new(partial_count, 0.0),
            frequency,
            sync: None,
        })
    }

    pub fn adsr(&mut self, attack: f32, decay: f32, sustain: f32, release: f32, gate: Input) -> NodeId {
        self.push(Node::Adsr {
            env: Adsr::new(attack, decay, sustain, release),
            gate,
        })
    }

    pub fn ad(&mut self, attack: f32, decay: f32, gate: Input) -> NodeId {
        self.push(Node::Ad {
            env: Ad::new(attack, decay),
            gate,
        })
    }

    pub fn amplify(&mut self, source: Input, ratio: Input) -> NodeId {
        self.push(Node::Amplify {
            source,
            ratio,
            amp: Amplifier::new(1.0),
        })
    }

    pub fn limit(&mut self, source: Input, min: f32, max: f32) -> NodeId {
        self.push(Node::Limit {
            source,
            limiter: Limiter::new(min, max),
        })
    }

    pub fn rectify(&mut self, source: Input, min: f32, max: f32) -> NodeId {
        self.push(Node::Rectify {
            source,
            rectifier: Rectifier::new(min, max),
        })
    }

    pub fn slew(&mut self, source: Input, rise_time: f32, fall_time: f32, source_range: f32) -> NodeId {
        self.push(Node::Slew {
            source,
            slew: SlewRateLimiter::new(rise_time, fall_time),
            source_range,
        })
    }

    pub fn quantize(&mut self, source: Input, steps: u32) -> NodeId {
        self.push(Node::Quantize {
            source,
            quantizer: Quantizer::new(steps),
        })
    }

    pub fn sample_hold(&mut self, source: Input, frequency: f32) -> NodeId {
        self.push(Node::SampleHold {
            source,
            sampler: SampleAndHold::new(frequency),
        })
    }

    pub fn mix(&mut self, a: Input, b: Input, ratio: f32) -> NodeId {
        self.push(Node::Mix {
            a,
            b,
            mixer: Mixer::new(ratio),
        })
    }

    pub fn am(&mut self, carrier: Input, modulator: Input) -> NodeId {
        self.push(Node::Am { carrier, modulator })
    }

    pub fn fm(&mut self, carrier: NodeId, modulator: Input) -> NodeId {
        self.push(Node::Fm { carrier, modulator })
    }

    pub fn delay(&mut self, source: Input, seconds: f32) -> NodeId {
        let time_step = self.time_step;
        self.push(Node::DelayLine {
            source,
            delay: Delay::with_length(seconds, LocationUnit::Seconds, time_step),
        })
    }

    /// Add a fan-out point over `source` with `legs` consumer-facing
    /// outputs. Consumers connect to the returned output ids, never to the
    /// splitter itself.
    pub fn splitter(&mut self, source: Input, legs: usize) -> (NodeId, Vec<NodeId>) {
        let splitter = self.push(Node::Splitter { source, value: 0.0 });
        let outputs = (0..legs)
            .map(|_| {
                self.push(Node::SplitterOutput {
                    splitter,
                    sent: true,
                })
            })
            .collect();
        (splitter, outputs)
    }

    /* Accessors. Each is a no-op when the node is not of the matching
     * kind, so patch code can hold ids loosely. */

    /// Rewire a node's primary input: an oscillator's frequency, an
    /// envelope's gate, or a processor's source.
    pub fn connect(&mut self, id: NodeId, input: Input) {
        match &mut self.nodes[id.0] {
            Node::Sine { frequency, .. }
            | Node::Pulse { frequency, .. }
            | Node::Saw { frequency, .. }
            | Node::Triangle { frequency, .. }
            | Node::Interpolated { frequency, .. }
            | Node::Additive { frequency, .. } => *frequency = input,
            Node::Adsr { gate, .. } | Node::Ad { gate, .. } => *gate = input,
            Node::Amplify { source, .. }
            | Node::Limit { source, .. }
            | Node::Rectify { source, .. }
            | Node::Slew { source, .. }
            | Node::Quantize { source, .. }
            | Node::SampleHold { source, .. }
            | Node::DelayLine { source, .. }
            | Node::Splitter { source, .. } => *source = input,
            Node::Fm { modulator, .. } => *modulator = input,
            _ => {}
        }
    }

    /// Set the frequency an oscillator falls back to when its frequency
    /// input is disconnected.
    pub fn set_frequency(&mut self, id: NodeId, frequency: f32) {
        match &mut self.nodes[id.0] {
            Node::Sine { osc, .. } => osc.frequency = frequency,
            Node::Pulse { osc, .. } => osc.frequency = frequency,
            Node::Saw { osc, .. } => osc.frequency = frequency,
            Node::Triangle { osc, .. } => osc.frequency = frequency,
            Node::Interpolated { osc, .. } => osc.frequency = frequency,
            Node::Additive { osc, .. } => osc.frequency = frequency,
            Node::SampleHold { sampler, .. } => sampler.frequency = frequency,
            _ => {}
        }
    }

    pub fn set_range(&mut self, id: NodeId, min: f32, max: f32) {
        match &mut self.nodes[id.0] {
            Node::Dc(g) => g.range = crate::dsp::OutputRange::new(min, max),
            Node::WhiteNoise(g) => g.range = crate::dsp::OutputRange::new(min, max),
            Node::PinkNoise(g) => g.range = crate::dsp::OutputRange::new(min, max),
            Node::BrownNoise(g) => g.range = crate::dsp::OutputRange::new(min, max),
            Node::Sine { osc, .. } => osc.range = crate::dsp::OutputRange::new(min, max),
            Node::Pulse { osc, .. } => osc.range = crate::dsp::OutputRange::new(min, max),
            Node::Saw { osc, .. } => osc.range = crate::dsp::OutputRange::new(min, max),
            Node::Triangle { osc, .. } => osc.range = crate::dsp::OutputRange::new(min, max),
            Node::Interpolated { osc, .. } => {
                osc.range = crate::dsp::OutputRange::new(min, max)
            }
            Node::Additive { osc, .. } => osc.range = crate::dsp::OutputRange::new(min, max),
            Node::Adsr { env, .. } => env.set_range(min, max),
            Node::Ad { env, .. } => env.set_range(min, max),
            Node::Limit { limiter, .. } => {
                limiter.range = crate::dsp::OutputRange::new(min, max)
            }
            Node::Rectify { rectifier, .. } => {
                rectifier.range = crate::dsp::OutputRange::new(min, max)
            }
            Node::Quantize { quantizer, .. } => {
                quantizer.range = crate::dsp::OutputRange::new(min, max)
            }
            _ => {}
        }
    }

    pub fn set_phase(&mut self, id: NodeId, phase: f32) {
        match &mut self.nodes[id.0] {
            Node::Sine { osc, .. } => osc.phase = phase,
            Node::Pulse { osc, .. } => osc.phase = phase,
            Node::Saw { osc, .. } => osc.phase = phase,
            Node::Triangle { osc, .. } => osc.phase = phase,
            Node::Interpolated { osc, .. } => osc.phase = phase,
            Node::Additive { osc, .. } => osc.phase = phase,
            _ => {}
        }
    }

    pub fn set_width(&mut self, id: NodeId, width: f32) {
        if let Node::Pulse { osc, .. } = &mut self.nodes[id.0] {
            osc.width = width;
        }
    }

    pub fn set_shape(&mut self, id: NodeId, points: &[ShapePoint]) {
        if let Node::Interpolated { osc, .. } = &mut self.nodes[id.0] {
            osc.shape(points);
        }
    }

    pub fn set_mix(&mut self, id: NodeId, ratio: f32) {
        if let Node::Mix { mixer, .. } = &mut self.nodes[id.0] {
            mixer.ratio = ratio;
        }
    }

    pub fn set_feedback(&mut self, id: NodeId, feedback: f32) {
        if let Node::DelayLine { delay, .. } = &mut self.nodes[id.0] {
            delay.feedback = feedback;
        }
    }

    pub fn set_delay_length(&mut self, id: NodeId, length: f32, unit: LocationUnit) {
        let time_step = self.time_step;
        if let Node::DelayLine { delay, .. } = &mut self.nodes[id.0] {
            delay.set_length(length, unit, Resolution::Interpolated, time_step);
        }
    }

    pub fn tap_in(
        &mut self,
        id: NodeId,
        location: f32,
        value: f32,
        unit: LocationUnit,
        resolution: Resolution,
        op: WriteOp,
    ) {
        if let Node::DelayLine { delay, .. } = &mut self.nodes[id.0] {
            delay.tap_in(location, value, unit, resolution, op);
        }
    }

    pub fn tap_out(&self, id: NodeId, location: f32, unit: LocationUnit, resolution: Resolution) -> f32 {
        match &self.nodes[id.0] {
            Node::DelayLine { delay, .. } => delay.tap_out(location, unit, resolution),
            _ => 0.0,
        }
    }

    /// Reset the slave oscillator's phase every time the master completes a
    /// cycle. The slave picks up the master's residual phase rather than
    /// zero, so the sync point does not drift at frequencies that are not an
    /// integer multiple of the sample rate.
    pub fn set_sync(&mut self, master: NodeId, slave: NodeId) {
        match &mut self.nodes[master.0] {
            Node::Sine { sync, .. }
            | Node::Pulse { sync, .. }
            | Node::Saw { sync, .. }
            | Node::Triangle { sync, .. }
            | Node::Interpolated { sync, .. }
            | Node::Additive { sync, .. } => *sync = Some(slave),
            _ => {}
        }
    }

    /* Evaluation. */

    /// Produce the next sample.
    pub fn step(&mut self, ctx: &StepCtx) -> f32 {
        match self.output {
            Some(id) => self.pull(id, ctx),
            None => 0.0,
        }
    }

    fn pull(&mut self, id: NodeId, ctx: &StepCtx) -> f32 {
        let mut node = mem::replace(&mut self.nodes[id.0], Node::Detached);
        let value = self.eval(&mut node, ctx);
        self.nodes[id.0] = node;
        value
    }

    fn input(&mut self, input: Input, ctx: &StepCtx) -> f32 {
        match input {
            Input::None => 0.0,
            Input::Const(value) => value,
            Input::Frequency => ctx.frequency,
            Input::Velocity => ctx.velocity,
            Input::Cv(index) => ctx.cv.get(index as usize).copied().unwrap_or(0.0),
            Input::Node(id) => self.pull(id, ctx),
        }
    }

    /// Resolve an oscillator's frequency input, falling back to the
    /// frequency stored on the oscillator when disconnected.
    fn frequency_input(&mut self, input: Input, fallback: f32, ctx: &StepCtx) -> f32 {
        match input {
            Input::None => fallback,
            other => self.input(other, ctx),
        }
    }

    fn eval(&mut self, node: &mut Node, ctx: &StepCtx) -> f32 {
        let dt = self.time_step;
        match node {
            Node::Detached => 0.0,
            Node::Dc(g) => g.step(),
            Node::WhiteNoise(g) => g.step(),
            Node::PinkNoise(g) => g.step(),
            Node::BrownNoise(g) => g.step(),
            Node::Sine {
                osc,
                frequency,
                sync,
            } => {
                let frequency = self.frequency_input(*frequency, osc.frequency, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency, dt);
                self.sync_slave(*sync, before, osc.phase);
                value
            }
            Node::Pulse {
                osc,
                frequency,
                width,
                sync,
            } => {
                if !matches!(width, Input::None) {
                    osc.width = self.input(*width, ctx);
                }
                let frequency = self.frequency_input(*frequency, osc.frequency, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency, dt);
                self.sync_slave(*sync, before, osc.phase);
                value
            }
            Node::Saw {
                osc,
                frequency,
                sync,
            } => {
                let frequency = self.frequency_input(*frequency, osc.frequency, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency, dt);
                self.sync_slave(*sync, before, osc.phase);
                value
            }
            Node::Triangle {
                osc,
                frequency,
                sync,
            } => {
                let frequency = self.frequency_input(*frequency, osc.frequency, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency, dt);
                self.sync_slave(*sync, before, osc.phase);
                value
            }
            Node::Interpolated {
                osc,
                frequency,
                sync,
            } => {
                let frequency = self.frequency_input(*frequency, osc.frequency, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency, dt);
                self.sync_slave(*sync, before, osc.phase);
                value
            }
            Node::Additive {
                osc,
                frequency,
                sync,
            } => {
                let frequency = self.frequency_input(*frequency, osc.frequency, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency, dt);
                self.sync_slave(*sync, before, osc.phase);
                value
            }
            Node::Adsr { env, gate } => {
                let excitation = self.input(*gate, ctx);
                env.step(excitation, dt)
            }
            Node::Ad { env, gate } => {
                let excitation = self.input(*gate, ctx);
                env.step(excitation, dt)
            }
            Node::Amplify { source, ratio, amp } => {
                if !matches!(ratio, Input::None) {
                    amp.ratio = self.input(*ratio, ctx);
                }
                let input = self.input(*source, ctx);
                amp.process(input)
            }
            Node::Limit { source, limiter } => {
                let input = self.input(*source, ctx);
                limiter.process(input)
            }
            Node::Rectify { source, rectifier } => {
                let input = self.input(*source, ctx);
                rectifier.process(input)
            }
            Node::Slew {
                source,
                slew,
                source_range,
            } => {
                let target = self.input(*source, ctx);
                slew.step(target, *source_range, dt)
            }
            Node::Quantize { source, quantizer } => {
                let input = self.input(*source, ctx);
                quantizer.process(input)
            }
            Node::SampleHold { source, sampler } => {
                let input = self.input(*source, ctx);
                sampler.step(input, dt)
            }
            Node::Mix { a, b, mixer } => {
                let a = self.input(*a, ctx);
                let b = self.input(*b, ctx);
                mixer.mix(a, b)
            }
            Node::Am { carrier, modulator } => {
                let modulator = self.input(*modulator, ctx);
                let carrier = self.input(*carrier, ctx);
                (1.0 + modulator) * carrier
            }
            Node::Fm { carrier, modulator } => {
                let offset = self.input(*modulator, ctx);
                self.pull_detuned(*carrier, offset, ctx)
            }
            Node::DelayLine { source, delay } => {
                let input = self.input(*source, ctx);
                delay.step(input)
            }
            Node::Splitter { source, value } => {
                *value = self.input(*source, ctx);
                *value
            }
            Node::SplitterOutput { splitter, sent } => {
                let splitter = *splitter;
                if *sent {
                    let value = self.pull(splitter, ctx);
                    for other in &mut self.nodes {
                        if let Node::SplitterOutput {
                            splitter: s,
                            sent: leg_sent,
                        } = other
                        {
                            if *s == splitter {
                                *leg_sent = false;
                            }
                        }
                    }
                    *sent = true;
                    value
                } else {
                    *sent = true;
                    match &self.nodes[splitter.0] {
                        Node::Splitter { value, .. } => *value,
                        _ => 0.0,
                    }
                }
            }
        }
    }

    /// Hand the master's residual phase to its sync slave when the master
    /// just wrapped.
    fn sync_slave(&mut self, sync: Option<NodeId>, before: f32, after: f32) {
        if let Some(slave) = sync {
            if after < before {
                self.set_phase(slave, after);
            }
        }
    }

    /// Step an oscillator at its resolved frequency plus `offset`, leaving
    /// the stored frequency untouched so the detune does not accumulate.
    fn pull_detuned(&mut self, id: NodeId, offset: f32, ctx: &StepCtx) -> f32 {
        let dt = self.time_step;
        let mut node = mem::replace(&mut self.nodes[id.0], Node::Detached);
        let value = match &mut node {
            Node::Sine {
                osc,
                frequency,
                sync,
            } => {
                let base = osc.frequency;
                let frequency = self.frequency_input(*frequency, base, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency + offset, dt);
                self.sync_slave(*sync, before, osc.phase);
                osc.frequency = base;
                value
            }
            Node::Pulse {
                osc,
                frequency,
                width,
                sync,
            } => {
                if !matches!(width, Input::None) {
                    osc.width = self.input(*width, ctx);
                }
                let base = osc.frequency;
                let frequency = self.frequency_input(*frequency, base, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency + offset, dt);
                self.sync_slave(*sync, before, osc.phase);
                osc.frequency = base;
                value
            }
            Node::Saw {
                osc,
                frequency,
                sync,
            } => {
                let base = osc.frequency;
                let frequency = self.frequency_input(*frequency, base, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency + offset, dt);
                self.sync_slave(*sync, before, osc.phase);
                osc.frequency = base;
                value
            }
            Node::Triangle {
                osc,
                frequency,
                sync,
            } => {
                let base = osc.frequency;
                let frequency = self.frequency_input(*frequency, base, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency + offset, dt);
                self.sync_slave(*sync, before, osc.phase);
                osc.frequency = base;
                value
            }
            Node::Interpolated {
                osc,
                frequency,
                sync,
            } => {
                let base = osc.frequency;
                let frequency = self.frequency_input(*frequency, base, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency + offset, dt);
                self.sync_slave(*sync, before, osc.phase);
                osc.frequency = base;
                value
            }
            Node::Additive {
                osc,
                frequency,
                sync,
            } => {
                let base = osc.frequency;
                let frequency = self.frequency_input(*frequency, base, ctx);
                let before = osc.phase;
                let value = osc.step_at(frequency + offset, dt);
                self.sync_slave(*sync, before, osc.phase);
                osc.frequency = base;
                value
            }
            other => self.eval(other, ctx),
        };
        self.nodes[id.0] = node;
        value
    }
}
