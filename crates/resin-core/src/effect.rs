//! The [`Effect`] trait and chaining combinators.
//!
//! Every processor in the shared effects chain implements [`Effect`]. The
//! trait is object-safe so hosts can build `Vec<Box<dyn Effect>>` chains,
//! but static dispatch through [`EffectExt::chain`] is preferred on the
//! render path.
//!
//! Mono processing is the base contract. Effects that maintain distinct
//! left/right state (ping-pong delay, plate reverb, stereo-linked
//! limiting) override [`Effect::process_stereo`] and report
//! `is_true_stereo() == true`; for everything else the default stereo
//! path runs the mono processor per channel.

/// Core trait for audio processors.
///
/// # Example
///
/// ```rust
/// use resin_core::Effect;
///
/// struct Attenuator {
///     gain: f32,
/// }
///
/// impl Effect for Attenuator {
///     fn process(&mut self, input: f32) -> f32 {
///         input * self.gain
///     }
///
///     fn set_sample_rate(&mut self, _sample_rate: f32) {}
///
///     fn reset(&mut self) {}
/// }
/// ```
pub trait Effect {
    /// Process a single mono sample, advancing internal state by one step.
    fn process(&mut self, input: f32) -> f32;

    /// Process one stereo frame.
    ///
    /// The default runs the mono processor on each channel, which is
    /// correct only for stateless or dual-mono effects. True stereo
    /// effects must override this.
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        (self.process(left), self.process(right))
    }

    /// Whether this effect keeps coupled left/right state.
    ///
    /// When `true`, callers must use [`process_stereo`](Self::process_stereo)
    /// rather than running two mono instances.
    fn is_true_stereo(&self) -> bool {
        false
    }

    /// Process a block of samples.
    ///
    /// Default calls [`process`](Self::process) per sample; effects may
    /// override for block-level optimizations.
    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len());
        for (inp, out) in input.iter().zip(output.iter_mut()) {
            *out = self.process(*inp);
        }
    }

    /// Process a buffer in place.
    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Update the sample rate and recalculate dependent coefficients.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear internal state without changing parameters.
    ///
    /// Called on transport stop/start and bypass toggles so stale delay
    /// content cannot leak into the next pass.
    fn reset(&mut self);

    /// Processing latency in samples, for host compensation.
    ///
    /// Zero for everything except lookahead processors.
    fn latency_samples(&self) -> usize {
        0
    }
}

/// Extension trait adding fluent chaining.
pub trait EffectExt: Effect + Sized {
    /// Feed this effect's output into `next`.
    ///
    /// ```rust,ignore
    /// let chain = delay.chain(reverb).chain(limiter);
    /// ```
    fn chain<E: Effect>(self, next: E) -> Chain<Self, E> {
        Chain {
            first: self,
            second: next,
        }
    }
}

impl<T: Effect> EffectExt for T {}

/// Two effects in series, created by [`EffectExt::chain`].
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A: Effect, B: Effect> Effect for Chain<A, B> {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mid = self.first.process(input);
        self.second.process(mid)
    }

    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let (ml, mr) = self.first.process_stereo(left, right);
        self.second.process_stereo(ml, mr)
    }

    fn is_true_stereo(&self) -> bool {
        self.first.is_true_stereo() || self.second.is_true_stereo()
    }

    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        self.first.process_block(input, output);
        self.second.process_block_inplace(output);
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.first.set_sample_rate(sample_rate);
        self.second.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }

    fn latency_samples(&self) -> usize {
        self.first.latency_samples() + self.second.latency_samples()
    }
}

impl<A, B> Chain<A, B> {
    /// Reference to the first effect.
    pub fn first(&self) -> &A {
        &self.first
    }

    /// Mutable reference to the first effect.
    pub fn first_mut(&mut self) -> &mut A {
        &mut self.first
    }

    /// Reference to the second effect.
    pub fn second(&self) -> &B {
        &self.second
    }

    /// Mutable reference to the second effect.
    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gain(f32);

    impl Effect for Gain {
        fn process(&mut self, input: f32) -> f32 {
            input * self.0
        }
        fn set_sample_rate(&mut self, _: f32) {}
        fn reset(&mut self) {}
    }

    #[test]
    fn chain_multiplies_through() {
        let mut chain = Gain(2.0).chain(Gain(3.0));
        assert_eq!(chain.process(1.0), 6.0);
    }

    #[test]
    fn chain_block() {
        let mut chain = Gain(2.0).chain(Gain(0.5));
        let input = [1.0, 2.0, 3.0];
        let mut output = [0.0; 3];
        chain.process_block(&input, &mut output);
        assert_eq!(output, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn chain_stereo_defaults_to_dual_mono() {
        let mut chain = Gain(2.0).chain(Gain(2.0));
        let (l, r) = chain.process_stereo(0.25, -0.25);
        assert_eq!(l, 1.0);
        assert_eq!(r, -1.0);
        assert!(!chain.is_true_stereo());
    }

    #[test]
    fn chain_sums_latency() {
        struct Lookahead(usize);
        impl Effect for Lookahead {
            fn process(&mut self, input: f32) -> f32 {
                input
            }
            fn set_sample_rate(&mut self, _: f32) {}
            fn reset(&mut self) {}
            fn latency_samples(&self) -> usize {
                self.0
            }
        }

        let chain = Lookahead(10).chain(Lookahead(5));
        assert_eq!(chain.latency_samples(), 15);
    }
}
