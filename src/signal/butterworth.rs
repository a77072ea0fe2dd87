//! Butterworth low-pass filtering
//!
//! Realizes an order-N Butterworth low-pass as a cascade of second-order
//! (biquad) sections, plus one first-order section for odd orders. The
//! cascade can be run causally or forward-backward for a zero-phase result.

use crate::{Error, Result};

/// One normalized second-order section (`a0 == 1`).
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 2],
}

impl Biquad {
    /// Low-pass section with cutoff `omega0` (rad/sample) and quality `q`.
    fn low_pass(omega0: f64, q: f64) -> Self {
        let cos_w = omega0.cos();
        let alpha = omega0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b: [
                (1.0 - cos_w) / 2.0 / a0,
                (1.0 - cos_w) / a0,
                (1.0 - cos_w) / 2.0 / a0,
            ],
            a: [-2.0 * cos_w / a0, (1.0 - alpha) / a0],
        }
    }

    /// Run the section causally over `input` (direct form II transposed).
    fn run(&self, input: &mut [f64]) {
        let mut z1 = 0.0;
        let mut z2 = 0.0;
        for sample in input.iter_mut() {
            let x = *sample;
            let y = self.b[0] * x + z1;
            z1 = self.b[1] * x - self.a[0] * y + z2;
            z2 = self.b[2] * x - self.a[1] * y;
            *sample = y;
        }
    }
}

/// One normalized first-order low-pass section (odd filter orders).
#[derive(Debug, Clone, Copy)]
struct FirstOrder {
    b: [f64; 2],
    a1: f64,
}

impl FirstOrder {
    fn low_pass(omega0: f64) -> Self {
        let k = (omega0 / 2.0).tan();
        Self {
            b: [k / (k + 1.0), k / (k + 1.0)],
            a1: (k - 1.0) / (k + 1.0),
        }
    }

    fn run(&self, input: &mut [f64]) {
        let mut z1 = 0.0;
        for sample in input.iter_mut() {
            let x = *sample;
            let y = self.b[0] * x + z1;
            z1 = self.b[1] * x - self.a1 * y;
            *sample = y;
        }
    }
}

/// Designed Butterworth low-pass cascade.
#[derive(Debug, Clone)]
pub struct LowPass {
    order: usize,
    sections: Vec<Biquad>,
    first_order: Option<FirstOrder>,
}

impl LowPass {
    /// Design an order-`order` low-pass with `normalized_cutoff` relative to
    /// the Nyquist frequency (`0 < normalized_cutoff < 1`).
    ///
    /// Butterworth pole pairs sit at angles `theta_k = (2k - 1)·π / (2·order)`
    /// from the imaginary axis, giving section qualities
    /// `q_k = 1 / (2·sin(theta_k))`; an odd order contributes one real pole
    /// realized as a first-order section.
    pub fn design(order: usize, normalized_cutoff: f64) -> Result<Self> {
        if order == 0 {
            return Err(Error::Signal("Butterworth order must be at least 1".into()));
        }
        if !(normalized_cutoff > 0.0 && normalized_cutoff < 1.0) {
            return Err(Error::Signal(format!(
                "normalized cutoff {normalized_cutoff} outside (0, 1)"
            )));
        }

        let omega0 = std::f64::consts::PI * normalized_cutoff;
        let pairs = order / 2;
        let sections = (1..=pairs)
            .map(|k| {
                let theta = (2.0 * k as f64 - 1.0) * std::f64::consts::PI / (2.0 * order as f64);
                Biquad::low_pass(omega0, 1.0 / (2.0 * theta.sin()))
            })
            .collect();
        let first_order = (order % 2 == 1).then(|| FirstOrder::low_pass(omega0));

        Ok(Self {
            order,
            sections,
            first_order,
        })
    }

    /// Causal (single forward) pass over the signal.
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut out = input.to_vec();
        self.run_cascade(&mut out);
        out
    }

    /// Zero-phase (forward-backward) pass over the signal.
    ///
    /// The signal is extended at both ends by an odd reflection before the
    /// two passes so that filter start-up transients decay inside the
    /// padding instead of inside the data.
    pub fn filtfilt(&self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        if n < 2 {
            return input.to_vec();
        }
        let pad = (3 * (self.order + 1)).min(n - 1);

        let mut extended = Vec::with_capacity(n + 2 * pad);
        let first = input[0];
        let last = input[n - 1];
        extended.extend((1..=pad).rev().map(|j| 2.0 * first - input[j]));
        extended.extend_from_slice(input);
        extended.extend((1..=pad).map(|j| 2.0 * last - input[n - 1 - j]));

        self.run_cascade(&mut extended);
        extended.reverse();
        self.run_cascade(&mut extended);
        extended.reverse();

        extended[pad..pad + n].to_vec()
    }

    fn run_cascade(&self, signal: &mut [f64]) {
        for section in &self.sections {
            section.run(signal);
        }
        if let Some(first_order) = &self.first_order {
            first_order.run(signal);
        }
    }
}
