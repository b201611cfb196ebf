//! Error diffusion kernel definitions.

/// An error diffusion kernel.
///
/// Each entry is `(dx, dy, weight)`: a forward neighbor relative to the pixel
/// being quantized and the numerator of the share of residual it receives.
/// The share is `weight / divisor`.
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    /// (dx, dy, weight) entries, all pointing at pixels not yet visited in
    /// row-major order.
    pub entries: &'static [(i32, i32, u8)],

    /// Normalizing divisor for the weights.
    pub divisor: u8,
}

impl Kernel {
    /// Sum of all entry weights.
    ///
    /// Equal to `divisor` when the kernel propagates 100% of the residual.
    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|&(_, _, w)| u32::from(w)).sum()
    }
}

/// Floyd-Steinberg kernel.
///
/// ```text
///        X   7
///    3   5   1
/// ```
pub const FLOYD_STEINBERG: Kernel = Kernel {
    entries: &[
        (1, 0, 7),  // right
        (-1, 1, 3), // bottom-left
        (0, 1, 5),  // bottom
        (1, 1, 1),  // bottom-right
    ],
    divisor: 16,
};
