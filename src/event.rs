/// Number of particle slots in each input row
pub const MAX_PARTICLES: usize = 200;

/// One row of the input table
///
/// Slots are `[E, PX, PY, PZ]`. The first slot with vanishing energy
/// and everything after it is padding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawEvent {
    /// Particle slots, at most `MAX_PARTICLES` are considered. Readers
    /// may leave out the padding.
    pub slots: Vec<[f64; 4]>,
    /// Event-level truth information and labels
    pub truth: Truth,
}

impl RawEvent {
    /// Number of real particles
    ///
    /// This is the index of the first slot with `E == 0`, or the
    /// number of scanned slots if there is none.
    pub fn n_part(&self) -> usize {
        let nslots = self.slots.len().min(MAX_PARTICLES);
        self.slots[..nslots]
            .iter()
            .position(|p| p[0] == 0.)
            .unwrap_or(nslots)
    }

    /// Real particles, padding excluded
    pub fn particles(&self) -> &[[f64; 4]] {
        &self.slots[..self.n_part()]
    }
}

/// Truth-level information copied verbatim into the output
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Truth {
    /// `truthE`
    pub e: f64,
    /// `truthPX`
    pub px: f64,
    /// `truthPY`
    pub py: f64,
    /// `truthPZ`
    pub pz: f64,
    /// `ttv`: sample split tag
    pub ttv: i64,
    /// `is_signal_new`: 1 for top jets, 0 for QCD
    pub is_signal_new: i64,
}

/// Transformed event
///
/// All per-particle vectors have length `n_part` and are aligned by
/// particle index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    /// `E`
    pub e: Vec<f64>,
    /// `PX`
    pub px: Vec<f64>,
    /// `PY`
    pub py: Vec<f64>,
    /// `PZ`
    pub pz: Vec<f64>,
    /// `E_log`: ln(E)
    pub e_log: Vec<f64>,
    /// `P`: magnitude of the three-momentum
    pub p: Vec<f64>,
    /// `P_log`: ln(P)
    pub p_log: Vec<f64>,
    /// `Etarel`: pseudorapidity relative to the event axis
    pub eta_rel: Vec<f64>,
    /// `Phirel`: azimuthal angle relative to the event axis
    pub phi_rel: Vec<f64>,
    pub truth: Truth,
    /// `E_tot`
    pub e_tot: f64,
    /// `PX_tot`
    pub px_tot: f64,
    /// `PY_tot`
    pub py_tot: f64,
    /// `PZ_tot`
    pub pz_tot: f64,
    /// `P_tot`
    pub p_tot: f64,
    /// `Eta_tot`
    pub eta_tot: f64,
    /// `Phi_tot`
    pub phi_tot: f64,
    /// `nPart`: number of real particles
    pub n_part: usize,
    /// `origIdx`: running row index over all input tables
    pub orig_idx: usize,
    /// `idx`: position inside the output chunk
    pub idx: usize,
}

impl Event {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            e: Vec::with_capacity(n),
            px: Vec::with_capacity(n),
            py: Vec::with_capacity(n),
            pz: Vec::with_capacity(n),
            e_log: Vec::with_capacity(n),
            p: Vec::with_capacity(n),
            p_log: Vec::with_capacity(n),
            eta_rel: Vec::with_capacity(n),
            phi_rel: Vec::with_capacity(n),
            n_part: n,
            ..Default::default()
        }
    }
}
