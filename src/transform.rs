use std::num::NonZeroUsize;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::izip;
use log::{debug, info};

use crate::{
    batch::{Batch, Chunk},
    error::{DomainError, Error},
    event::{Event, RawEvent},
    kinematics::{azimuth, ln, momentum, pseudorapidity, sign, wrap_phi},
    source::{BatchSink, EventSource},
};

impl TryFrom<&RawEvent> for Event {
    type Error = DomainError;

    /// Compute derived quantities for the real particles of `source`
    ///
    /// The bookkeeping fields `orig_idx` and `idx` are left at zero.
    fn try_from(source: &RawEvent) -> Result<Self, Self::Error> {
        let particles = source.particles();
        let mut ev = Event::with_capacity(particles.len());
        for &[e, px, py, pz] in particles {
            ev.e.push(e);
            ev.px.push(px);
            ev.py.push(py);
            ev.pz.push(pz);
            ev.e_log.push(ln(e)?);
            let p = momentum(px, py, pz);
            ev.p.push(p);
            ev.p_log.push(ln(p)?);
        }
        ev.truth = source.truth;

        ev.e_tot = sum(&ev.e);
        ev.px_tot = sum(&ev.px);
        ev.py_tot = sum(&ev.py);
        ev.pz_tot = sum(&ev.pz);
        ev.p_tot = momentum(ev.px_tot, ev.py_tot, ev.pz_tot);
        ev.eta_tot = pseudorapidity(ev.pz_tot, ev.p_tot)?;
        ev.phi_tot = azimuth(ev.px_tot, ev.py_tot)?;

        let eta_sign = sign(ev.eta_tot);
        for (&px, &py, &pz, &p) in izip!(&ev.px, &ev.py, &ev.pz, &ev.p) {
            let eta = pseudorapidity(pz, p)?;
            let phi = azimuth(px, py)?;
            ev.eta_rel.push(eta_sign * (eta - ev.eta_tot));
            ev.phi_rel.push(wrap_phi(phi - ev.phi_tot));
        }
        Ok(ev)
    }
}

// left to right starting from +0, so an empty sum is +0
fn sum(x: &[f64]) -> f64 {
    x.iter().fold(0., |acc, x| acc + x)
}

/// Outcome of a conversion run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Number of converted events
    pub events: usize,
    /// Names of the stored chunks, in order
    pub chunks: Vec<String>,
}

/// Streams input tables through the event transformation into
/// fixed-size output chunks
#[derive(Debug)]
pub struct EventTransformer<S, W> {
    source: S,
    sink: W,
    progress: bool,
}

impl<S: EventSource, W: BatchSink> EventTransformer<S, W> {
    pub fn new(source: S, sink: W) -> Self {
        Self {
            source,
            sink,
            progress: false,
        }
    }

    /// Show a progress bar while processing each input table
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Convert the tables `inputs` in order
    ///
    /// Output chunks are stored as `{prefix}_{n}` with at most
    /// `max_batch_size` events each. Any error aborts the run; chunks
    /// that were already stored remain.
    pub fn transform<I>(
        &mut self,
        inputs: I,
        prefix: &str,
        max_batch_size: NonZeroUsize,
    ) -> Result<Summary, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut summary = Summary::default();
        let mut batch = Batch::new(max_batch_size);
        for input in inputs {
            let input = input.as_ref();
            info!("Reading table from: {input}");
            let rows = self.source.read_table(input)?;

            info!("Processing {} events ...", rows.len());
            let progress = self.progress_bar(rows.len());
            for (n, raw) in rows.iter().enumerate() {
                let orig_idx = summary.events;
                let mut ev = Event::try_from(raw)
                    .map_err(|source| Error::Domain { orig_idx, source })?;
                ev.orig_idx = orig_idx;
                ev.idx = batch.len();
                if n == 0 {
                    debug!("First event of {input}: {ev:?}");
                }
                batch.append(ev);
                summary.events += 1;
                progress.inc(1);

                if batch.is_full() {
                    self.store(batch.flush(), prefix, &mut summary)?;
                }
            }
            progress.finish_and_clear();
        }
        if !batch.is_empty() || batch.flushed() == 0 {
            self.store(batch.flush(), prefix, &mut summary)?;
        }
        Ok(summary)
    }

    fn store(
        &mut self,
        chunk: Chunk,
        prefix: &str,
        summary: &mut Summary,
    ) -> Result<(), Error> {
        let name = format!("{prefix}_{}", chunk.number);
        info!("Saving {} events to {name} ...", chunk.events.len());
        self.sink.store(&name, &chunk.events)?;
        summary.chunks.push(name);
        Ok(())
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template(
            "{bar:40} {pos}/{len} [{elapsed_precise}<{eta_precise}, {per_sec}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(len as u64).with_style(style)
    }
}
