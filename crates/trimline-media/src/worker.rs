// crates/trimline-media/src/worker.rs
//
// MediaWorker: owns the background threads. All public API the engine calls
// lives here.
//
// Threads:
//   one per zoom level   — serialises that level's batches, so appends for a
//                          level always arrive in request order
//   shared rayon pool    — decodes the frames of one batch in parallel; every
//                          pool worker gets its own decoder via map_init
//   one per export       — runs the blocking stream-copy pipeline
//
// Cancellation: `generation` mirrors the view's source epoch. Level threads
// skip jobs from older generations and stop decoding mid-batch as soon as it
// moves on; results that still slip through are rejected by the cache.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use trimline_core::media_types::{BatchPlan, MediaResult, Priority};
use trimline_core::{CachedFrame, TimelineError, TrimRange};

use crate::backend::MediaBackend;
use crate::decode::FrameDecoder;

/// Pending batches per level. The view keeps at most one in flight per level,
/// the rest is slack for stale jobs from replaced sources.
const LEVEL_QUEUE: usize = 8;

// ── Internal types ────────────────────────────────────────────────────────────

struct ThumbJob {
    generation: u64,
    path:       PathBuf,
    plan:       BatchPlan,
}

/// Background batches wait while an eager batch is decoding.
#[derive(Default)]
struct EagerGate {
    active: Mutex<usize>,
    idle:   Condvar,
}

impl EagerGate {
    fn enter(&self) -> EagerGuard<'_> {
        *self.active.lock() += 1;
        EagerGuard(self)
    }

    fn wait_idle(&self) {
        let mut active = self.active.lock();
        while *active > 0 {
            self.idle.wait(&mut active);
        }
    }
}

struct EagerGuard<'a>(&'a EagerGate);

impl Drop for EagerGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.0.active.lock();
        *active -= 1;
        if *active == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Everything a level thread needs; one clone per thread.
struct ThumbContext<B: MediaBackend> {
    backend:    Arc<B>,
    pool:       Arc<rayon::ThreadPool>,
    gate:       Arc<EagerGate>,
    generation: Arc<AtomicU64>,
    shutdown:   Arc<AtomicBool>,
    tx:         Sender<MediaResult>,
    size:       (u32, u32),
}

impl<B: MediaBackend> ThumbContext<B> {
    fn run(self, jobs: Receiver<ThumbJob>) {
        for job in jobs.iter() {
            if self.shutdown.load(Ordering::Relaxed) {
                return;
            }
            let level = job.plan.level;
            if job.generation != self.generation.load(Ordering::Acquire) {
                debug!("[thumbs] level {level}: skipping batch from generation {}", job.generation);
                continue;
            }

            match self.decode_batch(&job) {
                Ok(Some(frames)) => {
                    debug!("[thumbs] level {level}: {} frames decoded", frames.len());
                    let _ = self.tx.send(MediaResult::Thumbnails { generation: job.generation, level, frames });
                }
                Ok(None) => debug!("[thumbs] level {level}: batch abandoned, source changed"),
                Err(e) => {
                    warn!("[thumbs] level {level}: cannot open {}: {e:#}", job.path.display());
                    let _ = self.tx.send(MediaResult::SourceError {
                        generation: job.generation,
                        level,
                        error: TimelineError::SourceUnavailable {
                            path:   job.path.clone(),
                            reason: format!("{e:#}"),
                        },
                    });
                }
            }
        }
    }

    /// Decodes one batch in timestamp order. `Ok(None)` when the source
    /// changed before the batch finished.
    fn decode_batch(&self, job: &ThumbJob) -> anyhow::Result<Option<Vec<CachedFrame>>> {
        let _eager = match job.plan.priority {
            Priority::Eager => Some(self.gate.enter()),
            Priority::Background => {
                self.gate.wait_idle();
                None
            }
        };
        let (w, h) = self.size;
        let current = || self.generation.load(Ordering::Acquire) == job.generation;

        // Surface an unopenable source as an error instead of a strip of
        // placeholders.
        drop(self.backend.open_decoder(&job.path, w, h)?);

        let frames: Vec<CachedFrame> = self.pool.install(|| {
            job.plan
                .timestamps
                .par_iter()
                .map_init(
                    || self.backend.open_decoder(&job.path, w, h).ok(),
                    |decoder, &ts| {
                        if !current() {
                            return CachedFrame::placeholder(ts);
                        }
                        let image = decoder.as_mut().and_then(|d| match d.decode_at(ts) {
                            Ok(image) => Some(image),
                            Err(e) => {
                                debug!("[thumbs] {e}");
                                None
                            }
                        });
                        CachedFrame { timestamp_ms: ts, image }
                    },
                )
                .collect()
        });

        Ok(current().then_some(frames))
    }
}

// ── MediaWorker ───────────────────────────────────────────────────────────────

pub struct MediaWorker<B: MediaBackend> {
    /// Thumbnails, source errors and export progress, drained by the engine.
    pub rx:     Receiver<MediaResult>,
    tx:         Sender<MediaResult>,
    backend:    Arc<B>,
    generation: Arc<AtomicU64>,
    shutdown:   Arc<AtomicBool>,
    level_txs:  Vec<Sender<ThumbJob>>,
}

impl<B: MediaBackend> MediaWorker<B> {
    /// Spawns one thread per zoom level. `thumb_size` is the decoded
    /// thumbnail size in pixels.
    pub fn new(backend: Arc<B>, levels: usize, thumb_size: (u32, u32)) -> anyhow::Result<Self> {
        let (tx, rx) = bounded(512);
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .thread_name(|i| format!("trimline-decode-{i}"))
                .build()?,
        );
        let gate = Arc::new(EagerGate::default());
        let generation = Arc::new(AtomicU64::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut level_txs = Vec::with_capacity(levels);
        for level in 0..levels {
            let (job_tx, job_rx) = bounded::<ThumbJob>(LEVEL_QUEUE);
            let ctx = ThumbContext {
                backend:    Arc::clone(&backend),
                pool:       Arc::clone(&pool),
                gate:       Arc::clone(&gate),
                generation: Arc::clone(&generation),
                shutdown:   Arc::clone(&shutdown),
                tx:         tx.clone(),
                size:       thumb_size,
            };
            thread::Builder::new()
                .name(format!("trimline-level-{level}"))
                .spawn(move || ctx.run(job_rx))?;
            level_txs.push(job_tx);
        }

        info!("[media] worker up: {levels} levels, {} decode threads", pool.current_num_threads());
        Ok(Self { rx, tx, backend, generation, shutdown, level_txs })
    }

    /// Moves the worker to a new source epoch; older batches stop decoding.
    pub fn set_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::Release);
    }

    pub fn ensure_level(&self, generation: u64, path: PathBuf, plan: BatchPlan) {
        let level = plan.level;
        let Some(job_tx) = self.level_txs.get(level) else {
            warn!("[thumbs] no thread for level {level}");
            return;
        };
        match job_tx.try_send(ThumbJob { generation, path, plan }) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                // An empty batch releases the level's in-flight mark.
                warn!("[thumbs] level {level}: queue full, batch dropped");
                let _ = self.tx.try_send(MediaResult::Thumbnails {
                    generation: job.generation,
                    level,
                    frames: Vec::new(),
                });
            }
            Err(TrySendError::Disconnected(_)) => warn!("[thumbs] level {level}: thread gone"),
        }
    }

    /// Spawns the export thread. Progress and the outcome arrive on `rx`.
    pub fn start_export(&self, job_id: Uuid, src: PathBuf, dst: PathBuf, range: TrimRange) {
        let tx = self.tx.clone();
        let backend = Arc::clone(&self.backend);
        let shutdown = Arc::clone(&self.shutdown);
        thread::spawn(move || {
            if shutdown.load(Ordering::Relaxed) {
                let _ = tx.send(MediaResult::TrimFailed {
                    job_id,
                    error: TimelineError::trim_io("starting export", "worker shutting down"),
                });
                return;
            }
            info!(
                "[trim] job {job_id}: {}..{}ms of {} → {}",
                range.start_ms,
                range.end_ms,
                src.display(),
                dst.display()
            );
            let mut on_phase = |phase| {
                let _ = tx.send(MediaResult::TrimPhase { job_id, phase });
            };
            let result = backend.export_trim(&src, &dst, &range, &mut on_phase);
            let _ = match result {
                Ok(path) => tx.send(MediaResult::TrimDone { job_id, path }),
                Err(error) => tx.send(MediaResult::TrimFailed { job_id, error }),
            };
        });
    }
}

impl<B: MediaBackend> Drop for MediaWorker<B> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Abandon running batches; dropping the senders ends the level threads.
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.level_txs.clear();
    }
}
