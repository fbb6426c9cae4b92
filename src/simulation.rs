use async_stream::stream;
use async_trait::async_trait;
use draftsafe_sdk::prelude::*;
use draftsafe_sdk::{DocumentId, TickReport};
use futures::stream::{Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Editor = AutoSaveCoordinator<Arc<FlakyPersistence>, Arc<MemoryCache>, ManualClock>;

/// Parameters of one simulation run
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub editors: usize,
    pub bursts_per_editor: usize,
    /// Fraction of remote saves that fail, 0.0 to 1.0.
    pub failure_rate: f64,
    pub seed: u64,
}

/// Statistics collected during a simulation run
#[derive(Clone, Debug, Default)]
pub struct SimulationStats {
    pub editors: usize,
    pub edits: usize,
    pub drafts_written: usize,
    pub debounce_saves: usize,
    pub periodic_saves: usize,
    pub failed_saves: usize,
    pub virtual_time: Duration,
    pub wall_time: Duration,
    pub consistent_editors: usize,
}

impl SimulationStats {
    pub fn is_consistent(&self) -> bool {
        self.consistent_editors == self.editors
    }

    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Soak Simulation Statistics                    ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Editors:                   {:>30} ║", self.editors);
        println!("║  Edits:                     {:>30} ║", self.edits);
        println!("║  Local Drafts Written:      {:>30} ║", self.drafts_written);
        println!("║  Debounced Saves:           {:>30} ║", self.debounce_saves);
        println!("║  Periodic Saves:            {:>30} ║", self.periodic_saves);
        println!("║  Failed Saves:              {:>30} ║", self.failed_saves);
        println!("║  Virtual Time:              {:>29}s ║", format!("{:.1}", self.virtual_time.as_secs_f64()));
        println!("║  Wall Time:                 {:>29}s ║", format!("{:.3}", self.wall_time.as_secs_f64()));
        println!("║  Consistent Editors:        {:>30} ║", format!("{}/{}", self.consistent_editors, self.editors));
        println!("╚════════════════════════════════════════════════════════════╝");
    }

    fn absorb(&mut self, report: &TickReport) {
        if report.draft_written {
            self.drafts_written += 1;
        }
        match report.save {
            Some(SaveTrigger::Debounce) => self.debounce_saves += 1,
            Some(SaveTrigger::Periodic) => self.periodic_saves += 1,
            _ => {}
        }
        if report.save_error.is_some() {
            self.failed_saves += 1;
        }
    }

    fn merge(&mut self, other: SimulationStats) {
        self.edits += other.edits;
        self.drafts_written += other.drafts_written;
        self.debounce_saves += other.debounce_saves;
        self.periodic_saves += other.periodic_saves;
        self.failed_saves += other.failed_saves;
        self.virtual_time = self.virtual_time.max(other.virtual_time);
        self.consistent_editors += other.consistent_editors;
    }
}

/// Remote store that fails a random fraction of calls.
pub struct FlakyPersistence {
    inner: MemoryPersistence,
    failure_rate: RwLock<f64>,
    rng: Mutex<StdRng>,
}

impl FlakyPersistence {
    pub fn new(failure_rate: f64, seed: u64) -> Self {
        Self {
            inner: MemoryPersistence::new(),
            failure_rate: RwLock::new(failure_rate),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn heal(&self) {
        *self.failure_rate.write() = 0.0;
    }

    pub fn latest(&self, document_id: &DocumentId) -> Option<ContentValue> {
        self.inner.latest(document_id)
    }
}

#[async_trait]
impl Persistence for FlakyPersistence {
    async fn persist(
        &self,
        document_id: &DocumentId,
        content: &ContentValue,
    ) -> Result<(), PersistError> {
        let rate = *self.failure_rate.read();
        let fail = rate > 0.0 && self.rng.lock().gen_bool(rate.min(1.0));
        if fail {
            return Err(PersistError::Unavailable("simulated outage".into()));
        }
        self.inner.persist(document_id, content).await
    }
}

/// A run of keystrokes followed by a pause.
#[derive(Clone, Copy, Debug)]
struct Burst {
    edits: usize,
    spacing_ms: u64,
    pause_ms: u64,
}

/// Generator that yields edit bursts for one editor
fn edit_bursts(seed: u64, bursts: usize) -> impl Stream<Item = Burst> {
    stream! {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..bursts {
            yield Burst {
                edits: rng.gen_range(1..40),
                spacing_ms: rng.gen_range(50..800),
                pause_ms: rng.gen_range(0..45_000),
            };
        }
    }
}

/// Advance virtual time by `ms`, ticking at every deadline on the way.
async fn wait(editor: &Editor, clock: &ManualClock, ms: u64, stats: &mut SimulationStats) {
    let target = clock.now_ms() + ms;
    while let Some(due) = editor.next_deadline() {
        if due > target {
            break;
        }
        clock.set(due);
        let report = editor.tick().await;
        stats.absorb(&report);
    }
    clock.set(target);
}

async fn run_editor(index: usize, config: SimulationConfig) -> SimulationStats {
    let seed = config.seed.wrapping_add(index as u64);
    let clock = ManualClock::new(1_700_000_000_000);
    let start = clock.now_ms();
    let persistence = Arc::new(FlakyPersistence::new(config.failure_rate, seed));
    let cache = Arc::new(MemoryCache::new());
    let document_id = format!("sim-{}", index);
    let editor = AutoSaveCoordinator::new(
        &document_id,
        persistence.clone(),
        cache.clone(),
        clock.clone(),
        AutoSaveConfig::default(),
    );

    let mut stats = SimulationStats::default();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut bursts = Box::pin(edit_bursts(seed, config.bursts_per_editor));

    while let Some(burst) = bursts.next().await {
        for _ in 0..burst.edits {
            let full = paragraphs.last().map_or(true, |p| p.len() >= 60);
            if full {
                paragraphs.push(format!("p{}", paragraphs.len()));
            } else if let Some(last) = paragraphs.last_mut() {
                last.push('x');
            }
            editor.update_content(ContentValue::from_paragraphs(&paragraphs));
            stats.edits += 1;
            wait(&editor, &clock, burst.spacing_ms, &mut stats).await;
        }
        wait(&editor, &clock, burst.pause_ms, &mut stats).await;
    }

    persistence.heal();
    if let Err(e) = editor.save().await {
        tracing::warn!(document_id = %document_id, error = %e, "final save failed");
    }

    let persisted = editor
        .document_id()
        .and_then(|id| persistence.latest(id));
    let consistent = editor.content().is_none() || persisted == editor.content();
    let no_draft = !editor.check_for_local_draft().has_local_draft;
    if consistent && no_draft {
        stats.consistent_editors = 1;
    } else {
        tracing::error!(document_id = %document_id, consistent, no_draft, "editor ended inconsistent");
    }

    editor.dispose();
    stats.virtual_time = Duration::from_millis(clock.now_ms() - start);
    stats
}

/// Run every editor of `config` concurrently and aggregate the results.
pub async fn run_simulation(config: SimulationConfig) -> SimulationStats {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Auto-Save Soak Simulation                           ║");
    println!("║  Editors: {} | Bursts/Editor: {} | Failure Rate: {:.0}% ║",
             config.editors, config.bursts_per_editor, config.failure_rate * 100.0);
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let mut handles = Vec::with_capacity(config.editors);
    for index in 0..config.editors {
        let config = config.clone();
        handles.push(tokio::spawn(run_editor(index, config)));
    }

    let mut stats = SimulationStats {
        editors: config.editors,
        ..SimulationStats::default()
    };
    for handle in handles {
        match handle.await {
            Ok(editor_stats) => stats.merge(editor_stats),
            Err(e) => tracing::error!(error = %e, "editor task failed"),
        }
    }
    stats.wall_time = start.elapsed();

    println!("  ✓ Completed");
    stats
}
