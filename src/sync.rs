/* ###################################################### System Architecture #######################################################

+----------------------+                                              +----------------------+
|     Listing API      |                                              |         CRM          |
|   (mirror system)    |                                              |   (truth system)     |
+----------------------+                                              +----------------------+
           |                                                                     |
           v                                                                     v
  +-----------------+      +-----------------------------------+       +-----------------+
  |    Snapshot     |----->|          LocationSource           |<------|    Snapshot     |
  +-----------------+      |         (TtlCache per side)       |       +-----------------+
                           +-----------------------------------+
                                   |                 |
                                   v                 v
                        +-------------------+ +-------------------+
                        | Listing extractor | |   CRM extractor   |
                        +-------------------+ +-------------------+
                                   |                 |
                                   v                 v
                        +-----------------------------------------+
                        |   WeeklyHours / DateExceptions (x2)     |
                        |   canonical sort, JSON and SHA-256      |
                        +-----------------------------------------+
                                             |
                                             v
                        +-----------------------------------------+        +------------------+
                        |        Reconciliation decision          |------->| LocationUpdater  |----> directives
                        +-----------------------------------------+        +------------------+

The arrows on the diagram above represent the direction of data flow.

- Both systems are read as snapshots of raw location records, memoized for a configurable TTL.
- Each record is turned into two hours facets: a weekly schedule and a set of date exceptions.
  A record that cannot be turned into a facet yields an absent facet, never an empty one.
- Facets are compared by the hash of their canonical serialization. When they differ, the CRM's
  canonical payload replaces the listing's; nothing ever flows from the listing to the CRM.
- The report command runs the same extraction and comparison and prints it as a table
  or writes it to a CSV file.

################################################################################################################################## */

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod reconcile;
pub mod schedule;
pub mod services;
pub mod source;

use {
    self::{
        config::Config,
        extract::ExtractContext,
        services::{
            reconciler::ReconcileSummary,
            report::ReportRow,
        },
        source::{
            DirectiveFileUpdater,
            DryRunUpdater,
            FileSnapshotSource,
        },
    },
    anyhow::Result,
    std::path::PathBuf,
};

pub struct Syncer {
    config: Config,
    source: FileSnapshotSource,
}

impl Syncer {
    pub fn new(config: Config) -> Self {
        Self {
            source: FileSnapshotSource::new(config.source.clone()),
            config,
        }
    }

    fn prepare(&self, no_cache: bool) -> ExtractContext {
        if no_cache {
            tracing::info!("Ignoring cached snapshots.");
            self.source.invalidate();
        }
        let context = ExtractContext::from_config(&self.config.extract);
        tracing::debug!(today = %context.today, "Evaluating date exceptions.");
        context
    }

    /// Pushes the CRM's hours to every listing location that disagrees.
    /// With `dry_run` directives are only logged.
    pub fn reconcile(&self, no_cache: bool, dry_run: bool) -> Result<ReconcileSummary> {
        let context = self.prepare(no_cache);
        if dry_run {
            services::reconcile(&self.source, &DryRunUpdater::new(), &context)
        } else {
            let updater = DirectiveFileUpdater::new(&self.config.updater);
            services::reconcile(&self.source, &updater, &context)
        }
    }

    pub fn report(&self, no_cache: bool) -> Result<Vec<ReportRow>> {
        let context = self.prepare(no_cache);
        services::build_report(&self.source, &context)
    }

    /// Writes report rows to a timestamped CSV file and returns its path.
    pub fn write_csv_report(&self, rows: &[ReportRow]) -> Result<PathBuf> {
        services::write_csv_report(rows, &self.config.report)
    }
}
