//! Where locations come from and where update directives go.
//!
//! The reconciler only sees the `LocationSource` and `LocationUpdater`
//! traits. The file-backed implementations read snapshots exported from the
//! listing API and the CRM, and write directives as JSON lines for a
//! separate pusher to apply.

use {
    crate::sync::{
        cache::TtlCache,
        extract::{
            crm::CrmLocation,
            listing::ListingLocation,
        },
        reconcile::UpdateDirective,
    },
    anyhow::{
        Context,
        Result,
    },
    serde::{
        Deserialize,
        Serialize,
        de::DeserializeOwned,
    },
    std::{
        fs::{
            File,
            OpenOptions,
        },
        io::{
            BufReader,
            Write,
        },
        path::{
            Path,
            PathBuf,
        },
        sync::{
            Arc,
            Mutex,
        },
        time::Duration,
    },
};

const LISTING_KEY: &str = "listing";
const CRM_KEY: &str = "crm";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON array of listing-API locations.
    pub listing_snapshot: PathBuf,
    /// JSON array of CRM clinic records.
    pub crm_snapshot:     PathBuf,
    /// How long a loaded snapshot is reused. Zero disables caching.
    #[serde(with = "humantime_serde")]
    pub cache_ttl:        Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_snapshot: PathBuf::from("data/listing_locations.json"),
            crm_snapshot:     PathBuf::from("data/crm_locations.json"),
            cache_ttl:        Duration::from_secs(300),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// File that pushed directives are appended to, one JSON object per line.
    pub directive_log: PathBuf,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            directive_log: PathBuf::from("data/directives.jsonl"),
        }
    }
}

pub trait LocationSource {
    fn listing_locations(&self) -> Result<Vec<ListingLocation>>;

    fn crm_locations(&self) -> Result<Vec<CrmLocation>>;

    /// First CRM record whose place id matches, ignoring surrounding
    /// whitespace.
    fn crm_location_by_place_id(&self, place_id: &str) -> Result<Option<CrmLocation>> {
        Ok(self
            .crm_locations()?
            .into_iter()
            .find(|location| location.place_id() == Some(place_id.trim())))
    }
}

pub struct FileSnapshotSource {
    config:  Config,
    listing: TtlCache<Vec<ListingLocation>>,
    crm:     TtlCache<Vec<CrmLocation>>,
}

fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Could not open snapshot {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Could not parse snapshot {}", path.display()))
}

impl FileSnapshotSource {
    pub fn new(config: Config) -> Self {
        Self {
            listing: TtlCache::new(config.cache_ttl),
            crm: TtlCache::new(config.cache_ttl),
            config,
        }
    }

    /// Drops cached snapshots so the next read goes to disk.
    pub fn invalidate(&self) {
        self.listing.clear();
        self.crm.clear();
    }
}

impl LocationSource for FileSnapshotSource {
    fn listing_locations(&self) -> Result<Vec<ListingLocation>> {
        let path = &self.config.listing_snapshot;
        let (locations, cached) = self.listing.fetch(LISTING_KEY, || read_snapshot(path))?;
        tracing::debug!(count = locations.len(), cached, "Loaded listing locations.");
        Ok(locations)
    }

    fn crm_locations(&self) -> Result<Vec<CrmLocation>> {
        let path = &self.config.crm_snapshot;
        let (locations, cached) = self.crm.fetch(CRM_KEY, || read_snapshot(path))?;
        tracing::debug!(count = locations.len(), cached, "Loaded CRM locations.");
        Ok(locations)
    }
}

pub trait LocationUpdater {
    /// Applies `directive` to the mirror location with resource name
    /// `location_name`.
    fn push(&self, location_name: &str, directive: &UpdateDirective) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectiveRecord<'a> {
    location:  &'a str,
    directive: &'a UpdateDirective,
}

pub struct DirectiveFileUpdater {
    path: PathBuf,
}

impl DirectiveFileUpdater {
    pub fn new(config: &UpdaterConfig) -> Self {
        Self {
            path: config.directive_log.clone(),
        }
    }
}

impl LocationUpdater for DirectiveFileUpdater {
    fn push(&self, location_name: &str, directive: &UpdateDirective) -> Result<()> {
        let mut line = serde_json::to_string(&DirectiveRecord {
            location: location_name,
            directive,
        })?;
        line.push('\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .with_context(|| format!("Could not append directive to {}", self.path.display()))?;

        tracing::info!(location = %location_name, path = %self.path.display(), "Directive written.");
        Ok(())
    }
}

/// Logs directives instead of applying them, keeping them for inspection.
#[derive(Clone, Default)]
pub struct DryRunUpdater {
    pushed: Arc<Mutex<Vec<(String, UpdateDirective)>>>,
}

impl DryRunUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushed(&self) -> Vec<(String, UpdateDirective)> {
        self.pushed
            .lock()
            .map(|pushed| pushed.clone())
            .unwrap_or_default()
    }
}

impl LocationUpdater for DryRunUpdater {
    fn push(&self, location_name: &str, directive: &UpdateDirective) -> Result<()> {
        tracing::info!(
            location = %location_name,
            directive = %serde_json::to_string(directive)?,
            "Dry run, not pushing directive."
        );
        self.pushed
            .lock()
            .map_err(|_| anyhow::anyhow!("dry run log poisoned"))?
            .push((location_name.to_string(), directive.clone()));
        Ok(())
    }
}
