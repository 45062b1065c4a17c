//! Demo data seeding
//!
//! Upserts the preset collections in the local store, then writes randomized
//! entities for each collection through the gateway write path. Most entities
//! are long-lived; a quarter of each collection gets a short lifetime so the
//! dashboard's expiring-soon figure has something to show.

use std::ops::Range;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::database::{Collection, CollectionRepository};
use crate::error::{StudioError, StudioResult};
use crate::gateway::{CreateEntityInput, EntityGateway};

/// Collections created by the seed tool, with their display colors
pub const PRESET_COLLECTIONS: [(&str, &str); 5] = [
    ("notes", "#3b82f6"),
    ("tickets", "#22c55e"),
    ("posts", "#a855f7"),
    ("events", "#f97316"),
    ("alerts", "#ef4444"),
];

pub const DEFAULT_SEED_COUNT: usize = 80;
/// Lifetime range for long-lived entities (about 70 to 85 minutes)
pub const LONG_BTL: Range<u64> = 2000..2600;
/// Lifetime range for soon-expiring entities (about 7 to 10 minutes)
pub const SOON_BTL: Range<u64> = 220..320;
const PROGRESS_EVERY: usize = 10;

const NOUNS: [&str; 10] = [
    "network", "database", "query", "entity", "index", "block", "studio", "faucet", "wallet",
    "client",
];
const VERBS: [&str; 10] = [
    "boosts", "updates", "creates", "deletes", "extends", "queries", "indexes", "streams",
    "mirrors", "verifies",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOptions {
    pub collections_only: bool,
    pub entities_only: bool,
    pub wipe_collections: bool,
    pub count: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            collections_only: false,
            entities_only: false,
            wipe_collections: false,
            count: DEFAULT_SEED_COUNT,
        }
    }
}

/// How many entities one collection receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub collection: String,
    pub count: usize,
}

impl PlanEntry {
    /// 25% (rounded down) of the entries get a short lifetime
    pub fn soon_count(&self) -> usize {
        self.count / 4
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub collections: Vec<Collection>,
    pub entities_created: usize,
    pub soon_expiring: usize,
}

/// Spread `total` evenly over `names`, placing the remainder at random, then shuffle
pub fn make_plan<R: Rng + ?Sized>(total: usize, names: &[String], rng: &mut R) -> Vec<PlanEntry> {
    if names.is_empty() {
        return Vec::new();
    }
    let base = total / names.len();
    let mut plan: Vec<PlanEntry> = names
        .iter()
        .map(|name| PlanEntry {
            collection: name.clone(),
            count: base,
        })
        .collect();
    for _ in 0..total - base * names.len() {
        let slot = rng.gen_range(0..plan.len());
        plan[slot].count += 1;
    }
    plan.shuffle(rng);
    plan
}

fn pick<'a, T: ?Sized, R: Rng + ?Sized>(items: &'a [&'a T], rng: &mut R) -> &'a T {
    items[rng.gen_range(0..items.len())]
}

/// "noun verb noun"
pub fn fake_sentence<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{} {} {}",
        pick(&NOUNS, rng),
        pick(&VERBS, rng),
        pick(&NOUNS, rng)
    )
}

fn fake_paragraph<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}. {}. {}.",
        fake_sentence(rng),
        fake_sentence(rng),
        fake_sentence(rng)
    )
}

/// Random payload shaped after the collection kind
pub fn random_payload<R: Rng + ?Sized>(collection: &str, rng: &mut R) -> JsonValue {
    let t = Utc::now().timestamp_millis();
    match collection {
        "notes" => json!({
            "title": fake_sentence(rng),
            "body": fake_paragraph(rng),
            "tags": ["studio", "demo"],
            "t": t,
        }),
        "tickets" => json!({
            "subject": fake_sentence(rng),
            "priority": rng.gen_range(1..=5),
            "open": rng.gen_bool(0.5),
            "t": t,
        }),
        "posts" => json!({
            "author": pick(&["Ada", "Linus", "Grace", "Alan"], rng),
            "likes": rng.gen_range(0..500),
            "t": t,
        }),
        "events" => json!({
            "name": fake_sentence(rng),
            "city": pick(&["Warsaw", "Berlin", "NYC", "SF"], rng),
            "attendees": rng.gen_range(10..300),
            "t": t,
        }),
        "alerts" => json!({
            "level": pick(&["low", "medium", "high", "critical"], rng),
            "message": fake_sentence(rng),
            "t": t,
        }),
        _ => json!({ "msg": "Hello Golem DB!", "t": t }),
    }
}

/// Optionally wipe, then upsert every preset. Returns the presets as stored.
pub async fn seed_collections(
    repo: &CollectionRepository,
    wipe: bool,
) -> StudioResult<Vec<Collection>> {
    if wipe {
        repo.wipe().await?;
    }
    let mut out = Vec::with_capacity(PRESET_COLLECTIONS.len());
    for (name, color) in PRESET_COLLECTIONS {
        out.push(repo.upsert_preset(name, color).await?);
    }
    Ok(out)
}

/// Create entities per plan. Returns (created, soon-expiring).
pub async fn seed_entities<R: Rng + Send>(
    gateway: &EntityGateway,
    plan: &[PlanEntry],
    rng: &mut R,
) -> StudioResult<(usize, usize)> {
    let total: usize = plan.iter().map(|p| p.count).sum();
    let mut created = 0;
    let mut soon = 0;

    for entry in plan {
        let soon_count = entry.soon_count();
        let long_count = entry.count - soon_count;
        let lifetimes = std::iter::repeat(LONG_BTL)
            .take(long_count)
            .chain(std::iter::repeat(SOON_BTL).take(soon_count));

        for range in lifetimes {
            let btl = rng.gen_range(range.clone());
            let data = random_payload(&entry.collection, rng);
            gateway
                .create(CreateEntityInput {
                    collection: entry.collection.clone(),
                    data,
                    btl: Some(btl),
                    ..CreateEntityInput::default()
                })
                .await?;

            created += 1;
            if range == SOON_BTL {
                soon += 1;
            }
            if created % PROGRESS_EVERY == 0 {
                info!("… {}/{}", created, total);
            }
        }
    }
    Ok((created, soon))
}

/// Run the whole seed. `gateway` is only needed when entities are written.
pub async fn run_seed<R: Rng + Send>(
    options: &SeedOptions,
    repo: &CollectionRepository,
    gateway: Option<&EntityGateway>,
    rng: &mut R,
) -> StudioResult<SeedReport> {
    let collections = if options.entities_only {
        repo.list().await?
    } else {
        seed_collections(repo, options.wipe_collections).await?
    };
    info!("Collections in store: {}", collections.len());
    for c in &collections {
        info!("  - {} ({})", c.name, c.color);
    }

    let mut report = SeedReport {
        collections,
        ..SeedReport::default()
    };
    if options.collections_only {
        info!("Done (collections only).");
        return Ok(report);
    }

    let gateway = gateway
        .ok_or_else(|| StudioError::validation("a ledger client is required to seed entities"))?;
    let names: Vec<String> = report.collections.iter().map(|c| c.name.clone()).collect();
    let plan = make_plan(options.count, &names, rng);

    let (created, soon) = seed_entities(gateway, &plan, rng).await?;
    report.entities_created = created;
    report.soon_expiring = soon;
    info!("Seed complete. Entities created: {}", created);
    Ok(report)
}
