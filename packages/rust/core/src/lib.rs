//! Cycle pipeline: one discover→select→generate→publish pass.
//!
//! `run_cycle` is single-threaded and runs to completion; the external
//! scheduler (CLI loop, cron) provides timing. All collaborators come in
//! through [`CycleDeps`], so the whole pipeline is testable with stub
//! sources and mock platform servers.

use chrono::Utc;
use coalwire_discovery::{ContentGenerator, DiscoverySource, append_hashtags, extract_category, hashtags_for};
use coalwire_publish::{Orchestrator, PublishItem, PublishOutcome, format_status_summary};
use coalwire_ranking::{is_filler_cycle, pick_topic, select_best};
use coalwire_shared::{
    AppConfig, CadenceState, Category, Platform, PublicationRecord, Result, validate_credentials,
};
use coalwire_storage::Store;
use tracing::{info, instrument, warn};

/// Byline used for filler items, which have no external source.
const FILLER_SOURCE_NAME: &str = "Coalwire Analysis";

/// Everything one cycle needs.
pub struct CycleDeps {
    pub config: AppConfig,
    pub store: Store,
    pub source: Box<dyn DiscoverySource>,
    pub generator: Box<dyn ContentGenerator>,
    pub orchestrator: Orchestrator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    News,
    Filler,
}

/// What one cycle did, for the CLI report and the admin summary.
#[derive(Debug)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub title: Option<String>,
    pub outcome: Option<PublishOutcome>,
    pub detail: String,
}

impl CycleReport {
    pub fn published(&self) -> bool {
        self.outcome
            .as_ref()
            .is_some_and(PublishOutcome::overall_success)
    }

    fn skipped(kind: CycleKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            title: None,
            outcome: None,
            detail: detail.into(),
        }
    }
}

/// Run one full publication cycle.
///
/// Missing credentials are fatal and abort before any network call. A
/// failed storage write after successful delivery is logged, never
/// escalated: the item went out, and the ledger can be repaired later.
#[instrument(skip_all)]
pub async fn run_cycle(deps: &CycleDeps) -> Result<CycleReport> {
    validate_credentials(&deps.config)?;

    let mut cadence = deps.store.load_cadence().await?;
    let interval = deps.config.cadence.interval;
    // A filler fires once per counter multiple; the counter itself stays put
    let filler_due = is_filler_cycle(cadence.post_count, interval)
        && cadence.last_filler_at != Some(cadence.post_count);

    let report = if filler_due {
        filler_cycle(deps, &mut cadence).await?
    } else {
        news_cycle(deps, &mut cadence).await?
    };

    if let Err(e) = deps.store.save_cadence(&cadence).await {
        warn!(error = %e, "failed to persist cadence state");
    }

    if let Some(outcome) = &report.outcome {
        let title = report.title.as_deref().unwrap_or("(untitled)");
        deps.orchestrator
            .notify_admin(&format_status_summary(title, outcome))
            .await;
    }

    info!(kind = ?report.kind, published = report.published(), detail = %report.detail, "cycle finished");
    Ok(report)
}

async fn news_cycle(deps: &CycleDeps, cadence: &mut CadenceState) -> Result<CycleReport> {
    let candidates = deps.source.discover().await?;
    let mut fresh = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if deps.store.exists(&candidate.source_url).await? {
            tracing::debug!(url = %candidate.source_url, "already processed, skipping");
        } else {
            fresh.push(candidate);
        }
    }

    let today = Utc::now().date_naive();
    let Some(idx) = select_best(&fresh, &deps.config.scoring, today) else {
        info!("no publishable candidate this cycle");
        return Ok(CycleReport::skipped(
            CycleKind::News,
            "no publishable candidate",
        ));
    };
    let candidate = &fresh[idx];

    let versions = deps.generator.render_news(candidate).await?;
    let tag_text = format!("{} {}", candidate.title, versions.channel_version);
    let channel_text = append_hashtags(&versions.channel_version, &hashtags_for(&tag_text));
    let category = extract_category(&channel_text);

    let item = PublishItem {
        title: candidate.title.clone(),
        summary: candidate.summary.clone(),
        category,
        source_name: candidate.source_name.clone(),
        source_url: Some(candidate.source_url.clone()),
        channel_text,
        web_html: versions.web_version,
    };
    let outcome = deps.orchestrator.publish(&item).await?;

    // Any delivery attempt gets a record: the record is proof-of-attempt
    // and blocks re-selection even when every platform failed. Gate
    // rejections write nothing and leave the candidate re-offerable.
    if let PublishOutcome::Delivered { .. } = &outcome {
        let mut record = PublicationRecord::new(&candidate.source_url, category);
        record.channel_message_id = outcome
            .outcome_for(Platform::Channel)
            .and_then(|o| o.external_id.clone());
        record.doc_record_id = outcome
            .outcome_for(Platform::DocStore)
            .and_then(|o| o.external_id.clone());
        if let Err(e) = deps.store.insert_publication(&record).await {
            warn!(url = %record.url, error = %e, "delivery attempted but record write failed");
        }
    }
    if outcome.overall_success() {
        cadence.post_count += 1;
    }

    Ok(CycleReport {
        kind: CycleKind::News,
        title: Some(candidate.title.clone()),
        detail: cycle_detail(&outcome),
        outcome: Some(outcome),
    })
}

async fn filler_cycle(deps: &CycleDeps, cadence: &mut CadenceState) -> Result<CycleReport> {
    let topic = {
        let mut rng = rand::thread_rng();
        pick_topic(
            &deps.config.cadence.topic_pool,
            &cadence.freight_topics,
            &mut rng,
        )
    };
    let Some(topic) = topic else {
        warn!("filler due but topic pool is empty");
        return Ok(CycleReport::skipped(CycleKind::Filler, "empty topic pool"));
    };
    info!(topic = %topic, count = cadence.post_count, "filler cycle");

    let versions = deps.generator.render_filler(&topic).await?;
    let channel_text = append_hashtags(
        &versions.channel_version,
        &hashtags_for(&versions.channel_version),
    );

    let item = PublishItem {
        title: topic.clone(),
        summary: topic.clone(),
        category: Category::Freight,
        source_name: FILLER_SOURCE_NAME.into(),
        source_url: None,
        channel_text,
        web_html: versions.web_version,
    };
    let outcome = deps.orchestrator.publish(&item).await?;

    if outcome.overall_success() {
        cadence.record_topic(&topic);
        cadence.last_filler_at = Some(cadence.post_count);
    }

    Ok(CycleReport {
        kind: CycleKind::Filler,
        title: Some(topic),
        detail: cycle_detail(&outcome),
        outcome: Some(outcome),
    })
}

fn cycle_detail(outcome: &PublishOutcome) -> String {
    match outcome {
        PublishOutcome::Rejected { reason } => format!("rejected: {reason}"),
        PublishOutcome::Delivered { outcomes } => {
            let delivered: Vec<&str> = outcomes
                .iter()
                .filter(|o| o.delivered())
                .map(|o| o.platform.as_str())
                .collect();
            if delivered.is_empty() {
                "all platforms failed".into()
            } else {
                format!("delivered to {}", delivered.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coalwire_discovery::{ContentGenerator, DiscoverySource};
    use coalwire_publish::{ChannelClient, DocStoreClient};
    use coalwire_shared::{Candidate, CoalwireError, PostVersions};
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StubSource {
        candidates: Vec<Candidate>,
    }

    #[async_trait]
    impl DiscoverySource for StubSource {
        async fn discover(&self) -> coalwire_shared::Result<Vec<Candidate>> {
            Ok(self.candidates.clone())
        }
    }

    struct StubGenerator;

    #[async_trait]
    impl ContentGenerator for StubGenerator {
        async fn render_news(&self, candidate: &Candidate) -> coalwire_shared::Result<PostVersions> {
            Ok(PostVersions {
                channel_version: format!(
                    "<b>⚡ [COAL] | {}</b>\n\nThermal coal at $142, up 4%.",
                    candidate.title
                ),
                web_version: "<p>Thermal coal at $142, up 4% on the week.</p>".into(),
            })
        }

        async fn render_filler(&self, topic: &str) -> coalwire_shared::Result<PostVersions> {
            Ok(PostVersions {
                channel_version: format!("<b>🚢 Freight Focus</b>\n\nCoal shipping and {topic}."),
                web_version: format!("<p>Coal freight analysis: {topic}.</p>"),
            })
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ContentGenerator for FailingGenerator {
        async fn render_news(&self, _: &Candidate) -> coalwire_shared::Result<PostVersions> {
            Err(CoalwireError::Network("generator down".into()))
        }

        async fn render_filler(&self, _: &str) -> coalwire_shared::Result<PostVersions> {
            Err(CoalwireError::Network("generator down".into()))
        }
    }

    struct TestEnv {
        deps: CycleDeps,
        #[allow(dead_code)]
        channel: MockServer,
        #[allow(dead_code)]
        docstore: MockServer,
        source_server: MockServer,
    }

    async fn test_env(
        source: Box<dyn DiscoverySource>,
        generator: Box<dyn ContentGenerator>,
    ) -> TestEnv {
        let channel = MockServer::start().await;
        let docstore = MockServer::start().await;
        let source_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/botTOK/sendMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": {"message_id": 11}})),
            )
            .mount(&channel)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "rec-1"})))
            .mount(&docstore)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&source_server)
            .await;

        let suffix = Uuid::now_v7().simple().to_string();
        let mut config = AppConfig::default();
        config.channel.bot_token_env = format!("CW_TEST_BOT_{suffix}");
        config.channel.chat_id = "@coalwire".into();
        config.channel.base_url = channel.uri();
        config.docstore.token_env = format!("CW_TEST_DOC_{suffix}");
        config.docstore.database_id = "db1".into();
        config.docstore.base_url = docstore.uri();
        config.search.api_key_env = format!("CW_TEST_SEARCH_{suffix}");
        unsafe {
            std::env::set_var(&config.channel.bot_token_env, "TOK");
            std::env::set_var(&config.docstore.token_env, "DOCTOK");
            std::env::set_var(&config.search.api_key_env, "SEARCHKEY");
        }

        let store = Store::open(
            &std::env::temp_dir().join(format!("cw_core_{suffix}.db")),
        )
        .await
        .unwrap();

        let orchestrator = Orchestrator::new(
            ChannelClient::new(&config.channel, "TOK".into()).unwrap(),
            DocStoreClient::new(&config.docstore, "DOCTOK".into()).unwrap(),
            config.scoring.clone(),
        )
        .unwrap();

        TestEnv {
            deps: CycleDeps {
                config,
                store,
                source,
                generator,
                orchestrator,
            },
            channel,
            docstore,
            source_server,
        }
    }

    fn candidate(url: &str) -> Candidate {
        Candidate {
            title: "Newcastle thermal coal climbs".into(),
            summary: "Newcastle thermal coal rose 4% to $142 per tonne as demand from Japan \
                      firmed and exports reached 8.4 million tonnes in the period."
                .into(),
            source_name: "Reuters".into(),
            source_url: url.into(),
            publication_date: Some(Utc::now().date_naive()),
            discovered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn news_cycle_publishes_and_increments_counter() {
        let env = test_env(
            Box::new(StubSource { candidates: vec![] }),
            Box::new(StubGenerator),
        )
        .await;
        let url = format!("{}/coal-climbs", env.source_server.uri());
        let deps = CycleDeps {
            source: Box::new(StubSource {
                candidates: vec![candidate(&url)],
            }),
            ..env.deps
        };

        let report = run_cycle(&deps).await.unwrap();

        assert_eq!(report.kind, CycleKind::News);
        assert!(report.published());
        assert!(deps.store.exists(&url).await.unwrap());
        let record = deps.store.get_publication(&url).await.unwrap().unwrap();
        assert_eq!(record.channel_message_id.as_deref(), Some("11"));
        assert_eq!(record.doc_record_id.as_deref(), Some("rec-1"));
        assert_eq!(record.category, Category::Coal);
        assert_eq!(deps.store.load_cadence().await.unwrap().post_count, 1);
    }

    #[tokio::test]
    async fn seen_urls_are_never_reselected() {
        let env = test_env(
            Box::new(StubSource { candidates: vec![] }),
            Box::new(StubGenerator),
        )
        .await;
        let url = format!("{}/already-done", env.source_server.uri());
        env.deps
            .store
            .insert_publication(&PublicationRecord::new(&url, Category::Coal))
            .await
            .unwrap();
        let deps = CycleDeps {
            source: Box::new(StubSource {
                candidates: vec![candidate(&url)],
            }),
            ..env.deps
        };

        let report = run_cycle(&deps).await.unwrap();

        assert!(!report.published());
        assert_eq!(report.detail, "no publishable candidate");
        assert_eq!(deps.store.load_cadence().await.unwrap().post_count, 0);
    }

    #[tokio::test]
    async fn filler_fires_once_per_counter_multiple() {
        let env = test_env(
            Box::new(StubSource { candidates: vec![] }),
            Box::new(StubGenerator),
        )
        .await;
        env.deps
            .store
            .save_cadence(&CadenceState {
                post_count: 6,
                ..CadenceState::default()
            })
            .await
            .unwrap();

        let report = run_cycle(&env.deps).await.unwrap();
        assert_eq!(report.kind, CycleKind::Filler);
        assert!(report.published());

        let cadence = env.deps.store.load_cadence().await.unwrap();
        assert_eq!(cadence.post_count, 6);
        assert_eq!(cadence.last_filler_at, Some(6));
        assert_eq!(cadence.freight_topics.len(), 1);

        // Same multiple again: back to the news branch, no repeat filler
        let report = run_cycle(&env.deps).await.unwrap();
        assert_eq!(report.kind, CycleKind::News);
    }

    #[tokio::test]
    async fn dead_source_is_rejected_without_record() {
        let env = test_env(
            Box::new(StubSource { candidates: vec![] }),
            Box::new(StubGenerator),
        )
        .await;
        let dead = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&dead)
            .await;
        let url = format!("{}/gone", dead.uri());
        let deps = CycleDeps {
            source: Box::new(StubSource {
                candidates: vec![candidate(&url)],
            }),
            ..env.deps
        };

        let report = run_cycle(&deps).await.unwrap();

        assert!(!report.published());
        assert!(report.detail.starts_with("rejected"));
        assert!(!deps.store.exists(&url).await.unwrap());
        assert_eq!(deps.store.load_cadence().await.unwrap().post_count, 0);
    }

    #[tokio::test]
    async fn generator_failure_surfaces_as_error() {
        let env = test_env(
            Box::new(StubSource { candidates: vec![] }),
            Box::new(FailingGenerator),
        )
        .await;
        let url = format!("{}/a", env.source_server.uri());
        let deps = CycleDeps {
            source: Box::new(StubSource {
                candidates: vec![candidate(&url)],
            }),
            ..env.deps
        };

        let err = run_cycle(&deps).await.unwrap_err();
        assert!(err.to_string().contains("generator down"));
    }

    #[tokio::test]
    async fn missing_credentials_are_fatal() {
        let env = test_env(
            Box::new(StubSource { candidates: vec![] }),
            Box::new(StubGenerator),
        )
        .await;
        let mut deps = env.deps;
        deps.config.channel.bot_token_env = "CW_TEST_DOES_NOT_EXIST".into();

        let err = run_cycle(&deps).await.unwrap_err();
        assert!(matches!(err, CoalwireError::Config { .. }));
    }
}
