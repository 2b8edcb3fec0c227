use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldscout_engine::{
    BeginOutcome, CapabilityFetch, ClassifierConfig, CollaboratorError, CredentialLookup, DiscoveryPipeline, DiscoverySession,
    FieldscoutConfig, FixtureCollaborators, MessageCatalog, ScenarioFlags, SessionConfig, SiteDescriptor, StorageDiscovery,
    StorageMountProfile, storage_mount_session,
};
use fieldscout_types::{
    AccountKeys, ApiResponse, BannerKind, DiscoveryResult, GenerationTag, PipelineKind, StorageAccount, StorageCredential, StorageItem,
    StorageKind, StorageMode,
};
use tokio::sync::Notify;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

const FIXTURE: &str = r#"{
    "keys": {
        "k1": {"data": {"keys": [{"value": "key-one"}]}},
        "k2": {"data": {"keys": [{"value": "key-two"}]}},
        "denied": {"data": {"keys": [{"value": "key-three"}]}},
        "empty": {"data": {"keys": [{"value": "key-four"}]}}
    },
    "containers": {
        "k1": {"data": [{"name": "k1-container"}]},
        "k2": {"data": [{"name": "k2-container"}]},
        "denied": {"error": {"message": "403"}, "status": 403},
        "empty": {"data": []}
    },
    "file_shares": {
        "k1": {"data": [{"name": "k1-share"}]},
        "k2": {"data": [{"name": "k2-share"}]},
        "denied": {"error": {"error": {"message": "403"}}, "status": 403},
        "empty": {"data": []}
    }
}"#;

fn accounts() -> Vec<StorageAccount> {
    ["k1", "k2", "denied", "empty"]
        .into_iter()
        .map(|name| StorageAccount {
            id: format!("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/{name}"),
            name: name.into(),
            kind: StorageKind::StorageV2,
            location: None,
        })
        .collect()
}

/// Fixture answers, with credential lookups for gated accounts held until released.
struct GatedCollaborators {
    fixture: FixtureCollaborators,
    gates: HashMap<String, Arc<Notify>>,
}

impl GatedCollaborators {
    fn new(gated: &[&str]) -> Self {
        Self {
            fixture: FixtureCollaborators::from_json(FIXTURE).expect("fixture"),
            gates: gated.iter().map(|name| (name.to_string(), Arc::new(Notify::new()))).collect(),
        }
    }

    fn release(&self, name: &str) {
        if let Some(gate) = self.gates.get(name) {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl CredentialLookup for GatedCollaborators {
    async fn list_keys(&self, account_id: &str) -> Result<ApiResponse<AccountKeys>, CollaboratorError> {
        let name = account_id.rsplit('/').next().unwrap_or(account_id);
        if let Some(gate) = self.gates.get(name) {
            gate.notified().await;
        }
        self.fixture.list_keys(account_id).await
    }
}

#[async_trait]
impl CapabilityFetch for GatedCollaborators {
    async fn fetch(
        &self,
        mode: StorageMode,
        account_name: &str,
        credential: &StorageCredential,
    ) -> Result<ApiResponse<Vec<StorageItem>>, CollaboratorError> {
        self.fixture.fetch(mode, account_name, credential).await
    }
}

/// Reports every finished run before the session receives it.
struct Tap {
    inner: StorageDiscovery,
    finished: UnboundedSender<GenerationTag>,
}

#[async_trait]
impl DiscoveryPipeline for Tap {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Storage
    }

    async fn run(&self, tag: GenerationTag) -> DiscoveryResult {
        let result = self.inner.run(tag).await;
        let _ = self.finished.send(result.tag.clone());
        result
    }
}

struct Crashing;

#[async_trait]
impl DiscoveryPipeline for Crashing {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Storage
    }

    async fn run(&self, tag: GenerationTag) -> DiscoveryResult {
        if tag.generation > 0 {
            panic!("lookup for {} crashed", tag.key);
        }
        DiscoveryResult::new(PipelineKind::Storage, tag, Vec::new())
    }
}

fn gated_session(
    gated: &[&str],
    abort_superseded: bool,
) -> (DiscoverySession<StorageMountProfile>, Arc<GatedCollaborators>, UnboundedReceiver<GenerationTag>) {
    let collaborators = Arc::new(GatedCollaborators::new(gated));
    let (finished, finished_rx) = unbounded_channel();
    let flags = ScenarioFlags::default();
    let pipeline = Tap {
        inner: StorageDiscovery::new(accounts(), flags, collaborators.clone(), collaborators.clone()),
        finished,
    };
    let profile = StorageMountProfile::new(accounts(), flags, MessageCatalog::default(), ClassifierConfig::default());
    let session = DiscoverySession::new(Arc::new(pipeline), profile, SessionConfig { abort_superseded });
    (session, collaborators, finished_rx)
}

fn fixture_session() -> DiscoverySession<StorageMountProfile> {
    let site = SiteDescriptor {
        is_container: true,
        ..SiteDescriptor::default()
    };
    let fixture = Arc::new(FixtureCollaborators::from_json(FIXTURE).expect("fixture"));
    storage_mount_session(&FieldscoutConfig::default(), &site, accounts(), fixture)
}

#[tokio::test]
async fn late_result_for_superseded_selection_is_discarded() {
    let (mut session, collaborators, mut finished) = gated_session(&["k1"], false);
    session.select("k1");
    session.select("k2");
    session.settle().await;
    let settled = session.snapshot();
    assert_eq!(settled.field_values["account_name"], "k2");
    assert_eq!(settled.field_values["access_key"], "key-two");

    collaborators.release("k1");
    let mut late = finished.recv().await.expect("k2 finished");
    if late.key.as_str() == "k2" {
        late = finished.recv().await.expect("k1 finished");
    }
    assert_eq!(late, GenerationTag::new("k1".into(), 1));

    assert_eq!(session.drain(), 0);
    assert_eq!(session.snapshot(), settled);
}

#[tokio::test]
async fn superseded_run_is_aborted_before_its_next_stage() {
    let (mut session, collaborators, _finished) = gated_session(&["k1"], true);
    session.select("k1");
    tokio::task::yield_now().await;
    session.select("k2");
    session.settle().await;
    collaborators.release("k1");
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    let calls = collaborators.fixture.calls();
    assert!(!calls.iter().any(|call| call.ends_with(":k1")), "unexpected calls: {calls:?}");
    assert_eq!(session.snapshot().field_values["account_name"], "k2");
}

#[tokio::test]
async fn queued_result_from_earlier_generation_is_rejected() {
    let (mut session, _collaborators, mut finished) = gated_session(&[], true);
    session.select("k1");
    assert_eq!(finished.recv().await.expect("k1 finished").key.as_str(), "k1");
    session.select("k2");
    session.settle().await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.generation, 2);
    assert_eq!(snapshot.field_values["access_key"], "key-two");
    assert!(
        snapshot.field_options["share_name"]
            .iter()
            .all(|option| option.key.starts_with("k2"))
    );
}

#[tokio::test]
async fn reselecting_in_flight_key_starts_nothing_new() {
    let (mut session, collaborators, _finished) = gated_session(&["k1"], true);
    let first = session.select("k1");
    assert!(matches!(first, BeginOutcome::Started(_)));
    assert_eq!(session.select("k1"), BeginOutcome::Joined(first.tag().clone()));
    collaborators.release("k1");
    session.settle().await;

    assert_eq!(session.snapshot().generation, 1);
    assert!(!session.is_pending());
    let key_calls = collaborators.fixture.calls().into_iter().filter(|call| call.starts_with("listKeys")).count();
    assert_eq!(key_calls, 1);
}

#[tokio::test]
async fn rerunning_a_key_with_unchanged_responses_is_idempotent() {
    let mut session = fixture_session();
    session.select("k1");
    session.settle().await;
    let first = session.snapshot();

    session.select("k2");
    session.settle().await;
    session.select("k1");
    session.settle().await;
    let again = session.snapshot();

    assert_eq!(again.generation, 3);
    assert_eq!(again.field_values, first.field_values);
    assert_eq!(again.field_options, first.field_options);
    assert_eq!(again.banner, first.banner);
}

#[tokio::test]
async fn dual_failure_surfaces_detail_without_forcing_a_mode() {
    let mut session = fixture_session();
    session.set_value("storage_type", Some("AzureFiles".into())).expect("storage type");
    session.select("denied");
    session.settle().await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.banner.kind, BannerKind::PartialFailure);
    assert!(snapshot.banner.message.as_deref().is_some_and(|message| message.contains("403")));
    assert_eq!(snapshot.field_values["storage_type"], "AzureFiles");
    assert!(snapshot.field_errors.contains_key("account_name"));
    assert!(!snapshot.field_errors.contains_key("storage_type"), "{:?}", snapshot.field_errors);
}

#[tokio::test]
async fn fresh_form_reports_no_field_errors() {
    let session = fixture_session();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.field_values["storage_type"], "AzureBlob");
    assert!(snapshot.field_errors.is_empty(), "unexpected errors: {:?}", snapshot.field_errors);
}

#[tokio::test]
async fn empty_account_produces_exactly_one_banner() {
    let mut session = fixture_session();
    session.select("empty");
    session.settle().await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.banner.kind, BannerKind::AccessDenied);
    assert!(snapshot.field_options["share_name"].is_empty());
    assert!(snapshot.field_options["storage_type"].iter().all(|option| option.disabled));
}

#[tokio::test]
async fn new_selection_clears_banner_and_dependents_before_discovery() {
    let mut session = fixture_session();
    session.set_value("name", Some("assets".into())).expect("name");
    session.select("empty");
    session.settle().await;
    assert!(session.snapshot().banner.is_active());

    session.select("k2");
    let pending = session.snapshot();
    assert!(pending.pending);
    assert!(!pending.banner.is_active());
    assert!(!pending.field_values.contains_key("access_key"));
    assert_eq!(pending.field_values["name"], "assets");
    assert_eq!(
        session.validate("share_name", Some("k2-share")),
        Some(MessageCatalog::default().validation_pending_error)
    );

    session.settle().await;
    session.set_value("storage_type", Some("AzureFiles".into())).expect("storage type");
    assert_eq!(session.validate("share_name", Some("k2-share")), None);
}

#[tokio::test]
async fn teardown_forgets_the_selection() {
    let (mut session, _collaborators, _finished) = gated_session(&["k1"], true);
    session.select("k1");
    session.teardown();
    assert!(session.current_key().is_none());
    assert!(session.current_tag().is_none());
    let snapshot = session.snapshot();
    assert!(!snapshot.pending);
    assert!(!snapshot.field_values.contains_key("account_name"));
}

#[tokio::test]
async fn crashed_run_settles_the_waiting_caller() {
    let profile = StorageMountProfile::new(accounts(), ScenarioFlags::default(), MessageCatalog::default(), ClassifierConfig::default());
    let mut session = DiscoverySession::new(Arc::new(Crashing), profile, SessionConfig::default());
    session.select("k1");
    assert!(session.is_pending());

    let completion = tokio::time::timeout(Duration::from_secs(5), session.next_completion())
        .await
        .expect("completion returns once the task is gone");
    assert_eq!(completion, Some(false));
    assert!(!session.is_pending());
    assert!(!session.snapshot().pending);
    assert_eq!(session.next_completion().await, None);
}
