//! End-to-end orchestration tests with a mock identity provider and
//! temporary hand-off/log files

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deployer::authn::credentials::{CredentialExchanger, KeycloakExchanger, TOKEN_PATH};
use deployer::deploy::dispatch::CommandDispatcher;
use deployer::deploy::orchestrator::{Orchestrator, WatchMode};
use deployer::deploy::watcher::{self, CompletionWatcher};
use deployer::errors::DeployerError;
use deployer::filesys::file::File;
use deployer::http::client::HttpClient;
use deployer::models::deployment::DeploymentRequest;
use secrecy::SecretString;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXPECTED_COMMAND: &str = "test-name test-base de test@mail.com test-username y y n n\n";

/// Accepts or rejects every client, counting calls
struct StaticExchanger {
    authorized: bool,
    calls: AtomicUsize,
}

impl StaticExchanger {
    fn new(authorized: bool) -> Arc<Self> {
        Arc::new(Self {
            authorized,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CredentialExchanger for StaticExchanger {
    async fn authorize(
        &self,
        _client_id: &str,
        _client_secret: &SecretString,
    ) -> Result<(), DeployerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.authorized {
            Ok(())
        } else {
            Err(DeployerError::Unauthorized)
        }
    }
}

struct Fixture {
    _dir: TempDir,
    handoff: File,
    log_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let handoff = File::new(dir.path().join("arg-pipe"));
        let log_path = dir.path().join("deploy-log.txt");
        Self {
            _dir: dir,
            handoff,
            log_path,
        }
    }

    fn orchestrator(
        &self,
        credentials: Arc<dyn CredentialExchanger>,
        watch_mode: WatchMode,
    ) -> Orchestrator {
        Orchestrator::new(
            credentials,
            CommandDispatcher::new(self.handoff.clone()),
            CompletionWatcher::new(&watcher::Options {
                log_file: self.log_path.clone(),
                poll_interval: Duration::from_millis(10),
            }),
            watch_mode,
        )
    }

    async fn append_log(&self, contents: &str) {
        append(&self.log_path, contents).await;
    }

    /// Wait until the hand-off file holds `expected`
    async fn wait_for_command(&self, expected: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(contents) = self.handoff.read_string().await {
                if contents == expected {
                    return;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "command {expected:?} was never handed off"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

async fn append(path: &Path, contents: &str) {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .unwrap();
    file.write_all(contents.as_bytes()).await.unwrap();
    file.flush().await.unwrap();
}

fn request() -> DeploymentRequest {
    DeploymentRequest {
        instance_name: "test-name".to_string(),
        user_name: "test-username".to_string(),
        user_email: "test@mail.com".to_string(),
        base_config: "test-base".to_string(),
        locale: Some("de".to_string()),
        with_replication_backend: true,
        with_backend: true,
        with_monitoring: false,
        with_sentry: false,
        client_id: "test-client".to_string(),
        client_secret: SecretString::from("test-key".to_string()),
    }
}

#[tokio::test]
async fn test_unauthorized_never_dispatches() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fixture = Fixture::new();
    let client = HttpClient::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
    let credentials = Arc::new(KeycloakExchanger::new(Arc::new(client)));
    let orchestrator = fixture.orchestrator(credentials, WatchMode::Unbounded);

    let result = orchestrator.deploy(request()).await;

    assert!(matches!(result, Err(DeployerError::Unauthorized)));
    assert!(!fixture.handoff.exists().await);
}

#[tokio::test]
async fn test_authorizes_before_validating() {
    let fixture = Fixture::new();
    let credentials = StaticExchanger::new(false);
    let orchestrator = fixture.orchestrator(credentials.clone(), WatchMode::Skip);

    let invalid = DeploymentRequest {
        instance_name: "with space".to_string(),
        ..request()
    };
    let result = orchestrator.deploy(invalid).await;

    assert!(matches!(result, Err(DeployerError::Unauthorized)));
    assert_eq!(credentials.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_request_is_bad_request() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator(StaticExchanger::new(true), WatchMode::Skip);

    let invalid = DeploymentRequest {
        user_name: "with_underscore".to_string(),
        ..request()
    };
    let err = orchestrator.deploy(invalid).await.unwrap_err();

    match err {
        DeployerError::Validation(err) => assert_eq!(err.field, Some("userName")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(!fixture.handoff.exists().await);
}

#[tokio::test]
async fn test_skip_mode_resolves_after_hand_off() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator(StaticExchanger::new(true), WatchMode::Skip);

    let ack = orchestrator.deploy(request()).await.unwrap();

    assert!(ack.ok);
    assert!(!ack.watched);
    assert!(!ack.correlation_id.is_empty());
    assert_eq!(fixture.handoff.read_string().await.unwrap(), EXPECTED_COMMAND);
}

#[tokio::test]
async fn test_default_locale_is_handed_off() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator(StaticExchanger::new(true), WatchMode::Skip);

    orchestrator
        .deploy(DeploymentRequest {
            locale: None,
            ..request()
        })
        .await
        .unwrap();

    assert_eq!(
        fixture.handoff.read_string().await.unwrap(),
        "test-name test-base en test@mail.com test-username y y n n\n"
    );
}

#[tokio::test]
async fn test_done_resolves_success() {
    let fixture = Arc::new(Fixture::new());
    fixture.append_log("DONE from an earlier deployment\n").await;
    let orchestrator = Arc::new(
        fixture.orchestrator(StaticExchanger::new(true), WatchMode::Unbounded),
    );

    let deployment = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.deploy(request()).await }
    });

    fixture.wait_for_command(EXPECTED_COMMAND).await;
    fixture.append_log("creating realm\nstarting containers\n").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!deployment.is_finished());

    fixture.append_log("DONE\n").await;
    let ack = tokio::time::timeout(Duration::from_secs(5), deployment)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(ack.ok);
    assert!(ack.watched);
}

#[tokio::test]
async fn test_error_line_fails_with_message() {
    let fixture = Arc::new(Fixture::new());
    let orchestrator = Arc::new(
        fixture.orchestrator(StaticExchanger::new(true), WatchMode::Unbounded),
    );

    let deployment = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.deploy(request()).await }
    });

    fixture.wait_for_command(EXPECTED_COMMAND).await;
    fixture.append_log("some logs\nERROR disk full\nDONE\n").await;

    let result = tokio::time::timeout(Duration::from_secs(5), deployment)
        .await
        .unwrap()
        .unwrap();

    match result {
        Err(DeployerError::ProvisioningFailed(message)) => assert_eq!(message, "disk full"),
        other => panic!("expected provisioning failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bounded_watch_times_out() {
    let fixture = Fixture::new();
    let limit = Duration::from_millis(100);
    let orchestrator =
        fixture.orchestrator(StaticExchanger::new(true), WatchMode::Bounded(limit));

    let result = orchestrator.deploy(request()).await;

    assert!(matches!(result, Err(DeployerError::WatchTimeout(d)) if d == limit));
    assert_eq!(fixture.handoff.read_string().await.unwrap(), EXPECTED_COMMAND);
}

#[tokio::test]
async fn test_deployments_are_processed_one_at_a_time() {
    let fixture = Arc::new(Fixture::new());
    let orchestrator = Arc::new(
        fixture.orchestrator(StaticExchanger::new(true), WatchMode::Unbounded),
    );

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.deploy(request()).await }
    });
    fixture.wait_for_command(EXPECTED_COMMAND).await;

    let second = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            orchestrator
                .deploy(DeploymentRequest {
                    instance_name: "second".to_string(),
                    ..request()
                })
                .await
        }
    });

    // The second request waits for the first to resolve
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fixture.handoff.read_string().await.unwrap(), EXPECTED_COMMAND);

    fixture.append_log("DONE\n").await;
    let first = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(first.watched);

    fixture
        .wait_for_command("second test-base de test@mail.com test-username y y n n\n")
        .await;
    fixture.append_log("ERROR realm exists\n").await;
    let second = tokio::time::timeout(Duration::from_secs(5), second)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(second, Err(DeployerError::ProvisioningFailed(m)) if m == "realm exists"));
}

#[tokio::test]
async fn test_unwritable_hand_off_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        StaticExchanger::new(true),
        CommandDispatcher::new(File::new(dir.path())),
        CompletionWatcher::new(&watcher::Options {
            log_file: dir.path().join("deploy-log.txt"),
            poll_interval: Duration::from_millis(10),
        }),
        WatchMode::Unbounded,
    );

    let result = orchestrator.deploy(request()).await;
    assert!(matches!(result, Err(DeployerError::Io(_))));
}

#[cfg(unix)]
fn mkfifo(path: &Path) {
    let status = std::process::Command::new("mkfifo")
        .arg(path)
        .status()
        .unwrap();
    assert!(status.success());
}

#[cfg(unix)]
#[tokio::test]
async fn test_pipe_without_reader_releases_the_queue() {
    let fixture = Fixture::new();
    mkfifo(fixture.handoff.path());
    let orchestrator = fixture.orchestrator(
        StaticExchanger::new(true),
        WatchMode::Bounded(Duration::from_millis(100)),
    );

    for _ in 0..2 {
        let result = tokio::time::timeout(Duration::from_secs(2), orchestrator.deploy(request()))
            .await
            .unwrap();
        assert!(matches!(result, Err(DeployerError::Io(_))));
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_pipe_with_reader_receives_command() {
    use tokio::io::AsyncReadExt;
    use tokio::net::unix::pipe;

    let fixture = Fixture::new();
    mkfifo(fixture.handoff.path());
    let mut reader = pipe::OpenOptions::new()
        .open_receiver(fixture.handoff.path())
        .unwrap();
    let orchestrator = fixture.orchestrator(
        StaticExchanger::new(true),
        WatchMode::Bounded(Duration::from_millis(100)),
    );

    let result = orchestrator.deploy(request()).await;
    assert!(matches!(result, Err(DeployerError::WatchTimeout(_))));

    let mut received = String::new();
    reader.read_to_string(&mut received).await.unwrap();
    assert_eq!(received, EXPECTED_COMMAND);
}
