//! In-memory collaborators for the runner tests
//!
//! [`FakeBackend`] plays the cluster controllers and the source host at once:
//! creating a component opens its PaC pull request and starts a build, runs
//! progress every time PipelineRuns are listed, and finished builds produce
//! snapshots, integration runs and group snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gantry_client::{ClientError, Cluster, Result, SourceHost, names};
use gantry_core::domain::{
    Application, CheckRun, CheckRunConclusion, Component, ConditionStatus, FileCommit, GitRef,
    IntegrationTestScenario, MergeResult, PipelineRun, PipelineRunCondition, PullRequest, Snapshot,
};
use gantry_core::dto::{ComponentSpec, PipelineRunQuery, ScenarioSpec};
use gantry_core::labels;
use gantry_core::poll::PollConfig;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Timeouts;

/// Branch prefix of the fake PaC onboarding pull requests
pub const PAC_BRANCH_PREFIX: &str = "konflux-";

/// Listings before a new run reports a start time
const TICKS_TO_START: u32 = 2;
/// Listings before a run finishes
const TICKS_TO_FINISH: u32 = 4;

/// Short bounds that keep every wait valid
pub fn fast_timeouts() -> Timeouts {
    let poll = PollConfig::new(Duration::from_secs(60), Duration::from_secs(1));
    Timeouts {
        build_start: poll,
        pac_pull_request: poll,
        build_finish: poll,
        check_run: poll,
        snapshot: poll,
        integration_run: poll,
        integration_start: poll,
        merge: PollConfig::new(Duration::from_secs(10), Duration::from_secs(1)),
        group_snapshot: poll,
    }
}

struct FakeRun {
    run: PipelineRun,
    ticks: u32,
    fails: bool,
}

#[derive(Default)]
struct FakeRepo {
    branches: BTreeMap<String, String>,
    pulls: Vec<PullRequest>,
    files: Vec<(String, String)>,
}

#[derive(Default)]
struct State {
    clock: i64,
    namespaces: BTreeSet<String>,
    applications: BTreeSet<(String, String)>,
    components: BTreeMap<(String, String), ComponentSpec>,
    scenarios: BTreeMap<(String, String), String>,
    runs: Vec<FakeRun>,
    snapshots: Vec<Snapshot>,
    repos: BTreeMap<String, FakeRepo>,
    build_failures: HashMap<String, u32>,
    any_build_failures: u32,
    build_requests: HashMap<String, u32>,
    grouped_shas: BTreeSet<String>,
    deleted: Vec<String>,
    fail_merges: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(1_767_225_600 + self.clock, 0).unwrap()
    }

    fn repo_mut(&mut self, repo: &str) -> Result<&mut FakeRepo> {
        self.repos
            .get_mut(repo)
            .ok_or_else(|| ClientError::not_found(format!("repository {}", repo)))
    }

    fn commit(&mut self, repo: &str, branch: &str) -> Result<String> {
        let sha = format!("sha{:04}", self.next_id());
        let repo = self.repo_mut(repo)?;
        let head = repo
            .branches
            .get_mut(branch)
            .ok_or_else(|| ClientError::not_found(format!("branch {}", branch)))?;
        *head = sha.clone();
        Ok(sha)
    }

    fn start_build(&mut self, namespace: &str, component: &str, application: &str, sha: &str) {
        let fails = match self.build_failures.get_mut(component) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ if self.any_build_failures > 0 => {
                self.any_build_failures -= 1;
                true
            }
            _ => false,
        };
        let id = self.next_id();
        let run: PipelineRun = serde_json::from_value(json!({
            "metadata": {
                "name": format!("{}-on-pull-request-{}", component, id),
                "namespace": namespace,
                "creationTimestamp": self.now(),
                "labels": {
                    (labels::COMPONENT_LABEL): component,
                    (labels::APPLICATION_LABEL): application,
                    (labels::PIPELINE_TYPE_LABEL): labels::PIPELINE_TYPE_BUILD,
                    (labels::PAC_SHA_LABEL): sha,
                }
            }
        }))
        .unwrap();
        self.runs.push(FakeRun { run, ticks: 0, fails });
    }

    fn start_integration(&mut self, namespace: &str, scenario: &str, snapshot: &str) {
        let id = self.next_id();
        let run: PipelineRun = serde_json::from_value(json!({
            "metadata": {
                "name": format!("{}-{}", scenario, id),
                "namespace": namespace,
                "creationTimestamp": self.now(),
                "labels": {
                    (labels::PIPELINE_TYPE_LABEL): labels::PIPELINE_TYPE_TEST,
                    (labels::SNAPSHOT_LABEL): snapshot,
                    (labels::SCENARIO_LABEL): scenario,
                }
            }
        }))
        .unwrap();
        self.runs.push(FakeRun { run, ticks: 0, fails: false });
    }

    fn advance(&mut self, finish_all: bool) {
        self.clock += 1;
        let now = self.now();
        let mut finished = Vec::new();

        for (index, fake) in self.runs.iter_mut().enumerate() {
            if fake.run.is_done() {
                continue;
            }
            fake.ticks = if finish_all { TICKS_TO_FINISH } else { fake.ticks + 1 };

            if fake.ticks >= TICKS_TO_START && fake.run.status.start_time.is_none() {
                fake.run.status.start_time = Some(now);
            }
            if fake.ticks >= TICKS_TO_FINISH {
                let (status, reason) = if fake.fails {
                    (ConditionStatus::False, "Failed")
                } else {
                    (ConditionStatus::True, "Succeeded")
                };
                fake.run.status.completion_time = Some(now);
                fake.run.status.conditions = vec![PipelineRunCondition {
                    condition_type: "Succeeded".to_string(),
                    status,
                    reason: Some(reason.to_string()),
                    message: fake.fails.then(|| "build-container step failed".to_string()),
                }];
                finished.push(index);
            }
        }

        for index in finished {
            let run = self.runs[index].run.clone();
            let is_build =
                run.metadata.label(labels::PIPELINE_TYPE_LABEL) == Some(labels::PIPELINE_TYPE_BUILD);
            if is_build && run.succeeded() {
                self.on_build_succeeded(&run);
            }
        }
    }

    fn on_build_succeeded(&mut self, run: &PipelineRun) {
        let namespace = run.metadata.namespace.clone().unwrap_or_default();
        let component = run.component().unwrap_or_default().to_string();
        let application = run
            .metadata
            .label(labels::APPLICATION_LABEL)
            .unwrap_or_default()
            .to_string();

        let id = self.next_id();
        let snapshot: Snapshot = serde_json::from_value(json!({
            "metadata": {
                "name": format!("{}-{}", application, id),
                "namespace": namespace,
                "creationTimestamp": self.now(),
                "labels": { (labels::COMPONENT_LABEL): component },
                "annotations": { (labels::BUILD_PIPELINE_RUN_LABEL): run.name() }
            },
            "spec": {
                "application": application,
                "components": [{ "name": component, "containerImage": format!("quay.io/{}", component) }]
            }
        }))
        .unwrap();
        let snapshot_name = snapshot.name().to_string();
        self.snapshots.push(snapshot);

        let scenarios: Vec<String> = self
            .scenarios
            .iter()
            .filter(|((ns, _), app)| *ns == namespace && **app == application)
            .map(|((_, name), _)| name.clone())
            .collect();
        for scenario in scenarios {
            self.start_integration(&namespace, &scenario, &snapshot_name);
        }

        if let Some(sha) = run.metadata.label(labels::PAC_SHA_LABEL) {
            if self.grouped_shas.contains(sha) {
                self.try_group_snapshot(&namespace, &application, sha);
            }
        }
    }

    /// Group snapshot once every build of a grouped pull request succeeded
    fn try_group_snapshot(&mut self, namespace: &str, application: &str, sha: &str) {
        let builds: Vec<&PipelineRun> = self
            .runs
            .iter()
            .map(|f| &f.run)
            .filter(|r| r.metadata.label(labels::PAC_SHA_LABEL) == Some(sha))
            .collect();
        if builds.is_empty() || !builds.iter().all(|r| r.succeeded()) {
            return;
        }

        let info: Vec<_> = builds
            .iter()
            .map(|r| {
                json!({
                    "namespace": namespace,
                    "component": r.component(),
                    "buildPipelineRun": r.name(),
                })
            })
            .collect();
        let components: Vec<_> = builds
            .iter()
            .map(|r| json!({ "name": r.component(), "containerImage": "quay.io/group" }))
            .collect();

        let id = self.next_id();
        let snapshot: Snapshot = serde_json::from_value(json!({
            "metadata": {
                "name": format!("{}-group-{}", application, id),
                "namespace": namespace,
                "creationTimestamp": self.now(),
                "labels": { (labels::SNAPSHOT_TYPE_LABEL): labels::SNAPSHOT_TYPE_GROUP },
                "annotations": {
                    (labels::GROUP_TEST_INFO_ANNOTATION): serde_json::Value::Array(info).to_string()
                }
            },
            "spec": { "application": application, "components": components }
        }))
        .unwrap();

        self.grouped_shas.remove(sha);
        self.snapshots.push(snapshot);
    }
}

/// Cluster and source host sharing one in-memory state
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend hosting `repos`, each with a `main` branch
    pub fn with_repos(repos: &[&str]) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock().unwrap();
            for repo in repos {
                let sha = format!("{}-main", repo);
                let mut fake = FakeRepo::default();
                fake.branches.insert("main".to_string(), sha);
                state.repos.insert(repo.to_string(), fake);
            }
        }
        backend
    }

    /// The next `n` builds of `component` fail
    pub fn fail_builds(&self, component: &str, n: u32) {
        self.state
            .lock()
            .unwrap()
            .build_failures
            .insert(component.to_string(), n);
    }

    /// The next `n` builds fail, whatever the component
    pub fn fail_next_builds(&self, n: u32) {
        self.state.lock().unwrap().any_build_failures = n;
    }

    /// Rejects every merge as not mergeable
    pub fn fail_merges(&self) {
        self.state.lock().unwrap().fail_merges = true;
    }

    pub fn build_requests(&self, component: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .build_requests
            .get(component)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_build_requests(&self) -> u32 {
        self.state.lock().unwrap().build_requests.values().sum()
    }

    /// Finishes every run that is still pending or running
    pub fn complete_all_runs(&self) {
        self.state.lock().unwrap().advance(true);
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.state.lock().unwrap().namespaces.iter().cloned().collect()
    }

    pub fn branches(&self, repo: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .repos
            .get(repo)
            .map(|r| r.branches.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn files(&self, repo: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .repos
            .get(repo)
            .map(|r| r.files.iter().map(|(_, path)| path.clone()).collect())
            .unwrap_or_default()
    }

    pub fn pull_requests(&self, repo: &str) -> Vec<PullRequest> {
        self.state
            .lock()
            .unwrap()
            .repos
            .get(repo)
            .map(|r| r.pulls.clone())
            .unwrap_or_default()
    }

    /// Deleted resources, as `<kind>/<name>`
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }
}

fn repo_of(git_url: &str) -> &str {
    git_url
        .trim_end_matches(".git")
        .rsplit('/')
        .next()
        .unwrap_or(git_url)
}

#[async_trait]
impl Cluster for FakeBackend {
    async fn create_namespace(&self, prefix: &str) -> Result<String> {
        let name = names::generate_name(prefix);
        self.state.lock().unwrap().namespaces.insert(name.clone());
        Ok(name)
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.remove(name) {
            return Err(ClientError::not_found(format!("namespace {}", name)));
        }
        state.deleted.push(format!("namespace/{}", name));
        Ok(())
    }

    async fn create_application(&self, namespace: &str, name: &str) -> Result<Application> {
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.contains(namespace) {
            return Err(ClientError::not_found(format!("namespace {}", namespace)));
        }
        state
            .applications
            .insert((namespace.to_string(), name.to_string()));
        Ok(serde_json::from_value(json!({ "metadata": { "name": name, "namespace": namespace } }))?)
    }

    async fn delete_application(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .applications
            .remove(&(namespace.to_string(), name.to_string()));
        state.deleted.push(format!("application/{}", name));
        Ok(())
    }

    async fn create_component(&self, namespace: &str, spec: &ComponentSpec) -> Result<Component> {
        let mut state = self.state.lock().unwrap();
        state
            .components
            .insert((namespace.to_string(), spec.name.clone()), spec.clone());

        let repo = repo_of(&spec.git_url).to_string();
        let base_sha = state
            .repos
            .get(&repo)
            .and_then(|r| r.branches.get(&spec.revision))
            .cloned();

        let sha = match base_sha {
            Some(base_sha) => {
                let branch = format!("{}{}", PAC_BRANCH_PREFIX, spec.name);
                let number = state.next_id() as u64;
                let fake = state.repo_mut(&repo)?;
                fake.branches.insert(branch.clone(), base_sha.clone());
                fake.files
                    .push((branch.clone(), format!(".tekton/{}-pull-request.yaml", spec.name)));

                let sha = state.commit(&repo, &branch)?;
                let pull = PullRequest {
                    number,
                    title: format!("Konflux update {}", spec.name),
                    state: "open".to_string(),
                    head: GitRef { ref_name: branch, sha: sha.clone() },
                    base: GitRef { ref_name: spec.revision.clone(), sha: base_sha },
                };
                state.repo_mut(&repo)?.pulls.push(pull);
                sha
            }
            None => format!("sha{:04}", state.next_id()),
        };

        state.start_build(namespace, &spec.name, &spec.application, &sha);

        Ok(serde_json::from_value(json!({
            "metadata": { "name": spec.name, "namespace": namespace },
            "spec": {
                "componentName": spec.name,
                "application": spec.application,
                "source": { "git": {
                    "url": spec.git_url,
                    "revision": spec.revision,
                    "context": spec.context_dir,
                } }
            }
        }))?)
    }

    async fn get_component(&self, namespace: &str, name: &str) -> Result<Component> {
        let state = self.state.lock().unwrap();
        let spec = state
            .components
            .get(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClientError::not_found(format!("component {}", name)))?;
        Ok(serde_json::from_value(json!({
            "metadata": { "name": spec.name, "namespace": namespace },
            "spec": { "componentName": spec.name, "application": spec.application }
        }))?)
    }

    async fn delete_component(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .components
            .remove(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClientError::not_found(format!("component {}", name)))?;
        state.deleted.push(format!("component/{}", name));
        Ok(())
    }

    async fn request_build(&self, namespace: &str, component: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let spec = state
            .components
            .get(&(namespace.to_string(), component.to_string()))
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("component {}", component)))?;

        let sha = state
            .runs
            .iter()
            .rev()
            .find(|f| f.run.component() == Some(component))
            .and_then(|f| f.run.metadata.label(labels::PAC_SHA_LABEL))
            .unwrap_or_default()
            .to_string();

        *state.build_requests.entry(component.to_string()).or_default() += 1;
        state.start_build(namespace, component, &spec.application, &sha);
        Ok(())
    }

    async fn create_integration_test_scenario(
        &self,
        namespace: &str,
        application: &str,
        spec: &ScenarioSpec,
    ) -> Result<IntegrationTestScenario> {
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| names::generate_name("my-integration-test"));
        self.state
            .lock()
            .unwrap()
            .scenarios
            .insert((namespace.to_string(), name.clone()), application.to_string());
        Ok(serde_json::from_value(json!({
            "metadata": { "name": name, "namespace": namespace },
            "spec": { "application": application }
        }))?)
    }

    async fn delete_integration_test_scenario(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .scenarios
            .remove(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| ClientError::not_found(format!("scenario {}", name)))?;
        state.deleted.push(format!("scenario/{}", name));
        Ok(())
    }

    async fn list_pipeline_runs(
        &self,
        namespace: &str,
        query: &PipelineRunQuery,
    ) -> Result<Vec<PipelineRun>> {
        let mut state = self.state.lock().unwrap();
        state.advance(false);
        Ok(state
            .runs
            .iter()
            .map(|f| &f.run)
            .filter(|r| r.metadata.namespace.as_deref() == Some(namespace))
            .filter(|r| query.matches(&r.metadata.labels))
            .cloned()
            .collect())
    }

    async fn list_snapshots(&self, namespace: &str, application: &str) -> Result<Vec<Snapshot>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .snapshots
            .iter()
            .filter(|s| s.metadata.namespace.as_deref() == Some(namespace))
            .filter(|s| s.spec.application == application)
            .cloned()
            .collect())
    }

    async fn delete_snapshot(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.snapshots.len();
        state
            .snapshots
            .retain(|s| !(s.name() == name && s.metadata.namespace.as_deref() == Some(namespace)));
        if state.snapshots.len() == before {
            return Err(ClientError::not_found(format!("snapshot {}", name)));
        }
        state.deleted.push(format!("snapshot/{}", name));
        Ok(())
    }
}

#[async_trait]
impl SourceHost for FakeBackend {
    async fn create_ref(
        &self,
        repo: &str,
        base_branch: &str,
        sha: Option<&str>,
        new_branch: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let fake = state.repo_mut(repo)?;
        let sha = match sha.filter(|s| !s.is_empty()) {
            Some(sha) => sha.to_string(),
            None => fake
                .branches
                .get(base_branch)
                .cloned()
                .ok_or_else(|| ClientError::not_found(format!("branch {}", base_branch)))?,
        };
        if fake.branches.contains_key(new_branch) {
            return Err(ClientError::api_error(422, "Reference already exists"));
        }
        fake.branches.insert(new_branch.to_string(), sha);
        Ok(())
    }

    async fn delete_ref(&self, repo: &str, branch: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .repo_mut(repo)?
            .branches
            .remove(branch)
            .ok_or_else(|| ClientError::api_error(422, "Reference does not exist"))?;
        state.deleted.push(format!("branch/{}/{}", repo, branch));
        Ok(())
    }

    async fn list_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .repo_mut(repo)?
            .pulls
            .iter()
            .filter(|p| p.state == "open")
            .cloned()
            .collect())
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        _body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest> {
        let mut state = self.state.lock().unwrap();
        let number = state.next_id() as u64;
        let fake = state.repo_mut(repo)?;
        let head_sha = fake
            .branches
            .get(head)
            .cloned()
            .ok_or_else(|| ClientError::api_error(422, format!("head {} does not exist", head)))?;
        let base_sha = fake
            .branches
            .get(base)
            .cloned()
            .ok_or_else(|| ClientError::api_error(422, format!("base {} does not exist", base)))?;

        let pull = PullRequest {
            number,
            title: title.to_string(),
            state: "open".to_string(),
            head: GitRef { ref_name: head.to_string(), sha: head_sha.clone() },
            base: GitRef { ref_name: base.to_string(), sha: base_sha },
        };
        fake.pulls.push(pull.clone());

        let builds: Vec<(String, String, String)> = state
            .components
            .iter()
            .filter(|(_, spec)| repo_of(&spec.git_url) == repo && spec.revision == base)
            .map(|((ns, name), spec)| (ns.clone(), name.clone(), spec.application.clone()))
            .collect();
        if !builds.is_empty() {
            state.grouped_shas.insert(head_sha.clone());
        }
        for (namespace, component, application) in builds {
            state.start_build(&namespace, &component, &application, &head_sha);
        }

        Ok(pull)
    }

    async fn merge_pull_request(&self, repo: &str, number: u64) -> Result<MergeResult> {
        let mut state = self.state.lock().unwrap();
        if state.fail_merges {
            return Err(ClientError::api_error(405, "Pull Request is not mergeable"));
        }
        let merge_sha = format!("merge{:04}", state.next_id());
        let fake = state.repo_mut(repo)?;
        let pull = fake
            .pulls
            .iter_mut()
            .find(|p| p.number == number && p.state == "open")
            .ok_or_else(|| ClientError::not_found(format!("pull request #{}", number)))?;
        pull.state = "closed".to_string();
        let base = pull.base.ref_name.clone();
        fake.branches.insert(base, merge_sha.clone());

        Ok(MergeResult {
            sha: Some(merge_sha),
            merged: true,
            message: "Pull Request successfully merged".to_string(),
        })
    }

    async fn create_file(
        &self,
        repo: &str,
        path: &str,
        _content: &str,
        branch: &str,
    ) -> Result<FileCommit> {
        let mut state = self.state.lock().unwrap();
        let commit_sha = state.commit(repo, branch)?;
        state
            .repo_mut(repo)?
            .files
            .push((branch.to_string(), path.to_string()));
        Ok(FileCommit {
            path: path.to_string(),
            sha: Some(format!("blob-{}", commit_sha)),
            commit_sha: Some(commit_sha),
        })
    }

    async fn list_check_runs(&self, repo: &str, sha: &str) -> Result<Vec<CheckRun>> {
        let mut state = self.state.lock().unwrap();
        state.repo_mut(repo)?;

        let mut latest: BTreeMap<String, &PipelineRun> = BTreeMap::new();
        for fake in &state.runs {
            if fake.run.metadata.label(labels::PAC_SHA_LABEL) != Some(sha) {
                continue;
            }
            if let Some(component) = fake.run.component() {
                latest.insert(component.to_string(), &fake.run);
            }
        }

        Ok(latest
            .into_iter()
            .map(|(component, run)| CheckRun {
                name: format!("{}-{}", component, labels::PULL_REQUEST_CHECK_SUFFIX),
                status: if run.is_done() { "completed" } else { "in_progress" }.to_string(),
                conclusion: run.is_done().then(|| {
                    if run.succeeded() {
                        CheckRunConclusion::Success
                    } else {
                        CheckRunConclusion::Failure
                    }
                }),
            })
            .collect())
    }
}
