#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use workshop_aws::adapters::fetch::Fetcher;
use workshop_aws::adapters::object_store::ObjectStore;
use workshop_aws::adapters::provisioning::{StackDescription, StackProvisioner, UpdateOutcome};
use workshop_aws::error::{BucketCheckError, ProvisioningError, ResolutionError, TransferError};
use workshop_core::contract::{StackOutputs, StackTemplateRequest};

pub fn outputs(pairs: &[(&str, &str)]) -> StackOutputs {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

// ── provisioning ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionerCall {
    Describe,
    Create,
    Update,
}

/// Scripted stand-in for CloudFormation.
///
/// A create or update moves the stack to the first scripted status; every
/// describe after that returns the current status and then advances. The last
/// status repeats once the script runs out.
pub struct ScriptedProvisioner {
    stack_name: String,
    status: Mutex<Option<String>>,
    script: Mutex<VecDeque<String>>,
    started: Mutex<bool>,
    outputs: StackOutputs,
    describe_failure: Option<String>,
    no_updates: bool,
    calls: Mutex<Vec<ProvisionerCall>>,
}

impl ScriptedProvisioner {
    pub fn missing(stack_name: &str) -> Self {
        Self {
            stack_name: stack_name.to_string(),
            status: Mutex::new(None),
            script: Mutex::new(VecDeque::new()),
            started: Mutex::new(false),
            outputs: StackOutputs::new(),
            describe_failure: None,
            no_updates: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn existing(stack_name: &str, status: &str, outputs: StackOutputs) -> Self {
        Self {
            status: Mutex::new(Some(status.to_string())),
            outputs,
            ..Self::missing(stack_name)
        }
    }

    pub fn failing(stack_name: &str, message: &str) -> Self {
        Self {
            describe_failure: Some(message.to_string()),
            ..Self::missing(stack_name)
        }
    }

    pub fn with_outputs(self, outputs: StackOutputs) -> Self {
        Self { outputs, ..self }
    }

    pub fn with_script(self, statuses: &[&str]) -> Self {
        Self {
            script: Mutex::new(statuses.iter().map(|status| status.to_string()).collect()),
            ..self
        }
    }

    pub fn without_pending_updates(self) -> Self {
        Self {
            no_updates: true,
            ..self
        }
    }

    pub fn calls(&self) -> Vec<ProvisionerCall> {
        self.calls.lock().expect("poisoned mutex").clone()
    }

    pub fn describe_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == ProvisionerCall::Describe)
            .count()
    }

    fn record(&self, call: ProvisionerCall) {
        self.calls.lock().expect("poisoned mutex").push(call);
    }

    fn start(&self, default_status: &str) {
        *self.started.lock().expect("poisoned mutex") = true;
        let first = self
            .script
            .lock()
            .expect("poisoned mutex")
            .pop_front()
            .unwrap_or_else(|| default_status.to_string());
        *self.status.lock().expect("poisoned mutex") = Some(first);
    }

    fn advance(&self) {
        if !*self.started.lock().expect("poisoned mutex") {
            return;
        }
        let next = self.script.lock().expect("poisoned mutex").pop_front();
        if let Some(next) = next {
            *self.status.lock().expect("poisoned mutex") = Some(next);
        }
    }
}

impl StackProvisioner for ScriptedProvisioner {
    fn describe_stack(&self, stack_name: &str) -> Result<Option<StackDescription>, ResolutionError> {
        self.record(ProvisionerCall::Describe);

        if let Some(message) = &self.describe_failure {
            return Err(ResolutionError::Query {
                stack_name: stack_name.to_string(),
                message: message.clone(),
            });
        }
        if stack_name != self.stack_name {
            return Ok(None);
        }

        let status = self.status.lock().expect("poisoned mutex").clone();
        let Some(status) = status else {
            return Ok(None);
        };
        self.advance();
        Ok(Some(StackDescription {
            stack_name: stack_name.to_string(),
            status,
            outputs: self.outputs.clone(),
        }))
    }

    fn create_stack(&self, request: &StackTemplateRequest) -> Result<String, ProvisioningError> {
        self.record(ProvisionerCall::Create);
        self.start("CREATE_IN_PROGRESS");
        Ok(format!("arn:aws:cloudformation:stack/{}", request.stack_name))
    }

    fn update_stack(&self, request: &StackTemplateRequest) -> Result<UpdateOutcome, ProvisioningError> {
        self.record(ProvisionerCall::Update);
        if self.no_updates {
            return Ok(UpdateOutcome::NoUpdates);
        }
        self.start("UPDATE_IN_PROGRESS");
        Ok(UpdateOutcome::Started {
            stack_id: format!("arn:aws:cloudformation:stack/{}", request.stack_name),
        })
    }
}

// ── object store ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
}

pub enum BucketState {
    Available,
    Missing,
    Forbidden,
}

/// In-memory object store that snapshots uploaded file contents.
pub struct RecordingStore {
    bucket_state: BucketState,
    denied_key_suffix: Option<&'static str>,
    objects: Mutex<Vec<StoredObject>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            bucket_state: BucketState::Available,
            denied_key_suffix: None,
            objects: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bucket_state(bucket_state: BucketState) -> Self {
        Self {
            bucket_state,
            ..Self::new()
        }
    }

    pub fn denying(suffix: &'static str) -> Self {
        Self {
            denied_key_suffix: Some(suffix),
            ..Self::new()
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().expect("poisoned mutex").clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects().into_iter().map(|object| object.key).collect()
    }
}

impl ObjectStore for RecordingStore {
    fn check_bucket(&self, bucket: &str) -> Result<(), BucketCheckError> {
        match self.bucket_state {
            BucketState::Available => Ok(()),
            BucketState::Missing => Err(BucketCheckError::Missing {
                bucket: bucket.to_string(),
            }),
            BucketState::Forbidden => Err(BucketCheckError::Forbidden {
                bucket: bucket.to_string(),
            }),
        }
    }

    fn upload_file(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), TransferError> {
        if self
            .denied_key_suffix
            .is_some_and(|suffix| key.ends_with(suffix))
        {
            return Err(TransferError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "AccessDenied".to_string(),
            });
        }

        let body = std::fs::read(local_path).map_err(|source| TransferError::Io {
            operation: "read",
            path: local_path.to_path_buf(),
            source,
        })?;
        self.objects
            .lock()
            .expect("poisoned mutex")
            .push(StoredObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
                body,
            });
        Ok(())
    }
}

// ── http ───────────────────────────────────────────────────────────

/// Serves fixed bodies by URL; unknown URLs answer 404.
pub struct MapFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requested: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new(bodies: &[(&str, &str)]) -> Self {
        Self {
            bodies: bodies
                .iter()
                .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                .collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("poisoned mutex").clone()
    }
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransferError> {
        self.requested
            .lock()
            .expect("poisoned mutex")
            .push(url.to_string());

        let body = self.bodies.get(url).ok_or_else(|| TransferError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        sink.write_all(body).map_err(|source| TransferError::Stream {
            url: url.to_string(),
            source,
        })?;
        Ok(body.len() as u64)
    }
}
