use super::{action, create_from, merge_update, UpdatePolicy};
use crate::clients::{Delegate, Normalized, RequestArgs, RequestDelegate, SessionHandle};
use crate::error::Result;
use crate::path::VIRTUAL_MACHINES;
use crate::registry::Manager;
use crate::spec::{array_at, str_at, RunMode, RunStrategy, Serializable, VmSpec};
use log::debug;
use serde_json::json;

/// The name of the variant used from Harvester v1.1.0, which expresses the desired power state
/// with `runStrategy` instead of `running`.
pub const VM_RUN_STRATEGY_VARIANT: &str = "run-strategy";

/// KubeVirt virtual machines.
#[derive(Debug, Clone)]
pub struct VirtualMachineManager {
    delegate: Delegate,
    run_strategy: bool,
}

impl Manager for VirtualMachineManager {
    const KIND: &'static str = "virtual machine";

    fn base(session: SessionHandle) -> Self {
        Self {
            delegate: Delegate::new(Self::KIND, session),
            run_strategy: false,
        }
    }
}

impl VirtualMachineManager {
    /// The `runStrategy` variant, registered for clusters from v1.1.0.
    pub fn with_run_strategy(session: SessionHandle) -> Self {
        Self {
            run_strategy: true,
            ..Self::base(session)
        }
    }

    pub fn delegate(&self) -> &Delegate {
        &self.delegate
    }

    pub fn uses_run_strategy(&self) -> bool {
        self.run_strategy
    }

    /// A new, running `VmSpec` with its power state expressed the way this cluster expects.
    pub fn spec<S>(&self, cpu_cores: u64, memory: S) -> VmSpec
    where
        S: Into<String>,
    {
        let mut spec = VmSpec::new(cpu_cores, memory);
        spec.run_mode = self.adapt(spec.run_mode);
        spec
    }

    fn adapt(&self, run_mode: RunMode) -> RunMode {
        match (self.run_strategy, run_mode) {
            (true, RunMode::Running(true)) => RunMode::Strategy(RunStrategy::RerunOnFailure),
            (true, RunMode::Running(false)) => RunMode::Strategy(RunStrategy::Halted),
            (false, RunMode::Strategy(strategy)) => {
                RunMode::Running(strategy != RunStrategy::Halted)
            }
            (_, run_mode) => run_mode,
        }
    }

    /// A copy of `spec` with its run mode converted to the form the cluster understands.
    fn adapted(&self, name: &str, spec: &VmSpec) -> VmSpec {
        let mut spec = spec.clone();
        let run_mode = self.adapt(spec.run_mode);
        if run_mode != spec.run_mode {
            debug!(
                "expressing run mode {:?} of '{}' as {:?}",
                spec.run_mode, name, run_mode
            );
            spec.run_mode = run_mode;
        }
        spec
    }

    fn path(name: &str, namespace: &str) -> String {
        VIRTUAL_MACHINES.gateway(namespace, name)
    }

    pub fn get(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.delegate
            .get(&Self::path(name, namespace), RequestArgs::new())
    }

    pub fn list(&self, namespace: Option<&str>) -> Result<Normalized> {
        self.delegate.get(
            &VIRTUAL_MACHINES.gateway_collection(namespace),
            RequestArgs::new(),
        )
    }

    /// Create a virtual machine. The run mode of `spec` is converted to the form the cluster
    /// understands.
    pub fn create(&self, name: &str, namespace: &str, spec: &VmSpec) -> Result<Normalized> {
        create_from(
            &self.delegate,
            &VIRTUAL_MACHINES.gateway_collection(Some(namespace)),
            name,
            namespace,
            &self.adapted(name, spec),
        )
    }

    /// Update a virtual machine from a `VmSpec`, converting its run mode like `create` does.
    pub fn update(
        &self,
        name: &str,
        namespace: &str,
        spec: &VmSpec,
        policy: UpdatePolicy,
    ) -> Result<Normalized> {
        self.update_document(name, namespace, &self.adapted(name, spec), policy)
    }

    /// Update a virtual machine from any document, which is sent as it merges.
    pub fn update_document<D>(
        &self,
        name: &str,
        namespace: &str,
        data: &D,
        policy: UpdatePolicy,
    ) -> Result<Normalized>
    where
        D: Serializable + ?Sized,
    {
        let path = Self::path(name, namespace);
        merge_update(&self.delegate, &path, name, namespace, data, policy)
    }

    /// Delete a virtual machine. With `remove_disks`, the volumes it mounts are deleted with it.
    pub fn delete(&self, name: &str, namespace: &str, remove_disks: bool) -> Result<Normalized> {
        let path = Self::path(name, namespace);
        let mut args = RequestArgs::new();
        if remove_disks {
            let current = self.delegate.get(&path, RequestArgs::new())?;
            let document = match (current.is_success(), current.json()) {
                (true, Some(document)) => document,
                _ => return Ok(current),
            };
            let disks: Vec<&str> = array_at(document, "/spec/template/spec/volumes")
                .iter()
                .filter(|volume| volume.get("persistentVolumeClaim").is_some())
                .filter_map(|volume| str_at(volume, "/name"))
                .collect();
            args = args
                .query("removedDisks", disks.join(","))
                .query("propagationPolicy", "Foreground");
        }
        self.delegate.delete(&path, args)
    }

    fn action(&self, name: &str, namespace: &str, verb: &str) -> Result<Normalized> {
        action(&self.delegate, &Self::path(name, namespace), verb, None)
    }

    pub fn start(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.action(name, namespace, "start")
    }

    pub fn stop(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.action(name, namespace, "stop")
    }

    pub fn restart(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.action(name, namespace, "restart")
    }

    pub fn pause(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.action(name, namespace, "pause")
    }

    pub fn unpause(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.action(name, namespace, "unpause")
    }

    /// Reboot through the guest agent.
    pub fn softreboot(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.action(name, namespace, "softreboot")
    }

    /// Live-migrate to the host named `node`.
    pub fn migrate(&self, name: &str, namespace: &str, node: &str) -> Result<Normalized> {
        action(
            &self.delegate,
            &Self::path(name, namespace),
            "migrate",
            Some(json!({ "nodeName": node })),
        )
    }

    pub fn abort_migrate(&self, name: &str, namespace: &str) -> Result<Normalized> {
        self.action(name, namespace, "abortMigration")
    }

    /// Back the virtual machine up to the configured backup target.
    pub fn backup(&self, name: &str, namespace: &str, backup_name: &str) -> Result<Normalized> {
        action(
            &self.delegate,
            &Self::path(name, namespace),
            "backup",
            Some(json!({ "name": backup_name })),
        )
    }
}
